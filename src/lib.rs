//! Trialmatch - clinical trial matching and ranking service
//!
//! This library matches patient profiles against clinical trial records
//! from an external registry. Per trial, it combines semantic relevance
//! (text embeddings), geographic proximity (nearest study site) and
//! structured eligibility into a deterministic, explained ranking.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{cosine_similarity, haversine_distance, MatchingEngine};
pub use models::{
    MatchConfig, MatchReport, PatientProfile, RankingStrategy, ScoredTrial, Trial, Verdict,
};
