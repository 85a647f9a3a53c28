// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    ConfigError, Coordinates, Eligibility, MatchConfig, MatchReport, PatientProfile,
    RankingStrategy, RawTrialRecord, ScoredTrial, Sex, SexRestriction, Trial, TrialLocation,
    TrialStatus, Verdict,
};
pub use requests::FindTrialsRequest;
pub use responses::{ErrorResponse, FindTrialsResponse, HealthResponse};
