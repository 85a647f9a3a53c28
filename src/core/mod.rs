// Core algorithm exports
pub mod distance;
pub mod eligibility;
pub mod engine;
pub mod filters;
pub mod normalize;
pub mod relevance;

pub use distance::{haversine_distance, nearest_site_km, proximity_contribution};
pub use engine::MatchingEngine;
pub use filters::{hospital_name_contains, SitePredicate};
pub use normalize::{normalize, DataError};
pub use relevance::cosine_similarity;
