// Service exports
pub mod embedding;
pub mod registry;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Coordinates, RawTrialRecord};

pub use embedding::EmbeddingClient;
pub use registry::RegistryClient;

/// Failure of an external capability (registry, embedding, geocoding).
/// These degrade the affected signal locally and never abort a request.
#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    Api(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Geographic filter forwarded with a registry query
#[derive(Debug, Clone, Copy)]
pub struct GeoFilter {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_km: u32,
}

/// Source of raw trial records (the trial registry)
#[async_trait]
pub trait TrialSource: Send + Sync {
    async fn fetch(
        &self,
        condition: &str,
        filter: Option<GeoFilter>,
    ) -> Result<Vec<RawTrialRecord>, CapabilityError>;
}

/// Text embedding capability used for semantic relevance
#[async_trait]
pub trait TextScorer: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, CapabilityError>;
}

/// Optional facility geocoding capability. Absence leaves site coordinates
/// unknown; unresolved facilities return None rather than a made-up point.
#[async_trait]
pub trait GeoResolver: Send + Sync {
    async fn resolve(&self, facility: &str, city: &str, country: &str) -> Option<Coordinates>;
}
