use serde::{Deserialize, Serialize};

use crate::models::domain::ScoredTrial;

/// Response for the trial matching endpoint
#[derive(Debug, Serialize)]
pub struct FindTrialsResponse {
    #[serde(rename = "requestId")]
    pub request_id: String,
    pub matches: Vec<ScoredTrial>,
    #[serde(rename = "totalCandidates")]
    pub total_candidates: usize,
    #[serde(rename = "skippedCount")]
    pub skipped_count: usize,
    #[serde(rename = "degradedCount")]
    pub degraded_count: usize,
    pub errors: Vec<String>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
