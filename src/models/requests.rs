use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::domain::Sex;

/// Request to match a patient against registry trials
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FindTrialsRequest {
    /// Condition used to query the registry (e.g. "lung cancer")
    #[validate(length(min = 1))]
    pub condition: String,
    /// Patient medical record text used for semantic relevance
    #[validate(length(min = 1))]
    #[serde(alias = "medical_record", rename = "medicalRecord")]
    pub medical_record: String,
    /// Hospital filter; when set, only trials with a matching site survive
    #[serde(default)]
    pub hospital: Option<String>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
    #[serde(default)]
    pub age: Option<u8>,
    #[serde(default)]
    pub sex: Option<Sex>,
    /// Search radius passed to the registry, in kilometers
    #[serde(default = "default_radius_km")]
    #[serde(alias = "radius_km", rename = "radiusKm")]
    pub radius_km: u32,
    /// Override for the configured result count
    #[validate(range(min = 1))]
    #[serde(default)]
    #[serde(alias = "top_n", rename = "topN")]
    pub top_n: Option<usize>,
}

fn default_radius_km() -> u32 {
    80
}
