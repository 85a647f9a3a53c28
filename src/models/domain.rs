use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raw record as returned by a trial registry. Schema varies by registry
/// version, so it stays opaque until normalization.
pub type RawTrialRecord = serde_json::Value;

/// Geographic coordinates in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Patient sex as recorded in the medical profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
}

/// Patient profile for one matching request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientProfile {
    /// Free-text medical record / condition description
    #[serde(rename = "medicalRecord")]
    pub medical_record: String,
    /// Hospital where the patient is being treated
    #[serde(default)]
    pub hospital: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub age: Option<u8>,
    #[serde(default)]
    pub sex: Option<Sex>,
}

impl PatientProfile {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

/// Overall recruitment status of a trial
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrialStatus {
    Recruiting,
    Active,
    Closed,
    Unknown,
}

/// One study site. Coordinates stay absent when the registry record has no
/// geo point and no resolver filled them in; they are never defaulted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialLocation {
    #[serde(default)]
    pub facility: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
}

/// Sex restriction in a trial's eligibility section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SexRestriction {
    #[default]
    Any,
    Male,
    Female,
}

/// Structured eligibility data. Age bounds keep the registry's raw text
/// alongside the parsed whole-years form; free-text criteria are advisory
/// only and never evaluated programmatically.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Eligibility {
    #[serde(default)]
    pub criteria: String,
    #[serde(default)]
    pub minimum_age_text: String,
    #[serde(default)]
    pub maximum_age_text: String,
    #[serde(default)]
    pub minimum_age_years: Option<u8>,
    #[serde(default)]
    pub maximum_age_years: Option<u8>,
    #[serde(default = "default_sex_restriction")]
    pub sex: SexRestriction,
    #[serde(default)]
    pub healthy_volunteers: Option<bool>,
}

fn default_sex_restriction() -> SexRestriction {
    SexRestriction::Any
}

impl Eligibility {
    /// True when no structured field carries information. Such trials get
    /// verdict `Unknown` rather than a fabricated `Eligible`.
    pub fn is_empty(&self) -> bool {
        self.minimum_age_years.is_none()
            && self.maximum_age_years.is_none()
            && self.sex == SexRestriction::Any
            && self.healthy_volunteers.is_none()
    }
}

/// Canonical trial record, produced once per raw record by the normalizer
/// and immutable thereafter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trial {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub summary: String,
    pub status: TrialStatus,
    /// Source order is preserved; it feeds proximity tie-breaks
    #[serde(default)]
    pub locations: Vec<TrialLocation>,
    #[serde(default)]
    pub eligibility: Eligibility,
}

impl Trial {
    /// Text used for semantic relevance: title, summary and criteria joined.
    /// Empty when the record carried none of them.
    pub fn relevance_text(&self) -> String {
        let mut parts = Vec::new();
        if !self.title.is_empty() {
            parts.push(self.title.as_str());
        }
        if !self.summary.is_empty() {
            parts.push(self.summary.as_str());
        }
        if !self.eligibility.criteria.is_empty() {
            parts.push(self.eligibility.criteria.as_str());
        }
        parts.join("\n")
    }
}

/// Eligibility outcome for one patient-trial pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Eligible,
    Ineligible,
    Unknown,
}

/// Trial plus the per-signal scores and the composite used for ranking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredTrial {
    pub trial: Trial,
    /// Raw cosine similarity in [-1, 1]; absent when the embedding
    /// capability failed for this trial
    #[serde(rename = "relevanceScore")]
    pub relevance_score: Option<f64>,
    /// Distance to the nearest site with known coordinates
    #[serde(rename = "proximityKm")]
    pub proximity_km: Option<f64>,
    /// Bounded contribution derived from proximity_km, 0.0 when unknown
    #[serde(rename = "proximityContribution")]
    pub proximity_contribution: f64,
    pub verdict: Verdict,
    #[serde(rename = "compositeScore")]
    pub composite_score: f64,
    pub explanation: String,
}

/// Ranking policy. The historical agent variants ranked by distance only,
/// by similarity only, or by a blend; this makes the variation explicit
/// configuration instead of parallel pipelines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingStrategy {
    SimilarityOnly,
    ProximityOnly,
    Blended,
}

impl Default for RankingStrategy {
    fn default() -> Self {
        RankingStrategy::Blended
    }
}

/// Invalid matching configuration, rejected before any processing starts
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("relevance_weight must be within [0, 1], got {0}")]
    InvalidWeight(f64),

    #[error("top_n must be greater than zero")]
    InvalidTopN,

    #[error("proximity_reference_km must be positive, got {0}")]
    InvalidReferenceDistance(f64),

    #[error("max_concurrency must be at least 1")]
    InvalidConcurrency,
}

/// Matching engine configuration
#[derive(Debug, Clone)]
pub struct MatchConfig {
    pub top_n: usize,
    /// Weight of the relevance signal; proximity gets `1 - relevance_weight`
    pub relevance_weight: f64,
    pub proximity_reference_km: f64,
    pub max_concurrency: usize,
    pub strategy: RankingStrategy,
    /// Overall scoring deadline; in-flight trials are abandoned on expiry
    pub timeout: Option<std::time::Duration>,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            top_n: 10,
            relevance_weight: 0.7,
            proximity_reference_km: 100.0,
            max_concurrency: 8,
            strategy: RankingStrategy::Blended,
            timeout: None,
        }
    }
}

impl MatchConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.relevance_weight) || self.relevance_weight.is_nan() {
            return Err(ConfigError::InvalidWeight(self.relevance_weight));
        }
        if self.top_n == 0 {
            return Err(ConfigError::InvalidTopN);
        }
        if !(self.proximity_reference_km > 0.0) {
            return Err(ConfigError::InvalidReferenceDistance(
                self.proximity_reference_km,
            ));
        }
        if self.max_concurrency == 0 {
            return Err(ConfigError::InvalidConcurrency);
        }
        Ok(())
    }

    /// Effective (relevance, proximity) weights for the configured strategy
    pub fn effective_weights(&self) -> (f64, f64) {
        match self.strategy {
            RankingStrategy::SimilarityOnly => (1.0, 0.0),
            RankingStrategy::ProximityOnly => (0.0, 1.0),
            RankingStrategy::Blended => (self.relevance_weight, 1.0 - self.relevance_weight),
        }
    }
}

/// Result of one matching request. The counts let callers tell an empty
/// shortlist apart from a systemic failure.
#[derive(Debug)]
pub struct MatchReport {
    pub matches: Vec<ScoredTrial>,
    pub total_candidates: usize,
    /// Records dropped during normalization
    pub skipped_count: usize,
    /// Trials whose relevance signal degraded on a capability failure
    pub degraded_count: usize,
    pub errors: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(MatchConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_weight_rejected() {
        let config = MatchConfig {
            relevance_weight: 1.5,
            ..MatchConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidWeight(_))
        ));
    }

    #[test]
    fn test_zero_top_n_rejected() {
        let config = MatchConfig {
            top_n: 0,
            ..MatchConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidTopN)));
    }

    #[test]
    fn test_strategy_weights() {
        let config = MatchConfig::default();
        assert_eq!(config.effective_weights(), (0.7, 0.3));

        let proximity_only = MatchConfig {
            strategy: RankingStrategy::ProximityOnly,
            ..MatchConfig::default()
        };
        assert_eq!(proximity_only.effective_weights(), (0.0, 1.0));
    }

    #[test]
    fn test_empty_eligibility() {
        assert!(Eligibility::default().is_empty());

        let with_age = Eligibility {
            minimum_age_years: Some(18),
            ..Eligibility::default()
        };
        assert!(!with_age.is_empty());
    }

    #[test]
    fn test_relevance_text_skips_empty_sections() {
        let trial = Trial {
            id: "NCT001".to_string(),
            title: "A study".to_string(),
            summary: String::new(),
            status: TrialStatus::Recruiting,
            locations: vec![],
            eligibility: Eligibility::default(),
        };
        assert_eq!(trial.relevance_text(), "A study");
    }
}
