use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use crate::models::RawTrialRecord;
use crate::services::{CapabilityError, GeoFilter, TrialSource};

/// Fields requested from the registry; keeps response payloads small
const STUDY_FIELDS: &str = "NCTId,BriefTitle,BriefSummary,OverallStatus,\
LocationFacility,LocationCity,LocationState,LocationCountry,LocationGeoPoint,\
EligibilityModule";

/// ClinicalTrials.gov v2 API client
///
/// Queries the `studies` endpoint by condition with an optional geographic
/// distance filter. A failed fetch surfaces as an error the caller reports
/// alongside an empty candidate set; it never crashes a request.
pub struct RegistryClient {
    endpoint: String,
    page_size: u32,
    client: Client,
}

impl RegistryClient {
    pub fn new(endpoint: String, page_size: u32, timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            endpoint,
            page_size,
            client,
        }
    }
}

#[async_trait]
impl TrialSource for RegistryClient {
    async fn fetch(
        &self,
        condition: &str,
        filter: Option<GeoFilter>,
    ) -> Result<Vec<RawTrialRecord>, CapabilityError> {
        let mut params: Vec<(&str, String)> = vec![
            ("query.cond", condition.to_string()),
            ("format", "json".to_string()),
            ("pageSize", self.page_size.to_string()),
            ("fields", STUDY_FIELDS.to_string()),
        ];

        if let Some(geo) = filter {
            // Registry syntax: distance(lat,lng,Nkm)
            params.push((
                "filter.geo",
                format!("distance({},{},{}km)", geo.latitude, geo.longitude, geo.radius_km),
            ));
        }

        tracing::debug!("Querying trial registry for condition '{}'", condition);

        let response = self
            .client
            .get(&self.endpoint)
            .query(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CapabilityError::Api(format!(
                "registry returned {}",
                response.status()
            )));
        }

        let json: Value = response.json().await?;

        let studies = json
            .get("studies")
            .and_then(|s| s.as_array())
            .ok_or_else(|| CapabilityError::InvalidResponse("missing studies array".into()))?;

        tracing::info!("Registry returned {} studies for '{}'", studies.len(), condition);

        Ok(studies.to_vec())
    }
}
