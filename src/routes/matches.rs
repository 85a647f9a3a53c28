use actix_web::{web, HttpResponse, Responder};
use std::sync::Arc;
use validator::Validate;

use crate::core::MatchingEngine;
use crate::models::{
    ErrorResponse, FindTrialsRequest, FindTrialsResponse, HealthResponse, PatientProfile,
};
use crate::services::{GeoFilter, TrialSource};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<dyn TrialSource>,
    pub engine: Arc<MatchingEngine>,
}

/// Configure all match-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/matches/find", web::post().to(find_trials));
}

/// Health check endpoint
pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Trial matching endpoint
///
/// POST /api/v1/matches/find
///
/// Request body:
/// ```json
/// {
///   "condition": "lung cancer",
///   "medicalRecord": "…",
///   "hospital": "Johns Hopkins",
///   "latitude": 39.29,
///   "longitude": -76.61,
///   "age": 54,
///   "sex": "female",
///   "radiusKm": 80,
///   "topN": 10
/// }
/// ```
async fn find_trials(
    state: web::Data<AppState>,
    req: web::Json<FindTrialsRequest>,
) -> impl Responder {
    // Validate request
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for find_trials request: {:?}", errors);
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "Validation failed".to_string(),
            message: errors.to_string(),
            status_code: 400,
        });
    }

    let request_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(
        "Matching request {}: condition='{}', radius={}km",
        request_id,
        req.condition,
        req.radius_km
    );

    let patient = PatientProfile {
        medical_record: req.medical_record.clone(),
        hospital: req.hospital.clone(),
        latitude: req.latitude,
        longitude: req.longitude,
        age: req.age,
        sex: req.sex,
    };

    let filter = GeoFilter {
        latitude: req.latitude,
        longitude: req.longitude,
        radius_km: req.radius_km,
    };

    // A failed fetch means zero candidates plus a surfaced error, never a
    // crashed request
    let (raw_trials, mut fetch_errors) =
        match state.registry.fetch(&req.condition, Some(filter)).await {
            Ok(records) => (records, Vec::new()),
            Err(e) => {
                tracing::error!("Registry fetch failed for request {}: {}", request_id, e);
                (Vec::new(), vec![format!("registry fetch failed: {}", e)])
            }
        };

    let report = state
        .engine
        .match_trials(&patient, raw_trials, req.top_n)
        .await;

    fetch_errors.extend(report.errors);

    tracing::info!(
        "Request {}: {} matches from {} candidates ({} skipped, {} degraded)",
        request_id,
        report.matches.len(),
        report.total_candidates,
        report.skipped_count,
        report.degraded_count
    );

    HttpResponse::Ok().json(FindTrialsResponse {
        request_id,
        matches: report.matches,
        total_candidates: report.total_candidates,
        skipped_count: report.skipped_count,
        degraded_count: report.degraded_count,
        errors: fetch_errors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_check_response() {
        let response = HealthResponse {
            status: "healthy".to_string(),
            version: "0.1.0".to_string(),
            timestamp: chrono::Utc::now(),
        };

        assert_eq!(response.status, "healthy");
    }

    #[test]
    fn test_request_validation() {
        let request = FindTrialsRequest {
            condition: String::new(),
            medical_record: "record".to_string(),
            hospital: None,
            latitude: 40.7,
            longitude: -74.0,
            age: None,
            sex: None,
            radius_km: 80,
            top_n: None,
        };
        assert!(request.validate().is_err());

        let request = FindTrialsRequest {
            condition: "cancer".to_string(),
            latitude: 120.0,
            ..request
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_zero_top_n_is_rejected() {
        let request = FindTrialsRequest {
            condition: "cancer".to_string(),
            medical_record: "record".to_string(),
            hospital: None,
            latitude: 40.7,
            longitude: -74.0,
            age: None,
            sex: None,
            radius_km: 80,
            top_n: Some(0),
        };
        assert!(request.validate().is_err());

        let request = FindTrialsRequest {
            top_n: Some(1),
            ..request
        };
        assert!(request.validate().is_ok());
    }
}
