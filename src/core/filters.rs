use std::sync::Arc;

use crate::models::{PatientProfile, Trial};

/// Pluggable site filter applied before scoring. Returning `false` excludes
/// the trial from the candidate set.
pub type SitePredicate = Arc<dyn Fn(&PatientProfile, &Trial) -> bool + Send + Sync>;

/// Case-insensitive facility-name containment against the patient's
/// treating hospital
///
/// This is the historical filtering behavior, expressed as one predicate so
/// fuzzy or normalized matchers can replace it without touching the engine.
/// Patients without a hospital on file match every trial.
pub fn hospital_name_contains() -> SitePredicate {
    Arc::new(|patient, trial| {
        let Some(hospital) = patient.hospital.as_deref() else {
            return true;
        };
        let needle = hospital.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        trial
            .locations
            .iter()
            .any(|location| location.facility.to_lowercase().contains(&needle))
    })
}
