use crate::models::{PatientProfile, Sex, SexRestriction, Trial, Verdict};

/// Evaluate a patient against a trial's structured eligibility fields
///
/// Only known-and-contradictory data disqualifies: a parsed age bound with a
/// known patient age outside it, or a sex restriction with a known mismatched
/// patient sex. Criteria whose patient attribute is unknown are recorded as
/// "not evaluated" and never flip the verdict to `Ineligible`. A trial with
/// no structured eligibility data at all gets verdict `Unknown`.
///
/// Free-text criteria are advisory; they surface in the explanation but are
/// never parsed into predicates here.
pub fn evaluate(patient: &PatientProfile, trial: &Trial) -> (Verdict, Vec<String>) {
    let eligibility = &trial.eligibility;
    let mut reasons = Vec::new();

    if eligibility.is_empty() {
        reasons.push("no structured eligibility data".to_string());
        if !eligibility.criteria.is_empty() {
            reasons.push("free-text criteria not evaluated".to_string());
        }
        return (Verdict::Unknown, reasons);
    }

    let mut disqualified = false;

    match (patient.age, eligibility.minimum_age_years) {
        (Some(age), Some(min)) if age < min => {
            disqualified = true;
            reasons.push(format!("age {} below minimum {}", age, min));
        }
        (Some(age), Some(min)) => {
            reasons.push(format!("age {} meets minimum {}", age, min));
        }
        (None, Some(min)) => {
            reasons.push(format!("minimum age {} unknown — not evaluated", min));
        }
        (_, None) => {}
    }

    match (patient.age, eligibility.maximum_age_years) {
        (Some(age), Some(max)) if age > max => {
            disqualified = true;
            reasons.push(format!("age {} above maximum {}", age, max));
        }
        (Some(age), Some(max)) => {
            reasons.push(format!("age {} within maximum {}", age, max));
        }
        (None, Some(max)) => {
            reasons.push(format!("maximum age {} unknown — not evaluated", max));
        }
        (_, None) => {}
    }

    match (patient.sex, eligibility.sex) {
        (_, SexRestriction::Any) => {}
        (Some(sex), restriction) => {
            if sex_matches(sex, restriction) {
                reasons.push(format!("sex restriction ({:?}) satisfied", restriction));
            } else {
                disqualified = true;
                reasons.push(format!("sex restriction ({:?}) not met", restriction));
            }
        }
        (None, restriction) => {
            reasons.push(format!(
                "sex restriction ({:?}) unknown — not evaluated",
                restriction
            ));
        }
    }

    // The patient model has no healthy-volunteer attribute; advisory only.
    if let Some(accepts) = eligibility.healthy_volunteers {
        reasons.push(if accepts {
            "accepts healthy volunteers".to_string()
        } else {
            "does not accept healthy volunteers — not evaluated".to_string()
        });
    }

    if !eligibility.criteria.is_empty() {
        reasons.push("free-text criteria not evaluated".to_string());
    }

    let verdict = if disqualified {
        Verdict::Ineligible
    } else {
        Verdict::Eligible
    };

    (verdict, reasons)
}

fn sex_matches(sex: Sex, restriction: SexRestriction) -> bool {
    matches!(
        (sex, restriction),
        (Sex::Male, SexRestriction::Male) | (Sex::Female, SexRestriction::Female)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Eligibility, TrialStatus};

    fn patient(age: Option<u8>, sex: Option<Sex>) -> PatientProfile {
        PatientProfile {
            medical_record: "chronic condition".to_string(),
            hospital: None,
            latitude: 40.7128,
            longitude: -74.0060,
            age,
            sex,
        }
    }

    fn trial_with(eligibility: Eligibility) -> Trial {
        Trial {
            id: "NCT001".to_string(),
            title: "Study".to_string(),
            summary: String::new(),
            status: TrialStatus::Recruiting,
            locations: vec![],
            eligibility,
        }
    }

    fn age_range(min: Option<u8>, max: Option<u8>) -> Eligibility {
        Eligibility {
            minimum_age_years: min,
            maximum_age_years: max,
            ..Eligibility::default()
        }
    }

    #[test]
    fn test_age_above_maximum_disqualifies() {
        let (verdict, reasons) = evaluate(
            &patient(Some(70), None),
            &trial_with(age_range(Some(18), Some(65))),
        );
        assert_eq!(verdict, Verdict::Ineligible);
        assert!(reasons.iter().any(|r| r.contains("above maximum")));
    }

    #[test]
    fn test_age_within_range_eligible() {
        let (verdict, _) = evaluate(
            &patient(Some(40), None),
            &trial_with(age_range(Some(18), Some(65))),
        );
        assert_eq!(verdict, Verdict::Eligible);
    }

    #[test]
    fn test_unknown_age_never_disqualifies() {
        let (verdict, reasons) = evaluate(
            &patient(None, None),
            &trial_with(age_range(Some(18), Some(65))),
        );
        assert_ne!(verdict, Verdict::Ineligible);
        assert!(reasons.iter().any(|r| r.contains("not evaluated")));
    }

    #[test]
    fn test_sex_mismatch_disqualifies() {
        let eligibility = Eligibility {
            sex: SexRestriction::Female,
            ..Eligibility::default()
        };
        let (verdict, _) = evaluate(&patient(None, Some(Sex::Male)), &trial_with(eligibility));
        assert_eq!(verdict, Verdict::Ineligible);
    }

    #[test]
    fn test_unknown_sex_does_not_disqualify() {
        let eligibility = Eligibility {
            sex: SexRestriction::Female,
            ..Eligibility::default()
        };
        let (verdict, _) = evaluate(&patient(None, None), &trial_with(eligibility));
        assert_eq!(verdict, Verdict::Eligible);
    }

    #[test]
    fn test_no_structured_data_is_unknown() {
        let (verdict, reasons) = evaluate(&patient(Some(40), None), &trial_with(Eligibility::default()));
        assert_eq!(verdict, Verdict::Unknown);
        assert!(reasons.iter().any(|r| r.contains("no structured eligibility")));
    }

    #[test]
    fn test_criteria_text_alone_is_unknown_and_advisory() {
        let eligibility = Eligibility {
            criteria: "Inclusion: confirmed diagnosis".to_string(),
            ..Eligibility::default()
        };
        let (verdict, reasons) = evaluate(&patient(Some(40), None), &trial_with(eligibility));
        assert_eq!(verdict, Verdict::Unknown);
        assert!(reasons.iter().any(|r| r.contains("free-text criteria")));
    }

    #[test]
    fn test_healthy_volunteer_flag_is_advisory() {
        let eligibility = Eligibility {
            healthy_volunteers: Some(false),
            ..Eligibility::default()
        };
        let (verdict, reasons) = evaluate(&patient(None, None), &trial_with(eligibility));
        assert_eq!(verdict, Verdict::Eligible);
        assert!(reasons.iter().any(|r| r.contains("healthy volunteers")));
    }
}
