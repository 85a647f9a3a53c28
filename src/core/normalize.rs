use serde_json::Value;
use thiserror::Error;

use crate::models::{
    Coordinates, Eligibility, RawTrialRecord, SexRestriction, Trial, TrialLocation, TrialStatus,
};

/// Malformed raw record. Normalization failures are isolated per record:
/// the record is skipped and counted, the batch continues.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("record is not a JSON object")]
    NotAnObject,

    #[error("record has no trial id")]
    MissingId,
}

/// Map a raw registry record onto the canonical `Trial`
///
/// Tolerates both registry schemas: the v2 nested `protocolSection` layout
/// and the flat legacy field layout. Any absent section yields defaults; the
/// only failure is a record without a usable id.
pub fn normalize(raw: &RawTrialRecord) -> Result<Trial, DataError> {
    if !raw.is_object() {
        return Err(DataError::NotAnObject);
    }

    if raw.get("protocolSection").is_some() {
        normalize_v2(raw)
    } else {
        normalize_flat(raw)
    }
}

fn normalize_v2(raw: &Value) -> Result<Trial, DataError> {
    let protocol = &raw["protocolSection"];
    let identification = &protocol["identificationModule"];

    let id = str_field(identification, "nctId").ok_or(DataError::MissingId)?;

    let title = str_field(identification, "briefTitle").unwrap_or_default();
    let summary = str_field(&protocol["descriptionModule"], "briefSummary").unwrap_or_default();
    let status = parse_status(
        &str_field(&protocol["statusModule"], "overallStatus").unwrap_or_default(),
    );

    let locations = protocol["contactsLocationsModule"]["locations"]
        .as_array()
        .map(|entries| entries.iter().map(parse_v2_location).collect())
        .unwrap_or_default();

    let eligibility = parse_eligibility(&protocol["eligibilityModule"]);

    Ok(Trial {
        id,
        title,
        summary,
        status,
        locations,
        eligibility,
    })
}

fn normalize_flat(raw: &Value) -> Result<Trial, DataError> {
    let id = str_field(raw, "NCTId").ok_or(DataError::MissingId)?;

    let facilities = string_list(&raw["LocationFacility"]);
    let cities = string_list(&raw["LocationCity"]);
    let regions = string_list(&raw["LocationState"]);
    let countries = string_list(&raw["LocationCountry"]);
    let geo_points = match &raw["LocationGeoPoint"] {
        Value::Array(points) => points.iter().map(parse_geo_point).collect(),
        point @ Value::Object(_) => vec![parse_geo_point(point)],
        _ => vec![],
    };

    let site_count = facilities
        .len()
        .max(cities.len())
        .max(regions.len())
        .max(countries.len());

    let locations = (0..site_count)
        .map(|i| TrialLocation {
            facility: facilities.get(i).cloned().unwrap_or_default(),
            city: cities.get(i).cloned().unwrap_or_default(),
            region: regions.get(i).cloned().unwrap_or_default(),
            country: countries.get(i).cloned().unwrap_or_default(),
            coordinates: geo_points.get(i).copied().flatten(),
        })
        .collect();

    Ok(Trial {
        id,
        title: str_field(raw, "BriefTitle").unwrap_or_default(),
        summary: str_field(raw, "BriefSummary").unwrap_or_default(),
        status: parse_status(&str_field(raw, "OverallStatus").unwrap_or_default()),
        locations,
        eligibility: parse_eligibility(&raw["EligibilityModule"]),
    })
}

fn parse_v2_location(entry: &Value) -> TrialLocation {
    TrialLocation {
        facility: str_field(entry, "facility").unwrap_or_default(),
        city: str_field(entry, "city").unwrap_or_default(),
        region: str_field(entry, "state").unwrap_or_default(),
        country: str_field(entry, "country").unwrap_or_default(),
        coordinates: parse_geo_point(&entry["geoPoint"]),
    }
}

fn parse_eligibility(module: &Value) -> Eligibility {
    let minimum_age_text = str_field(module, "minimumAge").unwrap_or_default();
    let maximum_age_text = str_field(module, "maximumAge").unwrap_or_default();
    let minimum_age_years = parse_age_years(&minimum_age_text);
    let maximum_age_years = parse_age_years(&maximum_age_text);

    Eligibility {
        criteria: str_field(module, "eligibilityCriteria").unwrap_or_default(),
        minimum_age_text,
        maximum_age_text,
        minimum_age_years,
        maximum_age_years,
        sex: parse_sex(&str_field(module, "sex").unwrap_or_default()),
        healthy_volunteers: parse_healthy_volunteers(&module["healthyVolunteers"]),
    }
}

/// Parse a registry age string ("18 Years", "6 Months", "N/A") into whole
/// years. Only a numeric prefix parses; everything else stays `None` while
/// the raw text is retained on the `Eligibility`.
pub fn parse_age_years(text: &str) -> Option<u8> {
    let trimmed = text.trim();
    let digits: String = trimmed.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let amount: u32 = digits.parse().ok()?;

    let unit = trimmed[digits.len()..].trim().to_ascii_lowercase();
    let years = if unit.starts_with("month") {
        amount / 12
    } else if unit.starts_with("week") {
        amount / 52
    } else if unit.starts_with("day") {
        amount / 365
    } else {
        // No unit or "Years"
        amount
    };

    u8::try_from(years).ok()
}

fn parse_status(raw: &str) -> TrialStatus {
    let upper = raw
        .trim()
        .to_ascii_uppercase()
        .replace(',', "")
        .replace(' ', "_");
    match upper.as_str() {
        "RECRUITING" | "ENROLLING_BY_INVITATION" => TrialStatus::Recruiting,
        "ACTIVE_NOT_RECRUITING" | "ACTIVE" => TrialStatus::Active,
        "COMPLETED" | "TERMINATED" | "WITHDRAWN" | "SUSPENDED" => TrialStatus::Closed,
        _ => TrialStatus::Unknown,
    }
}

fn parse_sex(raw: &str) -> SexRestriction {
    match raw.trim().to_ascii_uppercase().as_str() {
        "MALE" => SexRestriction::Male,
        "FEMALE" => SexRestriction::Female,
        _ => SexRestriction::Any,
    }
}

fn parse_healthy_volunteers(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "yes" | "true" => Some(true),
            "no" | "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn parse_geo_point(value: &Value) -> Option<Coordinates> {
    let latitude = value.get("lat").and_then(Value::as_f64)?;
    let longitude = value.get("lon").and_then(Value::as_f64)?;
    Some(Coordinates {
        latitude,
        longitude,
    })
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(String::from)
            .collect(),
        _ => vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_v2_record() {
        let raw = json!({
            "protocolSection": {
                "identificationModule": {"nctId": "NCT100", "briefTitle": "Lung study"},
                "descriptionModule": {"briefSummary": "A summary"},
                "statusModule": {"overallStatus": "RECRUITING"},
                "contactsLocationsModule": {
                    "locations": [
                        {
                            "facility": "Johns Hopkins Hospital",
                            "city": "Baltimore",
                            "state": "Maryland",
                            "country": "United States",
                            "geoPoint": {"lat": 39.2904, "lon": -76.6122}
                        },
                        {"facility": "Unknown Clinic", "city": "Somewhere"}
                    ]
                },
                "eligibilityModule": {
                    "eligibilityCriteria": "Inclusion: adults",
                    "sex": "ALL",
                    "minimumAge": "18 Years",
                    "maximumAge": "65 Years",
                    "healthyVolunteers": false
                }
            }
        });

        let trial = normalize(&raw).unwrap();
        assert_eq!(trial.id, "NCT100");
        assert_eq!(trial.title, "Lung study");
        assert_eq!(trial.status, TrialStatus::Recruiting);
        assert_eq!(trial.locations.len(), 2);
        assert!(trial.locations[0].coordinates.is_some());
        // Missing geoPoint stays None, never (0,0)
        assert!(trial.locations[1].coordinates.is_none());
        assert_eq!(trial.eligibility.minimum_age_years, Some(18));
        assert_eq!(trial.eligibility.maximum_age_years, Some(65));
        assert_eq!(trial.eligibility.sex, SexRestriction::Any);
        assert_eq!(trial.eligibility.healthy_volunteers, Some(false));
    }

    #[test]
    fn test_normalize_flat_record() {
        let raw = json!({
            "NCTId": "NCT200",
            "BriefTitle": "Legacy study",
            "BriefSummary": "Summary",
            "OverallStatus": "Completed",
            "LocationFacility": ["Mayo Clinic", "City Hospital"],
            "LocationCity": ["Rochester", "New York"],
            "LocationState": ["Minnesota", "New York"],
            "LocationCountry": ["United States", "United States"]
        });

        let trial = normalize(&raw).unwrap();
        assert_eq!(trial.id, "NCT200");
        assert_eq!(trial.status, TrialStatus::Closed);
        assert_eq!(trial.locations.len(), 2);
        assert_eq!(trial.locations[0].facility, "Mayo Clinic");
        // Source order preserved
        assert_eq!(trial.locations[1].city, "New York");
        assert!(trial.locations.iter().all(|l| l.coordinates.is_none()));
    }

    #[test]
    fn test_missing_sections_default() {
        let raw = json!({
            "protocolSection": {
                "identificationModule": {"nctId": "NCT300"}
            }
        });

        let trial = normalize(&raw).unwrap();
        assert_eq!(trial.id, "NCT300");
        assert!(trial.title.is_empty());
        assert_eq!(trial.status, TrialStatus::Unknown);
        assert!(trial.locations.is_empty());
        assert!(trial.eligibility.is_empty());
    }

    #[test]
    fn test_missing_id_fails() {
        let raw = json!({"protocolSection": {"identificationModule": {}}});
        assert!(matches!(normalize(&raw), Err(DataError::MissingId)));

        let raw = json!("not an object");
        assert!(matches!(normalize(&raw), Err(DataError::NotAnObject)));
    }

    #[test]
    fn test_parse_age_years() {
        assert_eq!(parse_age_years("18 Years"), Some(18));
        assert_eq!(parse_age_years("65"), Some(65));
        assert_eq!(parse_age_years("6 Months"), Some(0));
        assert_eq!(parse_age_years("30 Months"), Some(2));
        assert_eq!(parse_age_years("N/A"), None);
        assert_eq!(parse_age_years(""), None);
        assert_eq!(parse_age_years("None"), None);
    }

    #[test]
    fn test_age_text_retained_when_unparsable() {
        let raw = json!({
            "protocolSection": {
                "identificationModule": {"nctId": "NCT400"},
                "eligibilityModule": {"minimumAge": "N/A", "maximumAge": "65 Years"}
            }
        });

        let trial = normalize(&raw).unwrap();
        assert_eq!(trial.eligibility.minimum_age_text, "N/A");
        assert_eq!(trial.eligibility.minimum_age_years, None);
        assert_eq!(trial.eligibility.maximum_age_years, Some(65));
    }

    #[test]
    fn test_parse_status_variants() {
        assert_eq!(parse_status("RECRUITING"), TrialStatus::Recruiting);
        assert_eq!(parse_status("Active, not recruiting"), TrialStatus::Active);
        assert_eq!(parse_status("ACTIVE_NOT_RECRUITING"), TrialStatus::Active);
        assert_eq!(parse_status("TERMINATED"), TrialStatus::Closed);
        assert_eq!(parse_status(""), TrialStatus::Unknown);
    }
}
