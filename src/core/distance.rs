use crate::models::{Coordinates, TrialLocation};

/// Earth's radius in kilometers
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Calculate the Haversine distance between two points in kilometers
///
/// # Arguments
/// * `lat1` - Latitude of first point in degrees
/// * `lon1` - Longitude of first point in degrees
/// * `lat2` - Latitude of second point in degrees
/// * `lon2` - Longitude of second point in degrees
///
/// # Returns
/// Distance in kilometers
#[inline]
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Distance from the patient to the nearest trial site with known
/// coordinates. `None` when no site has coordinates; missing coordinates
/// are never substituted with a default point.
///
/// Sites are scanned in source order, so among equidistant sites the
/// earlier one wins.
pub fn nearest_site_km(patient: Coordinates, locations: &[TrialLocation]) -> Option<f64> {
    let mut best: Option<f64> = None;

    for location in locations {
        let Some(coords) = location.coordinates else {
            continue;
        };
        let distance = haversine_distance(
            patient.latitude,
            patient.longitude,
            coords.latitude,
            coords.longitude,
        );
        if best.map_or(true, |b| distance < b) {
            best = Some(distance);
        }
    }

    best
}

/// Map a distance to a bounded score contribution in (0, 1]
///
/// `contribution = 1 / (1 + d / reference_km)`: monotonically decreasing,
/// 1.0 only at zero distance, 0.5 at the reference distance. An unknown
/// distance contributes 0.0 — distinct from being at distance zero.
#[inline]
pub fn proximity_contribution(distance_km: Option<f64>, reference_km: f64) -> f64 {
    match distance_km {
        Some(d) => 1.0 / (1.0 + d / reference_km),
        None => 0.0,
    }
}
