//! Great-circle distance and the group geofence.

use stayrate_core::{BusinessRuleViolation, CoreError, CoreResult};

/// Earth radius used by the geofence, in meters.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Members must sit within this distance of the group template.
pub const MAX_GROUP_DISTANCE_M: u32 = 500;

/// Haversine distance between two WGS84 points, in meters.
pub fn haversine_distance_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_M * c
}

/// Enforce the 500 m geofence against the group template. Missing
/// coordinates on either side fail validation rather than the fence.
pub fn check_geofence(
    candidate: (Option<f64>, Option<f64>),
    template: (Option<f64>, Option<f64>),
) -> CoreResult<u32> {
    let (lat1, lon1) = match candidate {
        (Some(lat), Some(lon)) => (lat, lon),
        _ => {
            return Err(CoreError::validation(
                "location",
                "property has no coordinates for geofencing",
            ))
        }
    };
    let (lat2, lon2) = match template {
        (Some(lat), Some(lon)) => (lat, lon),
        _ => {
            return Err(CoreError::validation(
                "location",
                "group template has no coordinates for geofencing",
            ))
        }
    };

    let distance = haversine_distance_m(lat1, lon1, lat2, lon2).round() as u32;
    if distance > MAX_GROUP_DISTANCE_M {
        return Err(CoreError::BusinessRule(
            BusinessRuleViolation::GeoFencingViolation {
                distance,
                max_distance: MAX_GROUP_DISTANCE_M,
            },
        ));
    }
    Ok(distance)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearby_paris_points_pass_the_fence() {
        // ≈ 430 m from the Hôtel de Ville template.
        let distance = check_geofence(
            (Some(48.8600), Some(2.3550)),
            (Some(48.8566), Some(2.3522)),
        )
        .unwrap();
        assert!((350..500).contains(&distance), "distance {distance}");
    }

    #[test]
    fn distant_point_is_rejected_with_distance() {
        // ≈ 2.6 km away.
        let err = check_geofence(
            (Some(48.8700), Some(2.3800)),
            (Some(48.8566), Some(2.3522)),
        )
        .unwrap_err();
        match err {
            CoreError::BusinessRule(BusinessRuleViolation::GeoFencingViolation {
                distance,
                max_distance,
            }) => {
                assert!((2_300..2_900).contains(&distance), "distance {distance}");
                assert_eq!(max_distance, 500);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_coordinates_fail_validation_not_the_fence() {
        let err = check_geofence((None, None), (Some(48.85), Some(2.35))).unwrap_err();
        assert!(matches!(err, CoreError::Validation { .. }));
    }

    #[test]
    fn zero_distance_for_identical_points() {
        let distance = check_geofence(
            (Some(43.2965), Some(5.3698)),
            (Some(43.2965), Some(5.3698)),
        )
        .unwrap();
        assert_eq!(distance, 0);
    }
}
