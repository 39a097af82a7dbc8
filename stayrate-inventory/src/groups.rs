//! Group membership coherence: template matching plus the geofence.
//!
//! The template is the main property when it is still a member, otherwise
//! the first surviving member. A candidate must share capacity, surface, and
//! property type with the template and sit within 500 m of it.

use crate::geo::check_geofence;
use stayrate_core::{CoreError, CoreResult};
use stayrate_store::{GroupWithMembers, Property};

/// Surface equality tolerance in square meters.
const SURFACE_TOLERANCE_M2: f64 = 0.5;

/// Pick the template property for membership checks.
pub fn group_template<'a>(
    grouped: &GroupWithMembers,
    members: &'a [Property],
) -> Option<&'a Property> {
    if let Some(main) = grouped.group.main_property_id {
        if let Some(template) = members.iter().find(|p| p.id == main) {
            return Some(template);
        }
    }
    members.first()
}

/// Validate a candidate against the group template. Returns the geofence
/// distance in meters on success.
pub fn validate_member(candidate: &Property, template: &Property) -> CoreResult<u32> {
    if candidate.capacity != template.capacity {
        return Err(CoreError::validation(
            "capacity",
            format!(
                "group requires capacity {}, property has {}",
                template.capacity, candidate.capacity
            ),
        ));
    }
    if (candidate.surface - template.surface).abs() > SURFACE_TOLERANCE_M2 {
        return Err(CoreError::validation(
            "surface",
            format!(
                "group requires surface {} m2, property has {} m2",
                template.surface, candidate.surface
            ),
        ));
    }
    if candidate.property_type != template.property_type {
        return Err(CoreError::validation(
            "property_type",
            format!(
                "group requires type {}, property is {}",
                template.property_type, candidate.property_type
            ),
        ));
    }

    check_geofence(
        (candidate.latitude, candidate.longitude),
        (template.latitude, template.longitude),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use stayrate_core::{BusinessRuleViolation, PropertyStatus, Strategy};
    use stayrate_store::Group;
    use uuid::Uuid;

    fn property(capacity: i32, surface: f64, ptype: &str, lat: f64, lon: f64) -> Property {
        let now = Utc::now();
        Property {
            id: Uuid::new_v4(),
            team_id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            address: "3 rue de la République".into(),
            city: "Lyon".into(),
            latitude: Some(lat),
            longitude: Some(lon),
            country: "FR".into(),
            property_type: ptype.into(),
            capacity,
            surface,
            amenities: vec![],
            strategy: Strategy::Equilibre,
            floor_price: 55_00,
            base_price: 110_00,
            ceiling_price: None,
            min_stay: 1,
            max_stay: None,
            weekly_discount_percent: None,
            monthly_discount_percent: None,
            weekend_markup_percent: None,
            status: PropertyStatus::Active,
            pms_id: None,
            pms_type: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn matching_twin_within_fence_is_accepted() {
        let template = property(4, 62.0, "appartement", 45.7640, 4.8357);
        let candidate = property(4, 62.0, "appartement", 45.7655, 4.8365);
        assert!(validate_member(&candidate, &template).is_ok());
    }

    #[test]
    fn capacity_mismatch_is_rejected() {
        let template = property(4, 62.0, "appartement", 45.7640, 4.8357);
        let candidate = property(6, 62.0, "appartement", 45.7641, 4.8358);
        let err = validate_member(&candidate, &template).unwrap_err();
        assert!(matches!(err, CoreError::Validation { .. }));
    }

    #[test]
    fn type_mismatch_is_rejected() {
        let template = property(4, 62.0, "appartement", 45.7640, 4.8357);
        let candidate = property(4, 62.0, "studio", 45.7641, 4.8358);
        assert!(validate_member(&candidate, &template).is_err());
    }

    #[test]
    fn distant_twin_hits_the_geofence() {
        let template = property(4, 62.0, "appartement", 45.7640, 4.8357);
        let candidate = property(4, 62.0, "appartement", 45.8000, 4.9000);
        let err = validate_member(&candidate, &template).unwrap_err();
        assert!(matches!(
            err,
            CoreError::BusinessRule(BusinessRuleViolation::GeoFencingViolation { .. })
        ));
    }

    #[test]
    fn template_prefers_main_then_first_member() {
        let a = property(4, 62.0, "appartement", 45.76, 4.83);
        let b = property(4, 62.0, "appartement", 45.77, 4.84);
        let now = Utc::now();
        let grouped = GroupWithMembers {
            group: Group {
                id: Uuid::new_v4(),
                owner_id: Uuid::new_v4(),
                name: "presqu'île".into(),
                sync_prices: false,
                main_property_id: Some(b.id),
                created_at: now,
                updated_at: now,
            },
            members: vec![a.id, b.id],
        };
        let members = vec![a.clone(), b.clone()];
        assert_eq!(group_template(&grouped, &members).unwrap().id, b.id);

        let without_main = GroupWithMembers {
            group: Group {
                main_property_id: None,
                ..grouped.group.clone()
            },
            members: vec![a.id, b.id],
        };
        assert_eq!(group_template(&without_main, &members).unwrap().id, a.id);
    }
}
