//! Parent/child unit computation from a tenant's inventory.
//!
//! Each group with at least one surviving member contributes exactly one
//! parent (the main property if still a member, else the first surviving
//! member); its other members are children. Properties outside any group are
//! parents. Conservation: `parent + child = |properties|`.

use std::collections::HashSet;
use stayrate_store::{GroupWithMembers, Property};
use uuid::Uuid;

/// Billable unit counts for a tenant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Quantities {
    pub parent: u32,
    pub child: u32,
}

impl Quantities {
    pub fn total(&self) -> u32 {
        self.parent + self.child
    }
}

/// Compute `(parent, child)` from the current inventory.
///
/// Group members that no longer exist as properties are ignored; a property
/// claimed by several groups (impossible under the join-table uniqueness,
/// but defended here) only counts once, for the first group seen.
pub fn compute_quantities(properties: &[Property], groups: &[GroupWithMembers]) -> Quantities {
    let existing: HashSet<Uuid> = properties.iter().map(|p| p.id).collect();
    let mut claimed: HashSet<Uuid> = HashSet::new();
    let mut quantities = Quantities::default();

    for grouped in groups {
        let surviving: Vec<Uuid> = grouped
            .members
            .iter()
            .filter(|id| existing.contains(id) && !claimed.contains(id))
            .copied()
            .collect();
        if surviving.is_empty() {
            continue;
        }

        let parent = match grouped.group.main_property_id {
            Some(main) if surviving.contains(&main) => main,
            _ => surviving[0],
        };

        for member in &surviving {
            claimed.insert(*member);
            if *member == parent {
                quantities.parent += 1;
            } else {
                quantities.child += 1;
            }
        }
    }

    for property in properties {
        if !claimed.contains(&property.id) {
            quantities.parent += 1;
        }
    }

    quantities
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use stayrate_core::{PropertyStatus, Strategy};
    use stayrate_store::Group;

    fn property(id: Uuid) -> Property {
        let now = Utc::now();
        Property {
            id,
            team_id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            address: "1 quai de la Loire".into(),
            city: "Nantes".into(),
            latitude: None,
            longitude: None,
            country: "FR".into(),
            property_type: "maison".into(),
            capacity: 6,
            surface: 90.0,
            amenities: vec![],
            strategy: Strategy::Equilibre,
            floor_price: 70_00,
            base_price: 140_00,
            ceiling_price: None,
            min_stay: 2,
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

    fn group(members: Vec<Uuid>, main: Option<Uuid>) -> GroupWithMembers {
        let now = Utc::now();
        GroupWithMembers {
            group: Group {
                id: Uuid::new_v4(),
                owner_id: Uuid::new_v4(),
                name: "centre-ville".into(),
                sync_prices: true,
                main_property_id: main,
                created_at: now,
                updated_at: now,
            },
            members,
        }
    }

    #[test]
    fn ungrouped_properties_are_all_parents() {
        let properties: Vec<Property> = (0..3).map(|_| property(Uuid::new_v4())).collect();
        let q = compute_quantities(&properties, &[]);
        assert_eq!(q, Quantities { parent: 3, child: 0 });
    }

    #[test]
    fn group_contributes_one_parent_and_children() {
        let ids: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
        let properties: Vec<Property> = ids.iter().map(|id| property(*id)).collect();
        let groups = vec![group(ids.clone(), Some(ids[2]))];
        let q = compute_quantities(&properties, &groups);
        assert_eq!(q, Quantities { parent: 1, child: 3 });
    }

    #[test]
    fn main_property_gone_falls_back_to_first_member() {
        let ids: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        let properties: Vec<Property> = ids.iter().map(|id| property(*id)).collect();
        // Main references a deleted property.
        let groups = vec![group(ids.clone(), Some(Uuid::new_v4()))];
        let q = compute_quantities(&properties, &groups);
        assert_eq!(q, Quantities { parent: 1, child: 2 });
    }

    #[test]
    fn singleton_group_is_parent_only() {
        let id = Uuid::new_v4();
        let properties = vec![property(id)];
        let groups = vec![group(vec![id], Some(id))];
        let q = compute_quantities(&properties, &groups);
        assert_eq!(q, Quantities { parent: 1, child: 0 });
    }

    #[test]
    fn empty_inventory_is_zero_not_one() {
        let q = compute_quantities(&[], &[]);
        assert_eq!(q, Quantities::default());
    }

    #[test]
    fn conservation_parent_plus_child_equals_total() {
        let ids: Vec<Uuid> = (0..7).map(|_| Uuid::new_v4()).collect();
        let properties: Vec<Property> = ids.iter().map(|id| property(*id)).collect();
        let groups = vec![
            group(vec![ids[0], ids[1], ids[2]], Some(ids[0])),
            group(vec![ids[3], ids[4]], None),
        ];
        let q = compute_quantities(&properties, &groups);
        assert_eq!(q.total(), 7);
        assert_eq!(q, Quantities { parent: 4, child: 3 });
    }

    #[test]
    fn stale_group_members_are_ignored() {
        let kept = Uuid::new_v4();
        let properties = vec![property(kept)];
        // Group still references two deleted properties.
        let groups = vec![group(vec![Uuid::new_v4(), kept, Uuid::new_v4()], None)];
        let q = compute_quantities(&properties, &groups);
        assert_eq!(q, Quantities { parent: 1, child: 0 });
    }
}
