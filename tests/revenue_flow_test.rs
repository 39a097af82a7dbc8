//! Cross-subsystem integration tests on in-memory data: inventory shape →
//! billable quantities → tier totals → proration, and calendar generation →
//! clamping → the coalesced rate batches a PMS adapter would send.

use chrono::{NaiveDate, Utc};
use std::collections::HashSet;
use stayrate_billing::{
    check_trial_cap, compute_quantities, proration_deltas, tiered_parent_total, BillingError,
    Quantities, CHILD_UNIT_PRICE,
};
use stayrate_core::{PropertyStatus, Strategy, SubscriptionStatus};
use stayrate_pms::{coalesce_rates, MockAdapter, PmsAdapter, RateUpdate};
use stayrate_pricing::{build_calendar, clamp_days};
use stayrate_store::{Group, GroupWithMembers, Property};
use uuid::Uuid;

fn property(team_id: Uuid) -> Property {
    let now = Utc::now();
    Property {
        id: Uuid::new_v4(),
        team_id,
        owner_id: team_id,
        address: "8 rue du Vieux Port".into(),
        city: "Marseille".into(),
        latitude: Some(43.2965),
        longitude: Some(5.3698),
        country: "FR".into(),
        property_type: "appartement".into(),
        capacity: 4,
        surface: 55.0,
        amenities: vec!["wifi".into(), "climatisation".into()],
        strategy: Strategy::Equilibre,
        floor_price: 60_00,
        base_price: 120_00,
        ceiling_price: Some(350_00),
        min_stay: 2,
        max_stay: None,
        weekly_discount_percent: Some(5.0),
        monthly_discount_percent: Some(12.0),
        weekend_markup_percent: Some(15.0),
        status: PropertyStatus::Active,
        pms_id: None,
        pms_type: None,
        created_at: now,
        updated_at: now,
    }
}

fn group_of(owner_id: Uuid, members: &[&Property], main: Option<Uuid>) -> GroupWithMembers {
    let now = Utc::now();
    GroupWithMembers {
        group: Group {
            id: Uuid::new_v4(),
            owner_id,
            name: "vieux-port".into(),
            sync_prices: true,
            main_property_id: main,
            created_at: now,
            updated_at: now,
        },
        members: members.iter().map(|p| p.id).collect(),
    }
}

fn d(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

#[test]
fn seven_parents_two_children_bill_8791_cents() {
    let team = Uuid::new_v4();
    // 6 ungrouped properties + one group of 3 = 7 parents, 2 children.
    let properties: Vec<Property> = (0..9).map(|_| property(team)).collect();
    let grouped = group_of(
        team,
        &[&properties[0], &properties[1], &properties[2]],
        Some(properties[1].id),
    );

    let quantities = compute_quantities(&properties, &[grouped]);
    assert_eq!(quantities, Quantities { parent: 7, child: 2 });
    assert_eq!(quantities.total(), properties.len() as u32);

    let monthly = tiered_parent_total(quantities.parent)
        + quantities.child as i64 * CHILD_UNIT_PRICE;
    assert_eq!(monthly, 8791);
}

#[test]
fn mid_cycle_upgrade_emits_marginal_proration_amounts() {
    let old = Quantities { parent: 5, child: 0 };
    let new = Quantities { parent: 6, child: 1 };
    let deltas = proration_deltas(old, new);
    assert_eq!(deltas.parent_amount, 899);
    assert_eq!(deltas.child_amount, 399);

    // And shrinking back emits nothing.
    assert_eq!(proration_deltas(new, old).parent_amount, 0);
    assert_eq!(proration_deltas(new, old).child_amount, 0);
}

#[test]
fn trial_import_past_the_cap_is_rejected_with_structured_error() {
    let err = check_trial_cap(SubscriptionStatus::Trialing, 9, 3).unwrap_err();
    let BillingError::Rule(violation) = err else {
        panic!("expected a business-rule error");
    };
    let body = serde_json::to_value(&violation).unwrap();
    assert_eq!(body["code"], "LIMIT_EXCEEDED");
    assert_eq!(body["currentCount"], 9);
    assert_eq!(body["maxAllowed"], 10);
    assert_eq!(body["requiresPayment"], true);
    assert_eq!(body["attemptedImport"], 3);
}

#[test]
fn calendar_respects_locks_floor_ceiling_and_window() {
    let team = Uuid::new_v4();
    let property = property(team);
    let today = d("2025-07-01");

    let days = build_calendar(&property, today, None).unwrap();
    assert_eq!(days.len(), 180);

    // Bastille Day is locked by the operator at 220; clamping must skip it.
    let locked: HashSet<NaiveDate> = [d("2025-07-14")].into_iter().collect();
    let clamped = clamp_days(&days, property.floor_price, property.ceiling_price, &locked);

    assert_eq!(clamped.locked_preserved, 1);
    assert_eq!(clamped.writes.len(), 179);
    assert!(clamped.rates.iter().all(|r| r.date != d("2025-07-14")));
    for write in &clamped.writes {
        assert!(write.price >= property.floor_price);
        assert!(write.price <= property.ceiling_price.unwrap());
    }
}

#[tokio::test]
async fn clamped_rates_flow_through_a_pms_adapter_in_coalesced_batches() {
    let team = Uuid::new_v4();
    let property = property(team);
    let days = build_calendar(&property, d("2025-07-01"), None).unwrap();
    let clamped = clamp_days(&days, property.floor_price, property.ceiling_price, &HashSet::new());

    // Same-price days collapse into far fewer remote operations.
    let batches = coalesce_rates(&clamped.rates);
    assert!(batches.len() < clamped.rates.len());
    let batched_days: usize = batches.iter().map(|b| b.dates.len()).sum();
    assert_eq!(batched_days, clamped.rates.len());

    let adapter = MockAdapter::new();
    adapter
        .update_batch_rates("remote-1", &clamped.rates)
        .await
        .unwrap();
    let pushes = adapter.rate_pushes();
    assert_eq!(pushes.len(), 1);
    assert_eq!(pushes[0].1.len(), clamped.rates.len());
}

#[tokio::test]
async fn failed_remote_push_leaves_no_rate_recorded() {
    let adapter = MockAdapter::new();
    adapter.fail_next("maintenance window");
    let result = adapter
        .update_batch_rates(
            "remote-1",
            &[RateUpdate { date: d("2025-07-01"), price: 120.0 }],
        )
        .await;
    assert!(result.is_err());
    assert!(adapter.rate_pushes().is_empty());
}
