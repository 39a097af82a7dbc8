//! Entity models persisted by the store.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;
use stayrate_core::{
    BookingStatus, Cents, PmsKind, PricingMethod, PropertyStatus, Role, Strategy,
    SubscriptionStatus,
};
use uuid::Uuid;

use crate::{StoreError, StoreResult};

/// Auto-pricing scheduler state embedded on the tenant row.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AutoPricing {
    pub enabled: bool,
    /// IANA timezone the tenant's midnight is evaluated in. Falls back to the
    /// tenant's own timezone when unset.
    pub timezone: Option<String>,
    pub last_attempt: Option<DateTime<Utc>>,
    pub last_successful_run: Option<DateTime<Utc>>,
    pub failed_attempts: i32,
}

/// Operator account. One row per user; `team_id` groups accounts sharing an
/// inventory and is lazily initialized to the user's own id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub team_id: Option<Uuid>,
    pub timezone: String,
    pub language: String,
    pub currency: String,
    pub subscription_status: SubscriptionStatus,
    pub subscription_id: Option<String>,
    pub customer_id: Option<String>,
    pub access_disabled: bool,
    pub banned: bool,
    pub payment_failed: bool,
    pub pms_sync_enabled: bool,
    pub pms_sync_stopped_reason: Option<String>,
    pub auto_pricing: AutoPricing,
    /// Monthly revenue targets keyed by `YYYY-MM`.
    pub revenue_targets: HashMap<String, Cents>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tenant {
    /// Effective team id: falls back to the tenant's own id before the lazy
    /// initialization has been persisted.
    pub fn effective_team_id(&self) -> Uuid {
        self.team_id.unwrap_or(self.id)
    }

    /// Timezone the auto-pricing scheduler evaluates midnight in.
    pub fn scheduling_timezone(&self) -> &str {
        self.auto_pricing.timezone.as_deref().unwrap_or(&self.timezone)
    }
}

/// Rental property.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Property {
    pub id: Uuid,
    pub team_id: Uuid,
    pub owner_id: Uuid,
    pub address: String,
    pub city: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub country: String,
    pub property_type: String,
    pub capacity: i32,
    pub surface: f64,
    pub amenities: Vec<String>,
    pub strategy: Strategy,
    pub floor_price: Cents,
    pub base_price: Cents,
    pub ceiling_price: Option<Cents>,
    pub min_stay: i32,
    pub max_stay: Option<i32>,
    pub weekly_discount_percent: Option<f64>,
    pub monthly_discount_percent: Option<f64>,
    pub weekend_markup_percent: Option<f64>,
    pub status: PropertyStatus,
    pub pms_id: Option<String>,
    pub pms_type: Option<PmsKind>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Property {
    pub fn is_pms_linked(&self) -> bool {
        self.pms_id.is_some() && self.pms_type.is_some()
    }

    /// Validate the price ladder: `0 ≤ floor ≤ base ≤ ceiling?`.
    pub fn validate_prices(
        floor_price: Cents,
        base_price: Cents,
        ceiling_price: Option<Cents>,
    ) -> Result<(), String> {
        if floor_price < 0 {
            return Err("floor_price must be >= 0".into());
        }
        if base_price < floor_price {
            return Err("base_price must be >= floor_price".into());
        }
        if let Some(ceiling) = ceiling_price {
            if ceiling < base_price {
                return Err("ceiling_price must be >= base_price".into());
            }
        }
        Ok(())
    }
}

/// Property group; membership lives in the `group_properties` join table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub sync_prices: bool,
    pub main_property_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Group hydrated with its member property ids.
#[derive(Debug, Clone)]
pub struct GroupWithMembers {
    pub group: Group,
    pub members: Vec<Uuid>,
}

impl GroupWithMembers {
    /// The member billed as parent: the main property if still a member,
    /// else the first surviving member.
    pub fn parent_member(&self) -> Option<Uuid> {
        match self.group.main_property_id {
            Some(main) if self.members.contains(&main) => Some(main),
            _ => self.members.first().copied(),
        }
    }
}

/// Per-day price entry. Locked rows are immutable to automated writers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceOverride {
    pub property_id: Uuid,
    pub date: NaiveDate,
    pub price: Cents,
    pub is_locked: bool,
    pub reason: String,
    pub updated_by: String,
    pub updated_at: DateTime<Utc>,
}

/// Batch write issued by the pricing orchestrator. Never touches locks.
#[derive(Debug, Clone, PartialEq)]
pub struct OverrideWrite {
    pub date: NaiveDate,
    pub price: Cents,
    pub reason: String,
}

/// Reservation, locally created or mirrored from a PMS.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub property_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub price_per_night: Option<Cents>,
    pub revenue: Option<Cents>,
    pub channel: String,
    pub guest_name: Option<String>,
    pub status: BookingStatus,
    pub pms_booking_id: Option<String>,
    pub pricing_method: PricingMethod,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// A mirrored row must be mutated through the sync gateway.
    pub fn is_pms_mirror(&self) -> bool {
        self.pms_booking_id.is_some()
    }

    pub fn nights(&self) -> i64 {
        (self.end_date - self.start_date).num_days()
    }
}

/// PMS (or other provider) connection owned by a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Integration {
    pub user_id: Uuid,
    pub kind: PmsKind,
    /// Opaque per-kind credential payload.
    pub credentials: serde_json::Value,
    pub connected_at: DateTime<Utc>,
    pub last_sync: Option<DateTime<Utc>>,
}

/// Append-only audit entry for property mutations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyLog {
    pub id: i64,
    pub property_id: Uuid,
    pub user_id: Uuid,
    pub user_email: String,
    pub action: String,
    pub changes: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Cached payload produced by background market jobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub data: serde_json::Value,
    pub language: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Entries older than 24 hours are stale; consumers may still use them
    /// while a producer refreshes.
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        now - self.updated_at > chrono::Duration::hours(24)
    }
}

/// Parse a text column into one of the shared enums, reporting the table on
/// failure instead of panicking on corrupt data.
pub(crate) fn parse_column<T>(table: &'static str, raw: String) -> StoreResult<T>
where
    T: FromStr,
    T::Err: Display,
{
    raw.parse::<T>()
        .map_err(|e| StoreError::corrupt(table, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_ladder_validation() {
        assert!(Property::validate_prices(50_00, 100_00, Some(200_00)).is_ok());
        assert!(Property::validate_prices(50_00, 100_00, None).is_ok());
        assert!(Property::validate_prices(-1, 100_00, None).is_err());
        assert!(Property::validate_prices(150_00, 100_00, None).is_err());
        assert!(Property::validate_prices(50_00, 100_00, Some(80_00)).is_err());
    }

    #[test]
    fn parent_member_prefers_main_when_still_member() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let now = Utc::now();
        let mut grouped = GroupWithMembers {
            group: Group {
                id: Uuid::new_v4(),
                owner_id: Uuid::new_v4(),
                name: "lakefront".into(),
                sync_prices: true,
                main_property_id: Some(b),
                created_at: now,
                updated_at: now,
            },
            members: vec![a, b],
        };
        assert_eq!(grouped.parent_member(), Some(b));

        // Main property left the group: first surviving member takes over.
        grouped.members = vec![a];
        assert_eq!(grouped.parent_member(), Some(a));

        grouped.members.clear();
        assert_eq!(grouped.parent_member(), None);
    }

    #[test]
    fn cache_staleness_threshold() {
        let now = Utc::now();
        let entry = CacheEntry {
            key: "market:paris:fr".into(),
            data: serde_json::json!({}),
            language: None,
            updated_at: now - chrono::Duration::hours(25),
        };
        assert!(entry.is_stale(now));
        let fresh = CacheEntry {
            updated_at: now - chrono::Duration::hours(2),
            ..entry
        };
        assert!(!fresh.is_stale(now));
    }
}
