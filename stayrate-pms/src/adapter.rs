//! PMS capability trait and the canonical wire format every adapter
//! normalizes into: string ids, `YYYY-MM-DD` dates, prices as base-unit
//! floats.

use crate::PmsResult;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use stayrate_core::PmsKind;

/// Adapter identity and capabilities.
#[derive(Debug, Clone)]
pub struct AdapterMetadata {
    pub kind: PmsKind,
    pub name: &'static str,
    /// Whether the backend accepts coalesced multi-date rate operations.
    pub supports_bulk_rates: bool,
}

/// Property as normalized from a PMS backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PmsProperty {
    pub pms_id: String,
    pub name: String,
    pub capacity: Option<i32>,
    pub location: Option<String>,
}

/// Reservation as normalized from a PMS backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PmsReservation {
    pub pms_id: String,
    pub property_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: String,
    pub guest_name: Option<String>,
    pub total_price: Option<f64>,
    pub channel: Option<String>,
}

/// Payload for creating or updating a reservation remotely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationData {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub guest_name: Option<String>,
    pub total_price: Option<f64>,
    pub channel: Option<String>,
    pub status: Option<String>,
}

/// One day's rate, price in base units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateUpdate {
    pub date: NaiveDate,
    pub price: f64,
}

/// Same-price dates folded into one remote operation.
#[derive(Debug, Clone, PartialEq)]
pub struct CoalescedRates {
    pub dates: Vec<NaiveDate>,
    pub price: f64,
}

/// Settings subset a backend accepts; any field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub floor_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ceiling_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_stay: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_stay: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weekly_discount_percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly_discount_percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weekend_markup_percent: Option<f64>,
}

impl SettingsUpdate {
    pub fn is_empty(&self) -> bool {
        *self == SettingsUpdate::default()
    }
}

/// Capability set every PMS backend implements.
///
/// Errors carry a textual reason; retry policy belongs to callers.
#[async_trait]
pub trait PmsAdapter: Send + Sync {
    fn metadata(&self) -> AdapterMetadata;

    async fn test_connection(&self) -> PmsResult<()>;

    async fn get_properties(&self) -> PmsResult<Vec<PmsProperty>>;

    async fn get_reservations(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> PmsResult<Vec<PmsReservation>>;

    async fn create_reservation(
        &self,
        pms_property_id: &str,
        data: &ReservationData,
    ) -> PmsResult<PmsReservation>;

    async fn update_reservation(
        &self,
        pms_reservation_id: &str,
        data: &ReservationData,
    ) -> PmsResult<PmsReservation>;

    async fn delete_reservation(&self, pms_reservation_id: &str) -> PmsResult<()>;

    async fn update_property_settings(
        &self,
        pms_property_id: &str,
        settings: &SettingsUpdate,
    ) -> PmsResult<()>;

    async fn update_rate(
        &self,
        pms_property_id: &str,
        date: NaiveDate,
        price: f64,
    ) -> PmsResult<()>;

    /// Push a batch of per-day rates. Implementations for bulk-capable
    /// backends should send one operation per coalesced price.
    async fn update_batch_rates(
        &self,
        pms_property_id: &str,
        rates: &[RateUpdate],
    ) -> PmsResult<()>;
}

/// Fold same-price dates into one operation each, preserving first-seen
/// price order. Prices are keyed at cent precision so float noise does not
/// split a batch.
pub fn coalesce_rates(rates: &[RateUpdate]) -> Vec<CoalescedRates> {
    let mut batches: Vec<CoalescedRates> = Vec::new();
    for rate in rates {
        let key = (rate.price * 100.0).round() as i64;
        match batches
            .iter_mut()
            .find(|b| (b.price * 100.0).round() as i64 == key)
        {
            Some(batch) => batch.dates.push(rate.date),
            None => batches.push(CoalescedRates {
                dates: vec![rate.date],
                price: rate.price,
            }),
        }
    }
    batches
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn coalesce_groups_same_price_dates() {
        let rates = vec![
            RateUpdate { date: d("2025-07-01"), price: 120.0 },
            RateUpdate { date: d("2025-07-02"), price: 120.0 },
            RateUpdate { date: d("2025-07-03"), price: 145.0 },
            RateUpdate { date: d("2025-07-04"), price: 120.0 },
        ];
        let batches = coalesce_rates(&rates);
        assert_eq!(batches.len(), 2);
        assert_eq!(
            batches[0].dates,
            vec![d("2025-07-01"), d("2025-07-02"), d("2025-07-04")]
        );
        assert_eq!(batches[1].dates, vec![d("2025-07-03")]);
    }

    #[test]
    fn coalesce_ignores_sub_cent_noise() {
        let rates = vec![
            RateUpdate { date: d("2025-07-01"), price: 120.0 },
            RateUpdate { date: d("2025-07-02"), price: 120.000001 },
        ];
        assert_eq!(coalesce_rates(&rates).len(), 1);
    }

    #[test]
    fn coalesce_empty_is_empty() {
        assert!(coalesce_rates(&[]).is_empty());
    }
}
