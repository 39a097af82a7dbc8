//! Calendar builder: strategy selection, clamping, lock preservation, and
//! the remote-before-local write ordering.

use crate::ai::AiPricingClient;
use crate::deterministic::build_calendar;
use crate::market::MarketDataSource;
use crate::{PricingError, PricingResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use stayrate_core::Cents;
use stayrate_pms::{cents_to_units, RateUpdate, SyncGateway};
use stayrate_store::{OverrideWrite, Property, Store, Tenant};
use tracing::{info, warn};

/// One derived day: price in cents plus the reasoning that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayPrice {
    pub date: NaiveDate,
    pub price: Cents,
    pub reason: String,
    /// Set when demand justifies breaking the day-over-day cap.
    pub demand_spike: bool,
}

/// Which path produced the calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarMethod {
    Deterministic,
    Ai,
}

impl CalendarMethod {
    /// Audit-log action recorded with the write.
    pub fn log_action(&self) -> &'static str {
        match self {
            CalendarMethod::Deterministic => "update:deterministic-pricing",
            CalendarMethod::Ai => "update:ia-pricing",
        }
    }
}

/// What a calendar run did.
#[derive(Debug, Clone)]
pub struct CalendarOutcome {
    pub method: CalendarMethod,
    /// Rows upserted locally.
    pub written: u64,
    /// Locked days left untouched.
    pub locked_preserved: u32,
    /// Entries dropped for invalid prices.
    pub dropped: u32,
    /// Days pushed to the PMS (0 when sync is off or the property unlinked).
    pub pushed_remote: u32,
    /// The clamped days that were written, reusable for group propagation.
    pub days: Vec<DayPrice>,
}

/// Result of clamping a generated calendar against a property's constraints
/// and its locked days.
#[derive(Debug, Default)]
pub struct ClampedCalendar {
    pub writes: Vec<OverrideWrite>,
    pub rates: Vec<RateUpdate>,
    pub days: Vec<DayPrice>,
    pub locked_preserved: u32,
    pub dropped: u32,
}

/// Clamp generated days to `[floor, ceiling?]`, skip locked dates, and drop
/// invalid prices. Pure so both the direct and group-copy paths share it.
pub fn clamp_days(
    days: &[DayPrice],
    floor_price: Cents,
    ceiling_price: Option<Cents>,
    locked: &HashSet<NaiveDate>,
) -> ClampedCalendar {
    let mut result = ClampedCalendar::default();

    for day in days {
        if locked.contains(&day.date) {
            result.locked_preserved += 1;
            continue;
        }
        if day.price <= 0 {
            result.dropped += 1;
            continue;
        }

        let mut price = day.price.max(floor_price);
        if let Some(ceiling) = ceiling_price {
            price = price.min(ceiling);
        }

        result.writes.push(OverrideWrite {
            date: day.date,
            price,
            reason: day.reason.clone(),
        });
        result.rates.push(RateUpdate {
            date: day.date,
            price: cents_to_units(price),
        });
        result.days.push(DayPrice {
            date: day.date,
            price,
            reason: day.reason.clone(),
            demand_spike: day.demand_spike,
        });
    }

    result
}

/// Orchestrates the deterministic-first / AI-fallback pipeline for one
/// property at a time.
pub struct CalendarBuilder {
    store: Store,
    gateway: SyncGateway,
    market: MarketDataSource,
    ai: Option<AiPricingClient>,
}

impl CalendarBuilder {
    pub fn new(store: Store, gateway: SyncGateway, ai: Option<AiPricingClient>) -> Self {
        let market = MarketDataSource::new(store.clone());
        Self {
            store,
            gateway,
            market,
            ai,
        }
    }

    /// Generate and persist the 180-day calendar for a property.
    ///
    /// Deterministic pricing runs whenever market features cover the window;
    /// the AI path covers the gap and falls back to the degraded
    /// deterministic mode when its payload is rejected. A failed PMS push
    /// aborts before any local row is written.
    pub async fn generate(
        &self,
        tenant: &Tenant,
        property: &Property,
        today: NaiveDate,
    ) -> PricingResult<CalendarOutcome> {
        let window = stayrate_core::DateRange::pricing_window(today);
        let snapshot = self
            .market
            .snapshot(&property.city, &property.country, window)
            .await?;

        let (days, method) = match snapshot {
            Some(snapshot) => (
                build_calendar(property, today, Some(&snapshot))?,
                CalendarMethod::Deterministic,
            ),
            None => match &self.ai {
                Some(client) => match client.generate_calendar(property, today).await {
                    Ok(days) => (days, CalendarMethod::Ai),
                    Err(PricingError::AiPayload(reason)) => {
                        warn!(property = %property.id, reason, "ai payload rejected, using deterministic fallback");
                        (build_calendar(property, today, None)?, CalendarMethod::Deterministic)
                    }
                    Err(PricingError::AiProvider(reason)) => {
                        warn!(property = %property.id, reason, "ai provider failed, using deterministic fallback");
                        (build_calendar(property, today, None)?, CalendarMethod::Deterministic)
                    }
                    Err(other) => return Err(other),
                },
                None => (
                    build_calendar(property, today, None)?,
                    CalendarMethod::Deterministic,
                ),
            },
        };

        self.apply(tenant, property, &days, method, "auto-pricing").await
    }

    /// Clamp `days` for `property` and persist them: remote push first, then
    /// the local batch upsert, then the audit row. Used directly for group
    /// members receiving the main property's calendar.
    pub async fn apply(
        &self,
        tenant: &Tenant,
        property: &Property,
        days: &[DayPrice],
        method: CalendarMethod,
        updated_by: &str,
    ) -> PricingResult<CalendarOutcome> {
        let (from, to) = match (
            days.iter().map(|d| d.date).min(),
            days.iter().map(|d| d.date).max(),
        ) {
            (Some(from), Some(to)) => (from, to),
            _ => {
                return Err(PricingError::Unavailable(
                    "calendar generation produced no days".into(),
                ))
            }
        };

        let locked: HashSet<NaiveDate> = self
            .store
            .locked_dates_in_range(property.id, from, to)
            .await?
            .into_iter()
            .collect();

        let clamped = clamp_days(days, property.floor_price, property.ceiling_price, &locked);
        if clamped.dropped > 0 {
            warn!(
                property = %property.id,
                dropped = clamped.dropped,
                "dropped calendar entries with invalid prices"
            );
        }

        // Remote strictly before local: a failed push must leave no trace.
        let pushed_remote = self
            .gateway
            .push_calendar(tenant, property, &clamped.rates)
            .await?;

        let written = self
            .store
            .upsert_price_overrides(property.id, &clamped.writes, updated_by)
            .await?;

        let changes = serde_json::json!({
            "days_written": written,
            "locked_preserved": clamped.locked_preserved,
            "dropped": clamped.dropped,
        });
        if let Err(e) = self
            .store
            .append_property_log(property.id, property.owner_id, updated_by, method.log_action(), &changes)
            .await
        {
            warn!(property = %property.id, error = %e, "audit log write failed");
        }

        info!(
            property = %property.id,
            method = method.log_action(),
            written,
            locked = clamped.locked_preserved,
            pushed = pushed_remote,
            "calendar generated"
        );

        Ok(CalendarOutcome {
            method,
            written,
            locked_preserved: clamped.locked_preserved,
            dropped: clamped.dropped,
            pushed_remote,
            days: clamped.days,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn day(date: &str, price: Cents) -> DayPrice {
        DayPrice {
            date: d(date),
            price,
            reason: "test".into(),
            demand_spike: false,
        }
    }

    #[test]
    fn clamps_to_floor_and_ceiling() {
        let days = vec![
            day("2025-07-01", 40_00),
            day("2025-07-02", 120_00),
            day("2025-07-03", 500_00),
        ];
        let clamped = clamp_days(&days, 60_00, Some(300_00), &HashSet::new());
        let prices: Vec<Cents> = clamped.writes.iter().map(|w| w.price).collect();
        assert_eq!(prices, vec![60_00, 120_00, 300_00]);
    }

    #[test]
    fn null_ceiling_means_no_upper_clamp() {
        let days = vec![day("2025-07-01", 900_00)];
        let clamped = clamp_days(&days, 60_00, None, &HashSet::new());
        assert_eq!(clamped.writes[0].price, 900_00);
    }

    #[test]
    fn locked_days_are_skipped_and_excluded_from_push() {
        // Bastille Day is locked at 220; the generated 185 must not touch it.
        let days = vec![day("2025-07-13", 180_00), day("2025-07-14", 185_00)];
        let locked: HashSet<NaiveDate> = [d("2025-07-14")].into_iter().collect();
        let clamped = clamp_days(&days, 60_00, None, &locked);
        assert_eq!(clamped.locked_preserved, 1);
        assert_eq!(clamped.writes.len(), 1);
        assert_eq!(clamped.writes[0].date, d("2025-07-13"));
        assert!(clamped.rates.iter().all(|r| r.date != d("2025-07-14")));
    }

    #[test]
    fn invalid_prices_are_dropped() {
        let days = vec![day("2025-07-01", 0), day("2025-07-02", -5_00), day("2025-07-03", 120_00)];
        let clamped = clamp_days(&days, 60_00, None, &HashSet::new());
        assert_eq!(clamped.dropped, 2);
        assert_eq!(clamped.writes.len(), 1);
    }

    #[test]
    fn rates_mirror_writes_in_base_units() {
        let days = vec![day("2025-07-01", 129_00)];
        let clamped = clamp_days(&days, 60_00, None, &HashSet::new());
        assert_eq!(clamped.rates[0].price, 129.0);
    }
}
