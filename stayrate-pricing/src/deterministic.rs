//! Deterministic price derivation from market features.
//!
//! With a market snapshot the basis is the competitor average; without one
//! the engine degrades to the property's base price with neutral signals,
//! which is also the backstop when the AI path rejects a payload.

use crate::calendar::DayPrice;
use crate::market::MarketSnapshot;
use crate::{PricingError, PricingResult};
use chrono::{Datelike, NaiveDate, Weekday};
use stayrate_core::{Cents, DateRange, Strategy};
use stayrate_store::Property;

/// Default weekend markup when the property does not set one.
const DEFAULT_WEEKEND_MARKUP_PERCENT: f64 = 10.0;

/// Lead-time window in which strategies start discounting unsold nights.
const LAST_MINUTE_DAYS: i64 = 14;

/// Nearest charm price: whole units ending in 5, 9, or 0, never a round
/// hundred.
pub fn charm_price(cents: Cents) -> Cents {
    let units = ((cents as f64) / 100.0).round().max(1.0) as i64;
    let tens = units / 10 * 10;
    let candidates = [tens, tens + 5, tens + 9, tens + 10];
    let mut best = candidates[0];
    for candidate in candidates {
        if (candidate - units).abs() < (best - units).abs() {
            best = candidate;
        }
    }
    let best = if best <= 0 { 5 } else { best };
    let best = if best >= 100 && best % 100 == 0 {
        best - 1
    } else {
        best
    };
    best * 100
}

/// Clamp a day's price to ±50% of the previous day unless a demand spike
/// justifies the jump.
pub fn cap_daily_change(price: Cents, prev: Option<Cents>, spike: bool) -> Cents {
    let prev = match prev {
        Some(prev) if prev > 0 && !spike => prev,
        _ => return price,
    };
    let lower = (prev as f64 * 0.5).round() as Cents;
    let upper = (prev as f64 * 1.5).round() as Cents;
    price.clamp(lower, upper)
}

fn last_minute_discount(strategy: Strategy, days_out: i64) -> f64 {
    if days_out > LAST_MINUTE_DAYS {
        return 0.0;
    }
    let max_discount = match strategy {
        Strategy::Prudent => 0.08,
        Strategy::Equilibre => 0.05,
        Strategy::Agressif => 0.0,
    };
    let proximity = 1.0 - (days_out as f64 / LAST_MINUTE_DAYS as f64);
    max_discount * proximity.clamp(0.0, 1.0)
}

fn is_weekend_night(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Fri | Weekday::Sat)
}

/// Build the 180-day calendar for a property.
///
/// Prices come out charm-rounded and day-over-day capped; floor/ceiling
/// clamping is the builder's job so that locked-day handling sees the same
/// pass for both pricing paths.
pub fn build_calendar(
    property: &Property,
    today: NaiveDate,
    snapshot: Option<&MarketSnapshot>,
) -> PricingResult<Vec<DayPrice>> {
    let base_cents: Cents = match snapshot {
        Some(snapshot) if snapshot.is_usable() => (snapshot.competitor_avg_price * 100.0).round() as Cents,
        _ => property.base_price,
    };
    if base_cents <= 0 {
        return Err(PricingError::Unavailable(format!(
            "no usable price basis for property {}",
            property.id
        )));
    }

    let window = DateRange::pricing_window(today);
    let weekend_markup = property
        .weekend_markup_percent
        .unwrap_or(DEFAULT_WEEKEND_MARKUP_PERCENT)
        / 100.0;
    let aggressiveness = property.strategy.aggressiveness();

    let mut days = Vec::with_capacity(180);
    let mut prev: Option<Cents> = None;

    for date in window.days() {
        let signals = snapshot
            .map(|s| s.signals_for(date))
            .unwrap_or_default();
        let demand = signals.demand();
        let spike = signals.is_demand_spike();

        let demand_multiplier = 1.0 + (demand - 0.5) * 0.4 * aggressiveness;
        let weekend_factor = if is_weekend_night(date) {
            1.0 + weekend_markup
        } else {
            1.0
        };
        let days_out = (date - today).num_days();
        let discount = last_minute_discount(property.strategy, days_out);

        let raw = base_cents as f64 * demand_multiplier * weekend_factor * (1.0 - discount);
        if !raw.is_finite() {
            continue;
        }

        let capped = cap_daily_change(raw.round() as Cents, prev, spike);
        let price = charm_price(capped);

        let mut reason_parts = vec![match snapshot {
            Some(s) => format!("competitor avg {:.2}", s.competitor_avg_price),
            None => format!("base price {:.2}", property.base_price as f64 / 100.0),
        }];
        if spike {
            reason_parts.push("demand spike (event)".to_string());
        } else if demand > 0.6 {
            reason_parts.push("high demand".to_string());
        } else if demand < 0.4 {
            reason_parts.push("soft demand".to_string());
        }
        if weekend_factor > 1.0 {
            reason_parts.push("weekend markup".to_string());
        }
        if discount > 0.0 {
            reason_parts.push(format!("last-minute {} strategy", property.strategy));
        }

        days.push(DayPrice {
            date,
            price,
            reason: reason_parts.join(", "),
            demand_spike: spike,
        });
        prev = Some(price);
    }

    if days.is_empty() {
        return Err(PricingError::Unavailable(
            "deterministic engine produced no days".into(),
        ));
    }
    Ok(days)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::DaySignals;
    use chrono::Utc;
    use proptest::prelude::*;
    use std::collections::HashMap;
    use stayrate_core::PropertyStatus;
    use uuid::Uuid;

    fn property(strategy: Strategy, base: Cents) -> Property {
        let now = Utc::now();
        Property {
            id: Uuid::new_v4(),
            team_id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            address: "12 rue des Archives".into(),
            city: "Paris".into(),
            latitude: Some(48.8566),
            longitude: Some(2.3522),
            country: "FR".into(),
            property_type: "appartement".into(),
            capacity: 4,
            surface: 58.0,
            amenities: vec!["wifi".into()],
            strategy,
            floor_price: 60_00,
            base_price: base,
            ceiling_price: Some(400_00),
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

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn charm_prices_end_in_five_nine_or_zero() {
        for cents in [8_342, 10_000, 13_370, 9_901, 25_550] {
            let charmed = charm_price(cents);
            assert_eq!(charmed % 100, 0, "whole units only");
            let last_digit = (charmed / 100) % 10;
            assert!(matches!(last_digit, 0 | 5 | 9), "got {charmed}");
        }
    }

    #[test]
    fn charm_avoids_round_hundreds() {
        assert_eq!(charm_price(100_00), 99_00);
        assert_eq!(charm_price(200_00), 199_00);
        // 110 is fine, only round hundreds are avoided.
        assert_eq!(charm_price(110_00), 110_00);
    }

    #[test]
    fn calendar_is_180_ascending_days() {
        let property = property(Strategy::Equilibre, 120_00);
        let days = build_calendar(&property, d("2025-07-01"), None).unwrap();
        assert_eq!(days.len(), 180);
        for pair in days.windows(2) {
            assert!(pair[0].date < pair[1].date);
            assert_eq!((pair[1].date - pair[0].date).num_days(), 1);
        }
    }

    #[test]
    fn day_over_day_change_is_capped_without_spike() {
        let mut snapshot = MarketSnapshot {
            competitor_avg_price: 130.0,
            currency: None,
            days: HashMap::new(),
        };
        // A wild trend swing without an event must not double the price.
        snapshot.days.insert(
            d("2025-07-02"),
            DaySignals { weather_score: 1.0, event_impact: 0.3, trend_score: 1.0 },
        );
        let property = property(Strategy::Agressif, 120_00);
        let days = build_calendar(&property, d("2025-07-01"), Some(&snapshot)).unwrap();
        for pair in days.windows(2) {
            if !pair[1].demand_spike {
                let ratio = pair[1].price as f64 / pair[0].price as f64;
                assert!(ratio <= 1.55 && ratio >= 0.45, "ratio {ratio}");
            }
        }
    }

    #[test]
    fn spike_escapes_the_cap_and_is_flagged() {
        let mut snapshot = MarketSnapshot {
            competitor_avg_price: 130.0,
            currency: None,
            days: HashMap::new(),
        };
        snapshot.days.insert(
            d("2025-07-14"),
            DaySignals { weather_score: 0.9, event_impact: 0.95, trend_score: 0.8 },
        );
        let property = property(Strategy::Equilibre, 120_00);
        let days = build_calendar(&property, d("2025-07-01"), Some(&snapshot)).unwrap();
        let bastille = days.iter().find(|day| day.date == d("2025-07-14")).unwrap();
        assert!(bastille.demand_spike);
        assert!(bastille.reason.contains("demand spike"));
    }

    #[test]
    fn prudent_discounts_the_near_window_more_than_agressif() {
        let near = d("2025-07-03");
        let prudent = build_calendar(&property(Strategy::Prudent, 120_00), d("2025-07-01"), None)
            .unwrap();
        let agressif = build_calendar(&property(Strategy::Agressif, 120_00), d("2025-07-01"), None)
            .unwrap();
        let p = prudent.iter().find(|day| day.date == near).unwrap().price;
        let a = agressif.iter().find(|day| day.date == near).unwrap().price;
        assert!(p < a, "prudent {p} should undercut agressif {a}");
    }

    #[test]
    fn zero_base_price_without_market_data_is_an_error() {
        let property = property(Strategy::Equilibre, 0);
        assert!(matches!(
            build_calendar(&property, d("2025-07-01"), None),
            Err(PricingError::Unavailable(_))
        ));
    }

    proptest! {
        #[test]
        fn charm_never_moves_more_than_five_units(cents in 1_00i64..1_000_00) {
            let charmed = charm_price(cents);
            let units = (cents as f64 / 100.0).round() as i64;
            prop_assert!((charmed / 100 - units).abs() <= 5);
        }
    }
}
