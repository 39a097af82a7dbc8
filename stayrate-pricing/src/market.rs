//! Market features consumed by the deterministic engine.
//!
//! Background market jobs write one cache entry per `(city, country)` pair;
//! this module only reads. Entries older than 24 hours are treated as
//! absent, which routes the builder to the AI fallback.

use crate::PricingResult;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use stayrate_core::DateRange;
use stayrate_store::Store;
use tracing::debug;

/// Demand signals for one civil day. Scores are 0..1, neutral at 0.5.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DaySignals {
    #[serde(default = "neutral")]
    pub weather_score: f64,
    #[serde(default)]
    pub event_impact: f64,
    #[serde(default = "neutral")]
    pub trend_score: f64,
}

fn neutral() -> f64 {
    0.5
}

impl Default for DaySignals {
    fn default() -> Self {
        Self {
            weather_score: 0.5,
            event_impact: 0.0,
            trend_score: 0.5,
        }
    }
}

impl DaySignals {
    /// Blended demand score: events dominate, weather and trend refine.
    pub fn demand(&self) -> f64 {
        (self.weather_score * 0.3 + self.event_impact * 0.5 + self.trend_score * 0.2)
            .clamp(0.0, 1.0)
    }

    /// An event strong enough to justify breaking the day-over-day cap.
    pub fn is_demand_spike(&self) -> bool {
        self.event_impact >= 0.7
    }
}

/// Market snapshot for a `(city, country)` pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSnapshot {
    /// Competitor average nightly price in base currency units.
    pub competitor_avg_price: f64,
    #[serde(default)]
    pub currency: Option<String>,
    /// Per-day demand signals; missing days read as neutral.
    #[serde(default)]
    pub days: HashMap<NaiveDate, DaySignals>,
}

impl MarketSnapshot {
    pub fn signals_for(&self, date: NaiveDate) -> DaySignals {
        self.days.get(&date).copied().unwrap_or_default()
    }

    /// Usable as a pricing basis at all.
    pub fn is_usable(&self) -> bool {
        self.competitor_avg_price.is_finite() && self.competitor_avg_price > 0.0
    }
}

/// Cache key for a market snapshot.
pub fn market_cache_key(city: &str, country: &str) -> String {
    format!(
        "market:{}:{}",
        city.trim().to_lowercase(),
        country.trim().to_lowercase()
    )
}

/// Read side of the market cache.
#[derive(Clone)]
pub struct MarketDataSource {
    store: Store,
}

impl MarketDataSource {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Fresh snapshot for the window, or `None` when the cache has nothing
    /// usable (missing, stale, or unparseable).
    pub async fn snapshot(
        &self,
        city: &str,
        country: &str,
        _window: DateRange,
    ) -> PricingResult<Option<MarketSnapshot>> {
        let key = market_cache_key(city, country);
        let entry = match self.store.fresh_cache_entry(&key).await? {
            Some(entry) => entry,
            None => return Ok(None),
        };

        match serde_json::from_value::<MarketSnapshot>(entry.data) {
            Ok(snapshot) if snapshot.is_usable() => Ok(Some(snapshot)),
            Ok(_) => {
                debug!(key, "market snapshot unusable (no competitor average)");
                Ok(None)
            }
            Err(e) => {
                debug!(key, error = %e, "market snapshot failed to parse");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_is_normalized() {
        assert_eq!(market_cache_key(" Paris ", "FR"), "market:paris:fr");
    }

    #[test]
    fn missing_days_read_neutral() {
        let snapshot = MarketSnapshot {
            competitor_avg_price: 120.0,
            currency: None,
            days: HashMap::new(),
        };
        let signals = snapshot.signals_for("2025-07-01".parse().unwrap());
        assert_eq!(signals.weather_score, 0.5);
        assert_eq!(signals.event_impact, 0.0);
        assert!((signals.demand() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn spike_threshold() {
        let strong_event = DaySignals {
            weather_score: 0.5,
            event_impact: 0.8,
            trend_score: 0.5,
        };
        assert!(strong_event.is_demand_spike());
        assert!(!DaySignals::default().is_demand_spike());
    }

    #[test]
    fn snapshot_without_average_is_unusable() {
        let snapshot = MarketSnapshot {
            competitor_avg_price: 0.0,
            currency: None,
            days: HashMap::new(),
        };
        assert!(!snapshot.is_usable());
        let nan = MarketSnapshot {
            competitor_avg_price: f64::NAN,
            currency: None,
            days: HashMap::new(),
        };
        assert!(!nan.is_usable());
    }

    #[test]
    fn snapshot_parses_from_cache_payload() {
        let payload = serde_json::json!({
            "competitor_avg_price": 132.0,
            "currency": "EUR",
            "days": {
                "2025-07-14": { "weather_score": 0.9, "event_impact": 0.85, "trend_score": 0.6 }
            }
        });
        let snapshot: MarketSnapshot = serde_json::from_value(payload).unwrap();
        let bastille = snapshot.signals_for("2025-07-14".parse().unwrap());
        assert!(bastille.is_demand_spike());
    }
}
