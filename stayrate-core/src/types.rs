//! Shared scalar types and enums used across StayRate subsystems.
//!
//! Monetary amounts are integer minor units (cents). Civil dates are
//! `chrono::NaiveDate` interpreted in UTC; instants are `DateTime<Utc>`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Monetary amount in minor currency units (cents).
pub type Cents = i64;

/// Pricing strategy selected per property.
///
/// Serialized with the French labels the product exposes to operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strategy {
    /// Conservative: protect occupancy, price below market pressure.
    Prudent,
    /// Balanced: track the market.
    #[serde(rename = "Équilibré")]
    Equilibre,
    /// Aggressive: capture demand spikes, price above market pressure.
    Agressif,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Prudent => "Prudent",
            Strategy::Equilibre => "Équilibré",
            Strategy::Agressif => "Agressif",
        }
    }

    /// Demand-response multiplier applied by the deterministic pricing engine.
    pub fn aggressiveness(&self) -> f64 {
        match self {
            Strategy::Prudent => 0.85,
            Strategy::Equilibre => 1.0,
            Strategy::Agressif => 1.15,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Prudent" => Ok(Strategy::Prudent),
            "Équilibré" | "Equilibre" => Ok(Strategy::Equilibre),
            "Agressif" => Ok(Strategy::Agressif),
            other => Err(format!("unknown strategy: {other}")),
        }
    }
}

impl Default for Strategy {
    fn default() -> Self {
        Strategy::Equilibre
    }
}

/// Tenant role within a team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    Member,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Member => "member",
        }
    }

    /// Roles allowed to change property status or run destructive team ops.
    pub fn can_manage(&self) -> bool {
        matches!(self, Role::Admin | Role::Manager)
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "manager" => Ok(Role::Manager),
            "member" => Ok(Role::Member),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// Subscription lifecycle state mirrored from the payment provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    None,
    Trialing,
    Active,
    PastDue,
    Canceled,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::None => "none",
            SubscriptionStatus::Trialing => "trialing",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Canceled => "canceled",
        }
    }

    pub fn is_trialing(&self) -> bool {
        matches!(self, SubscriptionStatus::Trialing)
    }
}

impl FromStr for SubscriptionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(SubscriptionStatus::None),
            "trialing" => Ok(SubscriptionStatus::Trialing),
            "active" => Ok(SubscriptionStatus::Active),
            "past_due" => Ok(SubscriptionStatus::PastDue),
            "canceled" => Ok(SubscriptionStatus::Canceled),
            other => Err(format!("unknown subscription status: {other}")),
        }
    }
}

/// Property lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyStatus {
    Active,
    Archived,
    Error,
}

impl PropertyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyStatus::Active => "active",
            PropertyStatus::Archived => "archived",
            PropertyStatus::Error => "error",
        }
    }

    /// Valid transitions: `active ↔ archived`, `active ↔ error`,
    /// `archived ↔ error`. Self-transitions are rejected.
    pub fn can_transition_to(&self, next: PropertyStatus) -> bool {
        *self != next
    }
}

impl FromStr for PropertyStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(PropertyStatus::Active),
            "archived" => Ok(PropertyStatus::Archived),
            "error" => Ok(PropertyStatus::Error),
            other => Err(format!("unknown property status: {other}")),
        }
    }
}

/// Booking status, serialized with the French labels stored by the product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingStatus {
    #[serde(rename = "confirmé")]
    Confirme,
    #[serde(rename = "en_attente")]
    EnAttente,
    #[serde(rename = "annulé")]
    Annule,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Confirme => "confirmé",
            BookingStatus::EnAttente => "en_attente",
            BookingStatus::Annule => "annulé",
        }
    }
}

impl FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "confirmé" | "confirme" => Ok(BookingStatus::Confirme),
            "en_attente" => Ok(BookingStatus::EnAttente),
            "annulé" | "annule" => Ok(BookingStatus::Annule),
            other => Err(format!("unknown booking status: {other}")),
        }
    }
}

/// How a booking's nightly price was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PricingMethod {
    Ai,
    Manuelle,
    Pms,
}

impl PricingMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PricingMethod::Ai => "ai",
            PricingMethod::Manuelle => "manuelle",
            PricingMethod::Pms => "pms",
        }
    }
}

impl FromStr for PricingMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ai" => Ok(PricingMethod::Ai),
            "manuelle" => Ok(PricingMethod::Manuelle),
            "pms" => Ok(PricingMethod::Pms),
            other => Err(format!("unknown pricing method: {other}")),
        }
    }
}

/// Supported PMS backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PmsKind {
    Smoobu,
    Beds24,
    /// Deterministic in-memory backend used by tests and demos.
    Mock,
}

impl PmsKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PmsKind::Smoobu => "smoobu",
            PmsKind::Beds24 => "beds24",
            PmsKind::Mock => "mock",
        }
    }
}

impl fmt::Display for PmsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PmsKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "smoobu" => Ok(PmsKind::Smoobu),
            "beds24" => Ok(PmsKind::Beds24),
            "mock" => Ok(PmsKind::Mock),
            other => Err(format!("unknown pms kind: {other}")),
        }
    }
}

/// Inclusive civil-date range helper used by calendar and booking queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self { from, to }
    }

    /// The 180-day pricing window starting at `today`.
    pub fn pricing_window(today: NaiveDate) -> Self {
        Self {
            from: today,
            to: today + chrono::Duration::days(179),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.from && date <= self.to
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let from = self.from;
        let len = (self.to - self.from).num_days().max(-1) + 1;
        (0..len).map(move |offset| from + chrono::Duration::days(offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_round_trips_french_labels() {
        for s in [Strategy::Prudent, Strategy::Equilibre, Strategy::Agressif] {
            assert_eq!(s.as_str().parse::<Strategy>().unwrap(), s);
        }
        let json = serde_json::to_string(&Strategy::Equilibre).unwrap();
        assert_eq!(json, "\"Équilibré\"");
    }

    #[test]
    fn status_transitions_reject_self() {
        assert!(PropertyStatus::Active.can_transition_to(PropertyStatus::Archived));
        assert!(PropertyStatus::Archived.can_transition_to(PropertyStatus::Error));
        assert!(!PropertyStatus::Active.can_transition_to(PropertyStatus::Active));
    }

    #[test]
    fn pricing_window_spans_180_days() {
        let today = NaiveDate::from_ymd_opt(2025, 7, 1).unwrap();
        let window = DateRange::pricing_window(today);
        assert_eq!(window.days().count(), 180);
        assert_eq!(window.to, NaiveDate::from_ymd_opt(2025, 12, 27).unwrap());
    }

    #[test]
    fn pricing_window_includes_leap_day() {
        let today = NaiveDate::from_ymd_opt(2027, 12, 1).unwrap();
        let window = DateRange::pricing_window(today);
        let leap_day = NaiveDate::from_ymd_opt(2028, 2, 29).unwrap();
        assert!(window.contains(leap_day));
        assert!(window.days().any(|d| d == leap_day));
    }
}
