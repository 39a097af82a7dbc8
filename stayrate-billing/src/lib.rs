//! # StayRate Billing
//!
//! Subscription reconciliation against the payment provider. Every property
//! or group mutation recomputes the tenant's parent/child unit counts,
//! adjusts the subscription for the next period, and emits one-off proration
//! items for mid-cycle upgrades. Webhook events gate tenant access and PMS
//! sync as the provider reports payment outcomes.
//!
//! ## Core Features
//!
//! - **Tier Schedule**: 5-tier marginal parent pricing, flat child rate
//! - **Quantities**: parent/child computation from properties and groups
//! - **Stripe Client**: subscriptions, subscription items, invoice items,
//!   invoices, early trial end over the form-encoded v1 API
//! - **Reconciler**: trial-aware quantity adjustment, upgrade-only proration,
//!   trial property cap, end-trial-early
//! - **Webhook Handler**: five provider events, idempotent per event id

pub mod quantities;
pub mod reconciler;
pub mod stripe;
pub mod tiers;
pub mod webhooks;

pub use quantities::*;
pub use reconciler::*;
pub use stripe::*;
pub use tiers::*;
pub use webhooks::*;

use stayrate_core::BusinessRuleViolation;
use stayrate_store::StoreError;
use thiserror::Error;

/// Billing failures.
#[derive(Error, Debug)]
pub enum BillingError {
    /// Payment provider rejected or failed a call; reason preserved.
    #[error("payment provider error: {reason}")]
    Provider { reason: String },

    /// Credentials rejected by the provider.
    #[error("payment provider authentication rejected")]
    Auth,

    /// Provider answered with a payload we cannot parse.
    #[error("malformed provider payload: {0}")]
    Payload(String),

    /// Business rule rejected the operation (trial property cap).
    #[error("{0}")]
    Rule(BusinessRuleViolation),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result alias for billing operations.
pub type BillingResult<T> = Result<T, BillingError>;
