//! # StayRate Inventory
//!
//! Every property and group mutation flows through this crate: team/role
//! authorization, the append-only audit trail, geofenced group coherence,
//! the property status state machine, PMS import with the trial cap and the
//! used-listing guard, and the billing reconciliation trigger after each
//! inventory change.

pub mod geo;
pub mod groups;
pub mod service;

pub use geo::*;
pub use groups::*;
pub use service::*;

use stayrate_billing::BillingError;
use stayrate_core::CoreError;
use stayrate_pms::{GatewayError, PmsError};
use stayrate_store::StoreError;
use thiserror::Error;

/// Inventory operation failures, aggregating every collaborator's errors.
#[derive(Error, Debug)]
pub enum InventoryError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Billing(#[from] BillingError),
}

impl From<PmsError> for InventoryError {
    fn from(e: PmsError) -> Self {
        InventoryError::Gateway(GatewayError::Pms(e))
    }
}

impl InventoryError {
    /// HTTP status class for the transport layer.
    pub fn status_code(&self) -> u16 {
        match self {
            InventoryError::Core(e) => e.status_code(),
            InventoryError::Store(_) => 500,
            InventoryError::Gateway(GatewayError::Pms(_)) => 502,
            InventoryError::Gateway(GatewayError::NotLinked) => 400,
            InventoryError::Gateway(GatewayError::PropertyVanished) => 404,
            InventoryError::Gateway(GatewayError::Store(_)) => 500,
            InventoryError::Billing(BillingError::Rule(_)) => 403,
            InventoryError::Billing(BillingError::Provider { .. })
            | InventoryError::Billing(BillingError::Auth) => 502,
            InventoryError::Billing(_) => 500,
        }
    }

    /// Client-facing JSON body; business-rule violations round-trip their
    /// structured payload.
    pub fn client_body(&self) -> serde_json::Value {
        match self {
            InventoryError::Core(e) => e.client_body(),
            InventoryError::Billing(BillingError::Rule(violation)) => {
                serde_json::to_value(violation)
                    .unwrap_or_else(|_| serde_json::json!({ "error": "business rule violation" }))
            }
            InventoryError::Gateway(GatewayError::Pms(e)) => {
                serde_json::json!({ "error": format!("{} is unavailable", e.backend()) })
            }
            _ => serde_json::json!({ "error": "request failed" }),
        }
    }
}

/// Result alias for inventory operations.
pub type InventoryResult<T> = Result<T, InventoryError>;
