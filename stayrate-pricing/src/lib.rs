//! # StayRate Pricing
//!
//! 180-day dynamic price calendar generation. Deterministic derivation from
//! market features comes first; an AI completion is the fallback when no
//! market data covers the window, and deterministic pricing backstops a
//! malformed AI payload. Locked days are never touched, every written price
//! respects the property's floor and ceiling, and for PMS-linked properties
//! the remote push strictly precedes the local write.
//!
//! ## Core Features
//!
//! - **Market Features**: competitor averages and demand signals read from
//!   the system cache fed by background market jobs
//! - **Deterministic Engine**: strategy-modulated demand pricing with charm
//!   endings and a 50% day-over-day cap
//! - **AI Fallback**: JSON-only completion validated against a strict
//!   180-entry schema, never repaired
//! - **Calendar Builder**: lock preservation, floor/ceiling clamping,
//!   remote-before-local write ordering, audit logging

pub mod ai;
pub mod calendar;
pub mod deterministic;
pub mod market;

pub use ai::*;
pub use calendar::*;
pub use deterministic::*;
pub use market::*;

use stayrate_pms::GatewayError;
use stayrate_store::StoreError;
use thiserror::Error;

/// Pricing pipeline failures.
#[derive(Error, Debug)]
pub enum PricingError {
    /// Both pricing paths failed; nothing was written.
    #[error("no pricing path available: {0}")]
    Unavailable(String),

    /// AI provider transport or authentication failure.
    #[error("ai provider error: {0}")]
    AiProvider(String),

    /// AI answered with something that does not match the calendar schema.
    #[error("ai payload rejected: {0}")]
    AiPayload(String),

    /// Remote push failed; local rows were not written.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result alias for pricing operations.
pub type PricingResult<T> = Result<T, PricingError>;
