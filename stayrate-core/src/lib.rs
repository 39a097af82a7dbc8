//! # StayRate Core
//!
//! Shared foundation for the StayRate revenue management platform: scalar
//! types and enums used across every subsystem, process-wide configuration
//! loading, and the error taxonomy that all crates map their failures into.
//!
//! ## Core Features
//!
//! - **Shared Types**: Pricing strategies, subscription and booking statuses,
//!   roles, PMS backend kinds, and the money/date scalars
//! - **Configuration**: Environment-driven process configuration with
//!   fail-fast validation of payment credentials
//! - **Error Taxonomy**: Semantic error kinds (validation, authorization,
//!   not-found, conflict, business-rule, remote-provider, fatal) with
//!   structured JSON payloads for business-rule violations

pub mod config;
pub mod errors;
pub mod types;

pub use config::*;
pub use errors::*;
pub use types::*;
