//! # StayRate
//!
//! Multi-tenant revenue management backend for short-term rental operators.
//! This crate wires the subsystem crates together: `stayrate-store` for
//! persistence, `stayrate-pms` for PMS connectivity, `stayrate-pricing` for
//! calendar generation, `stayrate-billing` for subscription reconciliation
//! and payment webhooks, `stayrate-scheduler` for the hourly auto-pricing
//! tick, and `stayrate-inventory` for the mutation service in front of it
//! all.

pub mod system;

pub use system::StayRate;
