//! # StayRate Scheduler
//!
//! Cluster-wide hourly tick that regenerates price calendars at each
//! tenant's local midnight, with hour-grained retry after failures. Group
//! price sync runs the main property's calendar and copies the clamped
//! result onto the other members; everything else is priced individually.
//! Tenants fan out with bounded parallelism and every property gets a hard
//! per-item deadline.

pub mod eligibility;
pub mod scheduler;

pub use eligibility::*;
pub use scheduler::*;
