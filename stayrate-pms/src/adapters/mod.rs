//! Concrete PMS backends.

pub mod beds24;
pub mod mock;
pub mod smoobu;
