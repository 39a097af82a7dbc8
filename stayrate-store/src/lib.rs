//! # StayRate Store
//!
//! Typed persistence layer over PostgreSQL for every StayRate entity:
//! tenants, properties, groups, bookings, price overrides, integrations,
//! audit logs, the system cache, and the used-listing-id guard.
//!
//! ## Conventions
//!
//! - Reads return `Ok(None)` on miss, never an error
//! - Every write stamps `updated_at = NOW()` in the statement itself
//! - Group membership lives in the `group_properties` join table; deleting a
//!   group removes its join rows in the same transaction
//! - Locked price overrides are immutable to the batch upsert used by the
//!   pricing orchestrator, enforced in SQL as well as by callers
//! - Status-like columns are stored as text and parsed into the shared enums,
//!   surfacing corrupt rows as a dedicated error instead of a panic

mod bookings;
mod groups;
mod integrations;
mod listing_ids;
mod logs;
mod models;
mod overrides;
mod properties;
mod schema;
mod syscache;
mod tenants;
mod webhook_events;

pub use bookings::{MirrorOutcome, NewBooking};
pub use models::*;
pub use properties::{NewProperty, PropertyRules};
pub use syscache::CacheRefresh;
pub use tenants::NewTenant;

use dashmap::DashMap;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Errors surfaced by the persistence layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Underlying database failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A row holds a value the shared enums cannot parse.
    #[error("corrupt row in {table}: {message}")]
    Corrupt { table: &'static str, message: String },
}

impl StoreError {
    pub(crate) fn corrupt(table: &'static str, message: impl Into<String>) -> Self {
        StoreError::Corrupt {
            table,
            message: message.into(),
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Typed persistence handle shared across subsystems.
///
/// Cloning is cheap; the pool and the in-process cache-refresh guard are
/// reference-counted.
#[derive(Clone)]
pub struct Store {
    pool: PgPool,
    /// Keys currently being refreshed by a producer; concurrent readers of
    /// those keys get the stale entry instead of waiting.
    cache_refreshing: Arc<DashMap<String, ()>>,
}

impl Store {
    /// Connect to PostgreSQL and bootstrap the schema.
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;

        let store = Self::from_pool(pool);
        store.initialize_schema().await?;
        info!("store connected and schema verified");
        Ok(store)
    }

    /// Wrap an existing pool without running the bootstrap.
    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            pool,
            cache_refreshing: Arc::new(DashMap::new()),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
