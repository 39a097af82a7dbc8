//! System cache: payloads produced by background market jobs and consumed by
//! the pricing engine.
//!
//! Refreshes are producer-exclusive: the first worker to claim a key becomes
//! its producer; everyone else keeps reading the stale entry until the
//! producer writes or releases.

use crate::models::CacheEntry;
use crate::{Store, StoreResult};
use chrono::Utc;
use sqlx::Row;
use tracing::debug;

/// Guard held by the producer refreshing a cache key. Dropping it without
/// `commit` releases the claim so another worker may retry.
pub struct CacheRefresh<'a> {
    store: &'a Store,
    key: String,
    committed: bool,
}

impl<'a> CacheRefresh<'a> {
    /// Write the refreshed payload and release the claim.
    pub async fn commit(
        mut self,
        data: &serde_json::Value,
        language: Option<&str>,
    ) -> StoreResult<()> {
        self.store.put_cache_entry(&self.key, data, language).await?;
        self.committed = true;
        Ok(())
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for CacheRefresh<'_> {
    fn drop(&mut self) {
        self.store.cache_refreshing.remove(&self.key);
        if !self.committed {
            debug!(key = %self.key, "cache refresh released without commit");
        }
    }
}

impl Store {
    pub async fn cache_entry(&self, key: &str) -> StoreResult<Option<CacheEntry>> {
        let row = sqlx::query("SELECT * FROM system_cache WHERE key = $1")
            .bind(key)
            .fetch_optional(self.pool())
            .await?;
        Ok(match row {
            Some(row) => Some(CacheEntry {
                key: row.try_get("key")?,
                data: row.try_get("data")?,
                language: row.try_get("language")?,
                updated_at: row.try_get("updated_at")?,
            }),
            None => None,
        })
    }

    /// A cache entry only if fresh (< 24h old).
    pub async fn fresh_cache_entry(&self, key: &str) -> StoreResult<Option<CacheEntry>> {
        let entry = self.cache_entry(key).await?;
        Ok(entry.filter(|e| !e.is_stale(Utc::now())))
    }

    pub async fn put_cache_entry(
        &self,
        key: &str,
        data: &serde_json::Value,
        language: Option<&str>,
    ) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO system_cache (key, data, language, updated_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (key) DO UPDATE
            SET data = EXCLUDED.data, language = EXCLUDED.language, updated_at = NOW()
            "#,
        )
        .bind(key)
        .bind(data)
        .bind(language)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Claim a key for refresh. Returns `None` when another worker already
    /// holds the claim; the caller should serve the stale entry instead.
    pub fn begin_cache_refresh(&self, key: &str) -> Option<CacheRefresh<'_>> {
        use dashmap::mapref::entry::Entry;
        match self.cache_refreshing.entry(key.to_string()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                slot.insert(());
                Some(CacheRefresh {
                    store: self,
                    key: key.to_string(),
                    committed: false,
                })
            }
        }
    }
}
