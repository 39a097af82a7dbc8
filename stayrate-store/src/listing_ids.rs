//! Used-listing-id guard: each external PMS listing converts a free trial at
//! most once, platform-wide.

use crate::{Store, StoreResult};
use sqlx::Row;
use uuid::Uuid;

impl Store {
    /// Register a listing id. Duplicate inserts are swallowed: the guard is
    /// about global uniqueness, not about who asked first.
    pub async fn register_used_listing_id(
        &self,
        listing_id: &str,
        user_id: Uuid,
        source: &str,
    ) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO used_listing_ids (listing_id, user_id, source)
            VALUES ($1, $2, $3)
            ON CONFLICT (listing_id) DO NOTHING
            "#,
        )
        .bind(listing_id)
        .bind(user_id)
        .bind(source)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Whether a listing id was already consumed by a different user.
    pub async fn listing_id_used_by_other(
        &self,
        listing_id: &str,
        user_id: Uuid,
    ) -> StoreResult<bool> {
        let row = sqlx::query(
            "SELECT user_id FROM used_listing_ids WHERE listing_id = $1",
        )
        .bind(listing_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(match row {
            Some(row) => {
                let owner: Uuid = row.try_get("user_id")?;
                owner != user_id
            }
            None => false,
        })
    }
}
