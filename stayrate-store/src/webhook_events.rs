//! Durable webhook idempotency: one row per processed provider event id.

use crate::{Store, StoreResult};

impl Store {
    /// Record an event id. Returns `true` when this is the first time the id
    /// is seen; `false` means the event was already processed and the caller
    /// should no-op.
    pub async fn claim_webhook_event(
        &self,
        event_id: &str,
        event_type: &str,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO webhook_events (event_id, event_type)
            VALUES ($1, $2)
            ON CONFLICT (event_id) DO NOTHING
            "#,
        )
        .bind(event_id)
        .bind(event_type)
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected() == 1)
    }
}
