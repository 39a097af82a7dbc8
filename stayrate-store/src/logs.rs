//! Append-only property audit log.

use crate::models::PropertyLog;
use crate::{Store, StoreResult};
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

fn log_from_row(row: &PgRow) -> StoreResult<PropertyLog> {
    Ok(PropertyLog {
        id: row.try_get("id")?,
        property_id: row.try_get("property_id")?,
        user_id: row.try_get("user_id")?,
        user_email: row.try_get("user_email")?,
        action: row.try_get("action")?,
        changes: row.try_get("changes")?,
        created_at: row.try_get("created_at")?,
    })
}

impl Store {
    pub async fn append_property_log(
        &self,
        property_id: Uuid,
        user_id: Uuid,
        user_email: &str,
        action: &str,
        changes: &serde_json::Value,
    ) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO property_logs (property_id, user_id, user_email, action, changes)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(property_id)
        .bind(user_id)
        .bind(user_email)
        .bind(action)
        .bind(changes)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    pub async fn property_logs(&self, property_id: Uuid) -> StoreResult<Vec<PropertyLog>> {
        let rows = sqlx::query(
            "SELECT * FROM property_logs WHERE property_id = $1 ORDER BY created_at DESC",
        )
        .bind(property_id)
        .fetch_all(self.pool())
        .await?;
        rows.iter().map(log_from_row).collect()
    }
}
