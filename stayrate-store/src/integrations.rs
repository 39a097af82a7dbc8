//! PMS integration persistence. One row per `(user, kind)`; deleted on
//! disconnect.

use crate::models::{parse_column, Integration};
use crate::{Store, StoreResult};
use sqlx::postgres::PgRow;
use sqlx::Row;
use stayrate_core::PmsKind;
use uuid::Uuid;

fn integration_from_row(row: &PgRow) -> StoreResult<Integration> {
    Ok(Integration {
        user_id: row.try_get("user_id")?,
        kind: parse_column("integrations", row.try_get("kind")?)?,
        credentials: row.try_get("credentials")?,
        connected_at: row.try_get("connected_at")?,
        last_sync: row.try_get("last_sync")?,
    })
}

impl Store {
    /// Connect (or re-connect, replacing credentials) an integration.
    pub async fn upsert_integration(
        &self,
        user_id: Uuid,
        kind: PmsKind,
        credentials: &serde_json::Value,
    ) -> StoreResult<Integration> {
        let row = sqlx::query(
            r#"
            INSERT INTO integrations (user_id, kind, credentials)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, kind) DO UPDATE
            SET credentials = EXCLUDED.credentials, updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(kind.as_str())
        .bind(credentials)
        .fetch_one(self.pool())
        .await?;
        integration_from_row(&row)
    }

    pub async fn integration(
        &self,
        user_id: Uuid,
        kind: PmsKind,
    ) -> StoreResult<Option<Integration>> {
        let row = sqlx::query("SELECT * FROM integrations WHERE user_id = $1 AND kind = $2")
            .bind(user_id)
            .bind(kind.as_str())
            .fetch_optional(self.pool())
            .await?;
        row.as_ref().map(integration_from_row).transpose()
    }

    pub async fn integrations_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Integration>> {
        let rows = sqlx::query("SELECT * FROM integrations WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(self.pool())
            .await?;
        rows.iter().map(integration_from_row).collect()
    }

    pub async fn touch_integration_sync(&self, user_id: Uuid, kind: PmsKind) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE integrations
            SET last_sync = NOW(), updated_at = NOW()
            WHERE user_id = $1 AND kind = $2
            "#,
        )
        .bind(user_id)
        .bind(kind.as_str())
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Disconnect an integration.
    pub async fn delete_integration(&self, user_id: Uuid, kind: PmsKind) -> StoreResult<()> {
        sqlx::query("DELETE FROM integrations WHERE user_id = $1 AND kind = $2")
            .bind(user_id)
            .bind(kind.as_str())
            .execute(self.pool())
            .await?;
        Ok(())
    }
}
