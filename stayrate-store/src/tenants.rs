//! Tenant persistence: accounts, subscription state, auto-pricing bookkeeping.

use crate::models::{parse_column, AutoPricing, Tenant};
use crate::{Store, StoreError, StoreResult};
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::Row;
use stayrate_core::{Cents, Role, SubscriptionStatus};
use uuid::Uuid;

/// Fields required to register a tenant; everything else defaults.
#[derive(Debug, Clone)]
pub struct NewTenant {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub timezone: String,
    pub language: String,
    pub currency: String,
}

fn tenant_from_row(row: &PgRow) -> StoreResult<Tenant> {
    let revenue_targets: serde_json::Value = row.try_get("revenue_targets")?;
    let revenue_targets = serde_json::from_value(revenue_targets)
        .map_err(|e| StoreError::corrupt("tenants", format!("revenue_targets: {e}")))?;

    Ok(Tenant {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        role: parse_column("tenants", row.try_get("role")?)?,
        team_id: row.try_get("team_id")?,
        timezone: row.try_get("timezone")?,
        language: row.try_get("language")?,
        currency: row.try_get("currency")?,
        subscription_status: parse_column("tenants", row.try_get("subscription_status")?)?,
        subscription_id: row.try_get("subscription_id")?,
        customer_id: row.try_get("customer_id")?,
        access_disabled: row.try_get("access_disabled")?,
        banned: row.try_get("banned")?,
        payment_failed: row.try_get("payment_failed")?,
        pms_sync_enabled: row.try_get("pms_sync_enabled")?,
        pms_sync_stopped_reason: row.try_get("pms_sync_stopped_reason")?,
        auto_pricing: AutoPricing {
            enabled: row.try_get("auto_pricing_enabled")?,
            timezone: row.try_get("auto_pricing_timezone")?,
            last_attempt: row.try_get("auto_pricing_last_attempt")?,
            last_successful_run: row.try_get("auto_pricing_last_successful_run")?,
            failed_attempts: row.try_get("auto_pricing_failed_attempts")?,
        },
        revenue_targets,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

impl Store {
    /// Register a tenant. Fails on duplicate email.
    pub async fn create_tenant(&self, new: NewTenant) -> StoreResult<Tenant> {
        let row = sqlx::query(
            r#"
            INSERT INTO tenants (id, email, role, timezone, language, currency)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(new.id)
        .bind(&new.email)
        .bind(new.role.as_str())
        .bind(&new.timezone)
        .bind(&new.language)
        .bind(&new.currency)
        .fetch_one(self.pool())
        .await?;

        tenant_from_row(&row)
    }

    pub async fn tenant(&self, id: Uuid) -> StoreResult<Option<Tenant>> {
        let row = sqlx::query("SELECT * FROM tenants WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        row.as_ref().map(tenant_from_row).transpose()
    }

    pub async fn tenant_by_customer_id(&self, customer_id: &str) -> StoreResult<Option<Tenant>> {
        let row = sqlx::query("SELECT * FROM tenants WHERE customer_id = $1")
            .bind(customer_id)
            .fetch_optional(self.pool())
            .await?;
        row.as_ref().map(tenant_from_row).transpose()
    }

    /// Tenants with auto-pricing switched on, scanned by the hourly tick.
    pub async fn tenants_with_auto_pricing(&self) -> StoreResult<Vec<Tenant>> {
        let rows = sqlx::query("SELECT * FROM tenants WHERE auto_pricing_enabled = TRUE")
            .fetch_all(self.pool())
            .await?;
        rows.iter().map(tenant_from_row).collect()
    }

    /// Lazily initialize `team_id` to the tenant's own id and return it.
    pub async fn get_or_init_team(&self, tenant_id: Uuid) -> StoreResult<Option<Uuid>> {
        let row = sqlx::query(
            r#"
            UPDATE tenants
            SET team_id = COALESCE(team_id, id), updated_at = NOW()
            WHERE id = $1
            RETURNING team_id
            "#,
        )
        .bind(tenant_id)
        .fetch_optional(self.pool())
        .await?;

        Ok(match row {
            Some(row) => Some(row.try_get("team_id")?),
            None => None,
        })
    }

    /// Persist provider identifiers after checkout completes.
    pub async fn attach_subscription(
        &self,
        tenant_id: Uuid,
        customer_id: &str,
        subscription_id: &str,
        status: SubscriptionStatus,
    ) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE tenants
            SET customer_id = $2, subscription_id = $3, subscription_status = $4,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(tenant_id)
        .bind(customer_id)
        .bind(subscription_id)
        .bind(status.as_str())
        .execute(self.pool())
        .await?;
        Ok(())
    }

    pub async fn set_subscription_status(
        &self,
        tenant_id: Uuid,
        status: SubscriptionStatus,
    ) -> StoreResult<()> {
        sqlx::query(
            "UPDATE tenants SET subscription_status = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(tenant_id)
        .bind(status.as_str())
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Gate or restore access (ban flag included).
    pub async fn set_access(
        &self,
        tenant_id: Uuid,
        access_disabled: bool,
        banned: bool,
    ) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE tenants
            SET access_disabled = $2, banned = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(tenant_id)
        .bind(access_disabled)
        .bind(banned)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    pub async fn set_payment_failed(&self, tenant_id: Uuid, failed: bool) -> StoreResult<()> {
        sqlx::query("UPDATE tenants SET payment_failed = $2, updated_at = NOW() WHERE id = $1")
            .bind(tenant_id)
            .bind(failed)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    pub async fn set_pms_sync(
        &self,
        tenant_id: Uuid,
        enabled: bool,
        stopped_reason: Option<&str>,
    ) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE tenants
            SET pms_sync_enabled = $2, pms_sync_stopped_reason = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(tenant_id)
        .bind(enabled)
        .bind(stopped_reason)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    pub async fn set_auto_pricing(
        &self,
        tenant_id: Uuid,
        enabled: bool,
        timezone: Option<&str>,
    ) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE tenants
            SET auto_pricing_enabled = $2, auto_pricing_timezone = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(tenant_id)
        .bind(enabled)
        .bind(timezone)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Record a scheduler attempt. Success resets the failure counter; a
    /// failure increments it so the hourly retry window opens.
    pub async fn record_auto_pricing_attempt(
        &self,
        tenant_id: Uuid,
        at: DateTime<Utc>,
        success: bool,
    ) -> StoreResult<()> {
        if success {
            sqlx::query(
                r#"
                UPDATE tenants
                SET auto_pricing_last_attempt = $2,
                    auto_pricing_last_successful_run = $2,
                    auto_pricing_failed_attempts = 0,
                    updated_at = NOW()
                WHERE id = $1
                "#,
            )
            .bind(tenant_id)
            .bind(at)
            .execute(self.pool())
            .await?;
        } else {
            sqlx::query(
                r#"
                UPDATE tenants
                SET auto_pricing_last_attempt = $2,
                    auto_pricing_failed_attempts = auto_pricing_failed_attempts + 1,
                    updated_at = NOW()
                WHERE id = $1
                "#,
            )
            .bind(tenant_id)
            .bind(at)
            .execute(self.pool())
            .await?;
        }
        Ok(())
    }

    /// Upsert one monthly revenue target (`YYYY-MM` key) into the JSONB map.
    pub async fn set_revenue_target(
        &self,
        tenant_id: Uuid,
        month: &str,
        amount: Cents,
    ) -> StoreResult<()> {
        let patch = serde_json::json!({ month: amount });
        sqlx::query(
            r#"
            UPDATE tenants
            SET revenue_targets = revenue_targets || $2::jsonb, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(tenant_id)
        .bind(patch)
        .execute(self.pool())
        .await?;
        Ok(())
    }
}
