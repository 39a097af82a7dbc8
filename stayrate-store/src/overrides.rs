//! Price override persistence.
//!
//! Two write paths with different lock semantics: the orchestrator batch
//! upsert never touches locked rows (guarded in SQL), while manual edits may
//! set or clear the lock explicitly.

use crate::models::{OverrideWrite, PriceOverride};
use crate::{Store, StoreResult};
use chrono::NaiveDate;
use sqlx::postgres::PgRow;
use sqlx::Row;
use stayrate_core::Cents;
use uuid::Uuid;

fn override_from_row(row: &PgRow) -> StoreResult<PriceOverride> {
    Ok(PriceOverride {
        property_id: row.try_get("property_id")?,
        date: row.try_get("date")?,
        price: row.try_get("price")?,
        is_locked: row.try_get("is_locked")?,
        reason: row.try_get("reason")?,
        updated_by: row.try_get("updated_by")?,
        updated_at: row.try_get("updated_at")?,
    })
}

impl Store {
    pub async fn price_override(
        &self,
        property_id: Uuid,
        date: NaiveDate,
    ) -> StoreResult<Option<PriceOverride>> {
        let row = sqlx::query(
            "SELECT * FROM price_overrides WHERE property_id = $1 AND date = $2",
        )
        .bind(property_id)
        .bind(date)
        .fetch_optional(self.pool())
        .await?;
        row.as_ref().map(override_from_row).transpose()
    }

    /// All overrides for a property within `[from, to]`, ascending by date.
    pub async fn price_overrides_in_range(
        &self,
        property_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> StoreResult<Vec<PriceOverride>> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM price_overrides
            WHERE property_id = $1 AND date >= $2 AND date <= $3
            ORDER BY date
            "#,
        )
        .bind(property_id)
        .bind(from)
        .bind(to)
        .fetch_all(self.pool())
        .await?;
        rows.iter().map(override_from_row).collect()
    }

    /// Locked dates for a property within `[from, to]`.
    pub async fn locked_dates_in_range(
        &self,
        property_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> StoreResult<Vec<NaiveDate>> {
        let rows = sqlx::query(
            r#"
            SELECT date FROM price_overrides
            WHERE property_id = $1 AND date >= $2 AND date <= $3 AND is_locked = TRUE
            ORDER BY date
            "#,
        )
        .bind(property_id)
        .bind(from)
        .bind(to)
        .fetch_all(self.pool())
        .await?;
        rows.iter().map(|row| Ok(row.try_get("date")?)).collect()
    }

    /// Batch upsert from the pricing orchestrator, one statement for the
    /// whole calendar. Locked rows are left untouched even if a caller slips
    /// one through.
    pub async fn upsert_price_overrides(
        &self,
        property_id: Uuid,
        writes: &[OverrideWrite],
        updated_by: &str,
    ) -> StoreResult<u64> {
        if writes.is_empty() {
            return Ok(0);
        }

        let dates: Vec<NaiveDate> = writes.iter().map(|w| w.date).collect();
        let prices: Vec<Cents> = writes.iter().map(|w| w.price).collect();
        let reasons: Vec<String> = writes.iter().map(|w| w.reason.clone()).collect();

        let result = sqlx::query(
            r#"
            INSERT INTO price_overrides (property_id, date, price, is_locked, reason, updated_by, updated_at)
            SELECT $1, t.date, t.price, FALSE, t.reason, $5, NOW()
            FROM UNNEST($2::date[], $3::bigint[], $4::text[]) AS t(date, price, reason)
            ON CONFLICT (property_id, date) DO UPDATE
            SET price = EXCLUDED.price,
                reason = EXCLUDED.reason,
                updated_by = EXCLUDED.updated_by,
                updated_at = NOW()
            WHERE price_overrides.is_locked = FALSE
            "#,
        )
        .bind(property_id)
        .bind(&dates)
        .bind(&prices)
        .bind(&reasons)
        .bind(updated_by)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected())
    }

    /// Manual edit path: sets price and lock state for a single day.
    pub async fn set_manual_override(
        &self,
        property_id: Uuid,
        date: NaiveDate,
        price: Cents,
        is_locked: bool,
        reason: &str,
        updated_by: &str,
    ) -> StoreResult<PriceOverride> {
        let row = sqlx::query(
            r#"
            INSERT INTO price_overrides (property_id, date, price, is_locked, reason, updated_by, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, NOW())
            ON CONFLICT (property_id, date) DO UPDATE
            SET price = EXCLUDED.price,
                is_locked = EXCLUDED.is_locked,
                reason = EXCLUDED.reason,
                updated_by = EXCLUDED.updated_by,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(property_id)
        .bind(date)
        .bind(price)
        .bind(is_locked)
        .bind(reason)
        .bind(updated_by)
        .fetch_one(self.pool())
        .await?;
        override_from_row(&row)
    }
}
