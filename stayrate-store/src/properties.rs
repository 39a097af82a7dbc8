//! Property persistence.

use crate::models::{parse_column, Property};
use crate::{Store, StoreError, StoreResult};
use sqlx::postgres::PgRow;
use sqlx::Row;
use stayrate_core::{Cents, PmsKind, PropertyStatus, Strategy};
use uuid::Uuid;

/// Fields required to create a property.
#[derive(Debug, Clone)]
pub struct NewProperty {
    pub team_id: Uuid,
    pub owner_id: Uuid,
    pub address: String,
    pub city: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub country: String,
    pub property_type: String,
    pub capacity: i32,
    pub surface: f64,
    pub amenities: Vec<String>,
    pub strategy: Strategy,
    pub floor_price: Cents,
    pub base_price: Cents,
    pub ceiling_price: Option<Cents>,
    pub min_stay: i32,
    pub pms_id: Option<String>,
    pub pms_type: Option<PmsKind>,
}

/// Pricing rules subset pushed to the PMS and editable by operators.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PropertyRules {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_stay: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_stay: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weekly_discount_percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly_discount_percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weekend_markup_percent: Option<f64>,
}

fn property_from_row(row: &PgRow) -> StoreResult<Property> {
    let amenities: serde_json::Value = row.try_get("amenities")?;
    let amenities = serde_json::from_value(amenities)
        .map_err(|e| StoreError::corrupt("properties", format!("amenities: {e}")))?;
    let pms_type: Option<String> = row.try_get("pms_type")?;
    let pms_type = pms_type
        .map(|raw| parse_column("properties", raw))
        .transpose()?;

    Ok(Property {
        id: row.try_get("id")?,
        team_id: row.try_get("team_id")?,
        owner_id: row.try_get("owner_id")?,
        address: row.try_get("address")?,
        city: row.try_get("city")?,
        latitude: row.try_get("latitude")?,
        longitude: row.try_get("longitude")?,
        country: row.try_get("country")?,
        property_type: row.try_get("property_type")?,
        capacity: row.try_get("capacity")?,
        surface: row.try_get("surface")?,
        amenities,
        strategy: parse_column("properties", row.try_get("strategy")?)?,
        floor_price: row.try_get("floor_price")?,
        base_price: row.try_get("base_price")?,
        ceiling_price: row.try_get("ceiling_price")?,
        min_stay: row.try_get("min_stay")?,
        max_stay: row.try_get("max_stay")?,
        weekly_discount_percent: row.try_get("weekly_discount_percent")?,
        monthly_discount_percent: row.try_get("monthly_discount_percent")?,
        weekend_markup_percent: row.try_get("weekend_markup_percent")?,
        status: parse_column("properties", row.try_get("status")?)?,
        pms_id: row.try_get("pms_id")?,
        pms_type,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

impl Store {
    pub async fn create_property(&self, new: NewProperty) -> StoreResult<Property> {
        let amenities = serde_json::to_value(&new.amenities)
            .map_err(|e| StoreError::corrupt("properties", e.to_string()))?;
        let row = sqlx::query(
            r#"
            INSERT INTO properties (
                id, team_id, owner_id, address, city, latitude, longitude,
                country, property_type, capacity, surface, amenities, strategy,
                floor_price, base_price, ceiling_price, min_stay, pms_id, pms_type
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                      $14, $15, $16, $17, $18, $19)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.team_id)
        .bind(new.owner_id)
        .bind(&new.address)
        .bind(&new.city)
        .bind(new.latitude)
        .bind(new.longitude)
        .bind(&new.country)
        .bind(&new.property_type)
        .bind(new.capacity)
        .bind(new.surface)
        .bind(amenities)
        .bind(new.strategy.as_str())
        .bind(new.floor_price)
        .bind(new.base_price)
        .bind(new.ceiling_price)
        .bind(new.min_stay)
        .bind(&new.pms_id)
        .bind(new.pms_type.map(|k| k.as_str()))
        .fetch_one(self.pool())
        .await?;

        property_from_row(&row)
    }

    pub async fn property(&self, id: Uuid) -> StoreResult<Option<Property>> {
        let row = sqlx::query("SELECT * FROM properties WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        row.as_ref().map(property_from_row).transpose()
    }

    /// Properties of a team, including rows created before the team id was
    /// initialized (owner fallback).
    pub async fn properties_for_team(&self, team_id: Uuid) -> StoreResult<Vec<Property>> {
        let rows = sqlx::query(
            "SELECT * FROM properties WHERE team_id = $1 OR owner_id = $1 ORDER BY created_at",
        )
        .bind(team_id)
        .fetch_all(self.pool())
        .await?;
        rows.iter().map(property_from_row).collect()
    }

    pub async fn count_properties_for_team(&self, team_id: Uuid) -> StoreResult<u32> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM properties WHERE team_id = $1 OR owner_id = $1",
        )
        .bind(team_id)
        .fetch_one(self.pool())
        .await?;
        let n: i64 = row.try_get("n")?;
        Ok(n as u32)
    }

    pub async fn property_by_pms_id(
        &self,
        team_id: Uuid,
        pms_id: &str,
    ) -> StoreResult<Option<Property>> {
        let row = sqlx::query(
            "SELECT * FROM properties WHERE (team_id = $1 OR owner_id = $1) AND pms_id = $2",
        )
        .bind(team_id)
        .bind(pms_id)
        .fetch_optional(self.pool())
        .await?;
        row.as_ref().map(property_from_row).transpose()
    }

    /// Update the strategy and its price ladder in one statement.
    pub async fn update_property_strategy(
        &self,
        id: Uuid,
        strategy: Strategy,
        floor_price: Cents,
        base_price: Cents,
        ceiling_price: Option<Cents>,
    ) -> StoreResult<Option<Property>> {
        let row = sqlx::query(
            r#"
            UPDATE properties
            SET strategy = $2, floor_price = $3, base_price = $4, ceiling_price = $5,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(strategy.as_str())
        .bind(floor_price)
        .bind(base_price)
        .bind(ceiling_price)
        .fetch_optional(self.pool())
        .await?;
        row.as_ref().map(property_from_row).transpose()
    }

    /// Update the stay/discount rules subset.
    pub async fn update_property_rules(
        &self,
        id: Uuid,
        rules: &PropertyRules,
    ) -> StoreResult<Option<Property>> {
        let row = sqlx::query(
            r#"
            UPDATE properties
            SET min_stay = COALESCE($2, min_stay),
                max_stay = COALESCE($3, max_stay),
                weekly_discount_percent = COALESCE($4, weekly_discount_percent),
                monthly_discount_percent = COALESCE($5, monthly_discount_percent),
                weekend_markup_percent = COALESCE($6, weekend_markup_percent),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(rules.min_stay)
        .bind(rules.max_stay)
        .bind(rules.weekly_discount_percent)
        .bind(rules.monthly_discount_percent)
        .bind(rules.weekend_markup_percent)
        .fetch_optional(self.pool())
        .await?;
        row.as_ref().map(property_from_row).transpose()
    }

    pub async fn set_property_status(
        &self,
        id: Uuid,
        status: PropertyStatus,
    ) -> StoreResult<()> {
        sqlx::query("UPDATE properties SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// Delete a property and its dependent rows (overrides, join rows).
    pub async fn delete_property(&self, id: Uuid) -> StoreResult<()> {
        let mut tx = self.pool().begin().await?;
        sqlx::query("DELETE FROM group_properties WHERE property_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM price_overrides WHERE property_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM properties WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }
}
