//! Booking persistence, including the PMS mirror upsert.

use crate::models::{parse_column, Booking};
use crate::{Store, StoreResult};
use chrono::NaiveDate;
use sqlx::postgres::PgRow;
use sqlx::Row;
use stayrate_core::{BookingStatus, Cents, PricingMethod};
use uuid::Uuid;

/// Fields for a locally created booking.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub property_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub price_per_night: Option<Cents>,
    pub revenue: Option<Cents>,
    pub channel: String,
    pub guest_name: Option<String>,
    pub status: BookingStatus,
    pub pms_booking_id: Option<String>,
    pub pricing_method: PricingMethod,
}

/// Outcome of a PMS mirror upsert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MirrorOutcome {
    Created,
    Updated,
}

fn booking_from_row(row: &PgRow) -> StoreResult<Booking> {
    Ok(Booking {
        id: row.try_get("id")?,
        property_id: row.try_get("property_id")?,
        start_date: row.try_get("start_date")?,
        end_date: row.try_get("end_date")?,
        price_per_night: row.try_get("price_per_night")?,
        revenue: row.try_get("revenue")?,
        channel: row.try_get("channel")?,
        guest_name: row.try_get("guest_name")?,
        status: parse_column("bookings", row.try_get("status")?)?,
        pms_booking_id: row.try_get("pms_booking_id")?,
        pricing_method: parse_column("bookings", row.try_get("pricing_method")?)?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

impl Store {
    pub async fn create_booking(&self, new: NewBooking) -> StoreResult<Booking> {
        let row = sqlx::query(
            r#"
            INSERT INTO bookings (
                id, property_id, start_date, end_date, price_per_night, revenue,
                channel, guest_name, status, pms_booking_id, pricing_method
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.property_id)
        .bind(new.start_date)
        .bind(new.end_date)
        .bind(new.price_per_night)
        .bind(new.revenue)
        .bind(&new.channel)
        .bind(&new.guest_name)
        .bind(new.status.as_str())
        .bind(&new.pms_booking_id)
        .bind(new.pricing_method.as_str())
        .fetch_one(self.pool())
        .await?;
        booking_from_row(&row)
    }

    pub async fn booking(&self, id: Uuid) -> StoreResult<Option<Booking>> {
        let row = sqlx::query("SELECT * FROM bookings WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        row.as_ref().map(booking_from_row).transpose()
    }

    pub async fn update_booking(&self, booking: &Booking) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE bookings
            SET start_date = $2, end_date = $3, price_per_night = $4, revenue = $5,
                channel = $6, guest_name = $7, status = $8, pricing_method = $9,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(booking.id)
        .bind(booking.start_date)
        .bind(booking.end_date)
        .bind(booking.price_per_night)
        .bind(booking.revenue)
        .bind(&booking.channel)
        .bind(&booking.guest_name)
        .bind(booking.status.as_str())
        .bind(booking.pricing_method.as_str())
        .execute(self.pool())
        .await?;
        Ok(())
    }

    pub async fn delete_booking(&self, id: Uuid) -> StoreResult<()> {
        sqlx::query("DELETE FROM bookings WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// Bookings of a whole team overlapping `[from, to)`.
    pub async fn bookings_for_team_overlapping(
        &self,
        team_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> StoreResult<Vec<Booking>> {
        let rows = sqlx::query(
            r#"
            SELECT b.* FROM bookings b
            JOIN properties p ON p.id = b.property_id
            WHERE (p.team_id = $1 OR p.owner_id = $1)
              AND b.start_date < $3
              AND b.end_date > $2
            ORDER BY b.start_date
            "#,
        )
        .bind(team_id)
        .bind(from)
        .bind(to)
        .fetch_all(self.pool())
        .await?;
        rows.iter().map(booking_from_row).collect()
    }

    /// Upsert a remote-originated reservation keyed by
    /// `(property_id, pms_booking_id)`, reporting created vs updated.
    pub async fn upsert_pms_booking(
        &self,
        property_id: Uuid,
        pms_booking_id: &str,
        new: &NewBooking,
    ) -> StoreResult<MirrorOutcome> {
        let row = sqlx::query(
            r#"
            INSERT INTO bookings (
                id, property_id, start_date, end_date, price_per_night, revenue,
                channel, guest_name, status, pms_booking_id, pricing_method
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 'pms')
            ON CONFLICT (property_id, pms_booking_id) WHERE pms_booking_id IS NOT NULL
            DO UPDATE SET
                start_date = EXCLUDED.start_date,
                end_date = EXCLUDED.end_date,
                price_per_night = EXCLUDED.price_per_night,
                revenue = EXCLUDED.revenue,
                channel = EXCLUDED.channel,
                guest_name = EXCLUDED.guest_name,
                status = EXCLUDED.status,
                updated_at = NOW()
            RETURNING (created_at = updated_at) AS inserted
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(property_id)
        .bind(new.start_date)
        .bind(new.end_date)
        .bind(new.price_per_night)
        .bind(new.revenue)
        .bind(&new.channel)
        .bind(&new.guest_name)
        .bind(new.status.as_str())
        .bind(pms_booking_id)
        .fetch_one(self.pool())
        .await?;

        let inserted: bool = row.try_get("inserted")?;
        Ok(if inserted {
            MirrorOutcome::Created
        } else {
            MirrorOutcome::Updated
        })
    }
}
