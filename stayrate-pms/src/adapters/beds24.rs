//! Beds24 adapter.
//!
//! Token-authenticated JSON API. The calendar endpoint takes one entry per
//! date, so batch pushes send a per-date map in a single request instead of
//! coalesced price groups.

use crate::adapter::{
    AdapterMetadata, PmsAdapter, PmsProperty, PmsReservation, RateUpdate, ReservationData,
    SettingsUpdate,
};
use crate::{PmsError, PmsResult};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use stayrate_core::PmsKind;
use tracing::debug;

const BACKEND: &str = "beds24";
const BASE_URL: &str = "https://beds24.com/api/v2";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Beds24 API client and adapter implementation.
pub struct Beds24Adapter {
    client: reqwest::Client,
    token: String,
    base_url: String,
}

impl Beds24Adapter {
    pub fn from_credentials(credentials: &serde_json::Value) -> PmsResult<Self> {
        let token = credentials
            .get("token")
            .or_else(|| credentials.get("api_key"))
            .and_then(|v| v.as_str())
            .ok_or_else(|| PmsError::Credentials {
                backend: BACKEND,
                reason: "token is required".into(),
            })?;
        Self::new(token, BASE_URL)
    }

    pub fn new(token: &str, base_url: &str) -> PmsResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| PmsError::request(BACKEND, e.to_string()))?;
        Ok(Self {
            client,
            token: token.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .header("token", &self.token)
    }

    async fn check(response: reqwest::Response) -> PmsResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            Err(PmsError::Auth {
                backend: BACKEND,
                reason: format!("{status}: {body}"),
            })
        } else {
            Err(PmsError::request(BACKEND, format!("{status}: {body}")))
        }
    }
}

#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct PropertyWire {
    id: i64,
    name: String,
    #[serde(rename = "maxPeople")]
    max_people: Option<i32>,
    city: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BookingWire {
    id: i64,
    #[serde(rename = "propertyId")]
    property_id: i64,
    arrival: NaiveDate,
    departure: NaiveDate,
    status: Option<String>,
    #[serde(rename = "guestName")]
    guest_name: Option<String>,
    price: Option<f64>,
    #[serde(rename = "referer")]
    channel: Option<String>,
}

#[derive(Debug, Serialize)]
struct BookingPayload<'a> {
    #[serde(rename = "propertyId", skip_serializing_if = "Option::is_none")]
    property_id: Option<i64>,
    arrival: NaiveDate,
    departure: NaiveDate,
    #[serde(rename = "guestName", skip_serializing_if = "Option::is_none")]
    guest_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct CalendarPayload {
    #[serde(rename = "propertyId")]
    property_id: i64,
    /// Per-date price entries, `YYYY-MM-DD` keys.
    rates: BTreeMap<String, f64>,
}

fn normalize_property(wire: PropertyWire) -> PmsProperty {
    PmsProperty {
        pms_id: wire.id.to_string(),
        name: wire.name,
        capacity: wire.max_people,
        location: wire.city,
    }
}

fn normalize_booking(wire: BookingWire) -> PmsReservation {
    PmsReservation {
        pms_id: wire.id.to_string(),
        property_id: wire.property_id.to_string(),
        start_date: wire.arrival,
        end_date: wire.departure,
        status: wire.status.unwrap_or_else(|| "confirmed".to_string()),
        guest_name: wire.guest_name,
        total_price: wire.price,
        channel: wire.channel,
    }
}

fn parse_property_id(pms_property_id: &str) -> PmsResult<i64> {
    pms_property_id.parse::<i64>().map_err(|_| {
        PmsError::payload(BACKEND, format!("non-numeric property id: {pms_property_id}"))
    })
}

#[async_trait]
impl PmsAdapter for Beds24Adapter {
    fn metadata(&self) -> AdapterMetadata {
        AdapterMetadata {
            kind: PmsKind::Beds24,
            name: "Beds24",
            supports_bulk_rates: false,
        }
    }

    async fn test_connection(&self) -> PmsResult<()> {
        let response = self
            .request(reqwest::Method::GET, "/authentication/details")
            .send()
            .await
            .map_err(|e| PmsError::request(BACKEND, e.to_string()))?;
        Self::check(response).await?;
        Ok(())
    }

    async fn get_properties(&self) -> PmsResult<Vec<PmsProperty>> {
        let response = self
            .request(reqwest::Method::GET, "/properties")
            .send()
            .await
            .map_err(|e| PmsError::request(BACKEND, e.to_string()))?;
        let envelope: DataEnvelope<PropertyWire> = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| PmsError::payload(BACKEND, e.to_string()))?;
        Ok(envelope.data.into_iter().map(normalize_property).collect())
    }

    async fn get_reservations(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> PmsResult<Vec<PmsReservation>> {
        let response = self
            .request(reqwest::Method::GET, "/bookings")
            .query(&[
                ("arrivalFrom", from.to_string()),
                ("arrivalTo", to.to_string()),
            ])
            .send()
            .await
            .map_err(|e| PmsError::request(BACKEND, e.to_string()))?;
        let envelope: DataEnvelope<BookingWire> = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| PmsError::payload(BACKEND, e.to_string()))?;
        Ok(envelope.data.into_iter().map(normalize_booking).collect())
    }

    async fn create_reservation(
        &self,
        pms_property_id: &str,
        data: &ReservationData,
    ) -> PmsResult<PmsReservation> {
        let property_id = parse_property_id(pms_property_id)?;
        let response = self
            .request(reqwest::Method::POST, "/bookings")
            .json(&BookingPayload {
                property_id: Some(property_id),
                arrival: data.start_date,
                departure: data.end_date,
                guest_name: data.guest_name.as_deref(),
                price: data.total_price,
                status: data.status.as_deref(),
            })
            .send()
            .await
            .map_err(|e| PmsError::request(BACKEND, e.to_string()))?;
        let wire: BookingWire = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| PmsError::payload(BACKEND, e.to_string()))?;
        Ok(normalize_booking(wire))
    }

    async fn update_reservation(
        &self,
        pms_reservation_id: &str,
        data: &ReservationData,
    ) -> PmsResult<PmsReservation> {
        let response = self
            .request(
                reqwest::Method::PATCH,
                &format!("/bookings/{pms_reservation_id}"),
            )
            .json(&BookingPayload {
                property_id: None,
                arrival: data.start_date,
                departure: data.end_date,
                guest_name: data.guest_name.as_deref(),
                price: data.total_price,
                status: data.status.as_deref(),
            })
            .send()
            .await
            .map_err(|e| PmsError::request(BACKEND, e.to_string()))?;
        let wire: BookingWire = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| PmsError::payload(BACKEND, e.to_string()))?;
        Ok(normalize_booking(wire))
    }

    async fn delete_reservation(&self, pms_reservation_id: &str) -> PmsResult<()> {
        let response = self
            .request(
                reqwest::Method::DELETE,
                &format!("/bookings/{pms_reservation_id}"),
            )
            .send()
            .await
            .map_err(|e| PmsError::request(BACKEND, e.to_string()))?;
        Self::check(response).await?;
        Ok(())
    }

    async fn update_property_settings(
        &self,
        pms_property_id: &str,
        settings: &SettingsUpdate,
    ) -> PmsResult<()> {
        let property_id = parse_property_id(pms_property_id)?;
        let response = self
            .request(
                reqwest::Method::PATCH,
                &format!("/properties/{property_id}/settings"),
            )
            .json(settings)
            .send()
            .await
            .map_err(|e| PmsError::request(BACKEND, e.to_string()))?;
        Self::check(response).await?;
        Ok(())
    }

    async fn update_rate(
        &self,
        pms_property_id: &str,
        date: NaiveDate,
        price: f64,
    ) -> PmsResult<()> {
        self.update_batch_rates(pms_property_id, &[RateUpdate { date, price }])
            .await
    }

    async fn update_batch_rates(
        &self,
        pms_property_id: &str,
        rates: &[RateUpdate],
    ) -> PmsResult<()> {
        if rates.is_empty() {
            return Ok(());
        }
        let property_id = parse_property_id(pms_property_id)?;
        let per_date: BTreeMap<String, f64> = rates
            .iter()
            .map(|rate| (rate.date.to_string(), rate.price))
            .collect();
        debug!(property_id, days = per_date.len(), "pushing beds24 calendar");
        let response = self
            .request(reqwest::Method::POST, "/inventory/calendar")
            .json(&CalendarPayload {
                property_id,
                rates: per_date,
            })
            .send()
            .await
            .map_err(|e| PmsError::request(BACKEND, e.to_string()))?;
        Self::check(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_property_wire() {
        let wire: PropertyWire = serde_json::from_value(serde_json::json!({
            "id": 77001,
            "name": "Gîte des Calanques",
            "maxPeople": 6,
            "city": "Cassis"
        }))
        .unwrap();
        let property = normalize_property(wire);
        assert_eq!(property.pms_id, "77001");
        assert_eq!(property.capacity, Some(6));
        assert_eq!(property.location.as_deref(), Some("Cassis"));
    }

    #[test]
    fn normalizes_booking_wire_with_defaults() {
        let wire: BookingWire = serde_json::from_value(serde_json::json!({
            "id": 5120,
            "propertyId": 77001,
            "arrival": "2025-08-02",
            "departure": "2025-08-09"
        }))
        .unwrap();
        let reservation = normalize_booking(wire);
        assert_eq!(reservation.status, "confirmed");
        assert!(reservation.guest_name.is_none());
    }

    #[test]
    fn token_alias_api_key_is_accepted() {
        let adapter =
            Beds24Adapter::from_credentials(&serde_json::json!({ "api_key": "b24-key" })).unwrap();
        assert_eq!(adapter.metadata().kind, PmsKind::Beds24);
    }
}
