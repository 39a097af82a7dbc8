//! Smoobu adapter.
//!
//! Authenticates with a per-account API key; the rates endpoint accepts one
//! operation per price covering many dates, so coalesced pushes map to it
//! directly.

use crate::adapter::{
    coalesce_rates, AdapterMetadata, PmsAdapter, PmsProperty, PmsReservation, RateUpdate,
    ReservationData, SettingsUpdate,
};
use crate::{PmsError, PmsResult};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use stayrate_core::PmsKind;
use tracing::debug;

const BACKEND: &str = "smoobu";
const BASE_URL: &str = "https://login.smoobu.com/api";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Smoobu API client and adapter implementation.
pub struct SmoobuAdapter {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl SmoobuAdapter {
    pub fn from_credentials(credentials: &serde_json::Value) -> PmsResult<Self> {
        let api_key = credentials
            .get("api_key")
            .and_then(|v| v.as_str())
            .ok_or_else(|| PmsError::Credentials {
                backend: BACKEND,
                reason: "api_key is required".into(),
            })?;
        Self::new(api_key, BASE_URL)
    }

    pub fn new(api_key: &str, base_url: &str) -> PmsResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| PmsError::request(BACKEND, e.to_string()))?;
        Ok(Self {
            client,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .header("Api-Key", &self.api_key)
            .header("Cache-Control", "no-cache")
    }

    /// Map a response into success or a classified error, preserving the
    /// backend's own message as the reason.
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
struct ApartmentsEnvelope {
    apartments: Vec<ApartmentWire>,
}

#[derive(Debug, Deserialize)]
struct ApartmentWire {
    id: i64,
    name: String,
    #[serde(rename = "maxOccupancy")]
    max_occupancy: Option<i32>,
    location: Option<ApartmentLocationWire>,
}

#[derive(Debug, Deserialize)]
struct ApartmentLocationWire {
    city: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReservationsEnvelope {
    bookings: Vec<ReservationWire>,
}

#[derive(Debug, Deserialize)]
struct ReservationWire {
    id: i64,
    apartment: ApartmentRefWire,
    arrival: NaiveDate,
    departure: NaiveDate,
    #[serde(rename = "guest-name")]
    guest_name: Option<String>,
    price: Option<f64>,
    channel: Option<ChannelWire>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApartmentRefWire {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct ChannelWire {
    name: Option<String>,
}

#[derive(Debug, Serialize)]
struct ReservationPayload<'a> {
    #[serde(rename = "apartmentId", skip_serializing_if = "Option::is_none")]
    apartment_id: Option<i64>,
    arrival: NaiveDate,
    departure: NaiveDate,
    #[serde(rename = "guestName", skip_serializing_if = "Option::is_none")]
    guest_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    price: Option<f64>,
    #[serde(rename = "channelName", skip_serializing_if = "Option::is_none")]
    channel: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct RatesPayload {
    apartments: Vec<i64>,
    operations: Vec<RateOperation>,
}

#[derive(Debug, Serialize)]
struct RateOperation {
    dates: Vec<NaiveDate>,
    daily_price: f64,
}

fn normalize_apartment(wire: ApartmentWire) -> PmsProperty {
    PmsProperty {
        pms_id: wire.id.to_string(),
        name: wire.name,
        capacity: wire.max_occupancy,
        location: wire.location.and_then(|l| l.city),
    }
}

fn normalize_reservation(wire: ReservationWire) -> PmsReservation {
    PmsReservation {
        pms_id: wire.id.to_string(),
        property_id: wire.apartment.id.to_string(),
        start_date: wire.arrival,
        end_date: wire.departure,
        status: wire.kind.unwrap_or_else(|| "confirmed".to_string()),
        guest_name: wire.guest_name,
        total_price: wire.price,
        channel: wire.channel.and_then(|c| c.name),
    }
}

fn parse_property_id(pms_property_id: &str) -> PmsResult<i64> {
    pms_property_id
        .parse::<i64>()
        .map_err(|_| PmsError::payload(BACKEND, format!("non-numeric apartment id: {pms_property_id}")))
}

impl<'a> ReservationPayload<'a> {
    fn from_data(apartment_id: Option<i64>, data: &'a ReservationData) -> Self {
        Self {
            apartment_id,
            arrival: data.start_date,
            departure: data.end_date,
            guest_name: data.guest_name.as_deref(),
            price: data.total_price,
            channel: data.channel.as_deref(),
        }
    }
}

#[async_trait]
impl PmsAdapter for SmoobuAdapter {
    fn metadata(&self) -> AdapterMetadata {
        AdapterMetadata {
            kind: PmsKind::Smoobu,
            name: "Smoobu",
            supports_bulk_rates: true,
        }
    }

    async fn test_connection(&self) -> PmsResult<()> {
        let response = self
            .request(reqwest::Method::GET, "/me")
            .send()
            .await
            .map_err(|e| PmsError::request(BACKEND, e.to_string()))?;
        Self::check(response).await?;
        Ok(())
    }

    async fn get_properties(&self) -> PmsResult<Vec<PmsProperty>> {
        let response = self
            .request(reqwest::Method::GET, "/apartments")
            .send()
            .await
            .map_err(|e| PmsError::request(BACKEND, e.to_string()))?;
        let envelope: ApartmentsEnvelope = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| PmsError::payload(BACKEND, e.to_string()))?;
        Ok(envelope.apartments.into_iter().map(normalize_apartment).collect())
    }

    async fn get_reservations(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> PmsResult<Vec<PmsReservation>> {
        let response = self
            .request(reqwest::Method::GET, "/reservations")
            .query(&[
                ("arrivalFrom", from.to_string()),
                ("arrivalTo", to.to_string()),
            ])
            .send()
            .await
            .map_err(|e| PmsError::request(BACKEND, e.to_string()))?;
        let envelope: ReservationsEnvelope = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| PmsError::payload(BACKEND, e.to_string()))?;
        Ok(envelope
            .bookings
            .into_iter()
            .map(normalize_reservation)
            .collect())
    }

    async fn create_reservation(
        &self,
        pms_property_id: &str,
        data: &ReservationData,
    ) -> PmsResult<PmsReservation> {
        let apartment_id = parse_property_id(pms_property_id)?;
        let response = self
            .request(reqwest::Method::POST, "/reservations")
            .json(&ReservationPayload::from_data(Some(apartment_id), data))
            .send()
            .await
            .map_err(|e| PmsError::request(BACKEND, e.to_string()))?;
        let wire: ReservationWire = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| PmsError::payload(BACKEND, e.to_string()))?;
        Ok(normalize_reservation(wire))
    }

    async fn update_reservation(
        &self,
        pms_reservation_id: &str,
        data: &ReservationData,
    ) -> PmsResult<PmsReservation> {
        let response = self
            .request(
                reqwest::Method::PUT,
                &format!("/reservations/{pms_reservation_id}"),
            )
            .json(&ReservationPayload::from_data(None, data))
            .send()
            .await
            .map_err(|e| PmsError::request(BACKEND, e.to_string()))?;
        let wire: ReservationWire = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| PmsError::payload(BACKEND, e.to_string()))?;
        Ok(normalize_reservation(wire))
    }

    async fn delete_reservation(&self, pms_reservation_id: &str) -> PmsResult<()> {
        let response = self
            .request(
                reqwest::Method::DELETE,
                &format!("/reservations/{pms_reservation_id}"),
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
        let apartment_id = parse_property_id(pms_property_id)?;
        let response = self
            .request(
                reqwest::Method::PUT,
                &format!("/apartments/{apartment_id}/settings"),
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
        let apartment_id = parse_property_id(pms_property_id)?;
        let operations: Vec<RateOperation> = coalesce_rates(rates)
            .into_iter()
            .map(|batch| RateOperation {
                dates: batch.dates,
                daily_price: batch.price,
            })
            .collect();
        debug!(
            apartment_id,
            operations = operations.len(),
            days = rates.len(),
            "pushing smoobu rates"
        );
        let response = self
            .request(reqwest::Method::POST, "/rates")
            .json(&RatesPayload {
                apartments: vec![apartment_id],
                operations,
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
    fn normalizes_apartment_wire() {
        let wire: ApartmentWire = serde_json::from_value(serde_json::json!({
            "id": 412876,
            "name": "Loft Canal Saint-Martin",
            "maxOccupancy": 4,
            "location": { "city": "Paris" }
        }))
        .unwrap();
        let property = normalize_apartment(wire);
        assert_eq!(property.pms_id, "412876");
        assert_eq!(property.capacity, Some(4));
        assert_eq!(property.location.as_deref(), Some("Paris"));
    }

    #[test]
    fn normalizes_reservation_wire() {
        let wire: ReservationWire = serde_json::from_value(serde_json::json!({
            "id": 99120,
            "apartment": { "id": 412876 },
            "arrival": "2025-07-14",
            "departure": "2025-07-18",
            "guest-name": "M. Dupont",
            "price": 612.0,
            "channel": { "name": "Airbnb" },
            "type": "reservation"
        }))
        .unwrap();
        let reservation = normalize_reservation(wire);
        assert_eq!(reservation.pms_id, "99120");
        assert_eq!(reservation.property_id, "412876");
        assert_eq!(reservation.start_date.to_string(), "2025-07-14");
        assert_eq!(reservation.channel.as_deref(), Some("Airbnb"));
    }

    #[test]
    fn rejects_non_numeric_apartment_id() {
        assert!(matches!(
            parse_property_id("abc"),
            Err(PmsError::Payload { .. })
        ));
    }

    #[test]
    fn missing_api_key_is_a_credential_error() {
        let err = SmoobuAdapter::from_credentials(&serde_json::json!({})).unwrap_err();
        assert!(matches!(err, PmsError::Credentials { .. }));
    }
}
