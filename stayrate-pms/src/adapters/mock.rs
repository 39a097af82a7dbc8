//! Deterministic in-memory PMS backend for tests and demos.
//!
//! Records every push so assertions can inspect what would have gone over
//! the wire, and supports one-shot failure injection to exercise the
//! gateway's abort and best-effort contracts.

use crate::adapter::{
    AdapterMetadata, PmsAdapter, PmsProperty, PmsReservation, RateUpdate, ReservationData,
    SettingsUpdate,
};
use crate::{PmsError, PmsResult};
use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;
use std::collections::HashMap;
use stayrate_core::PmsKind;

#[derive(Default)]
struct MockState {
    properties: Vec<PmsProperty>,
    reservations: HashMap<String, PmsReservation>,
    rate_pushes: Vec<(String, Vec<RateUpdate>)>,
    settings_pushes: Vec<(String, SettingsUpdate)>,
    fail_next: Option<String>,
    next_id: u64,
}

/// In-memory adapter; cloneable handles share state.
#[derive(Default)]
pub struct MockAdapter {
    state: Mutex<MockState>,
}

impl MockAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_properties(properties: Vec<PmsProperty>) -> Self {
        let adapter = Self::new();
        adapter.state.lock().properties = properties;
        adapter
    }

    /// Make the next remote call fail with the given reason.
    pub fn fail_next(&self, reason: &str) {
        self.state.lock().fail_next = Some(reason.to_string());
    }

    pub fn seed_reservation(&self, reservation: PmsReservation) {
        self.state
            .lock()
            .reservations
            .insert(reservation.pms_id.clone(), reservation);
    }

    /// Rate batches pushed so far, in call order.
    pub fn rate_pushes(&self) -> Vec<(String, Vec<RateUpdate>)> {
        self.state.lock().rate_pushes.clone()
    }

    pub fn settings_pushes(&self) -> Vec<(String, SettingsUpdate)> {
        self.state.lock().settings_pushes.clone()
    }

    pub fn reservation_count(&self) -> usize {
        self.state.lock().reservations.len()
    }

    fn take_failure(&self) -> PmsResult<()> {
        if let Some(reason) = self.state.lock().fail_next.take() {
            return Err(PmsError::Request {
                backend: "mock",
                reason,
            });
        }
        Ok(())
    }

    fn next_id(&self) -> String {
        let mut state = self.state.lock();
        state.next_id += 1;
        format!("mock-{}", state.next_id)
    }
}

#[async_trait]
impl PmsAdapter for MockAdapter {
    fn metadata(&self) -> AdapterMetadata {
        AdapterMetadata {
            kind: PmsKind::Mock,
            name: "Mock",
            supports_bulk_rates: true,
        }
    }

    async fn test_connection(&self) -> PmsResult<()> {
        self.take_failure()
    }

    async fn get_properties(&self) -> PmsResult<Vec<PmsProperty>> {
        self.take_failure()?;
        Ok(self.state.lock().properties.clone())
    }

    async fn get_reservations(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> PmsResult<Vec<PmsReservation>> {
        self.take_failure()?;
        Ok(self
            .state
            .lock()
            .reservations
            .values()
            .filter(|r| r.start_date <= to && r.end_date >= from)
            .cloned()
            .collect())
    }

    async fn create_reservation(
        &self,
        pms_property_id: &str,
        data: &ReservationData,
    ) -> PmsResult<PmsReservation> {
        self.take_failure()?;
        let reservation = PmsReservation {
            pms_id: self.next_id(),
            property_id: pms_property_id.to_string(),
            start_date: data.start_date,
            end_date: data.end_date,
            status: data.status.clone().unwrap_or_else(|| "confirmed".into()),
            guest_name: data.guest_name.clone(),
            total_price: data.total_price,
            channel: data.channel.clone(),
        };
        self.seed_reservation(reservation.clone());
        Ok(reservation)
    }

    async fn update_reservation(
        &self,
        pms_reservation_id: &str,
        data: &ReservationData,
    ) -> PmsResult<PmsReservation> {
        self.take_failure()?;
        let mut state = self.state.lock();
        let reservation = state
            .reservations
            .get_mut(pms_reservation_id)
            .ok_or_else(|| PmsError::Request {
                backend: "mock",
                reason: format!("unknown reservation {pms_reservation_id}"),
            })?;
        reservation.start_date = data.start_date;
        reservation.end_date = data.end_date;
        reservation.guest_name = data.guest_name.clone();
        reservation.total_price = data.total_price;
        if let Some(status) = &data.status {
            reservation.status = status.clone();
        }
        Ok(reservation.clone())
    }

    async fn delete_reservation(&self, pms_reservation_id: &str) -> PmsResult<()> {
        self.take_failure()?;
        self.state.lock().reservations.remove(pms_reservation_id);
        Ok(())
    }

    async fn update_property_settings(
        &self,
        pms_property_id: &str,
        settings: &SettingsUpdate,
    ) -> PmsResult<()> {
        self.take_failure()?;
        self.state
            .lock()
            .settings_pushes
            .push((pms_property_id.to_string(), settings.clone()));
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
        self.take_failure()?;
        self.state
            .lock()
            .rate_pushes
            .push((pms_property_id.to_string(), rates.to_vec()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn records_rate_pushes() {
        let adapter = MockAdapter::new();
        adapter
            .update_batch_rates("p1", &[RateUpdate { date: d("2025-07-01"), price: 120.0 }])
            .await
            .unwrap();
        let pushes = adapter.rate_pushes();
        assert_eq!(pushes.len(), 1);
        assert_eq!(pushes[0].0, "p1");
    }

    #[tokio::test]
    async fn fail_next_fails_exactly_once() {
        let adapter = MockAdapter::new();
        adapter.fail_next("backend down");
        assert!(adapter.test_connection().await.is_err());
        assert!(adapter.test_connection().await.is_ok());
    }

    #[tokio::test]
    async fn reservation_lifecycle() {
        let adapter = MockAdapter::new();
        let created = adapter
            .create_reservation(
                "p1",
                &ReservationData {
                    start_date: d("2025-07-01"),
                    end_date: d("2025-07-05"),
                    guest_name: Some("A. Martin".into()),
                    total_price: Some(480.0),
                    channel: None,
                    status: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(adapter.reservation_count(), 1);
        adapter.delete_reservation(&created.pms_id).await.unwrap();
        assert_eq!(adapter.reservation_count(), 0);
    }
}
