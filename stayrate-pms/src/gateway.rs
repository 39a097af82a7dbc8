//! Sync gateway: translates local mutations into remote PMS calls with the
//! ordering contracts that keep both sides coherent.
//!
//! - Settings, rules, and rate pushes are remote-first: a remote failure
//!   aborts the local write entirely.
//! - Locally initiated reservation writes are remote-first but commit
//!   locally even when the remote side fails; the failure is annotated.
//! - Remote-originated reservations only ever upsert locally.
//!
//! All outbound calls are skipped silently when the tenant has PMS sync
//! disabled; local writes proceed.

use crate::adapter::{PmsAdapter, PmsProperty, RateUpdate, ReservationData, SettingsUpdate};
use crate::registry::PmsRegistry;
use crate::PmsError;
use chrono::NaiveDate;
use std::collections::HashSet;
use std::sync::Arc;
use stayrate_core::{BookingStatus, Cents, PmsKind, Strategy};
use stayrate_store::{
    Booking, MirrorOutcome, NewBooking, Property, PropertyRules, Store, StoreError, Tenant,
};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Gateway failures. PMS variants map to 502-class responses upstream.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error(transparent)]
    Pms(#[from] PmsError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("property is not linked to a PMS")]
    NotLinked,

    /// The property row disappeared between the remote push and the local
    /// commit.
    #[error("property vanished during update")]
    PropertyVanished,
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Counts reported by a reservation sync.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReservationSync {
    pub created: u32,
    pub updated: u32,
}

/// Convert base-unit float prices from the wire into cents.
pub fn to_cents(price: f64) -> Cents {
    (price * 100.0).round() as Cents
}

/// Convert cents into the base-unit floats the wire format carries.
pub fn cents_to_units(amount: Cents) -> f64 {
    amount as f64 / 100.0
}

/// Map a backend's reservation status vocabulary onto ours.
pub fn map_remote_status(status: &str) -> BookingStatus {
    match status.to_ascii_lowercase().as_str() {
        "confirmed" | "reservation" | "booked" | "new" => BookingStatus::Confirme,
        "cancelled" | "canceled" | "cancellation" => BookingStatus::Annule,
        _ => BookingStatus::EnAttente,
    }
}

struct RemoteLink {
    adapter: Arc<dyn PmsAdapter>,
    pms_property_id: String,
}

/// The gateway. Cheap to clone.
#[derive(Clone)]
pub struct SyncGateway {
    store: Store,
    registry: Arc<PmsRegistry>,
}

impl SyncGateway {
    pub fn new(store: Store, registry: Arc<PmsRegistry>) -> Self {
        Self { store, registry }
    }

    /// Resolve an adapter for a user's integration, regardless of the
    /// tenant-level sync flag (used by connection tests and imports).
    pub async fn adapter_for_integration(
        &self,
        user_id: uuid::Uuid,
        kind: PmsKind,
    ) -> GatewayResult<Arc<dyn PmsAdapter>> {
        let integration = self
            .store
            .integration(user_id, kind)
            .await?
            .ok_or(PmsError::NotConnected { kind })?;
        Ok(self.registry.resolve_integration(&integration)?)
    }

    /// List remote properties for an import.
    pub async fn list_remote_properties(
        &self,
        user_id: uuid::Uuid,
        kind: PmsKind,
    ) -> GatewayResult<Vec<PmsProperty>> {
        let adapter = self.adapter_for_integration(user_id, kind).await?;
        Ok(adapter.get_properties().await?)
    }

    /// Remote link for outbound pushes: `None` when sync is disabled for the
    /// tenant or the property is not PMS-linked.
    async fn outbound_link(
        &self,
        tenant: &Tenant,
        property: &Property,
    ) -> GatewayResult<Option<RemoteLink>> {
        if !tenant.pms_sync_enabled {
            debug!(property = %property.id, "pms sync disabled, skipping remote push");
            return Ok(None);
        }
        let (pms_id, kind) = match (&property.pms_id, property.pms_type) {
            (Some(pms_id), Some(kind)) => (pms_id.clone(), kind),
            _ => return Ok(None),
        };
        let adapter = self.adapter_for_integration(property.owner_id, kind).await?;
        Ok(Some(RemoteLink {
            adapter,
            pms_property_id: pms_id,
        }))
    }

    /// Strategy change: push the price ladder remotely, then commit locally.
    /// A remote failure aborts the local write.
    pub async fn update_strategy(
        &self,
        tenant: &Tenant,
        property: &Property,
        strategy: Strategy,
        floor_price: Cents,
        base_price: Cents,
        ceiling_price: Option<Cents>,
    ) -> GatewayResult<Property> {
        if let Some(link) = self.outbound_link(tenant, property).await? {
            let settings = SettingsUpdate {
                base_price: Some(cents_to_units(base_price)),
                floor_price: Some(cents_to_units(floor_price)),
                ceiling_price: ceiling_price.map(cents_to_units),
                ..SettingsUpdate::default()
            };
            link.adapter
                .update_property_settings(&link.pms_property_id, &settings)
                .await?;
        }

        let updated = self
            .store
            .update_property_strategy(property.id, strategy, floor_price, base_price, ceiling_price)
            .await?
            .ok_or(GatewayError::PropertyVanished)?;
        info!(property = %property.id, strategy = %strategy, "strategy updated");
        Ok(updated)
    }

    /// Rules change: same remote-first, abort-on-failure contract.
    pub async fn update_rules(
        &self,
        tenant: &Tenant,
        property: &Property,
        rules: &PropertyRules,
    ) -> GatewayResult<Property> {
        if let Some(link) = self.outbound_link(tenant, property).await? {
            let settings = SettingsUpdate {
                min_stay: rules.min_stay,
                max_stay: rules.max_stay,
                weekly_discount_percent: rules.weekly_discount_percent,
                monthly_discount_percent: rules.monthly_discount_percent,
                weekend_markup_percent: rules.weekend_markup_percent,
                ..SettingsUpdate::default()
            };
            if !settings.is_empty() {
                link.adapter
                    .update_property_settings(&link.pms_property_id, &settings)
                    .await?;
            }
        }

        let updated = self
            .store
            .update_property_rules(property.id, rules)
            .await?
            .ok_or(GatewayError::PropertyVanished)?;
        Ok(updated)
    }

    /// Orchestrator batch rates: locked dates are filtered out here as well
    /// as by the builder, then the remainder goes out in one batch. A remote
    /// failure aborts; the caller must not write local rows.
    pub async fn push_calendar(
        &self,
        tenant: &Tenant,
        property: &Property,
        rates: &[RateUpdate],
    ) -> GatewayResult<u32> {
        let link = match self.outbound_link(tenant, property).await? {
            Some(link) => link,
            None => return Ok(0),
        };
        if rates.is_empty() {
            return Ok(0);
        }

        let (from, to) = match (
            rates.iter().map(|r| r.date).min(),
            rates.iter().map(|r| r.date).max(),
        ) {
            (Some(from), Some(to)) => (from, to),
            _ => return Ok(0),
        };
        let locked: HashSet<NaiveDate> = self
            .store
            .locked_dates_in_range(property.id, from, to)
            .await?
            .into_iter()
            .collect();

        let unlocked: Vec<RateUpdate> = rates
            .iter()
            .filter(|r| !locked.contains(&r.date))
            .copied()
            .collect();
        if unlocked.is_empty() {
            return Ok(0);
        }

        link.adapter
            .update_batch_rates(&link.pms_property_id, &unlocked)
            .await?;
        debug!(
            property = %property.id,
            pushed = unlocked.len(),
            locked = locked.len(),
            "calendar pushed to pms"
        );
        Ok(unlocked.len() as u32)
    }

    /// Create a reservation locally, replaying it to the PMS first.
    ///
    /// Remote failure does not abort: reservation state is descriptive, not
    /// authoritative. The returned annotation carries the remote failure, if
    /// any.
    pub async fn create_reservation(
        &self,
        tenant: &Tenant,
        property: &Property,
        mut new: NewBooking,
    ) -> GatewayResult<(Booking, Option<String>)> {
        let mut remote_warning = None;

        if let Some(link) = self.outbound_link(tenant, property).await? {
            let data = reservation_data(&new);
            match link.adapter.create_reservation(&link.pms_property_id, &data).await {
                Ok(remote) => new.pms_booking_id = Some(remote.pms_id),
                Err(e) => {
                    warn!(property = %property.id, error = %e, "remote reservation create failed");
                    remote_warning = Some(e.to_string());
                }
            }
        }

        let booking = self.store.create_booking(new).await?;
        Ok((booking, remote_warning))
    }

    /// Update a reservation; mirrored rows are replayed remotely best-effort.
    pub async fn update_reservation(
        &self,
        tenant: &Tenant,
        property: &Property,
        booking: &Booking,
    ) -> GatewayResult<Option<String>> {
        let mut remote_warning = None;

        if let Some(pms_booking_id) = booking.pms_booking_id.as_ref() {
            if let Some(link) = self.outbound_link(tenant, property).await? {
                let data = booking_data(booking);
                if let Err(e) = link.adapter.update_reservation(pms_booking_id, &data).await {
                    warn!(booking = %booking.id, error = %e, "remote reservation update failed");
                    remote_warning = Some(e.to_string());
                }
            }
        }

        self.store.update_booking(booking).await?;
        Ok(remote_warning)
    }

    /// Delete a reservation; mirrored rows are deleted remotely best-effort.
    pub async fn delete_reservation(
        &self,
        tenant: &Tenant,
        property: &Property,
        booking: &Booking,
    ) -> GatewayResult<Option<String>> {
        let mut remote_warning = None;

        if let Some(pms_booking_id) = booking.pms_booking_id.as_ref() {
            if let Some(link) = self.outbound_link(tenant, property).await? {
                if let Err(e) = link.adapter.delete_reservation(pms_booking_id).await {
                    warn!(booking = %booking.id, error = %e, "remote reservation delete failed");
                    remote_warning = Some(e.to_string());
                }
            }
        }

        self.store.delete_booking(booking.id).await?;
        Ok(remote_warning)
    }

    /// Pull remote reservations for a property and mirror them locally,
    /// keyed by `(property_id, pms_booking_id)`.
    pub async fn sync_reservations(
        &self,
        property: &Property,
        from: NaiveDate,
        to: NaiveDate,
    ) -> GatewayResult<ReservationSync> {
        let (pms_id, kind) = match (&property.pms_id, property.pms_type) {
            (Some(pms_id), Some(kind)) => (pms_id.clone(), kind),
            _ => return Err(GatewayError::NotLinked),
        };
        let adapter = self.adapter_for_integration(property.owner_id, kind).await?;

        let reservations = adapter.get_reservations(from, to).await?;
        let mut summary = ReservationSync::default();

        for remote in reservations.iter().filter(|r| r.property_id == pms_id) {
            let nights = (remote.end_date - remote.start_date).num_days().max(1);
            let revenue = remote.total_price.map(to_cents);
            let new = NewBooking {
                property_id: property.id,
                start_date: remote.start_date,
                end_date: remote.end_date,
                price_per_night: revenue.map(|r| r / nights),
                revenue,
                channel: remote.channel.clone().unwrap_or_else(|| kind.to_string()),
                guest_name: remote.guest_name.clone(),
                status: map_remote_status(&remote.status),
                pms_booking_id: Some(remote.pms_id.clone()),
                pricing_method: stayrate_core::PricingMethod::Pms,
            };
            match self
                .store
                .upsert_pms_booking(property.id, &remote.pms_id, &new)
                .await?
            {
                MirrorOutcome::Created => summary.created += 1,
                MirrorOutcome::Updated => summary.updated += 1,
            }
        }

        self.store
            .touch_integration_sync(property.owner_id, kind)
            .await?;
        info!(
            property = %property.id,
            created = summary.created,
            updated = summary.updated,
            "reservations synced from pms"
        );
        Ok(summary)
    }

    pub fn store(&self) -> &Store {
        &self.store
    }
}

fn reservation_data(new: &NewBooking) -> ReservationData {
    ReservationData {
        start_date: new.start_date,
        end_date: new.end_date,
        guest_name: new.guest_name.clone(),
        total_price: new.revenue.map(cents_to_units),
        channel: Some(new.channel.clone()),
        status: Some(new.status.as_str().to_string()),
    }
}

fn booking_data(booking: &Booking) -> ReservationData {
    ReservationData {
        start_date: booking.start_date,
        end_date: booking.end_date,
        guest_name: booking.guest_name.clone(),
        total_price: booking.revenue.map(cents_to_units),
        channel: Some(booking.channel.clone()),
        status: Some(booking.status.as_str().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cents_round_trip_through_wire_units() {
        assert_eq!(to_cents(120.0), 12000);
        assert_eq!(to_cents(99.99), 9999);
        assert_eq!(cents_to_units(12000), 120.0);
        // Sub-cent float noise rounds to the nearest cent.
        assert_eq!(to_cents(119.999999), 12000);
    }

    #[test]
    fn remote_status_vocabulary_maps_to_ours() {
        assert_eq!(map_remote_status("confirmed"), BookingStatus::Confirme);
        assert_eq!(map_remote_status("Reservation"), BookingStatus::Confirme);
        assert_eq!(map_remote_status("cancelled"), BookingStatus::Annule);
        assert_eq!(map_remote_status("request"), BookingStatus::EnAttente);
    }
}
