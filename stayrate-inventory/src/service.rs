//! The mutation service every inventory change flows through.
//!
//! Each operation authorizes against the actor's team and role, applies the
//! mutation (through the sync gateway when the PMS is involved), appends a
//! best-effort audit row, and triggers billing reconciliation whenever the
//! billable inventory changed. Reconciliation failures never roll back the
//! mutation.

use crate::groups::{group_template, validate_member};
use crate::{InventoryError, InventoryResult};
use chrono::NaiveDate;
use serde_json::json;
use std::sync::Arc;
use stayrate_billing::{check_trial_cap, BillingReconciler};
use stayrate_core::{Cents, CoreError, PmsKind, PropertyStatus, Strategy};
use stayrate_pms::{PmsRegistry, ReservationSync, SyncGateway};
use stayrate_store::{
    Booking, Group, GroupWithMembers, Integration, NewBooking, NewProperty, Property,
    PropertyLog, PropertyRules, Store, Tenant,
};
use tracing::{info, warn};
use uuid::Uuid;

/// Client-facing payload for creating a property.
#[derive(Debug, Clone)]
pub struct PropertyInput {
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
}

/// Client-facing payload for reservation writes.
#[derive(Debug, Clone)]
pub struct BookingInput {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub price_per_night: Option<Cents>,
    pub revenue: Option<Cents>,
    pub channel: String,
    pub guest_name: Option<String>,
    pub status: stayrate_core::BookingStatus,
}

/// Outcome of a PMS property import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: u32,
    pub skipped_existing: u32,
    /// Listings refused because another account already consumed their free
    /// trial.
    pub skipped_used: u32,
}

/// Defaults applied to imported properties until the operator fills them in.
const IMPORT_DEFAULT_BASE_PRICE: Cents = 100_00;
const IMPORT_DEFAULT_FLOOR_PRICE: Cents = 50_00;
const IMPORT_DEFAULT_CAPACITY: i32 = 2;

/// The inventory mutation service.
#[derive(Clone)]
pub struct InventoryService {
    store: Store,
    gateway: SyncGateway,
    registry: Arc<PmsRegistry>,
    reconciler: BillingReconciler,
}

impl InventoryService {
    pub fn new(
        store: Store,
        gateway: SyncGateway,
        registry: Arc<PmsRegistry>,
        reconciler: BillingReconciler,
    ) -> Self {
        Self {
            store,
            gateway,
            registry,
            reconciler,
        }
    }

    /// Load the acting tenant, lazily initializing its team id.
    pub async fn actor(&self, user_id: Uuid) -> InventoryResult<Tenant> {
        self.store.get_or_init_team(user_id).await?;
        self.store
            .tenant(user_id)
            .await?
            .ok_or_else(|| InventoryError::Core(CoreError::NotFound { entity: "tenant" }))
    }

    fn authorize(&self, actor: &Tenant, property: &Property) -> InventoryResult<()> {
        let team_id = actor.effective_team_id();
        if property.team_id == team_id || property.owner_id == actor.id {
            Ok(())
        } else {
            Err(CoreError::Authorization("property belongs to another team".into()).into())
        }
    }

    fn authorize_group(&self, actor: &Tenant, group: &Group) -> InventoryResult<()> {
        if group.owner_id == actor.effective_team_id() || group.owner_id == actor.id {
            Ok(())
        } else {
            Err(CoreError::Authorization("group belongs to another team".into()).into())
        }
    }

    async fn load_property(&self, property_id: Uuid) -> InventoryResult<Property> {
        self.store
            .property(property_id)
            .await?
            .ok_or_else(|| InventoryError::Core(CoreError::NotFound { entity: "property" }))
    }

    async fn load_group(&self, group_id: Uuid) -> InventoryResult<GroupWithMembers> {
        self.store
            .group(group_id)
            .await?
            .ok_or_else(|| InventoryError::Core(CoreError::NotFound { entity: "group" }))
    }

    /// Best-effort audit append; failures never surface to callers.
    async fn audit(
        &self,
        property_id: Uuid,
        actor: &Tenant,
        action: &str,
        changes: serde_json::Value,
    ) {
        if let Err(e) = self
            .store
            .append_property_log(property_id, actor.id, &actor.email, action, &changes)
            .await
        {
            warn!(property = %property_id, action, error = %e, "audit log write failed");
        }
    }

    // ------------------------------------------------------------------
    // Properties
    // ------------------------------------------------------------------

    pub async fn create_property(
        &self,
        user_id: Uuid,
        input: PropertyInput,
    ) -> InventoryResult<Property> {
        let actor = self.actor(user_id).await?;

        if input.capacity < 1 {
            return Err(CoreError::validation("capacity", "must be at least 1").into());
        }
        Property::validate_prices(input.floor_price, input.base_price, input.ceiling_price)
            .map_err(|message| CoreError::validation("price", message))?;

        let team_id = actor.effective_team_id();
        let current = self.store.count_properties_for_team(team_id).await?;
        check_trial_cap(actor.subscription_status, current, 1)?;

        let property = self
            .store
            .create_property(NewProperty {
                team_id,
                owner_id: actor.id,
                address: input.address,
                city: input.city,
                latitude: input.latitude,
                longitude: input.longitude,
                country: input.country,
                property_type: input.property_type,
                capacity: input.capacity,
                surface: input.surface,
                amenities: input.amenities,
                strategy: input.strategy,
                floor_price: input.floor_price,
                base_price: input.base_price,
                ceiling_price: input.ceiling_price,
                min_stay: input.min_stay,
                pms_id: None,
                pms_type: None,
            })
            .await?;

        self.audit(property.id, &actor, "create", json!({ "city": property.city }))
            .await;
        self.reconciler.reconcile_swallowing(actor.id).await;
        info!(property = %property.id, "property created");
        Ok(property)
    }

    /// Strategy and price-ladder change. For a PMS-linked property with sync
    /// on, the remote push happens first and a failure leaves local state
    /// untouched.
    pub async fn update_strategy(
        &self,
        user_id: Uuid,
        property_id: Uuid,
        strategy: Strategy,
        floor_price: Cents,
        base_price: Cents,
        ceiling_price: Option<Cents>,
    ) -> InventoryResult<Property> {
        let actor = self.actor(user_id).await?;
        let property = self.load_property(property_id).await?;
        self.authorize(&actor, &property)?;

        Property::validate_prices(floor_price, base_price, ceiling_price)
            .map_err(|message| CoreError::validation("price", message))?;

        let updated = self
            .gateway
            .update_strategy(&actor, &property, strategy, floor_price, base_price, ceiling_price)
            .await?;

        self.audit(
            property_id,
            &actor,
            "update:strategy",
            json!({
                "strategy": { "from": property.strategy, "to": strategy },
                "base_price": { "from": property.base_price, "to": base_price },
                "floor_price": { "from": property.floor_price, "to": floor_price },
                "ceiling_price": { "from": property.ceiling_price, "to": ceiling_price },
            }),
        )
        .await;
        Ok(updated)
    }

    /// Stay/discount rules change, same abort-on-remote-failure contract.
    pub async fn update_rules(
        &self,
        user_id: Uuid,
        property_id: Uuid,
        rules: PropertyRules,
    ) -> InventoryResult<Property> {
        let actor = self.actor(user_id).await?;
        let property = self.load_property(property_id).await?;
        self.authorize(&actor, &property)?;

        if let Some(min_stay) = rules.min_stay {
            if min_stay < 1 {
                return Err(CoreError::validation("min_stay", "must be at least 1").into());
            }
        }
        if let (Some(min), Some(max)) = (rules.min_stay, rules.max_stay) {
            if max < min {
                return Err(CoreError::validation("max_stay", "must be >= min_stay").into());
            }
        }

        let updated = self.gateway.update_rules(&actor, &property, &rules).await?;
        self.audit(property_id, &actor, "update:rules", json!({ "rules": rules }))
            .await;
        Ok(updated)
    }

    /// Status transitions, restricted to admins and managers.
    pub async fn set_property_status(
        &self,
        user_id: Uuid,
        property_id: Uuid,
        status: PropertyStatus,
    ) -> InventoryResult<Property> {
        let actor = self.actor(user_id).await?;
        let property = self.load_property(property_id).await?;
        self.authorize(&actor, &property)?;

        if !actor.role.can_manage() {
            return Err(
                CoreError::Authorization("status changes require admin or manager".into()).into(),
            );
        }
        if !property.status.can_transition_to(status) {
            return Err(CoreError::validation(
                "status",
                format!("cannot transition {} -> {}", property.status.as_str(), status.as_str()),
            )
            .into());
        }

        self.store.set_property_status(property_id, status).await?;
        self.audit(
            property_id,
            &actor,
            "update:status",
            json!({ "from": property.status, "to": status }),
        )
        .await;
        self.load_property(property_id).await
    }

    pub async fn delete_property(&self, user_id: Uuid, property_id: Uuid) -> InventoryResult<()> {
        let actor = self.actor(user_id).await?;
        let property = self.load_property(property_id).await?;
        self.authorize(&actor, &property)?;
        if !actor.role.can_manage() {
            return Err(
                CoreError::Authorization("deletion requires admin or manager".into()).into(),
            );
        }

        // Membership fixups before the row disappears.
        if let Some(grouped) = self.store.group_of_property(property_id).await? {
            self.detach_member(&grouped, property_id).await?;
        }

        self.store.delete_property(property_id).await?;
        self.audit(property_id, &actor, "delete", json!({ "address": property.address }))
            .await;
        self.reconciler.reconcile_swallowing(actor.id).await;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Groups
    // ------------------------------------------------------------------

    pub async fn create_group(
        &self,
        user_id: Uuid,
        name: &str,
        sync_prices: bool,
        member_ids: &[Uuid],
        main_property_id: Option<Uuid>,
    ) -> InventoryResult<GroupWithMembers> {
        let actor = self.actor(user_id).await?;
        if name.trim().is_empty() {
            return Err(CoreError::validation("name", "must not be empty").into());
        }
        if let Some(main) = main_property_id {
            if !member_ids.contains(&main) {
                return Err(
                    CoreError::validation("main_property_id", "must be one of the members").into(),
                );
            }
        }

        let group = self
            .store
            .create_group(actor.effective_team_id(), name, sync_prices)
            .await?;

        for property_id in member_ids {
            self.add_to_group_inner(&actor, group.id, *property_id).await?;
        }
        if main_property_id.is_some() {
            self.store
                .set_group_main_property(group.id, main_property_id)
                .await?;
        }

        self.reconciler.reconcile_swallowing(actor.id).await;
        self.load_group(group.id).await
    }

    pub async fn add_to_group(
        &self,
        user_id: Uuid,
        group_id: Uuid,
        property_id: Uuid,
    ) -> InventoryResult<GroupWithMembers> {
        let actor = self.actor(user_id).await?;
        self.add_to_group_inner(&actor, group_id, property_id).await?;
        self.reconciler.reconcile_swallowing(actor.id).await;
        self.load_group(group_id).await
    }

    async fn add_to_group_inner(
        &self,
        actor: &Tenant,
        group_id: Uuid,
        property_id: Uuid,
    ) -> InventoryResult<()> {
        let grouped = self.load_group(group_id).await?;
        self.authorize_group(actor, &grouped.group)?;
        let candidate = self.load_property(property_id).await?;
        self.authorize(actor, &candidate)?;

        if self.store.group_of_property(property_id).await?.is_some() {
            return Err(
                CoreError::Conflict("property already belongs to a group".into()).into(),
            );
        }

        // Coherence against the template, when the group already has one.
        let members = self.member_properties(&grouped).await?;
        if let Some(template) = group_template(&grouped, &members) {
            validate_member(&candidate, template)?;
        }

        self.store.add_group_member(group_id, property_id).await?;
        self.audit(
            property_id,
            actor,
            "group:add",
            json!({ "group_id": group_id, "group_name": grouped.group.name }),
        )
        .await;
        Ok(())
    }

    pub async fn remove_from_group(
        &self,
        user_id: Uuid,
        group_id: Uuid,
        property_id: Uuid,
    ) -> InventoryResult<GroupWithMembers> {
        let actor = self.actor(user_id).await?;
        let grouped = self.load_group(group_id).await?;
        self.authorize_group(&actor, &grouped.group)?;
        if !grouped.members.contains(&property_id) {
            return Err(InventoryError::Core(CoreError::NotFound { entity: "group member" }));
        }

        self.detach_member(&grouped, property_id).await?;
        self.audit(
            property_id,
            &actor,
            "group:remove",
            json!({ "group_id": group_id }),
        )
        .await;
        self.reconciler.reconcile_swallowing(actor.id).await;
        self.load_group(group_id).await
    }

    /// Remove a member, repointing `main_property_id` at the first surviving
    /// member so the main always stays inside the group.
    async fn detach_member(
        &self,
        grouped: &GroupWithMembers,
        property_id: Uuid,
    ) -> InventoryResult<()> {
        self.store
            .remove_group_member(grouped.group.id, property_id)
            .await?;
        if grouped.group.main_property_id == Some(property_id) {
            let next_main = grouped
                .members
                .iter()
                .find(|id| **id != property_id)
                .copied();
            self.store
                .set_group_main_property(grouped.group.id, next_main)
                .await?;
        }
        Ok(())
    }

    pub async fn set_group_main(
        &self,
        user_id: Uuid,
        group_id: Uuid,
        property_id: Uuid,
    ) -> InventoryResult<GroupWithMembers> {
        let actor = self.actor(user_id).await?;
        let grouped = self.load_group(group_id).await?;
        self.authorize_group(&actor, &grouped.group)?;
        if !grouped.members.contains(&property_id) {
            return Err(
                CoreError::validation("main_property_id", "must be one of the members").into(),
            );
        }
        self.store
            .set_group_main_property(group_id, Some(property_id))
            .await?;
        self.reconciler.reconcile_swallowing(actor.id).await;
        self.load_group(group_id).await
    }

    pub async fn set_group_sync(
        &self,
        user_id: Uuid,
        group_id: Uuid,
        sync_prices: bool,
    ) -> InventoryResult<GroupWithMembers> {
        let actor = self.actor(user_id).await?;
        let grouped = self.load_group(group_id).await?;
        self.authorize_group(&actor, &grouped.group)?;
        self.store.set_group_sync_prices(group_id, sync_prices).await?;
        self.load_group(group_id).await
    }

    pub async fn delete_group(&self, user_id: Uuid, group_id: Uuid) -> InventoryResult<()> {
        let actor = self.actor(user_id).await?;
        let grouped = self.load_group(group_id).await?;
        self.authorize_group(&actor, &grouped.group)?;
        if !actor.role.can_manage() {
            return Err(
                CoreError::Authorization("group deletion requires admin or manager".into()).into(),
            );
        }
        self.store.delete_group(group_id).await?;
        self.reconciler.reconcile_swallowing(actor.id).await;
        Ok(())
    }

    async fn member_properties(
        &self,
        grouped: &GroupWithMembers,
    ) -> InventoryResult<Vec<Property>> {
        let mut members = Vec::with_capacity(grouped.members.len());
        for id in &grouped.members {
            if let Some(property) = self.store.property(*id).await? {
                members.push(property);
            }
        }
        Ok(members)
    }

    // ------------------------------------------------------------------
    // Integrations & import
    // ------------------------------------------------------------------

    /// Connect a PMS: the credentials must pass a live connection test
    /// before they are persisted.
    pub async fn connect_integration(
        &self,
        user_id: Uuid,
        kind: PmsKind,
        credentials: serde_json::Value,
    ) -> InventoryResult<Integration> {
        let actor = self.actor(user_id).await?;
        let adapter = self.registry.resolve(kind, &credentials)?;
        adapter.test_connection().await?;
        let integration = self
            .store
            .upsert_integration(actor.id, kind, &credentials)
            .await?;
        info!(user = %actor.id, %kind, "integration connected");
        Ok(integration)
    }

    pub async fn disconnect_integration(
        &self,
        user_id: Uuid,
        kind: PmsKind,
    ) -> InventoryResult<()> {
        let actor = self.actor(user_id).await?;
        self.store.delete_integration(actor.id, kind).await?;
        info!(user = %actor.id, %kind, "integration disconnected");
        Ok(())
    }

    /// Import remote properties. Trialing tenants are capped at the trial
    /// limit (counting only genuinely new listings) and cannot reuse a
    /// listing id another account already consumed a trial with.
    pub async fn import_from_pms(
        &self,
        user_id: Uuid,
        kind: PmsKind,
    ) -> InventoryResult<ImportSummary> {
        let actor = self.actor(user_id).await?;
        let team_id = actor.effective_team_id();

        let remote = self.gateway.list_remote_properties(actor.id, kind).await?;
        let mut summary = ImportSummary::default();
        let mut new_listings = Vec::new();
        for listing in remote {
            if self
                .store
                .property_by_pms_id(team_id, &listing.pms_id)
                .await?
                .is_some()
            {
                summary.skipped_existing += 1;
            } else {
                new_listings.push(listing);
            }
        }

        let current = self.store.count_properties_for_team(team_id).await?;
        check_trial_cap(actor.subscription_status, current, new_listings.len() as u32)?;

        for listing in new_listings {
            if actor.subscription_status.is_trialing()
                && self
                    .store
                    .listing_id_used_by_other(&listing.pms_id, actor.id)
                    .await?
            {
                warn!(listing = %listing.pms_id, "listing already consumed a trial elsewhere");
                summary.skipped_used += 1;
                continue;
            }

            let property = self
                .store
                .create_property(NewProperty {
                    team_id,
                    owner_id: actor.id,
                    address: listing.name.clone(),
                    city: listing.location.clone().unwrap_or_default(),
                    latitude: None,
                    longitude: None,
                    country: String::new(),
                    property_type: "appartement".into(),
                    capacity: listing.capacity.unwrap_or(IMPORT_DEFAULT_CAPACITY),
                    surface: 0.0,
                    amenities: Vec::new(),
                    strategy: Strategy::default(),
                    floor_price: IMPORT_DEFAULT_FLOOR_PRICE,
                    base_price: IMPORT_DEFAULT_BASE_PRICE,
                    ceiling_price: None,
                    min_stay: 1,
                    pms_id: Some(listing.pms_id.clone()),
                    pms_type: Some(kind),
                })
                .await?;
            self.audit(
                property.id,
                &actor,
                "import",
                json!({ "source": kind.as_str(), "pms_id": listing.pms_id }),
            )
            .await;
            summary.imported += 1;
        }

        self.store.touch_integration_sync(actor.id, kind).await?;
        self.reconciler.reconcile_swallowing(actor.id).await;
        info!(
            user = %actor.id,
            imported = summary.imported,
            skipped_existing = summary.skipped_existing,
            skipped_used = summary.skipped_used,
            "pms import finished"
        );
        Ok(summary)
    }

    // ------------------------------------------------------------------
    // Reservations
    // ------------------------------------------------------------------

    pub async fn create_reservation(
        &self,
        user_id: Uuid,
        property_id: Uuid,
        input: BookingInput,
    ) -> InventoryResult<(Booking, Option<String>)> {
        let actor = self.actor(user_id).await?;
        let property = self.load_property(property_id).await?;
        self.authorize(&actor, &property)?;
        validate_booking_dates(input.start_date, input.end_date)?;

        let (booking, remote_warning) = self
            .gateway
            .create_reservation(
                &actor,
                &property,
                NewBooking {
                    property_id,
                    start_date: input.start_date,
                    end_date: input.end_date,
                    price_per_night: input.price_per_night,
                    revenue: input.revenue,
                    channel: input.channel,
                    guest_name: input.guest_name,
                    status: input.status,
                    pms_booking_id: None,
                    pricing_method: stayrate_core::PricingMethod::Manuelle,
                },
            )
            .await?;

        self.audit(
            property_id,
            &actor,
            "booking:create",
            json!({ "booking_id": booking.id, "remote_failure": remote_warning }),
        )
        .await;
        Ok((booking, remote_warning))
    }

    pub async fn update_reservation(
        &self,
        user_id: Uuid,
        booking_id: Uuid,
        input: BookingInput,
    ) -> InventoryResult<(Booking, Option<String>)> {
        let actor = self.actor(user_id).await?;
        let mut booking = self
            .store
            .booking(booking_id)
            .await?
            .ok_or_else(|| InventoryError::Core(CoreError::NotFound { entity: "booking" }))?;
        let property = self.load_property(booking.property_id).await?;
        self.authorize(&actor, &property)?;
        validate_booking_dates(input.start_date, input.end_date)?;

        booking.start_date = input.start_date;
        booking.end_date = input.end_date;
        booking.price_per_night = input.price_per_night;
        booking.revenue = input.revenue;
        booking.channel = input.channel;
        booking.guest_name = input.guest_name;
        booking.status = input.status;

        let remote_warning = self
            .gateway
            .update_reservation(&actor, &property, &booking)
            .await?;
        self.audit(
            property.id,
            &actor,
            "booking:update",
            json!({ "booking_id": booking.id, "remote_failure": remote_warning }),
        )
        .await;
        Ok((booking, remote_warning))
    }

    pub async fn delete_reservation(
        &self,
        user_id: Uuid,
        booking_id: Uuid,
    ) -> InventoryResult<Option<String>> {
        let actor = self.actor(user_id).await?;
        let booking = self
            .store
            .booking(booking_id)
            .await?
            .ok_or_else(|| InventoryError::Core(CoreError::NotFound { entity: "booking" }))?;
        let property = self.load_property(booking.property_id).await?;
        self.authorize(&actor, &property)?;

        let remote_warning = self
            .gateway
            .delete_reservation(&actor, &property, &booking)
            .await?;
        self.audit(
            property.id,
            &actor,
            "booking:delete",
            json!({ "booking_id": booking.id, "remote_failure": remote_warning }),
        )
        .await;
        Ok(remote_warning)
    }

    /// Pull remote reservations for a property into the local mirror.
    pub async fn sync_reservations(
        &self,
        user_id: Uuid,
        property_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> InventoryResult<ReservationSync> {
        let actor = self.actor(user_id).await?;
        let property = self.load_property(property_id).await?;
        self.authorize(&actor, &property)?;

        let summary = self.gateway.sync_reservations(&property, from, to).await?;
        self.audit(
            property_id,
            &actor,
            "booking:sync",
            json!({ "created": summary.created, "updated": summary.updated }),
        )
        .await;
        Ok(summary)
    }

    // ------------------------------------------------------------------
    // Tenant-level operations
    // ------------------------------------------------------------------

    /// Upsert a monthly revenue target (`YYYY-MM`).
    pub async fn set_revenue_target(
        &self,
        user_id: Uuid,
        month: &str,
        amount: Cents,
    ) -> InventoryResult<()> {
        let actor = self.actor(user_id).await?;
        if !is_valid_month_key(month) {
            return Err(CoreError::validation("month", "expected YYYY-MM").into());
        }
        if amount < 0 {
            return Err(CoreError::validation("amount", "must be >= 0").into());
        }
        self.store.set_revenue_target(actor.id, month, amount).await?;
        Ok(())
    }

    /// Audit history for a property.
    pub async fn property_history(
        &self,
        user_id: Uuid,
        property_id: Uuid,
    ) -> InventoryResult<Vec<PropertyLog>> {
        let actor = self.actor(user_id).await?;
        let property = self.load_property(property_id).await?;
        self.authorize(&actor, &property)?;
        Ok(self.store.property_logs(property_id).await?)
    }

    /// End the trial early and bill the true quantities immediately.
    /// Admin-only: this is a destructive team-level operation.
    pub async fn end_trial_now(&self, user_id: Uuid) -> InventoryResult<()> {
        let actor = self.actor(user_id).await?;
        if actor.role != stayrate_core::Role::Admin {
            return Err(
                CoreError::Authorization("ending the trial requires admin".into()).into(),
            );
        }
        self.reconciler.end_trial_and_bill_now(actor.id).await?;
        Ok(())
    }
}

fn validate_booking_dates(start: NaiveDate, end: NaiveDate) -> Result<(), CoreError> {
    if start >= end {
        return Err(CoreError::validation(
            "end_date",
            "must be after start_date",
        ));
    }
    Ok(())
}

fn is_valid_month_key(month: &str) -> bool {
    let bytes = month.as_bytes();
    if bytes.len() != 7 || bytes[4] != b'-' {
        return false;
    }
    let (year, rest) = month.split_at(4);
    let mm = &rest[1..];
    year.chars().all(|c| c.is_ascii_digit())
        && mm.chars().all(|c| c.is_ascii_digit())
        && matches!(mm.parse::<u32>(), Ok(1..=12))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn booking_dates_must_be_ordered() {
        assert!(validate_booking_dates(d("2025-07-01"), d("2025-07-05")).is_ok());
        assert!(validate_booking_dates(d("2025-07-05"), d("2025-07-05")).is_err());
        assert!(validate_booking_dates(d("2025-07-06"), d("2025-07-05")).is_err());
    }

    #[test]
    fn month_key_validation() {
        assert!(is_valid_month_key("2025-07"));
        assert!(is_valid_month_key("2025-12"));
        assert!(!is_valid_month_key("2025-13"));
        assert!(!is_valid_month_key("2025-00"));
        assert!(!is_valid_month_key("2025/07"));
        assert!(!is_valid_month_key("25-07"));
        assert!(!is_valid_month_key("juillet"));
    }
}
