//! Payment provider webhook handling.
//!
//! Five event types gate tenant access and PMS sync. Handling is idempotent
//! per provider event id (durable claim in the store) and fast: the only
//! heavy side effect, listing-id registration, is deferred to a spawned
//! task.

use crate::{BillingError, BillingResult};
use serde::Deserialize;
use stayrate_core::SubscriptionStatus;
use stayrate_store::{Store, Tenant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Normalized payment events the handler consumes.
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentEvent {
    /// Checkout finished: persist provider ids, restore access, enable sync.
    SessionCompleted {
        tenant_ref: Option<Uuid>,
        customer_id: String,
        subscription_id: String,
        status: SubscriptionStatus,
    },
    /// Invoice payment failed.
    PaymentFailed { customer_id: String },
    /// Invoice payment recovered.
    PaymentSucceeded { customer_id: String },
    /// Subscription status changed upstream.
    SubscriptionUpdated {
        customer_id: String,
        status: SubscriptionStatus,
    },
    /// Subscription gone.
    SubscriptionDeleted { customer_id: String },
}

/// A provider event with its idempotency id.
#[derive(Debug, Clone)]
pub struct ParsedEvent {
    pub id: String,
    pub event_type: String,
    pub event: PaymentEvent,
}

/// What handling did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    Processed,
    /// Same event id seen before; state untouched.
    AlreadyProcessed,
    /// Event references no known tenant; acknowledged and dropped.
    UnknownTenant,
}

/// Provider status strings we mirror; anything else reads as active.
pub fn map_provider_status(raw: &str) -> SubscriptionStatus {
    match raw {
        "trialing" => SubscriptionStatus::Trialing,
        "past_due" => SubscriptionStatus::PastDue,
        "canceled" | "incomplete_expired" => SubscriptionStatus::Canceled,
        _ => SubscriptionStatus::Active,
    }
}

#[derive(Debug, Deserialize)]
struct EventEnvelope {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    data: EventData,
}

#[derive(Debug, Deserialize)]
struct EventData {
    object: serde_json::Value,
}

fn str_field(object: &serde_json::Value, field: &str) -> Option<String> {
    object.get(field).and_then(|v| v.as_str()).map(String::from)
}

/// Parse a raw provider event. `Ok(None)` for event types we do not consume.
pub fn parse_event(raw: &serde_json::Value) -> BillingResult<Option<ParsedEvent>> {
    let envelope: EventEnvelope = serde_json::from_value(raw.clone())
        .map_err(|e| BillingError::Payload(format!("event envelope: {e}")))?;
    let object = &envelope.data.object;

    let event = match envelope.event_type.as_str() {
        "checkout.session.completed" => {
            let customer_id = str_field(object, "customer")
                .ok_or_else(|| BillingError::Payload("session without customer".into()))?;
            let subscription_id = str_field(object, "subscription")
                .ok_or_else(|| BillingError::Payload("session without subscription".into()))?;
            let tenant_ref = str_field(object, "client_reference_id")
                .and_then(|raw| raw.parse::<Uuid>().ok());
            PaymentEvent::SessionCompleted {
                tenant_ref,
                customer_id,
                subscription_id,
                status: SubscriptionStatus::Trialing,
            }
        }
        "invoice.payment_failed" => PaymentEvent::PaymentFailed {
            customer_id: str_field(object, "customer")
                .ok_or_else(|| BillingError::Payload("invoice without customer".into()))?,
        },
        "invoice.payment_succeeded" => PaymentEvent::PaymentSucceeded {
            customer_id: str_field(object, "customer")
                .ok_or_else(|| BillingError::Payload("invoice without customer".into()))?,
        },
        "customer.subscription.updated" => PaymentEvent::SubscriptionUpdated {
            customer_id: str_field(object, "customer")
                .ok_or_else(|| BillingError::Payload("subscription without customer".into()))?,
            status: map_provider_status(
                str_field(object, "status").unwrap_or_default().as_str(),
            ),
        },
        "customer.subscription.deleted" => PaymentEvent::SubscriptionDeleted {
            customer_id: str_field(object, "customer")
                .ok_or_else(|| BillingError::Payload("subscription without customer".into()))?,
        },
        _ => return Ok(None),
    };

    Ok(Some(ParsedEvent {
        id: envelope.id,
        event_type: envelope.event_type,
        event,
    }))
}

/// Applies payment events to tenant state.
#[derive(Clone)]
pub struct WebhookHandler {
    store: Store,
}

impl WebhookHandler {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Handle one event. Replays of the same event id are no-ops.
    pub async fn handle(&self, parsed: &ParsedEvent) -> BillingResult<WebhookOutcome> {
        if !self
            .store
            .claim_webhook_event(&parsed.id, &parsed.event_type)
            .await?
        {
            debug!(event = %parsed.id, "webhook replay ignored");
            return Ok(WebhookOutcome::AlreadyProcessed);
        }

        match &parsed.event {
            PaymentEvent::SessionCompleted {
                tenant_ref,
                customer_id,
                subscription_id,
                status,
            } => {
                let tenant = match self.tenant_by_ref(*tenant_ref, customer_id).await? {
                    Some(tenant) => tenant,
                    None => return Ok(WebhookOutcome::UnknownTenant),
                };
                self.store
                    .attach_subscription(tenant.id, customer_id, subscription_id, *status)
                    .await?;
                self.store.set_access(tenant.id, false, false).await?;
                self.store.set_pms_sync(tenant.id, true, None).await?;

                // Deferred: listing-id registration can outlive the response.
                let store = self.store.clone();
                let tenant_id = tenant.id;
                tokio::spawn(async move {
                    register_tenant_listing_ids(store, tenant_id).await;
                });

                info!(tenant = %tenant.id, "checkout completed, access restored");
            }
            PaymentEvent::PaymentFailed { customer_id } => {
                let tenant = match self.store.tenant_by_customer_id(customer_id).await? {
                    Some(tenant) => tenant,
                    None => return Ok(WebhookOutcome::UnknownTenant),
                };
                if tenant.subscription_status.is_trialing() {
                    // Still trialing: flag only, access stays.
                    self.store.set_payment_failed(tenant.id, true).await?;
                    warn!(tenant = %tenant.id, "payment failed during trial");
                } else {
                    self.store
                        .set_subscription_status(tenant.id, SubscriptionStatus::PastDue)
                        .await?;
                    self.store.set_access(tenant.id, true, true).await?;
                    self.store
                        .set_pms_sync(tenant.id, false, Some("payment_failed"))
                        .await?;
                    warn!(tenant = %tenant.id, "payment failed, access disabled");
                }
            }
            PaymentEvent::PaymentSucceeded { customer_id } => {
                let tenant = match self.store.tenant_by_customer_id(customer_id).await? {
                    Some(tenant) => tenant,
                    None => return Ok(WebhookOutcome::UnknownTenant),
                };
                self.store
                    .set_subscription_status(tenant.id, SubscriptionStatus::Active)
                    .await?;
                self.store.set_access(tenant.id, false, false).await?;
                self.store.set_payment_failed(tenant.id, false).await?;
                info!(tenant = %tenant.id, "payment succeeded, access restored");
            }
            PaymentEvent::SubscriptionUpdated {
                customer_id,
                status,
            } => {
                let tenant = match self.store.tenant_by_customer_id(customer_id).await? {
                    Some(tenant) => tenant,
                    None => return Ok(WebhookOutcome::UnknownTenant),
                };
                self.store.set_subscription_status(tenant.id, *status).await?;
            }
            PaymentEvent::SubscriptionDeleted { customer_id } => {
                let tenant = match self.store.tenant_by_customer_id(customer_id).await? {
                    Some(tenant) => tenant,
                    None => return Ok(WebhookOutcome::UnknownTenant),
                };
                self.store
                    .set_subscription_status(tenant.id, SubscriptionStatus::Canceled)
                    .await?;
                self.store.set_access(tenant.id, true, true).await?;
                info!(tenant = %tenant.id, "subscription deleted, access disabled");
            }
        }

        Ok(WebhookOutcome::Processed)
    }

    async fn tenant_by_ref(
        &self,
        tenant_ref: Option<Uuid>,
        customer_id: &str,
    ) -> BillingResult<Option<Tenant>> {
        if let Some(tenant_id) = tenant_ref {
            if let Some(tenant) = self.store.tenant(tenant_id).await? {
                return Ok(Some(tenant));
            }
        }
        Ok(self.store.tenant_by_customer_id(customer_id).await?)
    }
}

/// Register every PMS listing id the tenant owns into the global guard.
/// Duplicates are swallowed by the store.
async fn register_tenant_listing_ids(store: Store, tenant_id: Uuid) {
    let tenant = match store.tenant(tenant_id).await {
        Ok(Some(tenant)) => tenant,
        Ok(None) => return,
        Err(e) => {
            error!(%tenant_id, error = %e, "listing-id registration: tenant load failed");
            return;
        }
    };
    let properties = match store.properties_for_team(tenant.effective_team_id()).await {
        Ok(properties) => properties,
        Err(e) => {
            error!(%tenant_id, error = %e, "listing-id registration: property load failed");
            return;
        }
    };
    for property in properties {
        if let (Some(pms_id), Some(kind)) = (&property.pms_id, property.pms_type) {
            if let Err(e) = store
                .register_used_listing_id(pms_id, tenant_id, kind.as_str())
                .await
            {
                error!(%tenant_id, pms_id, error = %e, "listing-id registration failed");
            }
        }
    }
    debug!(%tenant_id, "listing ids registered");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_checkout_session_completed() {
        let tenant_id = Uuid::new_v4();
        let raw = serde_json::json!({
            "id": "evt_1",
            "type": "checkout.session.completed",
            "data": { "object": {
                "customer": "cus_9",
                "subscription": "sub_9",
                "client_reference_id": tenant_id.to_string(),
            }}
        });
        let parsed = parse_event(&raw).unwrap().unwrap();
        assert_eq!(parsed.id, "evt_1");
        match parsed.event {
            PaymentEvent::SessionCompleted {
                tenant_ref,
                customer_id,
                subscription_id,
                ..
            } => {
                assert_eq!(tenant_ref, Some(tenant_id));
                assert_eq!(customer_id, "cus_9");
                assert_eq!(subscription_id, "sub_9");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn parses_subscription_updated_status() {
        let raw = serde_json::json!({
            "id": "evt_2",
            "type": "customer.subscription.updated",
            "data": { "object": { "customer": "cus_9", "status": "past_due" }}
        });
        let parsed = parse_event(&raw).unwrap().unwrap();
        assert_eq!(
            parsed.event,
            PaymentEvent::SubscriptionUpdated {
                customer_id: "cus_9".into(),
                status: SubscriptionStatus::PastDue,
            }
        );
    }

    #[test]
    fn unknown_event_types_are_ignored() {
        let raw = serde_json::json!({
            "id": "evt_3",
            "type": "charge.refunded",
            "data": { "object": {} }
        });
        assert!(parse_event(&raw).unwrap().is_none());
    }

    #[test]
    fn malformed_envelope_is_a_payload_error() {
        let raw = serde_json::json!({ "type": "invoice.payment_failed" });
        assert!(matches!(
            parse_event(&raw),
            Err(BillingError::Payload(_))
        ));
    }

    #[test]
    fn provider_status_mapping() {
        assert_eq!(map_provider_status("trialing"), SubscriptionStatus::Trialing);
        assert_eq!(map_provider_status("past_due"), SubscriptionStatus::PastDue);
        assert_eq!(map_provider_status("canceled"), SubscriptionStatus::Canceled);
        assert_eq!(map_provider_status("active"), SubscriptionStatus::Active);
        assert_eq!(map_provider_status("anything"), SubscriptionStatus::Active);
    }
}
