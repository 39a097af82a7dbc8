//! Minimal Stripe v1 client covering what reconciliation needs:
//! subscriptions with their items, item quantity updates, one-off invoice
//! items, invoice creation/finalization, and early trial end.
//!
//! The v1 API is form-encoded on the way in and JSON on the way out.

use crate::{BillingError, BillingResult};
use serde::Deserialize;
use std::time::Duration;
use stayrate_core::Cents;
use tracing::debug;

const BASE_URL: &str = "https://api.stripe.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Subscription as reconciliation sees it.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeSubscription {
    pub id: String,
    pub status: String,
    pub customer: String,
    pub trial_end: Option<i64>,
    #[serde(deserialize_with = "items_from_list")]
    pub items: Vec<StripeSubscriptionItem>,
}

/// One line item on a subscription.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeSubscriptionItem {
    pub id: String,
    #[serde(rename = "price", deserialize_with = "price_id_from_object")]
    pub price_id: String,
    #[serde(default)]
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
struct ItemList {
    data: Vec<StripeSubscriptionItem>,
}

fn items_from_list<'de, D>(deserializer: D) -> Result<Vec<StripeSubscriptionItem>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(ItemList::deserialize(deserializer)?.data)
}

#[derive(Debug, Deserialize)]
struct PriceObject {
    id: String,
}

fn price_id_from_object<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(PriceObject::deserialize(deserializer)?.id)
}

impl StripeSubscription {
    pub fn item_for_price(&self, price_id: &str) -> Option<&StripeSubscriptionItem> {
        self.items.iter().find(|item| item.price_id == price_id)
    }

    /// Quantity billed for a price; absent item reads as zero.
    pub fn quantity_for_price(&self, price_id: &str) -> u32 {
        self.item_for_price(price_id).map(|i| i.quantity).unwrap_or(0)
    }

    pub fn is_trialing(&self) -> bool {
        self.status == "trialing"
    }
}

#[derive(Debug, Deserialize)]
struct InvoiceObject {
    id: String,
}

/// Stripe API client.
#[derive(Clone)]
pub struct StripeClient {
    client: reqwest::Client,
    secret_key: String,
    base_url: String,
}

impl StripeClient {
    pub fn new(secret_key: &str) -> BillingResult<Self> {
        Self::with_base_url(secret_key, BASE_URL)
    }

    pub fn with_base_url(secret_key: &str, base_url: &str) -> BillingResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| BillingError::Provider { reason: e.to_string() })?;
        Ok(Self {
            client,
            secret_key: secret_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn check(response: reqwest::Response) -> BillingResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status.as_u16() == 401 {
            return Err(BillingError::Auth);
        }
        let body = response.text().await.unwrap_or_default();
        Err(BillingError::Provider {
            reason: format!("{status}: {body}"),
        })
    }

    async fn get(&self, path: &str) -> BillingResult<reqwest::Response> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .basic_auth(&self.secret_key, None::<&str>)
            .send()
            .await
            .map_err(|e| BillingError::Provider { reason: e.to_string() })?;
        Self::check(response).await
    }

    async fn post(&self, path: &str, form: &[(&str, String)]) -> BillingResult<reqwest::Response> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(form)
            .send()
            .await
            .map_err(|e| BillingError::Provider { reason: e.to_string() })?;
        Self::check(response).await
    }

    pub async fn subscription(&self, subscription_id: &str) -> BillingResult<StripeSubscription> {
        self.get(&format!("/v1/subscriptions/{subscription_id}"))
            .await?
            .json()
            .await
            .map_err(|e| BillingError::Payload(e.to_string()))
    }

    /// Set an existing item's quantity for the next period, no proration.
    pub async fn set_item_quantity(&self, item_id: &str, quantity: u32) -> BillingResult<()> {
        debug!(item_id, quantity, "updating subscription item quantity");
        self.post(
            &format!("/v1/subscription_items/{item_id}"),
            &[
                ("quantity", quantity.to_string()),
                ("proration_behavior", "none".to_string()),
            ],
        )
        .await?;
        Ok(())
    }

    /// Add a price to the subscription with an initial quantity.
    pub async fn create_subscription_item(
        &self,
        subscription_id: &str,
        price_id: &str,
        quantity: u32,
    ) -> BillingResult<()> {
        self.post(
            "/v1/subscription_items",
            &[
                ("subscription", subscription_id.to_string()),
                ("price", price_id.to_string()),
                ("quantity", quantity.to_string()),
                ("proration_behavior", "none".to_string()),
            ],
        )
        .await?;
        Ok(())
    }

    /// One-off charge added to the customer's next invoice.
    pub async fn create_invoice_item(
        &self,
        customer_id: &str,
        amount: Cents,
        currency: &str,
        description: &str,
    ) -> BillingResult<()> {
        self.post(
            "/v1/invoiceitems",
            &[
                ("customer", customer_id.to_string()),
                ("amount", amount.to_string()),
                ("currency", currency.to_lowercase()),
                ("description", description.to_string()),
            ],
        )
        .await?;
        Ok(())
    }

    /// Create an invoice collecting pending invoice items.
    pub async fn create_invoice(&self, customer_id: &str) -> BillingResult<String> {
        let invoice: InvoiceObject = self
            .post(
                "/v1/invoices",
                &[
                    ("customer", customer_id.to_string()),
                    ("auto_advance", "true".to_string()),
                ],
            )
            .await?
            .json()
            .await
            .map_err(|e| BillingError::Payload(e.to_string()))?;
        Ok(invoice.id)
    }

    pub async fn finalize_invoice(&self, invoice_id: &str) -> BillingResult<()> {
        self.post(&format!("/v1/invoices/{invoice_id}/finalize"), &[])
            .await?;
        Ok(())
    }

    /// End the trial now, prorating the remainder of the period.
    pub async fn end_trial_now(&self, subscription_id: &str) -> BillingResult<()> {
        self.post(
            &format!("/v1/subscriptions/{subscription_id}"),
            &[
                ("trial_end", "now".to_string()),
                ("proration_behavior", "create_prorations".to_string()),
            ],
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subscription_fixture() -> StripeSubscription {
        serde_json::from_value(serde_json::json!({
            "id": "sub_123",
            "status": "active",
            "customer": "cus_123",
            "trial_end": null,
            "items": {
                "object": "list",
                "data": [
                    { "id": "si_parent", "price": { "id": "price_parent" }, "quantity": 5 },
                    { "id": "si_child", "price": { "id": "price_child" }, "quantity": 2 }
                ]
            }
        }))
        .unwrap()
    }

    #[test]
    fn parses_subscription_with_item_list() {
        let sub = subscription_fixture();
        assert_eq!(sub.items.len(), 2);
        assert_eq!(sub.quantity_for_price("price_parent"), 5);
        assert_eq!(sub.quantity_for_price("price_child"), 2);
    }

    #[test]
    fn absent_price_reads_as_zero_quantity() {
        let sub = subscription_fixture();
        assert_eq!(sub.quantity_for_price("price_other"), 0);
        assert!(sub.item_for_price("price_other").is_none());
    }

    #[test]
    fn trialing_status_detection() {
        let mut sub = subscription_fixture();
        assert!(!sub.is_trialing());
        sub.status = "trialing".into();
        assert!(sub.is_trialing());
    }
}
