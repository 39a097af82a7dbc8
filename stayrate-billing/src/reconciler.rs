//! Post-mutation billing reconciliation.
//!
//! Quantity updates always apply to the next period (`proration_behavior =
//! none`); mid-cycle increases are charged through one-off invoice items at
//! the marginal tier prices. Decreases never credit. Reconciliation failures
//! are the caller's to swallow: the originating mutation stands either way.

use crate::quantities::{compute_quantities, Quantities};
use crate::stripe::{StripeClient, StripeSubscription};
use crate::tiers::{child_total, tiered_parent_total, TRIAL_PROPERTY_LIMIT};
use crate::{BillingError, BillingResult};
use stayrate_core::{BusinessRuleViolation, Cents, StripeConfig, SubscriptionStatus};
use stayrate_store::Store;
use tracing::{debug, error, info};
use uuid::Uuid;

/// One-off amounts owed for a mid-cycle quantity increase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProrationDeltas {
    /// Tier-schedule difference for parent units; only positive values bill.
    pub parent_amount: Cents,
    /// Flat-rate amount for added child units.
    pub child_amount: Cents,
}

/// Signed tier-total delta for parents, flat delta for children. Decreases
/// produce zero amounts, never credits.
pub fn proration_deltas(old: Quantities, new: Quantities) -> ProrationDeltas {
    let parent_amount =
        (tiered_parent_total(new.parent) - tiered_parent_total(old.parent)).max(0);
    let child_amount = child_total(new.child.saturating_sub(old.child));
    ProrationDeltas {
        parent_amount,
        child_amount,
    }
}

/// Reject a create/import that would push a trialing tenant past the
/// property cap. `attempted` is how many properties the operation adds.
pub fn check_trial_cap(
    status: SubscriptionStatus,
    current_count: u32,
    attempted: u32,
) -> Result<(), BillingError> {
    if !status.is_trialing() {
        return Ok(());
    }
    if current_count + attempted <= TRIAL_PROPERTY_LIMIT {
        return Ok(());
    }
    Err(BillingError::Rule(BusinessRuleViolation::LimitExceeded {
        current_count,
        max_allowed: TRIAL_PROPERTY_LIMIT,
        requires_payment: true,
        attempted_import: (attempted > 1).then_some(attempted),
    }))
}

/// Reconciles subscription state after inventory mutations.
#[derive(Clone)]
pub struct BillingReconciler {
    store: Store,
    stripe: StripeClient,
    config: StripeConfig,
}

impl BillingReconciler {
    pub fn new(store: Store, stripe: StripeClient, config: StripeConfig) -> Self {
        Self {
            store,
            stripe,
            config,
        }
    }

    /// Recompute quantities and bring the subscription in line. Returns the
    /// new quantities for observability.
    pub async fn reconcile(&self, tenant_id: Uuid) -> BillingResult<Quantities> {
        let tenant = match self.store.tenant(tenant_id).await? {
            Some(tenant) => tenant,
            None => {
                debug!(%tenant_id, "reconcile skipped: tenant missing");
                return Ok(Quantities::default());
            }
        };
        let subscription_id = match &tenant.subscription_id {
            Some(id) => id.clone(),
            None => {
                debug!(%tenant_id, "reconcile skipped: no subscription");
                return Ok(Quantities::default());
            }
        };

        let team_id = tenant.effective_team_id();
        let properties = self.store.properties_for_team(team_id).await?;
        let groups = self.store.groups_for_owner(team_id).await?;
        let new = compute_quantities(&properties, &groups);

        let subscription = self.stripe.subscription(&subscription_id).await?;
        let old = Quantities {
            parent: subscription.quantity_for_price(&self.config.price_parent_id),
            child: subscription.quantity_for_price(&self.config.price_child_id),
        };

        self.apply_quantities(&subscription, new).await?;

        if subscription.is_trialing() {
            // Trial adjusts quantities only; billing starts at conversion.
            info!(%tenant_id, parent = new.parent, child = new.child, "trial quantities adjusted");
            return Ok(new);
        }

        let deltas = proration_deltas(old, new);
        if deltas.parent_amount > 0 {
            self.stripe
                .create_invoice_item(
                    &subscription.customer,
                    deltas.parent_amount,
                    &tenant.currency,
                    "Mid-cycle upgrade — parent units",
                )
                .await?;
        }
        if deltas.child_amount > 0 {
            self.stripe
                .create_invoice_item(
                    &subscription.customer,
                    deltas.child_amount,
                    &tenant.currency,
                    "Mid-cycle upgrade — child units",
                )
                .await?;
        }

        info!(
            %tenant_id,
            old_parent = old.parent,
            old_child = old.child,
            parent = new.parent,
            child = new.child,
            proration_parent = deltas.parent_amount,
            proration_child = deltas.child_amount,
            "subscription reconciled"
        );
        Ok(new)
    }

    /// Reconcile, logging and swallowing failures; the originating
    /// inventory mutation must stand regardless.
    pub async fn reconcile_swallowing(&self, tenant_id: Uuid) {
        if let Err(e) = self.reconcile(tenant_id).await {
            error!(%tenant_id, error = %e, "billing reconciliation failed (mutation kept)");
        }
    }

    async fn apply_quantities(
        &self,
        subscription: &StripeSubscription,
        quantities: Quantities,
    ) -> BillingResult<()> {
        let updates = [
            (&self.config.price_parent_id, quantities.parent),
            (&self.config.price_child_id, quantities.child),
        ];
        for (price_id, quantity) in updates {
            match subscription.item_for_price(price_id) {
                Some(item) if item.quantity != quantity => {
                    self.stripe.set_item_quantity(&item.id, quantity).await?;
                }
                Some(_) => {}
                None if quantity > 0 => {
                    self.stripe
                        .create_subscription_item(&subscription.id, price_id, quantity)
                        .await?;
                }
                None => {}
            }
        }
        Ok(())
    }

    /// End the trial immediately: replace item quantities with the true
    /// counts, end the trial, and finalize a prorated invoice right away.
    pub async fn end_trial_and_bill_now(&self, tenant_id: Uuid) -> BillingResult<()> {
        let tenant = self
            .store
            .tenant(tenant_id)
            .await?
            .ok_or_else(|| BillingError::Provider {
                reason: format!("tenant {tenant_id} not found"),
            })?;
        let subscription_id = tenant.subscription_id.as_ref().ok_or_else(|| {
            BillingError::Provider {
                reason: "tenant has no subscription to convert".into(),
            }
        })?;
        let customer_id = tenant.customer_id.as_ref().ok_or_else(|| {
            BillingError::Provider {
                reason: "tenant has no payment customer".into(),
            }
        })?;

        let team_id = tenant.effective_team_id();
        let properties = self.store.properties_for_team(team_id).await?;
        let groups = self.store.groups_for_owner(team_id).await?;
        let quantities = compute_quantities(&properties, &groups);

        let subscription = self.stripe.subscription(subscription_id).await?;
        self.apply_quantities(&subscription, quantities).await?;
        self.stripe.end_trial_now(subscription_id).await?;

        let invoice_id = self.stripe.create_invoice(customer_id).await?;
        self.stripe.finalize_invoice(&invoice_id).await?;

        self.store
            .set_subscription_status(tenant_id, SubscriptionStatus::Active)
            .await?;
        info!(%tenant_id, parent = quantities.parent, child = quantities.child, "trial ended and billed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiers::CHILD_UNIT_PRICE;

    #[test]
    fn upgrade_from_five_parents_bills_the_marginal_unit() {
        // oldParent=5, oldChild=0 → newParent=6, newChild=1
        let deltas = proration_deltas(
            Quantities { parent: 5, child: 0 },
            Quantities { parent: 6, child: 1 },
        );
        assert_eq!(deltas.parent_amount, 899);
        assert_eq!(deltas.child_amount, 399);
    }

    #[test]
    fn decreases_never_credit() {
        let deltas = proration_deltas(
            Quantities { parent: 6, child: 2 },
            Quantities { parent: 4, child: 1 },
        );
        assert_eq!(deltas, ProrationDeltas::default());
    }

    #[test]
    fn mixed_change_only_bills_the_increase() {
        let deltas = proration_deltas(
            Quantities { parent: 5, child: 3 },
            Quantities { parent: 4, child: 5 },
        );
        assert_eq!(deltas.parent_amount, 0);
        assert_eq!(deltas.child_amount, 2 * CHILD_UNIT_PRICE);
    }

    #[test]
    fn trial_cap_rejects_import_past_ten() {
        let err = check_trial_cap(SubscriptionStatus::Trialing, 9, 3).unwrap_err();
        match err {
            BillingError::Rule(BusinessRuleViolation::LimitExceeded {
                current_count,
                max_allowed,
                requires_payment,
                attempted_import,
            }) => {
                assert_eq!(current_count, 9);
                assert_eq!(max_allowed, 10);
                assert!(requires_payment);
                assert_eq!(attempted_import, Some(3));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn trial_cap_allows_exactly_ten() {
        assert!(check_trial_cap(SubscriptionStatus::Trialing, 9, 1).is_ok());
        assert!(check_trial_cap(SubscriptionStatus::Trialing, 10, 1).is_err());
    }

    #[test]
    fn cap_only_applies_to_trialing() {
        assert!(check_trial_cap(SubscriptionStatus::Active, 50, 10).is_ok());
        assert!(check_trial_cap(SubscriptionStatus::None, 50, 10).is_ok());
    }

    #[test]
    fn single_create_omits_attempted_import() {
        let err = check_trial_cap(SubscriptionStatus::Trialing, 10, 1).unwrap_err();
        match err {
            BillingError::Rule(BusinessRuleViolation::LimitExceeded {
                attempted_import, ..
            }) => assert_eq!(attempted_import, None),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
