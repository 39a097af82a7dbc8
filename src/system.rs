//! System wiring: builds every subsystem in dependency order and manages
//! lifecycle.

use anyhow::Result;
use std::sync::Arc;
use stayrate_billing::{BillingReconciler, StripeClient, WebhookHandler};
use stayrate_core::AppConfig;
use stayrate_inventory::InventoryService;
use stayrate_pms::{PmsRegistry, SyncGateway};
use stayrate_pricing::{AiPricingClient, CalendarBuilder};
use stayrate_scheduler::AutoPricingScheduler;
use stayrate_store::Store;
use tracing::{info, warn};

/// The assembled StayRate backend.
pub struct StayRate {
    store: Store,
    builder: Arc<CalendarBuilder>,
    inventory: InventoryService,
    webhooks: WebhookHandler,
    scheduler: AutoPricingScheduler,
}

impl StayRate {
    /// Initialize all subsystems: store (with schema bootstrap), PMS
    /// registry and gateway, pricing builder, billing, inventory service,
    /// webhook handler, and the auto-pricing scheduler.
    pub async fn new(config: AppConfig) -> Result<Self> {
        let store = Store::connect(&config.database_url).await?;
        info!("store ready");

        let registry = Arc::new(PmsRegistry::with_defaults());
        let gateway = SyncGateway::new(store.clone(), Arc::clone(&registry));

        let ai = AiPricingClient::from_config(&config.ai);
        if ai.is_none() {
            warn!("no AI pricing provider configured; deterministic pricing only");
        }
        let builder = Arc::new(CalendarBuilder::new(store.clone(), gateway.clone(), ai));

        let stripe = StripeClient::new(&config.stripe.secret_key)
            .map_err(|e| anyhow::anyhow!("stripe client init failed: {e}"))?;
        let reconciler = BillingReconciler::new(store.clone(), stripe, config.stripe.clone());

        let inventory = InventoryService::new(
            store.clone(),
            gateway.clone(),
            Arc::clone(&registry),
            reconciler.clone(),
        );
        let webhooks = WebhookHandler::new(store.clone());
        let scheduler =
            AutoPricingScheduler::new(store.clone(), Arc::clone(&builder), config.scheduler.clone());

        Ok(Self {
            store,
            builder,
            inventory,
            webhooks,
            scheduler,
        })
    }

    /// Start background services.
    pub async fn start(&self) -> Result<()> {
        self.scheduler.start().await?;
        info!("all background services started");
        Ok(())
    }

    /// Stop background services.
    pub async fn stop(&self) {
        self.scheduler.stop().await;
        info!("all background services stopped");
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Calendar builder, for operator-triggered pricing runs.
    pub fn calendar_builder(&self) -> &Arc<CalendarBuilder> {
        &self.builder
    }

    pub fn inventory(&self) -> &InventoryService {
        &self.inventory
    }

    pub fn webhooks(&self) -> &WebhookHandler {
        &self.webhooks
    }

    pub fn scheduler(&self) -> &AutoPricingScheduler {
        &self.scheduler
    }
}
