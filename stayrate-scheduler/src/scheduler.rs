//! The hourly tick and the per-tenant fan-out.

use crate::eligibility::{is_eligible, local_today};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use stayrate_core::SchedulerConfig;
use stayrate_pricing::CalendarBuilder;
use stayrate_store::{Property, Store, Tenant};
use tokio::sync::{RwLock, Semaphore};
use tokio::time::{interval, timeout};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

const TICK_INTERVAL: Duration = Duration::from_secs(3600);

/// What one tick did.
#[derive(Debug, Clone, Copy, Default)]
pub struct TickSummary {
    pub scanned: usize,
    pub eligible: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Hourly auto-pricing scheduler.
#[derive(Clone)]
pub struct AutoPricingScheduler {
    store: Store,
    builder: Arc<CalendarBuilder>,
    config: SchedulerConfig,
    is_running: Arc<RwLock<bool>>,
}

impl AutoPricingScheduler {
    pub fn new(store: Store, builder: Arc<CalendarBuilder>, config: SchedulerConfig) -> Self {
        Self {
            store,
            builder,
            config,
            is_running: Arc::new(RwLock::new(false)),
        }
    }

    /// Start the hourly loop in a background task.
    pub async fn start(&self) -> anyhow::Result<()> {
        {
            let mut is_running = self.is_running.write().await;
            if *is_running {
                warn!("auto-pricing scheduler already running");
                return Ok(());
            }
            *is_running = true;
        }

        let scheduler = self.clone();
        tokio::spawn(async move {
            let mut ticker = interval(TICK_INTERVAL);
            loop {
                ticker.tick().await;
                if !*scheduler.is_running.read().await {
                    break;
                }
                match scheduler.run_tick(Utc::now()).await {
                    Ok(summary) => {
                        if summary.eligible > 0 {
                            info!(
                                scanned = summary.scanned,
                                eligible = summary.eligible,
                                succeeded = summary.succeeded,
                                failed = summary.failed,
                                "auto-pricing tick completed"
                            );
                        }
                    }
                    Err(e) => error!(error = %e, "auto-pricing tick failed"),
                }
            }
        });

        info!("auto-pricing scheduler started");
        Ok(())
    }

    pub async fn stop(&self) {
        let mut is_running = self.is_running.write().await;
        *is_running = false;
        info!("auto-pricing scheduler stopped");
    }

    /// One tick: scan tenants, process the eligible ones with bounded
    /// parallelism, and record attempt bookkeeping per tenant.
    pub async fn run_tick(&self, now: DateTime<Utc>) -> anyhow::Result<TickSummary> {
        let tenants = self.store.tenants_with_auto_pricing().await?;
        let mut summary = TickSummary {
            scanned: tenants.len(),
            ..TickSummary::default()
        };

        let eligible: Vec<Tenant> = tenants
            .into_iter()
            .filter(|tenant| is_eligible(tenant, now))
            .collect();
        summary.eligible = eligible.len();
        if eligible.is_empty() {
            return Ok(summary);
        }

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
        let mut handles = Vec::with_capacity(eligible.len());

        for tenant in eligible {
            let scheduler = self.clone();
            let semaphore = Arc::clone(&semaphore);
            handles.push(tokio::spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return false,
                };
                let success = scheduler.process_tenant(&tenant, now).await;
                if let Err(e) = scheduler
                    .store
                    .record_auto_pricing_attempt(tenant.id, now, success)
                    .await
                {
                    error!(tenant = %tenant.id, error = %e, "attempt bookkeeping failed");
                }
                success
            }));
        }

        for handle in handles {
            match handle.await {
                Ok(true) => summary.succeeded += 1,
                Ok(false) => summary.failed += 1,
                Err(e) => {
                    error!(error = %e, "tenant processing task panicked");
                    summary.failed += 1;
                }
            }
        }

        Ok(summary)
    }

    /// Process one tenant. Returns `true` only when every property priced
    /// cleanly; any failure or timeout marks the tenant for hourly retry.
    async fn process_tenant(&self, tenant: &Tenant, now: DateTime<Utc>) -> bool {
        let today = local_today(tenant, now);
        let team_id = tenant.effective_team_id();

        let properties = match self.store.properties_for_team(team_id).await {
            Ok(properties) => properties,
            Err(e) => {
                error!(tenant = %tenant.id, error = %e, "property enumeration failed");
                return false;
            }
        };
        let groups = match self.store.groups_for_owner(team_id).await {
            Ok(groups) => groups,
            Err(e) => {
                error!(tenant = %tenant.id, error = %e, "group enumeration failed");
                return false;
            }
        };

        // Archived or errored listings are skipped; their calendars would be
        // pushed to channels nobody books through.
        let active: Vec<&Property> = properties
            .iter()
            .filter(|p| p.status == stayrate_core::PropertyStatus::Active)
            .collect();

        let mut failures = 0usize;
        let mut covered: HashSet<Uuid> = HashSet::new();

        // Synced groups first: price the main property, copy to members.
        for grouped in groups
            .iter()
            .filter(|g| g.group.sync_prices && g.group.main_property_id.is_some())
        {
            let main_id = match grouped.group.main_property_id {
                Some(id) => id,
                None => continue,
            };
            let main = match active.iter().find(|p| p.id == main_id) {
                Some(main) => *main,
                None => {
                    debug!(group = %grouped.group.id, "main property inactive or missing, members priced individually");
                    continue;
                }
            };

            covered.insert(main.id);
            for member in &grouped.members {
                covered.insert(*member);
            }

            let outcome = match timeout(
                self.config.per_property_timeout,
                self.builder.generate(tenant, main, today),
            )
            .await
            {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(e)) => {
                    warn!(property = %main.id, error = %e, "group main pricing failed");
                    failures += 1;
                    continue;
                }
                Err(_) => {
                    warn!(property = %main.id, "group main pricing timed out");
                    failures += 1;
                    continue;
                }
            };

            for member_id in grouped.members.iter().filter(|id| **id != main.id) {
                let member = match active.iter().find(|p| p.id == *member_id) {
                    Some(member) => *member,
                    None => continue,
                };
                let applied = timeout(
                    self.config.per_property_timeout,
                    self.builder.apply(
                        tenant,
                        member,
                        &outcome.days,
                        outcome.method,
                        "auto-pricing",
                    ),
                )
                .await;
                match applied {
                    Ok(Ok(_)) => {}
                    Ok(Err(e)) => {
                        warn!(property = %member.id, error = %e, "group member pricing failed");
                        failures += 1;
                    }
                    Err(_) => {
                        warn!(property = %member.id, "group member pricing timed out");
                        failures += 1;
                    }
                }
            }
        }

        // Everything outside a synced group prices individually.
        for property in active.iter().filter(|p| !covered.contains(&p.id)) {
            match timeout(
                self.config.per_property_timeout,
                self.builder.generate(tenant, *property, today),
            )
            .await
            {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => {
                    warn!(property = %property.id, error = %e, "pricing failed");
                    failures += 1;
                }
                Err(_) => {
                    warn!(property = %property.id, "pricing timed out");
                    failures += 1;
                }
            }
        }

        if failures > 0 {
            warn!(tenant = %tenant.id, failures, "auto-pricing finished with failures");
        }
        failures == 0
    }
}
