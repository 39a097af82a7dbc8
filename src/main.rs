//! StayRate: multi-tenant revenue management backend for short-term rental
//! operators.
//!
//! The binary wires the subsystems together and runs until a shutdown
//! signal: the store against PostgreSQL, the PMS adapter registry and sync
//! gateway, the pricing calendar builder, billing reconciliation, the
//! payment webhook handler, and the hourly auto-pricing scheduler.

use anyhow::Result;
use stayrate::StayRate;
use stayrate_core::AppConfig;
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("stayrate=info".parse()?),
        )
        .json()
        .init();

    info!("starting StayRate backend");

    // Payment credentials are mandatory; refuse to start without them.
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("configuration error: {e}");
            return Err(e.into());
        }
    };

    let system = match StayRate::new(config).await {
        Ok(system) => {
            info!("StayRate initialized");
            system
        }
        Err(e) => {
            error!("initialization failed: {e}");
            return Err(e);
        }
    };

    system.start().await?;

    signal::ctrl_c().await?;
    info!("shutdown signal received");
    system.stop().await;

    info!("StayRate stopped");
    Ok(())
}
