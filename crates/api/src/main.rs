//! unicald - calendar aggregation sync daemon
//!
//! Loads configuration, runs one sync cycle at start-up, then keeps syncing
//! on the configured cron schedule until interrupted.

use anyhow::{Context, Result};
use tracing::{error, info};
use unical_app::{commands, AppContext};
use unical_infra::config;
use unical_infra::observability::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    // Before config loading so UNICAL_* variables from .env are visible
    let dotenv = dotenvy::dotenv();

    let config = config::load().context("failed to load configuration")?;
    init_tracing(&config.logging).context("failed to initialise tracing")?;

    match dotenv {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(err) => info!(error = %err, "no .env loaded"),
    }

    let sync_enabled = config.sync.enabled;
    let ctx = AppContext::new(config).await.context("failed to build application context")?;

    let connected = ctx.connect_configured_accounts().await?;
    info!(accounts = connected, "configured accounts connected");

    let report = commands::sync_now(&ctx).await;
    info!(
        accounts = report.accounts.len(),
        events_applied = report.events_applied(),
        failures = report.failures(),
        "start-up sync finished"
    );

    if sync_enabled {
        ctx.start_scheduler().await.context("failed to start sync scheduler")?;
    } else {
        info!("periodic sync disabled");
    }

    tokio::signal::ctrl_c().await.context("failed to listen for ctrl-c")?;
    info!("shutdown requested");

    if let Err(err) = ctx.shutdown().await {
        error!(error = %err, "shutdown did not complete cleanly");
    }
    Ok(())
}
