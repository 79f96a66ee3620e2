//! Command surface consumed by UI shells and the daemon

use std::time::Instant;

use chrono::{DateTime, Utc};
use unical_core::{AccountRepository, CycleOutcome, EventStore, SyncReport};
use unical_domain::{Account, Provider, Result, StoredEvent, TimeWindow, UnicalError};
use unical_infra::observability::SyncMetricsSnapshot;

use crate::utils::logging::log_command_execution;
use crate::AppContext;

fn finish<T>(command: &str, started: Instant, result: Result<T>) -> Result<T> {
    log_command_execution(command, started.elapsed(), result.as_ref().err());
    result
}

/// Stored events overlapping `[start, end)`, optionally for one account.
pub async fn events_in_range(
    ctx: &AppContext,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    account: Option<&str>,
) -> Result<Vec<StoredEvent>> {
    let started = Instant::now();
    let result = async {
        let window = TimeWindow::new(start, end)?;
        ctx.events.query(&window, account).await
    }
    .await;
    finish("events::events_in_range", started, result)
}

pub async fn list_accounts(ctx: &AppContext) -> Result<Vec<Account>> {
    let started = Instant::now();
    let result = ctx.account_service.accounts().await;
    finish("accounts::list_accounts", started, result)
}

/// Record a signed-in account and run its first sync cycle.
///
/// A failed first cycle leaves the account connected; the error is
/// returned so the caller can surface it.
pub async fn connect_account(
    ctx: &AppContext,
    email: &str,
    provider: Provider,
    display_name: Option<String>,
) -> Result<Account> {
    let started = Instant::now();
    let result = async {
        let account = ctx.account_service.connect(email, provider, display_name).await?;
        let report = ctx.orchestrator.sync_account(&account).await;
        if let CycleOutcome::Failed { error } = report.outcome {
            return Err(error);
        }
        ctx.accounts.get(&account.email).await?.ok_or_else(|| {
            UnicalError::Internal(format!("account {} vanished after sync", account.email))
        })
    }
    .await;
    finish("accounts::connect_account", started, result)
}

/// Returns `false` when no such account was stored.
pub async fn disconnect_account(ctx: &AppContext, email: &str) -> Result<bool> {
    let started = Instant::now();
    let result = ctx.account_service.disconnect(email).await;
    finish("accounts::disconnect_account", started, result)
}

/// Run one full cycle now. Each account is bounded by the configured job
/// timeout; failures are in the report.
pub async fn sync_now(ctx: &AppContext) -> SyncReport {
    let started = Instant::now();
    let report = ctx.sync_job.run().await;
    log_command_execution("sync::sync_now", started.elapsed(), None);
    report
}

pub fn sync_metrics(ctx: &AppContext) -> SyncMetricsSnapshot {
    ctx.sync_job.metrics().snapshot()
}
