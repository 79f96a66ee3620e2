//! Outcome of sync cycles

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use unical_domain::{Provider, UnicalError};

/// Which path the per-account state machine took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStrategy {
    /// No stored token: authoritative replace, then token seeding.
    Backfill,
    /// Incremental changes since the stored token.
    Delta,
    /// The remote rejected the stored token; it was discarded.
    TokenExpired,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CycleOutcome {
    Completed,
    Failed { error: UnicalError },
    /// Another cycle for the same account was in flight.
    AlreadyRunning,
    /// No remote source is registered for the account's provider.
    Unsupported,
}

/// Per-account result of one cycle. Totals are partial when the cycle failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSyncReport {
    pub account_email: String,
    pub provider: Provider,
    pub strategy: Option<SyncStrategy>,
    pub events_applied: usize,
    pub events_deleted: usize,
    pub token_stored: bool,
    /// The cycle hit the per-account time bound and was abandoned.
    #[serde(default)]
    pub timed_out: bool,
    pub outcome: CycleOutcome,
}

impl AccountSyncReport {
    pub(crate) fn new(account_email: &str, provider: Provider) -> Self {
        Self {
            account_email: account_email.to_string(),
            provider,
            strategy: None,
            events_applied: 0,
            events_deleted: 0,
            token_stored: false,
            timed_out: false,
            outcome: CycleOutcome::Completed,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, CycleOutcome::Failed { .. })
    }
}

/// Result of [`SyncOrchestrator::sync_all`](super::SyncOrchestrator::sync_all).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub accounts: Vec<AccountSyncReport>,
}

impl SyncReport {
    pub fn events_applied(&self) -> usize {
        self.accounts.iter().map(|a| a.events_applied).sum()
    }

    pub fn failures(&self) -> usize {
        self.accounts.iter().filter(|a| a.is_failure()).count()
    }

    pub fn account(&self, email: &str) -> Option<&AccountSyncReport> {
        self.accounts.iter().find(|a| a.account_email == email)
    }
}
