//! Change signals consumed by UI layers and notification schedulers

use serde::{Deserialize, Serialize};

use super::account::Provider;

/// Broadcast after state changes in the local stores or the sync engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChangeSignal {
    /// Stored events of one account/source pair changed.
    EventsChanged { account_email: String, source: Option<Provider> },
    /// An account was connected, disconnected or changed status.
    AccountsChanged,
    SyncStarted,
    SyncFinished { accounts: usize, events_applied: usize, failures: usize },
}
