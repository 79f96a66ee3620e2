//! Port interfaces for account persistence

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use unical_domain::{Account, AccountStatus, Result};

/// Persistence of signed-in accounts, keyed by lowercased email.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<Account>>;

    /// Accounts with `is_connected` set.
    async fn list_connected(&self) -> Result<Vec<Account>>;

    async fn get(&self, email: &str) -> Result<Option<Account>>;

    /// Insert or update. An existing row keeps its original `connected_at`.
    async fn upsert(&self, account: &Account) -> Result<()>;

    async fn set_status(&self, email: &str, status: AccountStatus) -> Result<()>;

    async fn mark_synced(&self, email: &str, at: DateTime<Utc>) -> Result<()>;

    /// Returns whether a row was removed.
    async fn remove(&self, email: &str) -> Result<bool>;

    async fn remove_all(&self) -> Result<()>;
}
