//! Port interfaces for local persistence and change signalling
//!
//! These traits define the boundaries between the sync engine
//! and infrastructure implementations.

use async_trait::async_trait;
use unical_domain::{CalendarEvent, ChangeSignal, Provider, Result, StoredEvent, TimeWindow};

/// Durable keyed storage of normalized events.
///
/// Events are unique by `(external_id, account_email, source)`. Every
/// successful mutating call publishes [`ChangeSignal::EventsChanged`].
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Atomically replace every event of `(account_email, source)` with `events`.
    async fn replace(
        &self,
        account_email: &str,
        source: Provider,
        events: &[CalendarEvent],
    ) -> Result<usize>;

    /// Insert or update in place by external id. Idempotent.
    async fn upsert(
        &self,
        account_email: &str,
        source: Provider,
        events: &[CalendarEvent],
    ) -> Result<usize>;

    /// Remove exactly the matching `(id, account_email, source)` tuples.
    async fn delete_by_external_ids(
        &self,
        ids: &[String],
        account_email: &str,
        source: Provider,
    ) -> Result<usize>;

    /// Remove every event of an account, across sources.
    async fn delete_account(&self, account_email: &str) -> Result<usize>;

    /// Events whose span intersects `window`, ordered by start.
    async fn query(
        &self,
        window: &TimeWindow,
        account_filter: Option<&str>,
    ) -> Result<Vec<StoredEvent>>;
}

/// One opaque continuation token per account, keyed case-insensitively.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn get(&self, account_email: &str) -> Result<Option<String>>;

    async fn set(&self, account_email: &str, token: &str) -> Result<()>;

    async fn remove(&self, account_email: &str) -> Result<()>;

    async fn remove_all(&self) -> Result<()>;
}

/// Fan-out of change signals to UI layers and schedulers.
pub trait ChangeNotifier: Send + Sync {
    fn publish(&self, signal: ChangeSignal);
}
