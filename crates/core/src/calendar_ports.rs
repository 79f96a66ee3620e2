//! Remote calendar port interfaces
//!
//! A [`RemoteEventSource`] talks to one provider's REST API and normalizes
//! its paginated responses into [`CalendarEvent`]s. Each call returns at
//! most one page; callers loop while a continuation marker is present.

use async_trait::async_trait;
use unical_domain::{Account, CalendarEvent, Provider, Result, TimeWindow};

/// One page of a time-window query, ordered by start ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowPage {
    pub events: Vec<CalendarEvent>,
    pub next_page: Option<String>,
}

/// One page of an incremental (delta) query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeltaPage {
    Changes {
        events: Vec<CalendarEvent>,
        /// External ids the remote reported as cancelled or removed.
        deleted_ids: Vec<String>,
        next_page: Option<String>,
        /// Only present on the terminal page.
        next_sync_token: Option<String>,
    },
    /// The stored sync token is no longer accepted (HTTP 410).
    Expired,
}

/// One page of a minimal-field query used to obtain a fresh sync token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedPage {
    pub next_page: Option<String>,
    pub next_sync_token: Option<String>,
}

/// Paginated access to one provider's calendar.
#[async_trait]
pub trait RemoteEventSource: Send + Sync {
    /// Provider this source serves.
    fn provider(&self) -> Provider;

    /// Fetch one page of events overlapping `window`.
    async fn fetch_window_page(
        &self,
        account: &Account,
        window: &TimeWindow,
        page_token: Option<&str>,
    ) -> Result<WindowPage>;

    /// Fetch one page of changes since `sync_token`.
    async fn fetch_delta_page(
        &self,
        account: &Account,
        sync_token: &str,
        page_token: Option<&str>,
    ) -> Result<DeltaPage>;

    /// Fetch one page of the token-seeding query over `window`.
    async fn fetch_seed_page(
        &self,
        account: &Account,
        window: &TimeWindow,
        page_token: Option<&str>,
    ) -> Result<SeedPage>;
}
