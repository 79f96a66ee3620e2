//! Shared test helpers for `unical-core` integration tests.
//!
//! In-memory implementations of the core ports plus a scripted remote
//! source, so scenario tests can focus on orchestration behaviour.

#![allow(dead_code)]

pub mod source;
pub mod stores;

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use unical_core::{SyncOrchestrator, SyncSettings};
use unical_domain::{CalendarEvent, LocalZone, Provider, TimeWindow};

pub use source::FakeSource;
pub use stores::{InMemoryAccounts, InMemoryEvents, InMemoryTokens, RecordingNotifier};

/// Timed event owned by `account`.
pub fn event(
    account: &str,
    source: Provider,
    id: &str,
    start: DateTime<Utc>,
    hours: i64,
) -> CalendarEvent {
    CalendarEvent {
        external_id: id.to_string(),
        account_email: account.to_string(),
        source,
        title: format!("Event {id}"),
        location: None,
        start,
        end: start + Duration::hours(hours),
        is_all_day: false,
        color: "blue".to_string(),
        agenda: None,
        attendees: None,
        html_link: None,
    }
}

/// Half-open `[start, end)` intersection; zero-length events are the
/// instant `start`. Mirrors the SQLite query.
pub fn overlaps(event: &CalendarEvent, window: &TimeWindow) -> bool {
    if event.start == event.end {
        return event.start >= window.start() && event.start < window.end();
    }
    event.start < window.end() && event.end > window.start()
}

/// Fully wired orchestrator over in-memory stores.
pub struct Harness {
    pub events: Arc<InMemoryEvents>,
    pub tokens: Arc<InMemoryTokens>,
    pub accounts: Arc<InMemoryAccounts>,
    pub notifier: Arc<RecordingNotifier>,
    pub orchestrator: SyncOrchestrator,
}

impl Harness {
    pub fn new(sources: Vec<Arc<FakeSource>>) -> Self {
        Self::with_settings(sources, Self::settings())
    }

    /// UTC settings used by [`Harness::new`].
    pub fn settings() -> SyncSettings {
        SyncSettings { zone: LocalZone::Named(chrono_tz::UTC), ..SyncSettings::default() }
    }

    pub fn with_settings(sources: Vec<Arc<FakeSource>>, settings: SyncSettings) -> Self {
        let events = Arc::new(InMemoryEvents::default());
        let tokens = Arc::new(InMemoryTokens::default());
        let accounts = Arc::new(InMemoryAccounts::default());
        let notifier = Arc::new(RecordingNotifier::default());

        let mut orchestrator = SyncOrchestrator::new(
            events.clone(),
            tokens.clone(),
            accounts.clone(),
            notifier.clone(),
            settings,
        );
        for source in sources {
            orchestrator = orchestrator.with_source(source);
        }

        Self { events, tokens, accounts, notifier, orchestrator }
    }
}
