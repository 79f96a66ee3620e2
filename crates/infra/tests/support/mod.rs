//! Shared helpers for `unical-infra` integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tempfile::TempDir;
use unical_core::ChangeNotifier;
use unical_domain::{Account, CalendarEvent, ChangeSignal, Provider};
use unical_infra::database::DbManager;
use unical_infra::http::HttpClient;

/// Temporary database wrapper that keeps the underlying file alive for the
/// duration of a test run.
pub struct TestDatabase {
    pub manager: Arc<DbManager>,
    _temp_dir: TempDir,
}

impl TestDatabase {
    /// Fresh database with the schema applied.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("temp dir should be created");
        let db_path = temp_dir.path().join("unical-test.db");

        let manager = DbManager::new(&db_path, 4).expect("db manager should be created");
        manager.run_migrations().expect("schema migrations should apply");

        Self { manager: Arc::new(manager), _temp_dir: temp_dir }
    }
}

impl Default for TestDatabase {
    fn default() -> Self {
        Self::new()
    }
}

/// Notifier that keeps every published signal.
#[derive(Default)]
pub struct RecordingNotifier {
    signals: Mutex<Vec<ChangeSignal>>,
}

impl RecordingNotifier {
    pub fn signals(&self) -> Vec<ChangeSignal> {
        self.signals.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.signals.lock().unwrap().clear();
    }

    pub fn events_changed_for(&self, account: &str) -> usize {
        self.signals()
            .iter()
            .filter(|s| {
                matches!(s, ChangeSignal::EventsChanged { account_email, .. } if account_email == account)
            })
            .count()
    }
}

impl ChangeNotifier for RecordingNotifier {
    fn publish(&self, signal: ChangeSignal) {
        self.signals.lock().unwrap().push(signal);
    }
}

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
        end: start + ChronoDuration::hours(hours),
        is_all_day: false,
        color: "blue".to_string(),
        agenda: None,
        attendees: None,
        html_link: None,
    }
}

pub fn account(email: &str, provider: Provider) -> Account {
    Account::new(email, provider, None)
}

/// Client that never retries, so error-path tests stay fast.
pub fn single_attempt_http() -> HttpClient {
    HttpClient::builder()
        .timeout(Duration::from_secs(5))
        .max_attempts(1)
        .base_backoff(Duration::from_millis(1))
        .build()
        .expect("http client should build")
}
