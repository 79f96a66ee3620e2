use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use unical_core::{DeltaPage, RemoteEventSource, SeedPage, WindowPage};
use unical_domain::{Account, CalendarEvent, Provider, Result, TimeWindow, UnicalError};

/// Remote request observed by [`FakeSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceCall {
    Window { start: DateTime<Utc>, end: DateTime<Utc>, page_token: Option<String> },
    Delta { sync_token: String, page_token: Option<String> },
    Seed { page_token: Option<String> },
}

/// Scripted remote calendar.
///
/// Window queries page over `remote` (filtered by overlap, sorted by start).
/// Delta and seed queries pop scripted responses, falling back to a single
/// terminal page carrying `"delta-token"` / `"seed-token"`.
pub struct FakeSource {
    provider: Provider,
    page_size: usize,
    delay: Option<Duration>,
    remote: Mutex<Vec<CalendarEvent>>,
    delta_pages: Mutex<VecDeque<Result<DeltaPage>>>,
    seed_pages: Mutex<VecDeque<SeedPage>>,
    window_failure: Mutex<Option<UnicalError>>,
    calls: Mutex<Vec<SourceCall>>,
}

impl FakeSource {
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            page_size: 2,
            delay: None,
            remote: Mutex::new(Vec::new()),
            delta_pages: Mutex::new(VecDeque::new()),
            seed_pages: Mutex::new(VecDeque::new()),
            window_failure: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_events(self, events: Vec<CalendarEvent>) -> Self {
        *self.remote.lock().unwrap() = events;
        self
    }

    pub fn push_delta(&self, page: Result<DeltaPage>) {
        self.delta_pages.lock().unwrap().push_back(page);
    }

    pub fn push_seed(&self, page: SeedPage) {
        self.seed_pages.lock().unwrap().push_back(page);
    }

    pub fn fail_windows(&self, error: UnicalError) {
        *self.window_failure.lock().unwrap() = Some(error);
    }

    pub fn calls(&self) -> Vec<SourceCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn window_calls(&self) -> Vec<SourceCall> {
        self.calls().into_iter().filter(|c| matches!(c, SourceCall::Window { .. })).collect()
    }

    pub fn seed_calls(&self) -> usize {
        self.calls().iter().filter(|c| matches!(c, SourceCall::Seed { .. })).count()
    }

    pub fn delta_calls(&self) -> usize {
        self.calls().iter().filter(|c| matches!(c, SourceCall::Delta { .. })).count()
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl RemoteEventSource for FakeSource {
    fn provider(&self) -> Provider {
        self.provider
    }

    async fn fetch_window_page(
        &self,
        _account: &Account,
        window: &TimeWindow,
        page_token: Option<&str>,
    ) -> Result<WindowPage> {
        self.calls.lock().unwrap().push(SourceCall::Window {
            start: window.start(),
            end: window.end(),
            page_token: page_token.map(str::to_string),
        });
        self.pause().await;

        if let Some(error) = self.window_failure.lock().unwrap().clone() {
            return Err(error);
        }

        let mut matching: Vec<CalendarEvent> = self
            .remote
            .lock()
            .unwrap()
            .iter()
            .filter(|e| super::overlaps(e, window))
            .cloned()
            .collect();
        matching.sort_by_key(|e| e.start);

        let offset: usize = page_token.map_or(0, |t| t.parse().unwrap());
        let events: Vec<_> = matching.iter().skip(offset).take(self.page_size).cloned().collect();
        let consumed = offset + events.len();
        let next_page = (consumed < matching.len()).then(|| consumed.to_string());

        Ok(WindowPage { events, next_page })
    }

    async fn fetch_delta_page(
        &self,
        _account: &Account,
        sync_token: &str,
        page_token: Option<&str>,
    ) -> Result<DeltaPage> {
        self.calls.lock().unwrap().push(SourceCall::Delta {
            sync_token: sync_token.to_string(),
            page_token: page_token.map(str::to_string),
        });
        self.pause().await;

        self.delta_pages.lock().unwrap().pop_front().unwrap_or_else(|| {
            Ok(DeltaPage::Changes {
                events: Vec::new(),
                deleted_ids: Vec::new(),
                next_page: None,
                next_sync_token: Some("delta-token".to_string()),
            })
        })
    }

    async fn fetch_seed_page(
        &self,
        _account: &Account,
        _window: &TimeWindow,
        page_token: Option<&str>,
    ) -> Result<SeedPage> {
        self.calls
            .lock()
            .unwrap()
            .push(SourceCall::Seed { page_token: page_token.map(str::to_string) });
        self.pause().await;

        Ok(self.seed_pages.lock().unwrap().pop_front().unwrap_or_else(|| SeedPage {
            next_page: None,
            next_sync_token: Some("seed-token".to_string()),
        }))
    }
}
