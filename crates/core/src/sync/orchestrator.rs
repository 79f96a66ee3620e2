//! Sync orchestrator - per-account backfill / delta / safety-window cycles

use std::collections::{HashMap, HashSet};
use std::pin::pin;
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use futures::{stream, StreamExt, TryStreamExt};
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};
use unical_domain::{
    Account, AccountStatus, CalendarEvent, ChangeSignal, Provider, Result, TimeWindow,
    UnicalError,
};

use super::paging::window_pages;
use super::ports::{ChangeNotifier, EventStore, TokenStore};
use super::report::{AccountSyncReport, CycleOutcome, SyncReport, SyncStrategy};
use super::windows::SyncSettings;
use crate::accounts::ports::AccountRepository;
use crate::calendar_ports::{DeltaPage, RemoteEventSource};

/// Steps of one account's cycle. The loop in [`SyncOrchestrator::run_cycle`]
/// advances through them strictly in order.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    Backfill,
    Seed,
    Delta(String),
    TokenExpired,
    SafetyWindow,
    Done,
}

enum DeltaResult {
    Applied,
    Expired,
}

/// Drives sync cycles for every connected account.
///
/// Accounts run concurrently up to `max_concurrent_accounts`; the steps of
/// one account's cycle are sequential. A second cycle for an account whose
/// cycle is still in flight is skipped with [`CycleOutcome::AlreadyRunning`].
pub struct SyncOrchestrator {
    sources: HashMap<Provider, Arc<dyn RemoteEventSource>>,
    events: Arc<dyn EventStore>,
    tokens: Arc<dyn TokenStore>,
    accounts: Arc<dyn AccountRepository>,
    notifier: Arc<dyn ChangeNotifier>,
    settings: SyncSettings,
    in_flight: DashMap<String, Arc<Mutex<()>>>,
}

impl SyncOrchestrator {
    /// Create an orchestrator without any remote source registered
    pub fn new(
        events: Arc<dyn EventStore>,
        tokens: Arc<dyn TokenStore>,
        accounts: Arc<dyn AccountRepository>,
        notifier: Arc<dyn ChangeNotifier>,
        settings: SyncSettings,
    ) -> Self {
        Self {
            sources: HashMap::new(),
            events,
            tokens,
            accounts,
            notifier,
            settings,
            in_flight: DashMap::new(),
        }
    }

    /// Register the source used for accounts of its provider
    pub fn with_source(mut self, source: Arc<dyn RemoteEventSource>) -> Self {
        self.sources.insert(source.provider(), source);
        self
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// Run one cycle for every connected account.
    ///
    /// Never fails: errors are logged and reported per account.
    pub async fn sync_all(&self) -> SyncReport {
        let started_at = Utc::now();
        self.notifier.publish(ChangeSignal::SyncStarted);

        let accounts = match self.accounts.list_connected().await {
            Ok(accounts) => accounts,
            Err(err) => {
                error!(error = %err, "failed to list accounts, skipping sync cycle");
                Vec::new()
            }
        };

        let reports: Vec<AccountSyncReport> = stream::iter(accounts)
            .map(|account| async move { self.sync_account(&account).await })
            .buffered(self.settings.max_concurrent_accounts.max(1))
            .collect()
            .await;

        let report = SyncReport { started_at, finished_at: Utc::now(), accounts: reports };
        info!(
            accounts = report.accounts.len(),
            events_applied = report.events_applied(),
            failures = report.failures(),
            "sync cycle finished"
        );
        self.notifier.publish(ChangeSignal::SyncFinished {
            accounts: report.accounts.len(),
            events_applied: report.events_applied(),
            failures: report.failures(),
        });
        report
    }

    /// Run one cycle for a single account.
    #[instrument(skip_all, fields(account = %account.email, provider = account.provider.as_str()))]
    pub async fn sync_account(&self, account: &Account) -> AccountSyncReport {
        let mut report = AccountSyncReport::new(&account.email, account.provider);

        let Some(source) = self.sources.get(&account.provider).cloned() else {
            debug!("no remote source registered for provider");
            report.outcome = CycleOutcome::Unsupported;
            return report;
        };

        let lock = self.in_flight.entry(account.email.clone()).or_default().clone();
        let Ok(_guard) = lock.try_lock() else {
            info!("sync already in flight for account, skipping");
            report.outcome = CycleOutcome::AlreadyRunning;
            return report;
        };

        self.update_status(&account.email, AccountStatus::Syncing).await;

        let timeout = self.settings.account_timeout;
        let bounded =
            tokio::time::timeout(timeout, self.run_cycle(account, source.as_ref(), &mut report)).await;
        let outcome = match bounded {
            Ok(result) => result,
            Err(_) => {
                report.timed_out = true;
                Err(UnicalError::Network(format!(
                    "account sync timed out after {}ms",
                    timeout.as_millis()
                )))
            }
        };

        match outcome {
            Ok(()) => {
                if let Err(err) = self.accounts.mark_synced(&account.email, Utc::now()).await {
                    warn!(error = %err, "failed to record sync time");
                }
                self.update_status(&account.email, AccountStatus::Connected).await;
                info!(
                    strategy = ?report.strategy,
                    applied = report.events_applied,
                    deleted = report.events_deleted,
                    "account sync completed"
                );
            }
            Err(err) => {
                error!(
                    error = %err,
                    applied = report.events_applied,
                    "account sync failed, keeping partial results"
                );
                self.update_status(&account.email, AccountStatus::Error).await;
                report.outcome = CycleOutcome::Failed { error: err };
            }
        }
        report
    }

    /// Apply pending remote changes since the stored token.
    ///
    /// Returns the number of events applied. Without a stored token this is
    /// a no-op; an expired token is discarded and reported as zero.
    pub async fn sync_delta(&self, account: &Account) -> Result<usize> {
        let Some(source) = self.sources.get(&account.provider).cloned() else {
            return Ok(0);
        };
        let Some(token) = self.tokens.get(&account.email).await? else {
            debug!("delta requested without a stored token");
            return Ok(0);
        };

        let mut report = AccountSyncReport::new(&account.email, account.provider);
        if let DeltaResult::Expired =
            self.run_delta(account, source.as_ref(), &token, &mut report).await?
        {
            self.tokens.remove(&account.email).await?;
        }
        Ok(report.events_applied)
    }

    async fn run_cycle(
        &self,
        account: &Account,
        source: &dyn RemoteEventSource,
        report: &mut AccountSyncReport,
    ) -> Result<()> {
        let mut step = match self.tokens.get(&account.email).await? {
            Some(token) => Step::Delta(token),
            None => Step::Backfill,
        };

        loop {
            debug!(?step, "sync step");
            step = match step {
                Step::Backfill => {
                    report.strategy = Some(SyncStrategy::Backfill);
                    self.run_backfill(account, source, report).await?;
                    Step::Seed
                }
                Step::Seed => {
                    self.run_seed(account, source, report).await?;
                    Step::SafetyWindow
                }
                Step::Delta(token) => {
                    report.strategy = Some(SyncStrategy::Delta);
                    match self.run_delta(account, source, &token, report).await? {
                        DeltaResult::Applied => Step::SafetyWindow,
                        DeltaResult::Expired => Step::TokenExpired,
                    }
                }
                Step::TokenExpired => {
                    warn!("sync token expired, next cycle will backfill");
                    report.strategy = Some(SyncStrategy::TokenExpired);
                    self.tokens.remove(&account.email).await?;
                    Step::SafetyWindow
                }
                Step::SafetyWindow => {
                    self.run_safety_window(account, source, report).await?;
                    Step::Done
                }
                Step::Done => return Ok(()),
            };
        }
    }

    /// Both backfill windows are authoritative: their combined pages replace
    /// the stored events of the account in one call.
    async fn run_backfill(
        &self,
        account: &Account,
        source: &dyn RemoteEventSource,
        report: &mut AccountSyncReport,
    ) -> Result<()> {
        let windows = self.settings.backfill_windows(Utc::now())?;

        let mut seen = HashSet::new();
        let mut collected = Vec::new();
        for window in &windows {
            let fetched = collect_window(source, account, window).await?;
            collected.extend(fetched.into_iter().filter(|e| seen.insert(e.external_id.clone())));
        }

        let replaced = self.events.replace(&account.email, source.provider(), &collected).await?;
        report.events_applied += replaced;
        info!(events = replaced, "backfill replaced stored events");
        Ok(())
    }

    async fn run_seed(
        &self,
        account: &Account,
        source: &dyn RemoteEventSource,
        report: &mut AccountSyncReport,
    ) -> Result<()> {
        let window = self.settings.seed_window(Utc::now())?;
        let mut page_token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let page = source.fetch_seed_page(account, &window, page_token.as_deref()).await?;
            pages += 1;
            if let Some(next) = page.next_page {
                page_token = Some(next);
                continue;
            }
            match page.next_sync_token {
                Some(token) => {
                    self.tokens.set(&account.email, &token).await?;
                    report.token_stored = true;
                    debug!(pages, "seeded sync token");
                }
                None => warn!(pages, "seeding finished without a sync token"),
            }
            return Ok(());
        }
    }

    async fn run_delta(
        &self,
        account: &Account,
        source: &dyn RemoteEventSource,
        sync_token: &str,
        report: &mut AccountSyncReport,
    ) -> Result<DeltaResult> {
        let provider = source.provider();
        let mut page_token: Option<String> = None;

        loop {
            let page = source.fetch_delta_page(account, sync_token, page_token.as_deref()).await?;
            let DeltaPage::Changes { events, deleted_ids, next_page, next_sync_token } = page else {
                return Ok(DeltaResult::Expired);
            };

            if !events.is_empty() {
                report.events_applied += self.events.upsert(&account.email, provider, &events).await?;
            }
            if !deleted_ids.is_empty() {
                report.events_deleted +=
                    self.events.delete_by_external_ids(&deleted_ids, &account.email, provider).await?;
            }

            if let Some(next) = next_page {
                page_token = Some(next);
                continue;
            }

            // Terminal page applied: only now does the new token become durable.
            match next_sync_token {
                Some(token) => {
                    self.tokens.set(&account.email, &token).await?;
                    report.token_stored = true;
                }
                None => warn!("terminal delta page carried no sync token"),
            }
            return Ok(DeltaResult::Applied);
        }
    }

    async fn run_safety_window(
        &self,
        account: &Account,
        source: &dyn RemoteEventSource,
        report: &mut AccountSyncReport,
    ) -> Result<()> {
        let window = self.settings.safety_window(Utc::now())?;
        let mut pages = pin!(window_pages(source, account, &window));

        while let Some(page) = pages.try_next().await? {
            if page.events.is_empty() {
                continue;
            }
            report.events_applied +=
                self.events.upsert(&account.email, source.provider(), &page.events).await?;
        }
        Ok(())
    }

    async fn update_status(&self, email: &str, status: AccountStatus) {
        if let Err(err) = self.accounts.set_status(email, status).await {
            warn!(error = %err, ?status, "failed to update account status");
            return;
        }
        self.notifier.publish(ChangeSignal::AccountsChanged);
    }
}

async fn collect_window(
    source: &dyn RemoteEventSource,
    account: &Account,
    window: &TimeWindow,
) -> Result<Vec<CalendarEvent>> {
    window_pages(source, account, window)
        .try_fold(Vec::new(), |mut events, page| async move {
            events.extend(page.events);
            Ok(events)
        })
        .await
}
