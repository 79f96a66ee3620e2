//! Periodic calendar sync.
//!
//! A cron job runs [`SyncOrchestrator::sync_all`] on a fixed schedule. Join
//! handles are tracked, cancellation is explicit, and every asynchronous
//! lifecycle step is wrapped in a timeout.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use unical_core::SyncOrchestrator;
//! use unical_infra::observability::SyncMetrics;
//! use unical_infra::scheduling::{SchedulerResult, SyncJob, SyncScheduler, SyncSchedulerConfig};
//!
//! # async fn example(orchestrator: Arc<SyncOrchestrator>) -> SchedulerResult<()> {
//! let job = SyncJob::new(orchestrator, Arc::new(SyncMetrics::new()));
//! let mut scheduler = SyncScheduler::new(SyncSchedulerConfig::default(), job);
//!
//! scheduler.start().await?;
//! // ... application runs ...
//! scheduler.stop().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use unical_core::{SyncOrchestrator, SyncReport};
use unical_domain::constants::DEFAULT_SYNC_CRON;
use unical_domain::SyncConfig;

use crate::observability::SyncMetrics;
use crate::scheduling::error::{SchedulerError, SchedulerResult};

/// Configuration for the sync scheduler.
#[derive(Debug, Clone)]
pub struct SyncSchedulerConfig {
    /// Cron expression (with seconds) describing the execution schedule.
    pub cron_expression: String,
    /// Timeout for starting the underlying scheduler.
    pub start_timeout: Duration,
    /// Timeout for stopping the scheduler.
    pub stop_timeout: Duration,
}

impl Default for SyncSchedulerConfig {
    fn default() -> Self {
        Self {
            cron_expression: DEFAULT_SYNC_CRON.into(),
            start_timeout: Duration::from_secs(5),
            stop_timeout: Duration::from_secs(5),
        }
    }
}

impl SyncSchedulerConfig {
    pub fn from_sync_config(config: &SyncConfig) -> Self {
        Self { cron_expression: config.cron_expression.clone(), ..Self::default() }
    }
}

/// One sync run, shared by the cron job and on-demand triggers.
///
/// Each account's cycle is bounded by the orchestrator's per-account
/// timeout, so a run always completes with a report.
#[derive(Clone)]
pub struct SyncJob {
    orchestrator: Arc<SyncOrchestrator>,
    metrics: Arc<SyncMetrics>,
}

impl SyncJob {
    pub fn new(orchestrator: Arc<SyncOrchestrator>, metrics: Arc<SyncMetrics>) -> Self {
        Self { orchestrator, metrics }
    }

    pub fn metrics(&self) -> &Arc<SyncMetrics> {
        &self.metrics
    }

    /// Run one full cycle across all connected accounts.
    ///
    /// Per-account failures and timeouts are counted and reported, never
    /// raised.
    pub async fn run(&self) -> SyncReport {
        let started = Instant::now();
        let report = self.orchestrator.sync_all().await;
        self.metrics.record_run(started.elapsed(), report.events_applied());

        let failures = report.failures();
        if failures > 0 {
            self.metrics.record_failure();
        }
        for account in report.accounts.iter().filter(|a| a.is_failure()) {
            if account.timed_out {
                self.metrics.record_timeout(started.elapsed());
            }
            warn!(
                user = %redact_email(&account.account_email),
                timed_out = account.timed_out,
                outcome = ?account.outcome,
                "account sync failed"
            );
        }

        info!(
            accounts = report.accounts.len(),
            events_applied = report.events_applied(),
            failures,
            duration_ms = started.elapsed().as_millis() as u64,
            "sync run finished"
        );
        report
    }
}

/// Cron-driven sync with explicit lifecycle management.
pub struct SyncScheduler {
    scheduler: Option<JobScheduler>,
    config: SyncSchedulerConfig,
    job: SyncJob,
    cancellation: CancellationToken,
}

impl SyncScheduler {
    pub fn new(config: SyncSchedulerConfig, job: SyncJob) -> Self {
        Self { scheduler: None, config, job, cancellation: CancellationToken::new() }
    }

    /// The job the scheduler runs, for on-demand triggers.
    pub fn job(&self) -> &SyncJob {
        &self.job
    }

    /// Start the scheduler.
    #[instrument(skip(self), fields(cron = %self.config.cron_expression))]
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        self.cancellation = CancellationToken::new();

        let scheduler_instance = self.build_scheduler().await?;
        let start_timeout = self.config.start_timeout;

        let start_result = tokio::time::timeout(start_timeout, scheduler_instance.start())
            .await
            .map_err(|source| SchedulerError::Timeout { duration: start_timeout, source })?;

        start_result.map_err(|source| SchedulerError::StartFailed { source })?;

        self.scheduler = Some(scheduler_instance);
        info!("Sync scheduler started");
        Ok(())
    }

    /// Stop the scheduler and cancel any pending trigger.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        if !self.is_running() {
            return Err(SchedulerError::NotRunning);
        }

        self.cancellation.cancel();

        let Some(mut scheduler) = self.scheduler.take() else {
            return Err(SchedulerError::NotRunning);
        };

        let stop_timeout = self.config.stop_timeout;
        let stop_result =
            tokio::time::timeout(stop_timeout, async move { scheduler.shutdown().await })
                .await
                .map_err(|source| SchedulerError::Timeout { duration: stop_timeout, source })?;

        stop_result.map_err(|source| SchedulerError::StopFailed { source })?;

        let snapshot = self.job.metrics().snapshot();
        info!(
            invocations = snapshot.invocations,
            failures = snapshot.failures,
            timeouts = snapshot.timeouts,
            "Sync scheduler stopped"
        );
        self.cancellation = CancellationToken::new();
        Ok(())
    }

    /// Returns true when a scheduler instance is active.
    pub fn is_running(&self) -> bool {
        self.scheduler.is_some()
    }

    async fn build_scheduler(&self) -> SchedulerResult<JobScheduler> {
        let scheduler =
            JobScheduler::new().await.map_err(|source| SchedulerError::CreationFailed { source })?;
        let job = self.job.clone();
        let cancel = self.cancellation.clone();

        let job_definition = Job::new_async(self.config.cron_expression.as_str(), move |_id, _lock| {
            let job = job.clone();
            let cancel = cancel.clone();
            Box::pin(async move {
                if cancel.is_cancelled() {
                    debug!("scheduler stopping, skipping trigger");
                    return;
                }
                debug!("scheduled sync triggered");
                job.run().await;
            })
        })
        .map_err(|source| SchedulerError::JobRegistrationFailed { source })?;

        let job_id = job_definition.guid();
        scheduler
            .add(job_definition)
            .await
            .map_err(|source| SchedulerError::JobRegistrationFailed { source })?;

        debug!(cron = %self.config.cron_expression, job_id = %job_id, "Registered sync job");
        Ok(scheduler)
    }
}

impl Drop for SyncScheduler {
    fn drop(&mut self) {
        if self.is_running() && !self.cancellation.is_cancelled() {
            warn!("SyncScheduler dropped while running; cancelling");
            self.cancellation.cancel();
        }
    }
}

/// Stable, non-reversible tag for an account in logs.
pub fn redact_email(email: &str) -> String {
    const EMAIL_HASH_SALT: &[u8] = b"unical-sync-scheduler-email-salt";
    let mut hasher = Sha256::new();
    hasher.update(EMAIL_HASH_SALT);
    hasher.update(email.trim().to_lowercase().as_bytes());
    let digest = hasher.finalize();
    let hash = hex::encode(&digest[..8]);
    format!("email_hash={hash}")
}
