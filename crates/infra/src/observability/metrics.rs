//! Sync run counters
//!
//! Plain atomics; no locking. Durations are stored in microseconds and
//! reported in milliseconds.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;

/// Counters for scheduled and manual sync runs.
#[derive(Debug, Default)]
pub struct SyncMetrics {
    invocations: AtomicU64,
    failures: AtomicU64,
    timeouts: AtomicU64,
    events_applied: AtomicU64,
    last_duration_micros: AtomicU64,
    total_duration_micros: AtomicU64,
}

/// Point-in-time copy of [`SyncMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncMetricsSnapshot {
    pub invocations: u64,
    pub failures: u64,
    pub timeouts: u64,
    pub events_applied: u64,
    pub last_duration_ms: u64,
    pub avg_duration_ms: u64,
}

impl SyncMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finished run and the events it applied.
    pub fn record_run(&self, duration: Duration, events_applied: usize) {
        let micros = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);

        // SeqCst: total and count feed the average
        self.invocations.fetch_add(1, Ordering::SeqCst);
        self.total_duration_micros.fetch_add(micros, Ordering::SeqCst);

        self.last_duration_micros.store(micros, Ordering::Relaxed);
        self.events_applied.fetch_add(events_applied as u64, Ordering::Relaxed);
    }

    /// A run that reported at least one failed account.
    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    /// A run cut off by the job timeout. Counts as an invocation.
    pub fn record_timeout(&self, elapsed: Duration) {
        self.record_run(elapsed, 0);
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SyncMetricsSnapshot {
        let invocations = self.invocations.load(Ordering::SeqCst);
        let total = self.total_duration_micros.load(Ordering::SeqCst);

        SyncMetricsSnapshot {
            invocations,
            failures: self.failures.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            events_applied: self.events_applied.load(Ordering::Relaxed),
            last_duration_ms: self.last_duration_micros.load(Ordering::Relaxed) / 1_000,
            avg_duration_ms: if invocations == 0 { 0 } else { total / invocations / 1_000 },
        }
    }
}
