//! Scheduling infrastructure for automated sync runs
//!
//! The scheduler follows a few runtime rules:
//! - Explicit lifecycle management (start/stop)
//! - Join handles for spawned tasks
//! - Cancellation token support
//! - Timeout wrapping on all async operations

pub mod error;
pub mod sync_scheduler;

pub use error::{SchedulerError, SchedulerResult};
pub use sync_scheduler::{redact_email, SyncJob, SyncScheduler, SyncSchedulerConfig};
