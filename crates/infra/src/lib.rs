//! # UniCalendar Infrastructure
//!
//! Infrastructure implementations of the core sync ports.
//!
//! This crate contains:
//! - SQLite stores for events, continuation tokens and accounts
//! - The retrying HTTP client and OAuth access-token providers
//! - Google Calendar and Microsoft Graph event sources
//! - Configuration loading, tracing setup and sync metrics
//! - The cron-driven sync scheduler
//!
//! ## Architecture
//! - Implements traits defined in `unical-core`
//! - Depends on `unical-common` and `unical-domain`
//! - Contains all "impure" code (I/O, network, clocks)

pub mod config;
pub mod database;
pub mod errors;
pub mod http;
pub mod integrations;
pub mod notifier;
pub mod observability;
pub mod scheduling;

// Re-export commonly used items
pub use database::*;
pub use errors::{status_error, InfraError};
pub use http::*;
pub use integrations::*;
pub use notifier::{BroadcastNotifier, DEFAULT_NOTIFIER_CAPACITY};
pub use scheduling::{SchedulerError, SyncJob, SyncScheduler, SyncSchedulerConfig};
