//! Common infrastructure shared across UniCalendar crates.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `platform`: SQLite storage (connection pool, pragmas, error types)

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Platform tier
// -------------------------------------------------------------------
#[cfg(feature = "platform")]
pub mod storage;

#[cfg(feature = "platform")]
pub use storage::{SqliteConnection, SqlitePool, StorageConfig, StorageError, StorageResult};
