//! Storage primitives for SQLite databases
//!
//! Pooled connections with per-connection pragmas applied on checkout.
//! Schema management belongs to the application using the pool.

pub mod config;
pub mod connection;
pub mod error;
pub mod pool;
pub mod pragmas;

// Re-export commonly used types
pub use config::StorageConfig;
pub use connection::SqliteConnection;
pub use error::{StorageError, StorageResult};
pub use pool::{PoolHealth, SqlitePool};
pub use pragmas::apply_connection_pragmas;
