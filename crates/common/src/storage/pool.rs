//! SQLite connection pool
//!
//! r2d2-based pooling with pragmas applied to each new connection.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use tracing::{debug, info, instrument, warn};

use super::config::StorageConfig;
use super::connection::SqliteConnection;
use super::error::{StorageError, StorageResult};
use super::pragmas::apply_connection_pragmas;

/// Pool state reported by [`SqlitePool::health_check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolHealth {
    pub connections: u32,
    pub idle_connections: u32,
    pub max_size: u32,
    pub connections_acquired: u64,
    pub connection_errors: u64,
}

/// SQLite connection pool
#[derive(Debug)]
pub struct SqlitePool {
    pool: Pool<SqliteConnectionManager>,
    config: StorageConfig,
    acquired: AtomicU64,
    errors: AtomicU64,
}

impl SqlitePool {
    /// Open (or create) the database file and build the pool.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid, the file can't be
    /// opened, or the pragmas can't be applied.
    #[instrument(skip(config), fields(db_path = %config.path.display(), pool_size = config.pool_size))]
    pub fn new(config: StorageConfig) -> StorageResult<Self> {
        config.validate()?;

        if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let init_config = config.clone();
        let manager = SqliteConnectionManager::file(&config.path).with_init(move |conn| {
            apply_connection_pragmas(conn, &init_config)
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
        });

        let pool = Pool::builder()
            .max_size(config.pool_size)
            .connection_timeout(config.connection_timeout())
            .build(manager)
            .map_err(|e| {
                warn!(error = %e, "failed to create connection pool");
                StorageError::Connection(format!("Failed to create pool: {e}"))
            })?;

        info!("sqlite pool created with {} connections", config.pool_size);
        Ok(Self { pool, config, acquired: AtomicU64::new(0), errors: AtomicU64::new(0) })
    }

    /// Check out a connection.
    #[instrument(skip(self), fields(pool_size = self.config.pool_size))]
    pub fn get(&self) -> StorageResult<SqliteConnection> {
        let start = Instant::now();
        match self.pool.get() {
            Ok(conn) => {
                self.acquired.fetch_add(1, Ordering::Relaxed);
                debug!("connection acquired in {}ms", start.elapsed().as_millis());
                Ok(SqliteConnection::new(conn))
            }
            Err(e) => {
                self.errors.fetch_add(1, Ordering::Relaxed);
                if e.to_string().to_lowercase().contains("timed out") {
                    warn!("connection checkout timed out after {:?}", self.config.connection_timeout());
                    Err(StorageError::Timeout(self.config.connection_timeout_secs))
                } else {
                    warn!(error = %e, "connection checkout failed");
                    Err(StorageError::Connection(format!("Failed to get connection: {e}")))
                }
            }
        }
    }

    /// Check out a connection and run `SELECT 1`.
    pub fn health_check(&self) -> StorageResult<PoolHealth> {
        let conn = self.get()?;
        conn.query_one("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        drop(conn);

        let state = self.pool.state();
        Ok(PoolHealth {
            connections: state.connections,
            idle_connections: state.idle_connections,
            max_size: self.config.pool_size,
            connections_acquired: self.acquired.load(Ordering::Relaxed),
            connection_errors: self.errors.load(Ordering::Relaxed),
        })
    }
}
