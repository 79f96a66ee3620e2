//! SQLite-backed sync token storage.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use tokio::task;
use tracing::instrument;
use unical_core::TokenStore;
use unical_domain::{normalize_email, Result};

use super::manager::{map_join_error, map_sql_error, DbManager};

/// SQLite implementation of [`TokenStore`], one row per account.
pub struct SqliteTokenStore {
    db: Arc<DbManager>,
}

impl SqliteTokenStore {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TokenStore for SqliteTokenStore {
    async fn get(&self, account_email: &str) -> Result<Option<String>> {
        let db = Arc::clone(&self.db);
        let account = normalize_email(account_email);

        task::spawn_blocking(move || -> Result<Option<String>> {
            let conn = db.get_connection()?;
            conn.query_row(
                "SELECT token FROM sync_tokens WHERE account_email = ?1",
                params![&account],
                |row| row.get(0),
            )
            .optional()
            .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    #[instrument(skip(self, token))]
    async fn set(&self, account_email: &str, token: &str) -> Result<()> {
        let db = Arc::clone(&self.db);
        let account = normalize_email(account_email);
        let token = token.to_string();

        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            conn.execute(
                "INSERT INTO sync_tokens (account_email, token, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(account_email) DO UPDATE SET
                    token = excluded.token,
                    updated_at = excluded.updated_at",
                params![&account, &token, Utc::now().timestamp_millis()],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    #[instrument(skip(self))]
    async fn remove(&self, account_email: &str) -> Result<()> {
        let db = Arc::clone(&self.db);
        let account = normalize_email(account_email);

        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            conn.execute("DELETE FROM sync_tokens WHERE account_email = ?1", params![&account])
                .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    #[instrument(skip(self))]
    async fn remove_all(&self) -> Result<()> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            conn.execute("DELETE FROM sync_tokens", []).map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }
}
