//! SQLite-backed account persistence.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row};
use tokio::task;
use tracing::instrument;
use unical_core::AccountRepository;
use unical_domain::{normalize_email, Account, AccountStatus, Provider, Result, UnicalError};

use super::event_repository::timestamp;
use super::manager::{map_join_error, map_sql_error, DbManager};

const ACCOUNT_COLUMNS: &str =
    "email, provider, display_name, connected_at, is_connected, status, last_synced_at";

/// SQLite implementation of [`AccountRepository`]
pub struct SqliteAccountRepository {
    db: Arc<DbManager>,
}

impl SqliteAccountRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    async fn list_where(&self, clause: &'static str) -> Result<Vec<Account>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> Result<Vec<Account>> {
            let conn = db.get_connection()?;
            let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts {clause} ORDER BY connected_at, email");
            let mut stmt = conn.prepare(&sql).map_err(map_sql_error)?;
            let rows = stmt.query_map([], map_account_row).map_err(map_sql_error)?;
            rows.collect::<std::result::Result<Vec<_>, _>>().map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn update(&self, email: &str, sql: &'static str, value: String) -> Result<()> {
        let db = Arc::clone(&self.db);
        let email = normalize_email(email);

        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            let changed = conn.execute(sql, params![value, &email]).map_err(map_sql_error)?;
            if changed == 0 {
                return Err(UnicalError::NotFound(format!("account {email}")));
            }
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }
}

#[async_trait]
impl AccountRepository for SqliteAccountRepository {
    async fn list(&self) -> Result<Vec<Account>> {
        self.list_where("").await
    }

    async fn list_connected(&self) -> Result<Vec<Account>> {
        self.list_where("WHERE is_connected = 1").await
    }

    async fn get(&self, email: &str) -> Result<Option<Account>> {
        let db = Arc::clone(&self.db);
        let email = normalize_email(email);

        task::spawn_blocking(move || -> Result<Option<Account>> {
            let conn = db.get_connection()?;
            conn.query_row(
                &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = ?1"),
                params![&email],
                map_account_row,
            )
            .optional()
            .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    #[instrument(skip(self, account), fields(email = %account.email, provider = %account.provider))]
    async fn upsert(&self, account: &Account) -> Result<()> {
        let db = Arc::clone(&self.db);
        let account = account.clone();

        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            conn.execute(
                "INSERT INTO accounts (email, provider, display_name, connected_at, is_connected, status, last_synced_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(email) DO UPDATE SET
                    provider = excluded.provider,
                    display_name = COALESCE(excluded.display_name, accounts.display_name),
                    is_connected = excluded.is_connected,
                    status = excluded.status,
                    last_synced_at = COALESCE(excluded.last_synced_at, accounts.last_synced_at)",
                params![
                    normalize_email(&account.email),
                    account.provider.as_str(),
                    &account.display_name,
                    account.connected_at.timestamp_millis(),
                    account.is_connected,
                    account.status.to_string(),
                    account.last_synced_at.map(|t| t.timestamp_millis()),
                ],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    #[instrument(skip(self))]
    async fn set_status(&self, email: &str, status: AccountStatus) -> Result<()> {
        self.update(email, "UPDATE accounts SET status = ?1 WHERE email = ?2", status.to_string())
            .await
    }

    #[instrument(skip(self))]
    async fn mark_synced(&self, email: &str, at: DateTime<Utc>) -> Result<()> {
        let db = Arc::clone(&self.db);
        let email = normalize_email(email);

        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            let changed = conn
                .execute(
                    "UPDATE accounts SET last_synced_at = ?1 WHERE email = ?2",
                    params![at.timestamp_millis(), &email],
                )
                .map_err(map_sql_error)?;
            if changed == 0 {
                return Err(UnicalError::NotFound(format!("account {email}")));
            }
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    #[instrument(skip(self))]
    async fn remove(&self, email: &str) -> Result<bool> {
        let db = Arc::clone(&self.db);
        let email = normalize_email(email);

        task::spawn_blocking(move || -> Result<bool> {
            let conn = db.get_connection()?;
            let removed = conn
                .execute("DELETE FROM accounts WHERE email = ?1", params![&email])
                .map_err(map_sql_error)?;
            Ok(removed > 0)
        })
        .await
        .map_err(map_join_error)?
    }

    #[instrument(skip(self))]
    async fn remove_all(&self) -> Result<()> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            conn.execute("DELETE FROM accounts", []).map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }
}

fn map_account_row(row: &Row<'_>) -> rusqlite::Result<Account> {
    let provider: String = row.get(1)?;
    let provider = Provider::from_str(&provider)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, e.into()))?;
    let status: String = row.get(5)?;
    let status = AccountStatus::from_str(&status)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, e.into()))?;
    let last_synced_at = match row.get::<_, Option<i64>>(6)? {
        Some(_) => Some(timestamp(row, 6)?),
        None => None,
    };

    Ok(Account {
        email: row.get(0)?,
        provider,
        display_name: row.get(2)?,
        connected_at: timestamp(row, 3)?,
        is_connected: row.get(4)?,
        status,
        last_synced_at,
    })
}
