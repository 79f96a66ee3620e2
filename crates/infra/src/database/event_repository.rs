//! SQLite-backed implementation of the `EventStore` port.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use tokio::task;
use tracing::{debug, instrument};
use unical_core::{ChangeNotifier, EventStore};
use unical_domain::{
    normalize_email, Attendee, CalendarEvent, ChangeSignal, Provider, Result, StoredEvent,
    TimeWindow, UnicalError,
};
use uuid::Uuid;

use super::manager::{map_join_error, map_sql_error, map_storage_error, DbManager};

const EVENT_COLUMNS: &str = "id, external_id, account_email, source, title, location, start_ts, \
                             end_ts, is_all_day, color, agenda, attendees_json, html_link, \
                             created_at, updated_at";

/// SQLite implementation of [`EventStore`]
pub struct SqliteEventStore {
    db: Arc<DbManager>,
    notifier: Arc<dyn ChangeNotifier>,
}

impl SqliteEventStore {
    /// Create a new event store publishing changes to `notifier`.
    pub fn new(db: Arc<DbManager>, notifier: Arc<dyn ChangeNotifier>) -> Self {
        Self { db, notifier }
    }

    fn events_changed(&self, account_email: String, source: Option<Provider>) {
        self.notifier.publish(ChangeSignal::EventsChanged { account_email, source });
    }
}

#[async_trait]
impl EventStore for SqliteEventStore {
    #[instrument(skip(self, events), fields(source = %source, count = events.len()))]
    async fn replace(
        &self,
        account_email: &str,
        source: Provider,
        events: &[CalendarEvent],
    ) -> Result<usize> {
        let db = Arc::clone(&self.db);
        let account = normalize_email(account_email);
        let events = events.to_vec();
        let owner = account.clone();

        let written = task::spawn_blocking(move || -> Result<usize> {
            let mut conn = db.get_connection()?;
            let tx = conn.begin().map_err(map_storage_error)?;
            let removed = tx
                .execute(
                    "DELETE FROM calendar_events WHERE account_email = ?1 AND source = ?2",
                    params![&owner, source.as_str()],
                )
                .map_err(map_sql_error)?;
            let written = write_events(&tx, &owner, source, &events)?;
            tx.commit().map_err(map_sql_error)?;
            debug!(removed, written, "replaced account events");
            Ok(written)
        })
        .await
        .map_err(map_join_error)??;

        self.events_changed(account, Some(source));
        Ok(written)
    }

    #[instrument(skip(self, events), fields(source = %source, count = events.len()))]
    async fn upsert(
        &self,
        account_email: &str,
        source: Provider,
        events: &[CalendarEvent],
    ) -> Result<usize> {
        if events.is_empty() {
            return Ok(0);
        }

        let db = Arc::clone(&self.db);
        let account = normalize_email(account_email);
        let events = events.to_vec();
        let owner = account.clone();

        let written = task::spawn_blocking(move || -> Result<usize> {
            let mut conn = db.get_connection()?;
            let tx = conn.begin().map_err(map_storage_error)?;
            let written = write_events(&tx, &owner, source, &events)?;
            tx.commit().map_err(map_sql_error)?;
            Ok(written)
        })
        .await
        .map_err(map_join_error)??;

        self.events_changed(account, Some(source));
        Ok(written)
    }

    #[instrument(skip(self, ids), fields(source = %source, count = ids.len()))]
    async fn delete_by_external_ids(
        &self,
        ids: &[String],
        account_email: &str,
        source: Provider,
    ) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        let db = Arc::clone(&self.db);
        let account = normalize_email(account_email);
        let ids = ids.to_vec();
        let owner = account.clone();

        let removed = task::spawn_blocking(move || -> Result<usize> {
            let mut conn = db.get_connection()?;
            let tx = conn.begin().map_err(map_storage_error)?;
            let mut removed = 0;
            {
                let mut stmt = tx
                    .prepare(
                        "DELETE FROM calendar_events
                         WHERE external_id = ?1 AND account_email = ?2 AND source = ?3",
                    )
                    .map_err(map_sql_error)?;
                for id in &ids {
                    removed +=
                        stmt.execute(params![id, &owner, source.as_str()]).map_err(map_sql_error)?;
                }
            }
            tx.commit().map_err(map_sql_error)?;
            Ok(removed)
        })
        .await
        .map_err(map_join_error)??;

        if removed > 0 {
            self.events_changed(account, Some(source));
        }
        Ok(removed)
    }

    #[instrument(skip(self))]
    async fn delete_account(&self, account_email: &str) -> Result<usize> {
        let db = Arc::clone(&self.db);
        let account = normalize_email(account_email);
        let owner = account.clone();

        let removed = task::spawn_blocking(move || -> Result<usize> {
            let conn = db.get_connection()?;
            conn.execute("DELETE FROM calendar_events WHERE account_email = ?1", params![&owner])
                .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)??;

        if removed > 0 {
            self.events_changed(account, None);
        }
        Ok(removed)
    }

    #[instrument(skip(self, window), fields(start = %window.start(), end = %window.end()))]
    async fn query(
        &self,
        window: &TimeWindow,
        account_filter: Option<&str>,
    ) -> Result<Vec<StoredEvent>> {
        let db = Arc::clone(&self.db);
        let start = window.start().timestamp_millis();
        let end = window.end().timestamp_millis();
        let filter = account_filter.map(normalize_email);

        task::spawn_blocking(move || -> Result<Vec<StoredEvent>> {
            let conn = db.get_connection()?;
            let sql = format!(
                "SELECT {EVENT_COLUMNS} FROM calendar_events
                 WHERE ((end_ts > ?1 AND start_ts < ?2)
                        OR (start_ts = end_ts AND start_ts >= ?1 AND start_ts < ?2))
                   AND (?3 IS NULL OR account_email = ?3)
                 ORDER BY start_ts ASC, end_ts ASC"
            );
            let mut stmt = conn.prepare(&sql).map_err(map_sql_error)?;
            let rows = stmt
                .query_map(params![start, end, filter], map_event_row)
                .map_err(map_sql_error)?;
            rows.collect::<std::result::Result<Vec<_>, _>>().map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }
}

fn write_events(
    conn: &Connection,
    account_email: &str,
    source: Provider,
    events: &[CalendarEvent],
) -> Result<usize> {
    let now = Utc::now().timestamp_millis();
    let mut stmt = conn
        .prepare(
            "INSERT INTO calendar_events (
                id, external_id, account_email, source, title, location, start_ts, end_ts,
                is_all_day, color, agenda, attendees_json, html_link, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?14)
            ON CONFLICT(external_id, account_email, source) DO UPDATE SET
                title = excluded.title,
                location = excluded.location,
                start_ts = excluded.start_ts,
                end_ts = excluded.end_ts,
                is_all_day = excluded.is_all_day,
                color = excluded.color,
                agenda = excluded.agenda,
                attendees_json = excluded.attendees_json,
                html_link = excluded.html_link,
                updated_at = excluded.updated_at",
        )
        .map_err(map_sql_error)?;

    let mut written = 0;
    for event in events {
        let attendees = event
            .attendees
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| UnicalError::Internal(format!("failed to encode attendees: {e}")))?;

        written += stmt
            .execute(params![
                Uuid::now_v7().to_string(),
                &event.external_id,
                account_email,
                source.as_str(),
                &event.title,
                &event.location,
                event.start.timestamp_millis(),
                event.end.timestamp_millis(),
                event.is_all_day,
                &event.color,
                &event.agenda,
                attendees,
                &event.html_link,
                now,
            ])
            .map_err(map_sql_error)?;
    }
    Ok(written)
}

fn map_event_row(row: &Row<'_>) -> rusqlite::Result<StoredEvent> {
    let source: String = row.get(3)?;
    let source = Provider::from_str(&source)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, e.into()))?;

    let attendees: Option<String> = row.get(11)?;
    let attendees = attendees
        .map(|json| serde_json::from_str::<Vec<Attendee>>(&json))
        .transpose()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(11, Type::Text, Box::new(e)))?;

    Ok(StoredEvent {
        id: row.get(0)?,
        event: CalendarEvent {
            external_id: row.get(1)?,
            account_email: row.get(2)?,
            source,
            title: row.get(4)?,
            location: row.get(5)?,
            start: timestamp(row, 6)?,
            end: timestamp(row, 7)?,
            is_all_day: row.get(8)?,
            color: row.get(9)?,
            agenda: row.get(10)?,
            attendees,
            html_link: row.get(12)?,
        },
        created_at: timestamp(row, 13)?,
        updated_at: timestamp(row, 14)?,
    })
}

/// Instants are stored as unix milliseconds.
pub(crate) fn timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let millis: i64 = row.get(idx)?;
    DateTime::from_timestamp_millis(millis).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Integer,
            format!("timestamp out of range: {millis}").into(),
        )
    })
}
