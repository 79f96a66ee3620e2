//! Normalized calendar events

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::account::Provider;
use crate::impl_domain_status_conversions;

/// Attendee response as reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Accepted,
    Declined,
    Tentative,
    NeedsAction,
}

impl_domain_status_conversions!(ResponseStatus {
    Accepted => "accepted",
    Declined => "declined",
    Tentative => "tentative",
    NeedsAction => "needs_action",
});

/// Purely descriptive attendee record stored alongside its event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendee {
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub response_status: Option<ResponseStatus>,
}

/// Event as produced by a remote source, before it gets a local id.
///
/// Identity is `(external_id, account_email, source)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub external_id: String,
    pub account_email: String,
    pub source: Provider,
    pub title: String,
    pub location: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub is_all_day: bool,
    pub color: String,
    pub agenda: Option<String>,
    pub attendees: Option<Vec<Attendee>>,
    pub html_link: Option<String>,
}

/// Event as persisted in the local store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredEvent {
    pub id: String,
    #[serde(flatten)]
    pub event: CalendarEvent,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
