//! Google Calendar v3 event source

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use reqwest::Method;
use serde::Deserialize;
use tracing::{debug, instrument, warn};
use unical_core::{DeltaPage, RemoteEventSource, SeedPage, WindowPage};
use unical_domain::constants::{DEFAULT_EVENT_COLOR, HTTP_STATUS_GONE, MAX_PAGE_SIZE, UNTITLED_EVENT};
use unical_domain::{
    Account, Attendee, CalendarEvent, GoogleConfig, LocalZone, Provider, ResponseStatus, Result,
    TimeWindow,
};

use super::{clean_attendee_email, non_blank};
use crate::integrations::calendar::auth::AccessTokenProvider;
use crate::http::{read_json, HttpClient};

const WINDOW_FIELDS: &str = "items(id,status,summary,description,location,colorId,\
                             start(date,dateTime,timeZone),end(date,dateTime,timeZone),\
                             attendees(email,displayName,responseStatus),htmlLink),nextPageToken";
const DELTA_FIELDS: &str = "items(id,status,summary,description,location,colorId,\
                            start(date,dateTime,timeZone),end(date,dateTime,timeZone),\
                            attendees(email,displayName,responseStatus),htmlLink),\
                            nextPageToken,nextSyncToken";
const SEED_FIELDS: &str = "nextPageToken,nextSyncToken";

/// Google Calendar provider for the `primary` calendar of each account.
pub struct GoogleEventSource {
    http: HttpClient,
    api_base: String,
    tokens: Arc<dyn AccessTokenProvider>,
    zone: LocalZone,
    page_size: u32,
}

impl GoogleEventSource {
    pub fn new(http: HttpClient, config: &GoogleConfig, tokens: Arc<dyn AccessTokenProvider>) -> Self {
        Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            tokens,
            zone: LocalZone::default(),
            page_size: MAX_PAGE_SIZE,
        }
    }

    /// Timezone all-day dates are anchored to.
    pub fn with_zone(mut self, zone: LocalZone) -> Self {
        self.zone = zone;
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        self
    }

    async fn get_events(
        &self,
        account: &Account,
        query: &[(&str, String)],
    ) -> Result<reqwest::Response> {
        let token = self.tokens.access_token(account).await?;
        let url = format!("{}/calendars/primary/events", self.api_base);
        let request = self.http.request(Method::GET, url).bearer_auth(token).query(query);
        self.http.send(request).await
    }

    fn base_query(&self, fields: &str, page_token: Option<&str>) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("singleEvents", "true".to_string()),
            ("maxResults", self.page_size.to_string()),
            ("fields", fields.to_string()),
        ];
        if let Some(page_token) = page_token {
            query.push(("pageToken", page_token.to_string()));
        }
        query
    }

    fn map_event(&self, account: &Account, item: GoogleEvent) -> Option<CalendarEvent> {
        let (start, end, is_all_day) = match (&item.start, &item.end) {
            (Some(start), Some(end)) => self.span(start, end, &item.id)?,
            _ => {
                warn!(event_id = %item.id, "event without start or end skipped");
                return None;
            }
        };

        let attendees = item.attendees.map(|list| {
            list.into_iter()
                .filter_map(|a| {
                    let email = clean_attendee_email(a.email.as_deref(), &item.id)?;
                    Some(Attendee {
                        email: Some(email),
                        display_name: non_blank(a.display_name),
                        response_status: a.response_status.as_deref().and_then(response_status),
                    })
                })
                .collect()
        });

        Some(CalendarEvent {
            external_id: item.id,
            account_email: account.email.clone(),
            source: Provider::Google,
            title: non_blank(item.summary).unwrap_or_else(|| UNTITLED_EVENT.to_string()),
            location: non_blank(item.location),
            start,
            end,
            is_all_day,
            color: item.color_id.as_deref().map_or(DEFAULT_EVENT_COLOR, color_name).to_string(),
            agenda: non_blank(item.description),
            attendees,
            html_link: item.html_link,
        })
    }

    fn span(
        &self,
        start: &EventDateTime,
        end: &EventDateTime,
        event_id: &str,
    ) -> Option<(DateTime<Utc>, DateTime<Utc>, bool)> {
        if let Some(date) = start.date.as_deref() {
            let Ok(start_date) = NaiveDate::parse_from_str(date, "%Y-%m-%d") else {
                warn!(event_id, date, "unparseable all-day start skipped");
                return None;
            };
            let end_date =
                end.date.as_deref().and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());
            let (start, end) = self.zone.all_day_span(start_date, end_date);
            return Some((start, end, true));
        }

        let parse = |value: Option<&str>| {
            value
                .and_then(|v| DateTime::parse_from_rfc3339(v).ok())
                .map(|dt| dt.with_timezone(&Utc))
        };
        match (parse(start.date_time.as_deref()), parse(end.date_time.as_deref())) {
            (Some(start), Some(end)) => Some((start, end.max(start), false)),
            _ => {
                warn!(event_id, "unparseable event time skipped");
                None
            }
        }
    }
}

#[async_trait]
impl RemoteEventSource for GoogleEventSource {
    fn provider(&self) -> Provider {
        Provider::Google
    }

    #[instrument(skip(self, account, window), fields(account = %account.email, has_page = page_token.is_some()))]
    async fn fetch_window_page(
        &self,
        account: &Account,
        window: &TimeWindow,
        page_token: Option<&str>,
    ) -> Result<WindowPage> {
        let mut query = self.base_query(WINDOW_FIELDS, page_token);
        query.extend([
            ("orderBy", "startTime".to_string()),
            ("timeMin", rfc3339(window.start())),
            ("timeMax", rfc3339(window.end())),
            ("sanitizeHtml", "true".to_string()),
        ]);

        let response = self.get_events(account, &query).await?;
        let page: GoogleEventsResponse = read_json(response).await?;

        let events: Vec<CalendarEvent> = page
            .items
            .into_iter()
            .filter(|item| !item.is_cancelled())
            .filter_map(|item| self.map_event(account, item))
            .collect();
        debug!(count = events.len(), "window page fetched");

        Ok(WindowPage { events, next_page: page.next_page_token })
    }

    #[instrument(skip(self, account, sync_token), fields(account = %account.email, has_page = page_token.is_some()))]
    async fn fetch_delta_page(
        &self,
        account: &Account,
        sync_token: &str,
        page_token: Option<&str>,
    ) -> Result<DeltaPage> {
        let mut query = self.base_query(DELTA_FIELDS, page_token);
        query.extend([
            ("showDeleted", "true".to_string()),
            ("syncToken", sync_token.to_string()),
            ("sanitizeHtml", "true".to_string()),
        ]);

        let response = self.get_events(account, &query).await?;
        if response.status().as_u16() == HTTP_STATUS_GONE {
            warn!("sync token rejected by Google, full backfill required");
            return Ok(DeltaPage::Expired);
        }
        let page: GoogleEventsResponse = read_json(response).await?;

        let mut events = Vec::new();
        let mut deleted_ids = Vec::new();
        for item in page.items {
            if item.is_cancelled() {
                deleted_ids.push(item.id);
            } else if let Some(event) = self.map_event(account, item) {
                events.push(event);
            }
        }
        debug!(changed = events.len(), deleted = deleted_ids.len(), "delta page fetched");

        Ok(DeltaPage::Changes {
            events,
            deleted_ids,
            next_page: page.next_page_token,
            next_sync_token: page.next_sync_token,
        })
    }

    /// Google issues sync tokens for the unbounded event list, so the
    /// window is not sent.
    #[instrument(skip(self, account, _window), fields(account = %account.email, has_page = page_token.is_some()))]
    async fn fetch_seed_page(
        &self,
        account: &Account,
        _window: &TimeWindow,
        page_token: Option<&str>,
    ) -> Result<SeedPage> {
        let mut query = self.base_query(SEED_FIELDS, page_token);
        query.push(("showDeleted", "true".to_string()));

        let response = self.get_events(account, &query).await?;
        let page: GoogleSeedResponse = read_json(response).await?;

        Ok(SeedPage { next_page: page.next_page_token, next_sync_token: page.next_sync_token })
    }
}

fn rfc3339(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn response_status(value: &str) -> Option<ResponseStatus> {
    match value {
        "accepted" => Some(ResponseStatus::Accepted),
        "declined" => Some(ResponseStatus::Declined),
        "tentative" => Some(ResponseStatus::Tentative),
        "needsAction" => Some(ResponseStatus::NeedsAction),
        _ => None,
    }
}

/// Names of Google's fixed event color palette.
fn color_name(color_id: &str) -> &'static str {
    match color_id {
        "1" => "lavender",
        "2" => "sage",
        "3" => "grape",
        "4" => "flamingo",
        "5" => "banana",
        "6" => "tangerine",
        "7" => "peacock",
        "8" => "graphite",
        "9" => "blueberry",
        "10" => "basil",
        "11" => "tomato",
        _ => DEFAULT_EVENT_COLOR,
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleEventsResponse {
    #[serde(default)]
    items: Vec<GoogleEvent>,
    next_sync_token: Option<String>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleSeedResponse {
    next_sync_token: Option<String>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleEvent {
    id: String,
    status: Option<String>,
    summary: Option<String>,
    description: Option<String>,
    location: Option<String>,
    color_id: Option<String>,
    start: Option<EventDateTime>,
    end: Option<EventDateTime>,
    attendees: Option<Vec<GoogleAttendee>>,
    html_link: Option<String>,
}

impl GoogleEvent {
    fn is_cancelled(&self) -> bool {
        self.status.as_deref() == Some("cancelled")
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventDateTime {
    date_time: Option<String>,
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoogleAttendee {
    email: Option<String>,
    display_name: Option<String>,
    response_status: Option<String>,
}
