//! Microsoft Graph (Outlook) event source

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use chrono_tz::Tz;
use reqwest::{Method, RequestBuilder};
use serde::Deserialize;
use tracing::{debug, instrument, warn};
use unical_core::{DeltaPage, RemoteEventSource, SeedPage, WindowPage};
use unical_domain::constants::{DEFAULT_EVENT_COLOR, HTTP_STATUS_GONE, UNTITLED_EVENT};
use unical_domain::{
    Account, Attendee, CalendarEvent, LocalZone, MicrosoftConfig, Provider, ResponseStatus, Result,
    TimeWindow, UnicalError,
};
use url::Url;

use super::{clean_attendee_email, non_blank};
use crate::http::{read_json, HttpClient};
use crate::integrations::calendar::auth::AccessTokenProvider;

const OUTLOOK_TIMEZONE_HEADER: &str = r#"outlook.timezone="UTC""#;
const OUTLOOK_ID_TYPE_HEADER: &str = r#"IdType="ImmutableId""#;
const EVENT_SELECT: &str =
    "id,subject,bodyPreview,location,start,end,isAllDay,isCancelled,categories,attendees,webLink";
/// Graph caps `$top` and `odata.maxpagesize` for calendar views.
const GRAPH_MAX_PAGE_SIZE: u32 = 1000;

/// Microsoft Graph provider for the default calendar of each account.
///
/// Continuations are the absolute `@odata.nextLink` URLs and the sync token
/// is the `@odata.deltaLink` URL.
pub struct MicrosoftEventSource {
    http: HttpClient,
    api_base: String,
    tokens: Arc<dyn AccessTokenProvider>,
    zone: LocalZone,
    page_size: u32,
}

impl MicrosoftEventSource {
    pub fn new(
        http: HttpClient,
        config: &MicrosoftConfig,
        tokens: Arc<dyn AccessTokenProvider>,
    ) -> Self {
        Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            tokens,
            zone: LocalZone::default(),
            page_size: 50,
        }
    }

    pub fn with_zone(mut self, zone: LocalZone) -> Self {
        self.zone = zone;
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.clamp(1, GRAPH_MAX_PAGE_SIZE);
        self
    }

    fn max_page_size_header(&self) -> String {
        format!("odata.maxpagesize={}", self.page_size)
    }

    /// Continuation links must point back at the configured Graph host;
    /// the bearer token is never sent anywhere else.
    fn continuation_url(&self, link: &str) -> Result<Url> {
        let base = Url::parse(&self.api_base)
            .map_err(|e| UnicalError::Config(format!("invalid Graph api_base: {e}")))?;
        let url = Url::parse(link)
            .map_err(|e| UnicalError::Decode(format!("invalid continuation link: {e}")))?;
        if url.origin() != base.origin() {
            return Err(UnicalError::Decode(format!(
                "continuation link points outside {}",
                base.origin().ascii_serialization()
            )));
        }
        Ok(url)
    }

    async fn get(&self, account: &Account, request: RequestBuilder) -> Result<reqwest::Response> {
        let token = self.tokens.access_token(account).await?;
        let request = request
            .bearer_auth(token)
            .header("Prefer", OUTLOOK_TIMEZONE_HEADER)
            .header("Prefer", self.max_page_size_header())
            .header("Prefer", OUTLOOK_ID_TYPE_HEADER);
        self.http.send(request).await
    }

    fn delta_request(&self, window: &TimeWindow, link: Option<&str>) -> Result<RequestBuilder> {
        match link {
            Some(link) => Ok(self.http.request(Method::GET, self.continuation_url(link)?)),
            None => Ok(self
                .http
                .request(Method::GET, format!("{}/me/calendarView/delta", self.api_base))
                .query(&[("startDateTime", iso(window.start())), ("endDateTime", iso(window.end()))])),
        }
    }

    fn map_event(&self, account: &Account, item: GraphEvent) -> Option<CalendarEvent> {
        let (start, end) = match (&item.start, &item.end) {
            (Some(start), Some(end)) => (start, end),
            _ => {
                warn!(event_id = %item.id, "event without start or end skipped");
                return None;
            }
        };

        let (start, end) = if item.is_all_day {
            let start_date = parse_graph_time(start)?.date_naive();
            let end_date = parse_graph_time(end).map(|e| e.date_naive());
            self.zone.all_day_span(start_date, end_date)
        } else {
            match (parse_graph_time(start), parse_graph_time(end)) {
                (Some(start), Some(end)) => (start, end.max(start)),
                _ => {
                    warn!(event_id = %item.id, "unparseable event time skipped");
                    return None;
                }
            }
        };

        let attendees = item.attendees.map(|list| {
            list.into_iter()
                .filter_map(|a| {
                    let address = a.email_address.as_ref().and_then(|e| e.address.as_deref());
                    let email = clean_attendee_email(address, &item.id)?;
                    Some(Attendee {
                        email: Some(email),
                        display_name: non_blank(a.email_address.and_then(|e| e.name)),
                        response_status: a
                            .status
                            .and_then(|s| s.response)
                            .as_deref()
                            .and_then(response_status),
                    })
                })
                .collect()
        });

        Some(CalendarEvent {
            external_id: item.id,
            account_email: account.email.clone(),
            source: Provider::Outlook,
            title: non_blank(item.subject).unwrap_or_else(|| UNTITLED_EVENT.to_string()),
            location: non_blank(item.location.and_then(|l| l.display_name)),
            start,
            end,
            is_all_day: item.is_all_day,
            color: item.categories.first().map_or_else(|| DEFAULT_EVENT_COLOR.to_string(), |c| category_color(c)),
            agenda: non_blank(item.body_preview),
            attendees,
            html_link: item.web_link,
        })
    }
}

#[async_trait]
impl RemoteEventSource for MicrosoftEventSource {
    fn provider(&self) -> Provider {
        Provider::Outlook
    }

    #[instrument(skip(self, account, window), fields(account = %account.email, has_page = page_token.is_some()))]
    async fn fetch_window_page(
        &self,
        account: &Account,
        window: &TimeWindow,
        page_token: Option<&str>,
    ) -> Result<WindowPage> {
        let request = match page_token {
            Some(link) => self.http.request(Method::GET, self.continuation_url(link)?),
            None => self
                .http
                .request(Method::GET, format!("{}/me/calendarView", self.api_base))
                .query(&[
                    ("startDateTime", iso(window.start())),
                    ("endDateTime", iso(window.end())),
                    ("$orderby", "start/dateTime".to_string()),
                    ("$top", self.page_size.to_string()),
                    ("$select", EVENT_SELECT.to_string()),
                ]),
        };

        let response = self.get(account, request).await?;
        let page: GraphEventsResponse = read_json(response).await?;

        let events: Vec<CalendarEvent> = page
            .value
            .into_iter()
            .filter(|item| !item.is_removed())
            .filter_map(|item| self.map_event(account, item))
            .collect();
        debug!(count = events.len(), "window page fetched");

        Ok(WindowPage { events, next_page: page.next_link })
    }

    #[instrument(skip(self, account, sync_token), fields(account = %account.email, has_page = page_token.is_some()))]
    async fn fetch_delta_page(
        &self,
        account: &Account,
        sync_token: &str,
        page_token: Option<&str>,
    ) -> Result<DeltaPage> {
        let link = page_token.unwrap_or(sync_token);
        let request = self.http.request(Method::GET, self.continuation_url(link)?);

        let response = self.get(account, request).await?;
        if response.status().as_u16() == HTTP_STATUS_GONE {
            warn!("delta link rejected by Graph, full backfill required");
            return Ok(DeltaPage::Expired);
        }
        let page: GraphEventsResponse = read_json(response).await?;

        let mut events = Vec::new();
        let mut deleted_ids = Vec::new();
        for item in page.value {
            if item.is_removed() {
                deleted_ids.push(item.id);
            } else if let Some(event) = self.map_event(account, item) {
                events.push(event);
            }
        }
        debug!(changed = events.len(), deleted = deleted_ids.len(), "delta page fetched");

        Ok(DeltaPage::Changes {
            events,
            deleted_ids,
            next_page: page.next_link,
            next_sync_token: page.delta_link,
        })
    }

    #[instrument(skip(self, account, window), fields(account = %account.email, has_page = page_token.is_some()))]
    async fn fetch_seed_page(
        &self,
        account: &Account,
        window: &TimeWindow,
        page_token: Option<&str>,
    ) -> Result<SeedPage> {
        let request = self.delta_request(window, page_token)?;
        let response = self.get(account, request).await?;
        let page: GraphEventsResponse = read_json(response).await?;

        Ok(SeedPage { next_page: page.next_link, next_sync_token: page.delta_link })
    }
}

fn iso(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Graph returns wall-clock times plus a zone name; with the UTC preference
/// header the zone is UTC, anything else is resolved by IANA name.
fn parse_graph_time(value: &GraphDateTime) -> Option<DateTime<Utc>> {
    let raw = value.date_time.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
    match value.time_zone.as_deref().map(str::trim) {
        None | Some("") => Some(naive.and_utc()),
        Some(tz) if tz.eq_ignore_ascii_case("utc") => Some(naive.and_utc()),
        Some(tz) => match tz.parse::<Tz>() {
            Ok(tz) => Some(LocalZone::Named(tz).resolve(naive)),
            Err(_) => {
                warn!(time_zone = tz, "unknown Graph time zone, reading as UTC");
                Some(naive.and_utc())
            }
        },
    }
}

fn response_status(value: &str) -> Option<ResponseStatus> {
    match value {
        "accepted" | "organizer" => Some(ResponseStatus::Accepted),
        "declined" => Some(ResponseStatus::Declined),
        "tentativelyAccepted" => Some(ResponseStatus::Tentative),
        "none" | "notResponded" => Some(ResponseStatus::NeedsAction),
        _ => None,
    }
}

/// Outlook's preset categories are named "<Color> category".
fn category_color(category: &str) -> String {
    let lower = category.trim().to_lowercase();
    lower.strip_suffix(" category").unwrap_or(&lower).to_string()
}

#[derive(Debug, Deserialize)]
struct GraphEventsResponse {
    #[serde(default)]
    value: Vec<GraphEvent>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
    #[serde(rename = "@odata.deltaLink")]
    delta_link: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphEvent {
    id: String,
    subject: Option<String>,
    body_preview: Option<String>,
    location: Option<GraphLocation>,
    start: Option<GraphDateTime>,
    end: Option<GraphDateTime>,
    #[serde(default)]
    is_all_day: bool,
    #[serde(default)]
    is_cancelled: bool,
    #[serde(default)]
    categories: Vec<String>,
    attendees: Option<Vec<GraphAttendee>>,
    web_link: Option<String>,
    #[serde(rename = "@removed")]
    removed: Option<serde_json::Value>,
}

impl GraphEvent {
    fn is_removed(&self) -> bool {
        self.removed.is_some() || self.is_cancelled
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphDateTime {
    date_time: String,
    time_zone: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphLocation {
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphAttendee {
    email_address: Option<GraphEmailAddress>,
    status: Option<GraphResponse>,
}

#[derive(Debug, Deserialize)]
struct GraphEmailAddress {
    address: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GraphResponse {
    response: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrations::calendar::auth::StaticTokenProvider;

    fn source() -> MicrosoftEventSource {
        let config = MicrosoftConfig {
            api_base: "https://graph.example.com/v1.0".into(),
            ..MicrosoftConfig::default()
        };
        MicrosoftEventSource::new(HttpClient::new().unwrap(), &config, Arc::new(StaticTokenProvider::new()))
            .with_zone(LocalZone::from_name(Some("America/New_York")).unwrap())
    }

    fn decode(json: serde_json::Value) -> GraphEvent {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn utc_wall_clock_times_are_read_as_utc() {
        let time = GraphDateTime { date_time: "2024-06-01T09:00:00.0000000".into(), time_zone: Some("UTC".into()) };
        assert_eq!(parse_graph_time(&time).unwrap().to_rfc3339(), "2024-06-01T09:00:00+00:00");
    }

    #[test]
    fn all_day_event_is_anchored_to_local_midnight() {
        let account = Account::new("a@example.com", Provider::Outlook, None);
        let event = source()
            .map_event(
                &account,
                decode(serde_json::json!({
                    "id": "AAMk1",
                    "subject": "Offsite",
                    "isAllDay": true,
                    "categories": ["Red category"],
                    "start": {"dateTime": "2024-06-01T00:00:00.0000000", "timeZone": "UTC"},
                    "end": {"dateTime": "2024-06-03T00:00:00.0000000", "timeZone": "UTC"}
                })),
            )
            .unwrap();

        // EDT is UTC-4
        assert_eq!(event.start.to_rfc3339(), "2024-06-01T04:00:00+00:00");
        assert_eq!(event.end.to_rfc3339(), "2024-06-03T04:00:00+00:00");
        assert_eq!(event.color, "red");
        assert_eq!(event.source, Provider::Outlook);
    }

    #[test]
    fn removed_items_are_flagged() {
        let item = decode(serde_json::json!({"id": "gone", "@removed": {"reason": "deleted"}}));
        assert!(item.is_removed());
        let item = decode(serde_json::json!({"id": "off", "isCancelled": true}));
        assert!(item.is_removed());
    }

    #[test]
    fn continuation_links_must_stay_on_graph_host() {
        let source = source();
        assert!(source.continuation_url("https://graph.example.com/v1.0/me/calendarView?$skip=50").is_ok());
        assert!(matches!(
            source.continuation_url("https://evil.example.net/steal"),
            Err(UnicalError::Decode(_))
        ));
    }
}
