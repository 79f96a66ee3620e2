//! Domain constants
//!
//! Defaults shared by configuration, providers and the orchestrator.

/// Maximum page size accepted by the Google Calendar events endpoint.
pub const MAX_PAGE_SIZE: u32 = 2500;

/// Months fetched before "now" during the initial backfill.
pub const DEFAULT_BACKFILL_MONTHS: u32 = 3;

/// Safety window re-fetched on every cycle, relative to now.
pub const DEFAULT_SAFETY_PAST_DAYS: i64 = 7;
pub const DEFAULT_SAFETY_FUTURE_DAYS: i64 = 180;

/// Title used when the remote event has no summary.
pub const UNTITLED_EVENT: &str = "(No Title)";

/// Color assigned when the provider does not supply one.
pub const DEFAULT_EVENT_COLOR: &str = "blue";

/// Default cron schedule for periodic sync (every 15 minutes).
pub const DEFAULT_SYNC_CRON: &str = "0 */15 * * * *";

/// HTTP status the calendar APIs use for an expired continuation token.
pub const HTTP_STATUS_GONE: u16 = 410;
