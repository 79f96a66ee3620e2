//! Time windows used by one sync cycle

use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use unical_domain::{LocalZone, Result, SyncConfig, TimeWindow};

/// Knobs the orchestrator needs, resolved from configuration.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub backfill_months: u32,
    pub safety_past_days: i64,
    pub safety_future_days: i64,
    pub max_concurrent_accounts: usize,
    /// Upper bound for one account's cycle.
    pub account_timeout: StdDuration,
    pub zone: LocalZone,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self::from_config(&SyncConfig::default(), LocalZone::System)
    }
}

impl SyncSettings {
    pub fn from_config(config: &SyncConfig, zone: LocalZone) -> Self {
        Self {
            backfill_months: config.backfill_months,
            safety_past_days: config.safety_past_days,
            safety_future_days: config.safety_future_days,
            max_concurrent_accounts: config.max_concurrent_accounts.max(1),
            account_timeout: StdDuration::from_secs(config.job_timeout_secs.max(1)),
            zone,
        }
    }

    /// The two authoritative backfill windows: the last N months up to
    /// `now`, then `now` until the last second of the local year.
    pub fn backfill_windows(&self, now: DateTime<Utc>) -> Result<[TimeWindow; 2]> {
        let recent_start = self.zone.months_before_today(now, self.backfill_months);
        let year_end = self.zone.end_of_year(now).max(now);

        Ok([TimeWindow::new(recent_start, now)?, TimeWindow::new(now, year_end)?])
    }

    /// Span covered by both backfill windows; the token-seeding query uses it.
    pub fn seed_window(&self, now: DateTime<Utc>) -> Result<TimeWindow> {
        let [recent, rest] = self.backfill_windows(now)?;
        TimeWindow::new(recent.start(), rest.end())
    }

    /// Recent-past to near-future range re-fetched every cycle.
    pub fn safety_window(&self, now: DateTime<Utc>) -> Result<TimeWindow> {
        TimeWindow::new(
            now - Duration::days(self.safety_past_days.max(0)),
            now + Duration::days(self.safety_future_days.max(0)),
        )
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn berlin() -> SyncSettings {
        SyncSettings {
            zone: LocalZone::from_name(Some("Europe/Berlin")).unwrap(),
            ..SyncSettings::default()
        }
    }

    #[test]
    fn backfill_windows_are_contiguous() {
        let now = Utc.with_ymd_and_hms(2024, 5, 15, 10, 30, 0).unwrap();
        let [recent, rest] = berlin().backfill_windows(now).unwrap();

        // 2024-02-15 00:00 CET
        assert_eq!(recent.start(), Utc.with_ymd_and_hms(2024, 2, 14, 23, 0, 0).unwrap());
        assert_eq!(recent.end(), now);
        assert_eq!(rest.start(), now);
        // 2024-12-31 23:59:59 CET
        assert_eq!(rest.end(), Utc.with_ymd_and_hms(2024, 12, 31, 22, 59, 59).unwrap());
    }

    #[test]
    fn last_second_of_year_yields_empty_rest_window() {
        let settings = SyncSettings { zone: LocalZone::Named(chrono_tz::UTC), ..SyncSettings::default() };
        let now = Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).unwrap() + Duration::milliseconds(500);
        let [_, rest] = settings.backfill_windows(now).unwrap();
        assert!(rest.is_empty());
    }

    #[test]
    fn safety_window_spans_configured_days() {
        let now = Utc.with_ymd_and_hms(2024, 5, 15, 0, 0, 0).unwrap();
        let window = SyncSettings::default().safety_window(now).unwrap();
        assert_eq!(window.start(), now - Duration::days(7));
        assert_eq!(window.end(), now + Duration::days(180));
    }

    #[test]
    fn seed_window_covers_backfill() {
        let now = Utc.with_ymd_and_hms(2024, 5, 15, 10, 30, 0).unwrap();
        let settings = berlin();
        let [recent, rest] = settings.backfill_windows(now).unwrap();
        let seed = settings.seed_window(now).unwrap();
        assert_eq!(seed.start(), recent.start());
        assert_eq!(seed.end(), rest.end());
    }
}
