//! Local-calendar arithmetic
//!
//! All-day events are floating dates: they are anchored to midnight in the
//! user's local timezone, not in UTC. [`LocalZone`] carries that timezone.

use chrono::{
    DateTime, Datelike, Duration, Local, LocalResult, Months, NaiveDate, NaiveDateTime, NaiveTime,
    TimeZone, Utc,
};
use chrono_tz::Tz;

use crate::errors::{Result, UnicalError};

/// The timezone that defines "local midnight".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocalZone {
    /// Whatever the host reports.
    #[default]
    System,
    Named(Tz),
}

impl LocalZone {
    /// Parse an optional IANA timezone name; `None` means the system zone.
    pub fn from_name(name: Option<&str>) -> Result<Self> {
        match name.map(str::trim).filter(|n| !n.is_empty()) {
            None => Ok(Self::System),
            Some(name) => name
                .parse::<Tz>()
                .map(Self::Named)
                .map_err(|e| UnicalError::Config(format!("unknown timezone '{name}': {e}"))),
        }
    }

    /// Instant of local midnight at the start of `date`.
    pub fn midnight(&self, date: NaiveDate) -> DateTime<Utc> {
        match self {
            Self::System => local_midnight(&Local, date),
            Self::Named(tz) => local_midnight(tz, date),
        }
    }

    /// Local calendar date containing `instant`.
    pub fn date_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        match self {
            Self::System => instant.with_timezone(&Local).date_naive(),
            Self::Named(tz) => instant.with_timezone(tz).date_naive(),
        }
    }

    /// Interpret a wall-clock time in this zone.
    pub fn resolve(&self, naive: NaiveDateTime) -> DateTime<Utc> {
        match self {
            Self::System => resolve_local(&Local, naive),
            Self::Named(tz) => resolve_local(tz, naive),
        }
    }

    /// Local midnight at the start of the day containing `instant`.
    pub fn start_of_day(&self, instant: DateTime<Utc>) -> DateTime<Utc> {
        self.midnight(self.date_of(instant))
    }

    /// Span of an all-day event: local midnight of `start` until local
    /// midnight of `end`. A missing or non-increasing end date yields a
    /// single day.
    pub fn all_day_span(
        &self,
        start: NaiveDate,
        end: Option<NaiveDate>,
    ) -> (DateTime<Utc>, DateTime<Utc>) {
        let end = end.filter(|e| *e > start).unwrap_or_else(|| next_day(start));
        (self.midnight(start), self.midnight(end))
    }

    /// `months` calendar months before the start of `now`'s local day.
    pub fn months_before_today(&self, now: DateTime<Utc>, months: u32) -> DateTime<Utc> {
        let today = self.date_of(now);
        let date = today.checked_sub_months(Months::new(months)).unwrap_or(NaiveDate::MIN);
        self.midnight(date)
    }

    /// Dec 31, 23:59:59 local time of `now`'s year.
    pub fn end_of_year(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let year = self.date_of(now).year();
        let last = NaiveDate::from_ymd_opt(year, 12, 31)
            .and_then(|d| d.and_hms_opt(23, 59, 59))
            .unwrap_or(NaiveDateTime::MAX);
        self.resolve(last)
    }
}

fn next_day(date: NaiveDate) -> NaiveDate {
    date.succ_opt().unwrap_or(date)
}

fn local_midnight<Z: TimeZone>(tz: &Z, date: NaiveDate) -> DateTime<Utc> {
    resolve_local(tz, date.and_time(NaiveTime::MIN))
}

// Ambiguous times take the earlier instant; times inside a DST gap move
// forward by the gap.
fn resolve_local<Z: TimeZone>(tz: &Z, naive: NaiveDateTime) -> DateTime<Utc> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        LocalResult::None => tz
            .from_local_datetime(&(naive + Duration::hours(1)))
            .earliest()
            .map_or_else(|| naive.and_utc(), |dt| dt.with_timezone(&Utc)),
    }
}
