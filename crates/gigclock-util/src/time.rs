//! Time utilities for gigclock
//!
//! Provides the wall clock used by the binaries, shift thresholds, and the
//! calendar helpers used to scope attendance queries to days and months.
//!
//! # Mock Time for Development
//!
//! In debug builds, the `GIGCLOCK_MOCK_TIME` environment variable can be set
//! to override the system time for all time-sensitive operations. This is useful
//! for exercising lateness thresholds and day rollover by hand.
//!
//! Format: `YYYY-MM-DD HH:MM:SS` (e.g., `2025-12-25 09:05:00`)
//!
//! Example:
//! ```bash
//! GIGCLOCK_MOCK_TIME="2025-12-25 09:05:00" gigclock check-in --lat 39.9 --lon 116.4
//! ```

use chrono::{
    DateTime, Datelike, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;

/// Environment variable name for mock time (debug builds only)
pub const MOCK_TIME_ENV_VAR: &str = "GIGCLOCK_MOCK_TIME";

/// Cached mock time offset from the real time when the process started.
/// This allows mock time to advance naturally.
static MOCK_TIME_OFFSET: OnceLock<Option<chrono::Duration>> = OnceLock::new();

/// Initialize the mock time offset based on the environment variable.
#[allow(clippy::disallowed_methods)] // This is the internal implementation that wraps Local::now()
fn get_mock_time_offset() -> Option<chrono::Duration> {
    *MOCK_TIME_OFFSET.get_or_init(|| {
        #[cfg(debug_assertions)]
        {
            if let Ok(mock_time_str) = std::env::var(MOCK_TIME_ENV_VAR) {
                if let Ok(naive_dt) =
                    NaiveDateTime::parse_from_str(&mock_time_str, "%Y-%m-%d %H:%M:%S")
                {
                    if let Some(mock_dt) = Local.from_local_datetime(&naive_dt).single() {
                        let offset = mock_dt.signed_duration_since(chrono::Local::now());
                        tracing::info!(
                            mock_time = %mock_time_str,
                            offset_secs = offset.num_seconds(),
                            "Mock time enabled"
                        );
                        return Some(offset);
                    } else {
                        tracing::warn!(
                            mock_time = %mock_time_str,
                            "Failed to convert mock time to local timezone"
                        );
                    }
                } else {
                    tracing::warn!(
                        mock_time = %mock_time_str,
                        expected_format = "%Y-%m-%d %H:%M:%S",
                        "Invalid mock time format"
                    );
                }
            }
            None
        }
        #[cfg(not(debug_assertions))]
        {
            None
        }
    })
}

/// Get the current local time, respecting mock time settings in debug builds.
#[allow(clippy::disallowed_methods)] // This is the wrapper that provides mock time support
pub fn now() -> DateTime<Local> {
    let real_now = chrono::Local::now();

    if let Some(offset) = get_mock_time_offset() {
        real_now + offset
    } else {
        real_now
    }
}

/// Calendar date of an instant in the local timezone.
pub fn local_date(instant: &DateTime<Utc>) -> NaiveDate {
    instant.with_timezone(&Local).date_naive()
}

/// First instant of a local calendar date, in UTC.
///
/// When a DST jump skips local midnight, the first existing local time of
/// that day is used instead.
pub fn local_start_of_day(date: NaiveDate) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    Local
        .from_local_datetime(&midnight)
        .earliest()
        .or_else(|| {
            Local
                .from_local_datetime(&(midnight + chrono::Duration::hours(1)))
                .earliest()
        })
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
}

/// Format a DateTime as HH:MM for record lists.
pub fn format_clock_time<Tz: TimeZone>(dt: &DateTime<Tz>) -> String
where
    Tz::Offset: fmt::Display,
{
    dt.format("%H:%M").to_string()
}

/// Format a DateTime for display with full date and time.
pub fn format_datetime_full<Tz: TimeZone>(dt: &DateTime<Tz>) -> String
where
    Tz::Offset: fmt::Display,
{
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Wall-clock time of day, used for shift thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WallClock {
    pub hour: u8,
    pub minute: u8,
}

impl WallClock {
    pub fn new(hour: u8, minute: u8) -> Option<Self> {
        if hour < 24 && minute < 60 {
            Some(Self { hour, minute })
        } else {
            None
        }
    }

    pub fn to_naive_time(self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour as u32, self.minute as u32, 0).unwrap_or(NaiveTime::MIN)
    }

    /// Returns seconds since midnight
    pub fn as_seconds_from_midnight(&self) -> u32 {
        (self.hour as u32) * 3600 + (self.minute as u32) * 60
    }
}

impl PartialOrd for WallClock {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for WallClock {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.as_seconds_from_midnight()
            .cmp(&other.as_seconds_from_midnight())
    }
}

impl fmt::Display for WallClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Inclusive range of local calendar dates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// A range covering a single day
    pub fn day(date: NaiveDate) -> Self {
        Self { start: date, end: date }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Instants spanned by this range (local midnight to local midnight)
    pub fn to_time_range(&self) -> TimeRange {
        let end = self
            .end
            .succ_opt()
            .map(local_start_of_day)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        TimeRange {
            start: local_start_of_day(self.start),
            end,
        }
    }
}

/// Half-open range of instants `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn contains(&self, instant: &DateTime<Utc>) -> bool {
        *instant >= self.start && *instant < self.end
    }
}

/// Error parsing a `YYYY-MM` month
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Invalid month '{0}': expected YYYY-MM")]
pub struct ParseYearMonthError(pub String);

/// A calendar month, 1-based like chrono (`month` in 1..=12)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|_| Self { year, month })
    }

    /// Month containing the given date
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn last_day(&self) -> NaiveDate {
        self.following()
            .and_then(|next| next.first_day().pred_opt())
            .unwrap_or(NaiveDate::MAX)
    }

    pub fn date_range(&self) -> DateRange {
        DateRange::new(self.first_day(), self.last_day())
    }

    /// The previous calendar month
    pub fn prev(&self) -> Option<Self> {
        if self.month == 1 {
            Self::new(self.year - 1, 12)
        } else {
            Self::new(self.year, self.month - 1)
        }
    }

    /// The next calendar month, unless it lies after the month of `today`
    pub fn next_until(&self, today: NaiveDate) -> Option<Self> {
        self.following().filter(|next| *next <= Self::of(today))
    }

    fn following(&self) -> Option<Self> {
        if self.month == 12 {
            Self::new(self.year + 1, 1)
        } else {
            Self::new(self.year, self.month + 1)
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = ParseYearMonthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseYearMonthError(s.to_string());
        let (year, month) = s.trim().split_once('-').ok_or_else(err)?;
        let year: i32 = year.parse().map_err(|_| err())?;
        let month: u32 = month.parse().map_err(|_| err())?;
        Self::new(year, month).ok_or_else(err)
    }
}
