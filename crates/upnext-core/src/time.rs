//! Time types for calendar events.
//!
//! This module provides [`EventTime`] for representing event start/end times
//! (which may be either a specific datetime or an all-day date),
//! [`TimeWindow`] for the query range of a digest run, and the
//! [`CalendarRange`] resolution that turns a configured range into a concrete
//! window in the configured timezone.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;

/// Represents the time of a calendar event.
///
/// Calendar events can have two types of times:
/// - **DateTime**: A specific point in time (stored as UTC)
/// - **AllDay**: A date without a specific time (all-day events)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum EventTime {
    /// A specific datetime, stored in UTC.
    DateTime(DateTime<Utc>),
    /// An all-day event date (no specific time).
    AllDay(NaiveDate),
}

impl EventTime {
    /// Creates a new `EventTime::DateTime` from a UTC datetime.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self::DateTime(dt)
    }

    /// Creates a new `EventTime::AllDay` from a date.
    pub fn from_date(date: NaiveDate) -> Self {
        Self::AllDay(date)
    }

    /// Returns `true` if this is an all-day event time.
    pub fn is_all_day(&self) -> bool {
        matches!(self, Self::AllDay(_))
    }

    /// Converts to a UTC datetime for comparison purposes.
    ///
    /// For all-day events, returns midnight UTC on that date.
    pub fn to_utc_datetime(&self) -> DateTime<Utc> {
        match self {
            Self::DateTime(dt) => *dt,
            Self::AllDay(date) => date.and_hms_opt(0, 0, 0).expect("valid time").and_utc(),
        }
    }

    /// Returns the date of this event time in the given timezone.
    ///
    /// All-day events carry their date directly; datetimes are converted.
    pub fn date_in(&self, tz: &Tz) -> NaiveDate {
        match self {
            Self::DateTime(dt) => dt.with_timezone(tz).date_naive(),
            Self::AllDay(date) => *date,
        }
    }

    /// Returns true if this event time, interpreted as an end time, is fully
    /// in the past at `now`.
    ///
    /// A timed end is past once `end < now`. An all-day end is past only once
    /// its whole day is over in the given timezone.
    pub fn is_past_end(&self, now: DateTime<Utc>, tz: &Tz) -> bool {
        match self {
            Self::DateTime(dt) => *dt < now,
            Self::AllDay(date) => {
                let next_midnight = local_midnight_utc(date.succ_opt().unwrap_or(*date), tz);
                next_midnight <= now
            }
        }
    }
}

impl PartialOrd for EventTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EventTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_utc_datetime().cmp(&other.to_utc_datetime())
    }
}

/// A time window for a digest run.
///
/// Represents a half-open interval `[start, end)` in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Start of the window (inclusive).
    pub start: DateTime<Utc>,
    /// End of the window (exclusive).
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Creates a new time window.
    ///
    /// # Panics
    ///
    /// Panics if `start` is after `end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        assert!(start <= end, "TimeWindow start must be <= end");
        Self { start, end }
    }

    /// Returns true if the given event time falls inside the window.
    ///
    /// All-day events are tested against the date span of the window in the
    /// given timezone, so a feed date in a far-away zone still lands on the
    /// right day.
    pub fn contains(&self, time: &EventTime, tz: &Tz) -> bool {
        match time {
            EventTime::DateTime(dt) => self.start <= *dt && *dt < self.end,
            EventTime::AllDay(date) => {
                let day_start = local_midnight_utc(*date, tz);
                self.start <= day_start && day_start < self.end
            }
        }
    }

    /// Returns the first date of the window in the given timezone.
    pub fn start_date(&self, tz: &Tz) -> NaiveDate {
        self.start.with_timezone(tz).date_naive()
    }

    /// Returns the last date of the window in the given timezone.
    ///
    /// The window end is exclusive, so the last covered day is one second
    /// before `end`.
    pub fn end_date(&self, tz: &Tz) -> NaiveDate {
        (self.end - Duration::seconds(1)).with_timezone(tz).date_naive()
    }
}

/// The configured digest range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CalendarRange {
    /// Derive from the schedule kind: daily schedule covers one day, weekly
    /// schedule covers the current week.
    #[default]
    Auto,
    /// Today only.
    Day,
    /// The current week, starting on the configured week-start day.
    Week,
}

impl FromStr for CalendarRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AUTO" => Ok(Self::Auto),
            "DAY" => Ok(Self::Day),
            "WEEK" => Ok(Self::Week),
            other => Err(format!("unknown calendar range: {other:?}")),
        }
    }
}

/// The kind of derived schedule, used to resolve [`CalendarRange::Auto`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScheduleKind {
    Daily,
    Weekly,
}

impl FromStr for ScheduleKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DAILY" => Ok(Self::Daily),
            "WEEKLY" => Ok(Self::Weekly),
            other => Err(format!("unknown schedule type: {other:?}")),
        }
    }
}

/// Converts a local date to the UTC instant of its midnight in `tz`.
///
/// On DST gaps where midnight does not exist, the earliest valid instant of
/// the day is used.
pub fn local_midnight_utc(date: NaiveDate, tz: &Tz) -> DateTime<Utc> {
    let naive = date.and_hms_opt(0, 0, 0).expect("valid time");
    match tz.from_local_datetime(&naive) {
        chrono::LocalResult::Single(dt) => dt.with_timezone(&Utc),
        chrono::LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        chrono::LocalResult::None => {
            // DST gap: scan forward for the first representable minute.
            let mut probe = naive;
            loop {
                probe += Duration::minutes(30);
                if let chrono::LocalResult::Single(dt) = tz.from_local_datetime(&probe) {
                    return dt.with_timezone(&Utc);
                }
            }
        }
    }
}

/// Resolves the configured range into a concrete `[start, end)` window.
///
/// `schedule` is the derived schedule kind, if one is configured; it is only
/// consulted for [`CalendarRange::Auto`]. When the service runs from an
/// explicit cron expression no schedule kind exists and Auto falls back to a
/// one-day window.
pub fn resolve_window(
    range: CalendarRange,
    schedule: Option<ScheduleKind>,
    start_week_on_monday: bool,
    tz: &Tz,
    now: DateTime<Utc>,
) -> TimeWindow {
    let effective = match range {
        CalendarRange::Auto => match schedule {
            Some(ScheduleKind::Weekly) => CalendarRange::Week,
            Some(ScheduleKind::Daily) | None => CalendarRange::Day,
        },
        other => other,
    };

    let today = now.with_timezone(tz).date_naive();
    match effective {
        CalendarRange::Day => {
            let start = local_midnight_utc(today, tz);
            let end = local_midnight_utc(today + Duration::days(1), tz);
            TimeWindow::new(start, end)
        }
        CalendarRange::Week | CalendarRange::Auto => {
            let week_start_day = if start_week_on_monday {
                Weekday::Mon
            } else {
                Weekday::Sun
            };
            let offset = (today.weekday().num_days_from_monday() as i64
                - week_start_day.num_days_from_monday() as i64)
                .rem_euclid(7);
            let week_start = today - Duration::days(offset);
            let start = local_midnight_utc(week_start, tz);
            let end = local_midnight_utc(week_start + Duration::days(7), tz);
            TimeWindow::new(start, end)
        }
    }
}
