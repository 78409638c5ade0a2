//! Filtering policies for expanded events.
//!
//! Three independent policies are applied before the digest is assembled:
//! window filtering, cross-source deduplication, and the passed-event policy.

use std::collections::HashSet;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::event::{DigestEvent, Occurrence};
use crate::time::TimeWindow;

/// How events whose end time is before "now" are displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PassedEventMode {
    /// Show passed events unmarked.
    #[default]
    Display,
    /// Drop passed events entirely.
    Hide,
    /// Show passed events struck through.
    Strike,
}

impl FromStr for PassedEventMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DISPLAY" => Ok(Self::Display),
            "HIDE" => Ok(Self::Hide),
            "STRIKE" => Ok(Self::Strike),
            other => Err(format!("unknown passed-event handling: {other:?}")),
        }
    }
}

/// Options for [`filter_events`].
#[derive(Debug, Clone)]
pub struct FilterOptions {
    /// The resolved query window.
    pub window: TimeWindow,
    /// The passed-event policy.
    pub passed: PassedEventMode,
    /// Whether to collapse identical `(title, start)` events across sources.
    pub deduplicate: bool,
}

/// Applies all filter policies and annotates the survivors for display.
///
/// The result is chronological. Duplicates keep their first (earliest-source)
/// instance. Events outside the window never survive, regardless of policy.
pub fn filter_events(
    mut events: Vec<Occurrence>,
    options: &FilterOptions,
    now: DateTime<Utc>,
    tz: &Tz,
) -> Vec<DigestEvent> {
    events.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.title.cmp(&b.title)));

    let mut seen: HashSet<(String, crate::time::EventTime)> = HashSet::new();
    let mut result = Vec::with_capacity(events.len());

    for occ in events {
        if !options.window.contains(&occ.start, tz) {
            continue;
        }
        if options.deduplicate && !seen.insert(occ.dedup_key()) {
            debug!(title = %occ.title, "Dropping duplicate event");
            continue;
        }

        let event = DigestEvent::from_occurrence(&occ, now, tz);
        if event.is_past && options.passed == PassedEventMode::Hide {
            continue;
        }
        result.push(event);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::CalendarKind;
    use crate::time::EventTime;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    fn occurrence(title: &str, start: DateTime<Utc>, source: &str) -> Occurrence {
        Occurrence::new(
            title,
            EventTime::from_utc(start),
            EventTime::from_utc(start + chrono::Duration::hours(1)),
            CalendarKind::Tv,
            source,
        )
    }

    fn week_options(passed: PassedEventMode, deduplicate: bool) -> FilterOptions {
        FilterOptions {
            window: TimeWindow::new(utc(2025, 3, 10, 0, 0, 0), utc(2025, 3, 17, 0, 0, 0)),
            passed,
            deduplicate,
        }
    }

    #[test]
    fn events_outside_window_are_dropped() {
        let tz = chrono_tz::UTC;
        // now = Monday 00:00, Tuesday 20:00 in range, next Monday 09:00 out
        let now = utc(2025, 3, 10, 0, 0, 0);
        let events = vec![
            occurrence("Tuesday Show - S01E02", utc(2025, 3, 11, 20, 0, 0), "a"),
            occurrence("Next Week Show - S01E03", utc(2025, 3, 17, 9, 0, 0), "a"),
        ];

        let result = filter_events(
            events,
            &week_options(PassedEventMode::Display, false),
            now,
            &tz,
        );
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].show, "Tuesday Show");
    }

    #[test]
    fn dedup_collapses_identical_title_start() {
        let tz = chrono_tz::UTC;
        let now = utc(2025, 3, 10, 0, 0, 0);
        let start = utc(2025, 3, 11, 20, 0, 0);
        let events = vec![
            occurrence("Shared Show - S01E01", start, "source-a"),
            occurrence("Shared Show - S01E01", start, "source-b"),
        ];

        let deduped = filter_events(
            events.clone(),
            &week_options(PassedEventMode::Display, true),
            now,
            &tz,
        );
        assert_eq!(deduped.len(), 1);

        let kept = filter_events(
            events,
            &week_options(PassedEventMode::Display, false),
            now,
            &tz,
        );
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn same_title_different_start_is_not_a_duplicate() {
        let tz = chrono_tz::UTC;
        let now = utc(2025, 3, 10, 0, 0, 0);
        let events = vec![
            occurrence("Nightly Show - S01E01", utc(2025, 3, 11, 20, 0, 0), "a"),
            occurrence("Nightly Show - S01E01", utc(2025, 3, 12, 20, 0, 0), "b"),
        ];

        let result = filter_events(
            events,
            &week_options(PassedEventMode::Display, true),
            now,
            &tz,
        );
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn passed_event_policies() {
        let tz = chrono_tz::UTC;
        let now = utc(2025, 3, 12, 12, 0, 0);
        let events = || {
            vec![
                occurrence("Ended Show - S01E01", utc(2025, 3, 10, 20, 0, 0), "a"),
                occurrence("Future Show - S01E02", utc(2025, 3, 14, 20, 0, 0), "a"),
            ]
        };

        let hidden = filter_events(events(), &week_options(PassedEventMode::Hide, false), now, &tz);
        assert_eq!(hidden.len(), 1);
        assert_eq!(hidden[0].show, "Future Show");

        let displayed = filter_events(
            events(),
            &week_options(PassedEventMode::Display, false),
            now,
            &tz,
        );
        assert_eq!(displayed.len(), 2);
        assert!(displayed.iter().all(|e| e.show != "Ended Show" || e.is_past));

        let struck = filter_events(
            events(),
            &week_options(PassedEventMode::Strike, false),
            now,
            &tz,
        );
        assert_eq!(struck.len(), 2);
        assert!(struck[0].is_past);
    }

    #[test]
    fn output_is_chronological() {
        let tz = chrono_tz::UTC;
        let now = utc(2025, 3, 10, 0, 0, 0);
        let events = vec![
            occurrence("Later - S01E02", utc(2025, 3, 14, 20, 0, 0), "a"),
            occurrence("Earlier - S01E01", utc(2025, 3, 11, 20, 0, 0), "b"),
        ];

        let result = filter_events(
            events,
            &week_options(PassedEventMode::Display, false),
            now,
            &tz,
        );
        assert_eq!(result[0].show, "Earlier");
        assert_eq!(result[1].show, "Later");
    }

    #[test]
    fn idempotent_for_fixed_now() {
        let tz = chrono_tz::UTC;
        let now = utc(2025, 3, 10, 0, 0, 0);
        let events = || {
            vec![
                occurrence("A Show - S01E01", utc(2025, 3, 11, 20, 0, 0), "a"),
                occurrence("B Show - S01E01", utc(2025, 3, 12, 20, 0, 0), "b"),
            ]
        };
        let options = week_options(PassedEventMode::Strike, true);

        let first = filter_events(events(), &options, now, &tz);
        let second = filter_events(events(), &options, now, &tz);
        assert_eq!(first, second);
    }
}
