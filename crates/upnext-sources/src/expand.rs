//! Recurrence expansion.
//!
//! Turns parsed [`RawEvent`]s into concrete [`Occurrence`]s inside a time
//! window. Non-recurring events pass through; recurring masters are expanded
//! with the rrule crate, honoring EXDATEs and preserving the master duration.

use chrono::{Duration, Utc};
use chrono_tz::Tz;
use rrule::RRuleSet;
use tracing::warn;
use upnext_core::{EventTime, Occurrence, TimeWindow};

use crate::raw_event::RawEvent;
use crate::source::CalendarSource;

/// Upper bound on instances generated per recurring master.
const MAX_INSTANCES: u16 = 366;

/// Expands events from one source into window-bounded occurrences.
///
/// Output is sorted chronologically (ties broken by title). A master whose
/// RRULE fails to parse degrades to its own single occurrence rather than
/// dropping the event.
pub fn expand_events(
    events: Vec<RawEvent>,
    source: &CalendarSource,
    window: &TimeWindow,
    tz: &Tz,
) -> Vec<Occurrence> {
    let mut occurrences = Vec::new();

    for event in events {
        if event.is_recurring() {
            occurrences.extend(expand_recurring(&event, source, window, tz));
        } else if window.contains(&event.start, tz) {
            occurrences.push(occurrence_from(&event, event.start, event.end, source));
        }
    }

    occurrences.sort_by(|a, b| (a.start, &a.title).cmp(&(b.start, &b.title)));
    occurrences
}

fn expand_recurring(
    event: &RawEvent,
    source: &CalendarSource,
    window: &TimeWindow,
    tz: &Tz,
) -> Vec<Occurrence> {
    let rrule_str = build_rrule_string(event);

    let rrule_set: RRuleSet = match rrule_str.parse() {
        Ok(set) => set,
        Err(e) => {
            warn!(
                url = %source.url,
                uid = %event.uid,
                error = %e,
                "Failed to parse RRULE, keeping master occurrence only"
            );
            if window.contains(&event.start, tz) {
                return vec![occurrence_from(event, event.start, event.end, source)];
            }
            return Vec::new();
        }
    };

    // Widen by a second on each side; the exact bounds are re-checked against
    // the half-open window below.
    let rrule_tz: rrule::Tz = Utc.into();
    let after = (window.start - Duration::seconds(1)).with_timezone(&rrule_tz);
    let before = (window.end + Duration::seconds(1)).with_timezone(&rrule_tz);

    let result = rrule_set.after(after).before(before).all(MAX_INSTANCES);

    let duration = event.end.to_utc_datetime() - event.start.to_utc_datetime();

    let mut instances = Vec::new();
    for occ_dt in &result.dates {
        let (start, end) = match (event.start, event.end) {
            (EventTime::AllDay(d_start), EventTime::AllDay(d_end)) => {
                let day_diff = (d_end - d_start).num_days();
                let date = occ_dt.date_naive();
                (
                    EventTime::from_date(date),
                    EventTime::from_date(date + Duration::days(day_diff)),
                )
            }
            _ => {
                let utc = occ_dt.with_timezone(&Utc);
                (EventTime::from_utc(utc), EventTime::from_utc(utc + duration))
            }
        };

        if window.contains(&start, tz) {
            instances.push(occurrence_from(event, start, end, source));
        }
    }

    instances
}

fn occurrence_from(
    event: &RawEvent,
    start: EventTime,
    end: EventTime,
    source: &CalendarSource,
) -> Occurrence {
    Occurrence::new(
        event.summary.clone(),
        start,
        end,
        source.kind,
        source.url.as_str(),
    )
}

/// Builds the iCalendar block the rrule crate parses.
///
/// All-day dates become midnight UTC; the all-day shape is restored when
/// instances are generated.
fn build_rrule_string(event: &RawEvent) -> String {
    let mut lines = Vec::new();

    let dtstart = match event.start {
        EventTime::AllDay(date) => format!("DTSTART:{}T000000Z", date.format("%Y%m%d")),
        EventTime::DateTime(dt) => format!("DTSTART:{}", dt.format("%Y%m%dT%H%M%SZ")),
    };
    lines.push(dtstart);

    if let Some(ref rrule) = event.rrule {
        lines.push(format!("RRULE:{rrule}"));
    }

    for value in event.exdates.iter().flat_map(|v| v.split(',')) {
        if let Some(normalized) = normalize_exdate(value) {
            lines.push(format!("EXDATE:{normalized}"));
        } else {
            warn!(uid = %event.uid, value, "Skipping unrecognized EXDATE value");
        }
    }

    lines.join("\n")
}

/// Normalizes one EXDATE value to the `YYYYMMDDTHHMMSSZ` form.
fn normalize_exdate(value: &str) -> Option<String> {
    let value = value.trim();
    if value.len() == 8 && value.chars().all(|c| c.is_ascii_digit()) {
        return Some(format!("{value}T000000Z"));
    }
    if value.len() == 16 && value.ends_with('Z') && value.as_bytes()[8] == b'T' {
        return Some(value.to_string());
    }
    if value.len() == 15 && value.as_bytes()[8] == b'T' {
        // Floating, treat as UTC like the rest of the pipeline.
        return Some(format!("{value}Z"));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, NaiveDate, TimeZone};
    use upnext_core::CalendarKind;
    use url::Url;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    fn tv_source() -> CalendarSource {
        CalendarSource::new(
            Url::parse("https://example.com/sonarr.ics").unwrap(),
            CalendarKind::Tv,
        )
    }

    fn week_window() -> TimeWindow {
        TimeWindow::new(utc(2025, 3, 10, 0, 0, 0), utc(2025, 3, 17, 0, 0, 0))
    }

    #[test]
    fn non_recurring_events_pass_through_when_in_window() {
        let inside = RawEvent::new(
            "a",
            "Severance - S02E05 - Trojan's Horse",
            EventTime::from_utc(utc(2025, 3, 10, 20, 0, 0)),
            EventTime::from_utc(utc(2025, 3, 10, 21, 0, 0)),
        );
        let outside = RawEvent::new(
            "b",
            "Later Show",
            EventTime::from_utc(utc(2025, 3, 20, 20, 0, 0)),
            EventTime::from_utc(utc(2025, 3, 20, 21, 0, 0)),
        );

        let occurrences =
            expand_events(vec![inside, outside], &tv_source(), &week_window(), &chrono_tz::UTC);

        assert_eq!(occurrences.len(), 1);
        assert_eq!(occurrences[0].title, "Severance - S02E05 - Trojan's Horse");
        assert_eq!(occurrences[0].kind, CalendarKind::Tv);
    }

    #[test]
    fn weekly_rrule_expands_within_window() {
        // Daily recurrence starting before the window; only in-window days survive.
        let master = RawEvent::new(
            "daily",
            "Neighbours - S41E10 - Episode",
            EventTime::from_utc(utc(2025, 3, 8, 18, 0, 0)),
            EventTime::from_utc(utc(2025, 3, 8, 18, 30, 0)),
        )
        .with_rrule("FREQ=DAILY;COUNT=6");

        let occurrences =
            expand_events(vec![master], &tv_source(), &week_window(), &chrono_tz::UTC);

        // Mar 8..=13 generated, Mar 10..=13 inside the window.
        assert_eq!(occurrences.len(), 4);
        assert_eq!(
            occurrences[0].start,
            EventTime::from_utc(utc(2025, 3, 10, 18, 0, 0))
        );
        assert_eq!(
            occurrences[3].start,
            EventTime::from_utc(utc(2025, 3, 13, 18, 0, 0))
        );
        // Duration preserved.
        assert_eq!(
            occurrences[0].end,
            EventTime::from_utc(utc(2025, 3, 10, 18, 30, 0))
        );
    }

    #[test]
    fn exdate_removes_an_instance() {
        let master = RawEvent::new(
            "daily",
            "Neighbours - S41E10 - Episode",
            EventTime::from_utc(utc(2025, 3, 10, 18, 0, 0)),
            EventTime::from_utc(utc(2025, 3, 10, 18, 30, 0)),
        )
        .with_rrule("FREQ=DAILY;COUNT=3")
        .with_exdates(vec!["20250311T180000Z".to_string()]);

        let occurrences =
            expand_events(vec![master], &tv_source(), &week_window(), &chrono_tz::UTC);

        assert_eq!(occurrences.len(), 2);
        assert_eq!(
            occurrences[1].start,
            EventTime::from_utc(utc(2025, 3, 12, 18, 0, 0))
        );
    }

    #[test]
    fn all_day_recurrence_stays_all_day() {
        let master = RawEvent::new(
            "weekly-movie",
            "Matinee Classics",
            EventTime::from_date(NaiveDate::from_ymd_opt(2025, 3, 11).unwrap()),
            EventTime::from_date(NaiveDate::from_ymd_opt(2025, 3, 12).unwrap()),
        )
        .with_rrule("FREQ=WEEKLY;COUNT=2");

        let occurrences =
            expand_events(vec![master], &tv_source(), &week_window(), &chrono_tz::UTC);

        assert_eq!(occurrences.len(), 1);
        assert!(occurrences[0].start.is_all_day());
        assert_eq!(
            occurrences[0].start,
            EventTime::from_date(NaiveDate::from_ymd_opt(2025, 3, 11).unwrap())
        );
        assert_eq!(
            occurrences[0].end,
            EventTime::from_date(NaiveDate::from_ymd_opt(2025, 3, 12).unwrap())
        );
    }

    #[test]
    fn invalid_rrule_degrades_to_master_occurrence() {
        let master = RawEvent::new(
            "broken",
            "Severance - S02E06 - Attila",
            EventTime::from_utc(utc(2025, 3, 11, 20, 0, 0)),
            EventTime::from_utc(utc(2025, 3, 11, 21, 0, 0)),
        )
        .with_rrule("FREQ=SOMETIMES");

        let occurrences =
            expand_events(vec![master], &tv_source(), &week_window(), &chrono_tz::UTC);

        assert_eq!(occurrences.len(), 1);
        assert_eq!(
            occurrences[0].start,
            EventTime::from_utc(utc(2025, 3, 11, 20, 0, 0))
        );
    }

    #[test]
    fn output_is_sorted_chronologically() {
        let later = RawEvent::new(
            "b",
            "B Show - S01E02 - Later",
            EventTime::from_utc(utc(2025, 3, 12, 20, 0, 0)),
            EventTime::from_utc(utc(2025, 3, 12, 21, 0, 0)),
        );
        let earlier = RawEvent::new(
            "a",
            "A Show - S01E01 - Earlier",
            EventTime::from_utc(utc(2025, 3, 10, 20, 0, 0)),
            EventTime::from_utc(utc(2025, 3, 10, 21, 0, 0)),
        );

        let occurrences =
            expand_events(vec![later, earlier], &tv_source(), &week_window(), &chrono_tz::UTC);

        assert_eq!(occurrences[0].title, "A Show - S01E01 - Earlier");
        assert_eq!(occurrences[1].title, "B Show - S01E02 - Later");
    }

    #[test]
    fn exdate_normalization() {
        assert_eq!(
            normalize_exdate("20250311").as_deref(),
            Some("20250311T000000Z")
        );
        assert_eq!(
            normalize_exdate("20250311T180000Z").as_deref(),
            Some("20250311T180000Z")
        );
        assert_eq!(
            normalize_exdate("20250311T180000").as_deref(),
            Some("20250311T180000Z")
        );
        assert_eq!(normalize_exdate("tomorrow"), None);
    }
}
