//! ICS/iCalendar parsing.
//!
//! Parses iCalendar (RFC 5545) feed bodies into [`RawEvent`]s. Recurrence
//! properties are kept as raw strings for the expansion step.

use chrono::{TimeZone, Utc};
use icalendar::{Calendar, CalendarComponent, CalendarDateTime, Component, DatePerhapsTime, Event};
use tracing::{debug, warn};
use upnext_core::EventTime;

use crate::error::{SourceError, SourceResult};
use crate::raw_event::RawEvent;

/// Parses a feed body and extracts its events.
///
/// A body that is not valid iCalendar is an error for the whole source.
/// Individual events missing required fields are skipped with a warning.
pub fn parse_ics(ics: &str, source_url: &str) -> SourceResult<Vec<RawEvent>> {
    let calendar: Calendar = ics
        .parse()
        .map_err(|e: String| SourceError::parse(source_url, e))?;

    let events: Vec<RawEvent> = calendar
        .iter()
        .filter_map(|component| match component {
            CalendarComponent::Event(event) => parse_event(event, source_url),
            _ => None,
        })
        .collect();

    debug!(url = %source_url, count = events.len(), "Parsed calendar feed");
    Ok(events)
}

/// Parses a single VEVENT into a [`RawEvent`].
fn parse_event(event: &Event, source_url: &str) -> Option<RawEvent> {
    let uid = match event.get_uid() {
        Some(uid) => uid,
        None => {
            warn!(url = %source_url, "Skipping VEVENT without UID");
            return None;
        }
    };

    let summary = match event.get_summary() {
        Some(summary) => summary,
        None => {
            warn!(url = %source_url, uid, "Skipping VEVENT without SUMMARY");
            return None;
        }
    };

    let start = match event.get_start() {
        Some(start) => convert_date_time(start),
        None => {
            warn!(url = %source_url, uid, "Skipping VEVENT without DTSTART");
            return None;
        }
    };

    // Feeds regularly omit DTEND for instantaneous releases.
    let end = event
        .get_end()
        .map(convert_date_time)
        .unwrap_or(start);

    let mut raw = RawEvent::new(uid, summary, start, end);

    if let Some(rrule) = event.property_value("RRULE") {
        raw = raw.with_rrule(rrule);
    }

    // EXDATE can appear multiple times per VEVENT.
    if let Some(props) = event.multi_properties().get("EXDATE") {
        raw = raw.with_exdates(props.iter().map(|p| p.value().to_string()).collect());
    } else if let Some(value) = event.property_value("EXDATE") {
        raw = raw.with_exdates(vec![value.to_string()]);
    }

    Some(raw)
}

/// Converts icalendar's date-or-datetime to [`EventTime`].
fn convert_date_time(dt: DatePerhapsTime) -> EventTime {
    match dt {
        DatePerhapsTime::Date(date) => EventTime::from_date(date),
        DatePerhapsTime::DateTime(cdt) => {
            let utc_dt = match cdt {
                CalendarDateTime::Utc(dt) => dt,
                CalendarDateTime::Floating(naive) => Utc.from_utc_datetime(&naive),
                // Unresolvable TZIDs are treated as UTC, matching common
                // release feeds which publish UTC times anyway.
                CalendarDateTime::WithTimezone { date_time, tzid } => {
                    match tzid.parse::<chrono_tz::Tz>() {
                        Ok(tz) => tz
                            .from_local_datetime(&date_time)
                            .earliest()
                            .map(|dt| dt.with_timezone(&Utc))
                            .unwrap_or_else(|| Utc.from_utc_datetime(&date_time)),
                        Err(_) => Utc.from_utc_datetime(&date_time),
                    }
                }
            };
            EventTime::from_utc(utc_dt)
        }
    }
}
