//! Raw events as parsed from a feed, before recurrence expansion.

use upnext_core::EventTime;

/// A single VEVENT lifted out of an ICS feed.
///
/// Recurrence data is kept as raw property strings; [`crate::expand`] turns
/// masters into concrete occurrences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    /// Stable identifier from the UID property.
    pub uid: String,
    /// Event title from SUMMARY.
    pub summary: String,
    /// Start time, timed or all-day.
    pub start: EventTime,
    /// End time. Feeds that omit DTEND get `start` back.
    pub end: EventTime,
    /// Raw RRULE value, if the event recurs.
    pub rrule: Option<String>,
    /// Raw EXDATE values (one per property occurrence, possibly comma-separated).
    pub exdates: Vec<String>,
}

impl RawEvent {
    pub fn new(
        uid: impl Into<String>,
        summary: impl Into<String>,
        start: EventTime,
        end: EventTime,
    ) -> Self {
        Self {
            uid: uid.into(),
            summary: summary.into(),
            start,
            end,
            rrule: None,
            exdates: Vec::new(),
        }
    }

    /// Sets the raw RRULE value.
    #[must_use]
    pub fn with_rrule(mut self, rrule: impl Into<String>) -> Self {
        self.rrule = Some(rrule.into());
        self
    }

    /// Adds raw EXDATE values.
    #[must_use]
    pub fn with_exdates(mut self, exdates: Vec<String>) -> Self {
        self.exdates = exdates;
        self
    }

    /// Whether this event is a recurring master.
    pub fn is_recurring(&self) -> bool {
        self.rrule.is_some()
    }
}
