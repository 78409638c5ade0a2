//! Calendar sources: fetching, ICS parsing, recurrence expansion.
//!
//! The pipeline here goes feed URL -> ICS body -> [`RawEvent`]s ->
//! window-bounded [`upnext_core::Occurrence`]s.

pub mod error;
pub mod expand;
pub mod fetch;
pub mod ics;
pub mod raw_event;
pub mod source;

pub use error::{SourceError, SourceResult};
pub use expand::expand_events;
pub use fetch::{FetchOptions, IcsFetcher};
pub use ics::parse_ics;
pub use raw_event::RawEvent;
pub use source::{CalendarSource, parse_calendar_urls};
