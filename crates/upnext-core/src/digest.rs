//! Digest assembly: grouping filtered events into days.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::event::{CalendarKind, DigestEvent};
use crate::time::TimeWindow;

/// A single day of the digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Day {
    /// The local date this day covers.
    pub date: NaiveDate,
    /// TV events on this day, chronological.
    pub tv: Vec<DigestEvent>,
    /// Movie events on this day, chronological.
    pub movies: Vec<DigestEvent>,
}

impl Day {
    fn new(date: NaiveDate) -> Self {
        Self {
            date,
            tv: Vec::new(),
            movies: Vec::new(),
        }
    }

    /// The display title for this day, e.g. "Monday, March 10".
    pub fn title(&self) -> String {
        self.date.format("%A, %B %-d").to_string()
    }

    /// Total number of events on this day.
    pub fn event_count(&self) -> usize {
        self.tv.len() + self.movies.len()
    }
}

/// The finalized set of events for one run, grouped and counted.
///
/// Built per run and discarded after delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Digest {
    /// The resolved query window.
    pub window: TimeWindow,
    /// Days with at least one event, ordered by date.
    pub days: Vec<Day>,
    /// Number of TV episodes in the digest.
    pub tv_count: usize,
    /// Number of movie releases in the digest.
    pub movie_count: usize,
    /// Number of season premieres in the digest.
    pub premiere_count: usize,
}

impl Digest {
    /// Groups filtered events into days and computes the totals.
    ///
    /// Day grouping uses the event's start date in `tz`, keyed through a map
    /// so each local date yields exactly one day even when the chronological
    /// (UTC) order crosses local date boundaries back and forth, as all-day
    /// events at midnight UTC do against late-evening local events.
    pub fn build(events: Vec<DigestEvent>, window: TimeWindow, tz: &Tz) -> Self {
        let mut days: BTreeMap<NaiveDate, Day> = BTreeMap::new();
        let mut tv_count = 0;
        let mut movie_count = 0;
        let mut premiere_count = 0;

        for event in events {
            let date = event.start.date_in(tz);
            let day = days.entry(date).or_insert_with(|| Day::new(date));

            match event.kind {
                CalendarKind::Tv => {
                    tv_count += 1;
                    if event.is_premiere {
                        premiere_count += 1;
                    }
                    day.tv.push(event);
                }
                CalendarKind::Movie => {
                    movie_count += 1;
                    day.movies.push(event);
                }
            }
        }

        Self {
            window,
            days: days.into_values().collect(),
            tv_count,
            movie_count,
            premiere_count,
        }
    }

    /// Returns true if the digest contains no events at all.
    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Total number of events across all days.
    pub fn total_count(&self) -> usize {
        self.tv_count + self.movie_count
    }
}
