//! Event types for the digest pipeline.
//!
//! This module provides the two event representations used by the pipeline:
//! - [`Occurrence`]: a single concrete instance of a calendar event inside
//!   the query window (recurring events already expanded)
//! - [`DigestEvent`]: an occurrence annotated for display (parsed episode
//!   metadata, premiere and passed flags)

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::LazyLock;

use crate::time::EventTime;

/// Matches standard episode numbers: S01E02, s1e2, 101x04, ...
static EPISODE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^s?(\d{1,4})[ex](\d{1,4})$").expect("valid regex"));

/// The kind of calendar a source produces events for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalendarKind {
    /// TV episode calendar (Sonarr-style feeds).
    Tv,
    /// Movie release calendar (Radarr-style feeds).
    Movie,
}

impl CalendarKind {
    /// Returns the lowercase name used in configuration and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tv => "tv",
            Self::Movie => "movie",
        }
    }
}

impl FromStr for CalendarKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tv" => Ok(Self::Tv),
            "movie" => Ok(Self::Movie),
            other => Err(format!("unknown calendar type: {other:?}")),
        }
    }
}

/// A single concrete occurrence of a calendar event.
///
/// Produced by the sources crate after parsing and recurrence expansion.
/// Invariant: `start <= end`; the constructor clamps a malformed end to the
/// start rather than producing a negative-duration event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occurrence {
    /// The raw event summary (e.g. "Severance - S02E05 - Trojan's Horse").
    pub title: String,
    /// When the occurrence starts.
    pub start: EventTime,
    /// When the occurrence ends.
    pub end: EventTime,
    /// The kind of calendar this occurrence came from.
    pub kind: CalendarKind,
    /// The source feed URL, kept for diagnostics.
    pub source_url: String,
}

impl Occurrence {
    /// Creates a new occurrence, clamping `end` to `start` if it is earlier.
    pub fn new(
        title: impl Into<String>,
        start: EventTime,
        end: EventTime,
        kind: CalendarKind,
        source_url: impl Into<String>,
    ) -> Self {
        let end = if end < start { start } else { end };
        Self {
            title: title.into(),
            start,
            end,
            kind,
            source_url: source_url.into(),
        }
    }

    /// The key used for cross-source deduplication.
    pub fn dedup_key(&self) -> (String, EventTime) {
        (self.title.clone(), self.start)
    }
}

/// Episode metadata parsed from a Sonarr-style summary.
///
/// Summaries follow "Show - S01E02 - Episode Title"; any of the trailing
/// parts may be missing, and the separator may appear inside the show name,
/// so parsing is best-effort from the right.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EpisodeInfo {
    /// The show (or movie) name.
    pub show: String,
    /// The episode number text (e.g. "S01E02"), if present.
    pub number: Option<String>,
    /// The episode title, if present.
    pub title: Option<String>,
}

impl EpisodeInfo {
    /// Parses a feed summary into show/number/title parts.
    pub fn parse(summary: &str) -> Self {
        let parts: Vec<&str> = summary.split(" - ").collect();

        // Find the first part that looks like an episode number; everything
        // before it is the show name, everything after is the episode title.
        for (idx, part) in parts.iter().enumerate() {
            if idx > 0 && EPISODE_PATTERN.is_match(part.trim()) {
                let show = parts[..idx].join(" - ");
                let title = if idx + 1 < parts.len() {
                    Some(parts[idx + 1..].join(" - "))
                } else {
                    None
                };
                return Self {
                    show,
                    number: Some(part.trim().to_string()),
                    title,
                };
            }
        }

        // No standard number: treat "A - B" as show + episode title
        if parts.len() >= 2 {
            Self {
                show: parts[0].to_string(),
                number: None,
                title: Some(parts[1..].join(" - ")),
            }
        } else {
            Self {
                show: summary.to_string(),
                number: None,
                title: None,
            }
        }
    }

    /// Returns true if the episode number marks a season premiere (episode 1).
    pub fn is_premiere(&self) -> bool {
        self.number
            .as_deref()
            .and_then(|n| EPISODE_PATTERN.captures(n))
            .and_then(|caps| caps.get(2))
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .is_some_and(|ep| ep == 1)
    }
}

/// Returns true if `number` looks like a standard SxxEyy episode number.
pub fn is_standard_episode_number(number: &str) -> bool {
    EPISODE_PATTERN.is_match(number.trim())
}

/// An occurrence annotated for display.
///
/// This is the unit the formatter consumes: episode metadata is parsed out
/// and the passed/premiere flags are precomputed against a fixed "now".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestEvent {
    /// The raw summary, kept for dedup keys and logs.
    pub title: String,
    /// The show or movie name.
    pub show: String,
    /// The episode number text, if any.
    pub episode_number: Option<String>,
    /// The episode title, if any.
    pub episode_title: Option<String>,
    /// When the event starts.
    pub start: EventTime,
    /// When the event ends.
    pub end: EventTime,
    /// Which calendar kind this event belongs to.
    pub kind: CalendarKind,
    /// True if this is a season premiere.
    pub is_premiere: bool,
    /// True if the event ended before the run's "now".
    pub is_past: bool,
}

impl DigestEvent {
    /// Builds a display event from an occurrence, evaluated at `now`.
    pub fn from_occurrence(occ: &Occurrence, now: DateTime<Utc>, tz: &Tz) -> Self {
        let info = EpisodeInfo::parse(&occ.title);
        let is_premiere = occ.kind == CalendarKind::Tv && info.is_premiere();
        let is_past = occ.end.is_past_end(now, tz);

        Self {
            title: occ.title.clone(),
            show: info.show,
            episode_number: info.number,
            episode_title: info.title,
            start: occ.start,
            end: occ.end,
            kind: occ.kind,
            is_premiere,
            is_past,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    #[test]
    fn kind_parsing() {
        assert_eq!("tv".parse::<CalendarKind>().unwrap(), CalendarKind::Tv);
        assert_eq!("Movie".parse::<CalendarKind>().unwrap(), CalendarKind::Movie);
        assert!("anime".parse::<CalendarKind>().is_err());
    }

    #[test]
    fn occurrence_clamps_inverted_end() {
        let start = EventTime::from_utc(utc(2025, 3, 10, 20, 0, 0));
        let end = EventTime::from_utc(utc(2025, 3, 10, 19, 0, 0));
        let occ = Occurrence::new("Show", start, end, CalendarKind::Tv, "https://example.com/a");
        assert_eq!(occ.start, occ.end);
    }

    #[test]
    fn episode_parse_full_summary() {
        let info = EpisodeInfo::parse("Severance - S02E05 - Trojan's Horse");
        assert_eq!(info.show, "Severance");
        assert_eq!(info.number.as_deref(), Some("S02E05"));
        assert_eq!(info.title.as_deref(), Some("Trojan's Horse"));
        assert!(!info.is_premiere());
    }

    #[test]
    fn episode_parse_premiere() {
        let info = EpisodeInfo::parse("Andor - S02E01 - One Year Later");
        assert!(info.is_premiere());

        let info = EpisodeInfo::parse("The Wire - 3x01");
        assert_eq!(info.show, "The Wire");
        assert_eq!(info.number.as_deref(), Some("3x01"));
        assert!(info.is_premiere());
    }

    #[test]
    fn episode_parse_show_with_dash() {
        let info = EpisodeInfo::parse("Star Wars - Andor - S01E12 - Rix Road");
        assert_eq!(info.show, "Star Wars - Andor");
        assert_eq!(info.number.as_deref(), Some("S01E12"));
        assert_eq!(info.title.as_deref(), Some("Rix Road"));
    }

    #[test]
    fn episode_parse_no_number() {
        let info = EpisodeInfo::parse("Some Special - Holiday Reunion");
        assert_eq!(info.show, "Some Special");
        assert!(info.number.is_none());
        assert_eq!(info.title.as_deref(), Some("Holiday Reunion"));
        assert!(!info.is_premiere());
    }

    #[test]
    fn episode_parse_bare_title() {
        let info = EpisodeInfo::parse("Dune: Part Three");
        assert_eq!(info.show, "Dune: Part Three");
        assert!(info.number.is_none());
        assert!(info.title.is_none());
    }

    #[test]
    fn standard_number_detection() {
        assert!(is_standard_episode_number("S01E02"));
        assert!(is_standard_episode_number("s1e2"));
        assert!(is_standard_episode_number("101x04"));
        assert!(!is_standard_episode_number("Part 1"));
        assert!(!is_standard_episode_number("Episode One"));
    }

    #[test]
    fn digest_event_flags() {
        let tz = chrono_tz::UTC;
        let now = utc(2025, 3, 12, 12, 0, 0);

        let past = Occurrence::new(
            "Andor - S02E01 - One Year Later",
            EventTime::from_utc(utc(2025, 3, 11, 20, 0, 0)),
            EventTime::from_utc(utc(2025, 3, 11, 21, 0, 0)),
            CalendarKind::Tv,
            "https://example.com/sonarr.ics",
        );
        let ev = DigestEvent::from_occurrence(&past, now, &tz);
        assert!(ev.is_past);
        assert!(ev.is_premiere);
        assert_eq!(ev.show, "Andor");

        let upcoming = Occurrence::new(
            "Dune: Part Three",
            EventTime::from_date(chrono::NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()),
            EventTime::from_date(chrono::NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()),
            CalendarKind::Movie,
            "https://example.com/radarr.ics",
        );
        let ev = DigestEvent::from_occurrence(&upcoming, now, &tz);
        assert!(!ev.is_past);
        assert!(!ev.is_premiere);
    }
}
