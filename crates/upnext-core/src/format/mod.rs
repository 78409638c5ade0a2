//! Output formatting for the digest.
//!
//! This module renders a [`Digest`] into destination-specific text:
//! - [`discord`]: header content plus per-day embeds
//! - [`slack`]: header blocks plus per-day attachments
//!
//! Rendering is pure: `(Digest, FormatOptions) -> formatted parts`. The
//! destination modules own their markup and size limits; shared line and
//! header building lives here.

pub mod discord;
pub mod slack;

use chrono::{Datelike, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::digest::{Day, Digest};
use crate::event::{CalendarKind, DigestEvent, is_standard_episode_number};
use crate::filter::PassedEventMode;
use crate::time::EventTime;

pub use discord::{DiscordDigest, render_discord};
pub use slack::{SlackDigest, render_slack};

/// Time format preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeFormat {
    /// 24-hour format (e.g., "20:30").
    #[default]
    H24,
    /// 12-hour format with AM/PM (e.g., "8:30 PM").
    H12,
}

/// Configuration options for digest formatting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatOptions {
    /// Header text shown at the top of the digest.
    pub header: String,
    /// Whether to append the window's date range to the header.
    pub show_date_range: bool,
    /// Whether to add a "times shown in ..." line under the subheader.
    pub show_timezone: bool,
    /// Whether to prefix events with their start time at all.
    pub display_time: bool,
    /// 12/24-hour clock.
    pub time_format: TimeFormat,
    /// Whether hours below 10 keep a leading zero.
    pub leading_zero: bool,
    /// Passed-event display policy.
    pub passed: PassedEventMode,
    /// Optional footer text sent after the last day.
    pub footer: Option<String>,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            header: "New Releases".to_string(),
            show_date_range: true,
            show_timezone: false,
            display_time: true,
            time_format: TimeFormat::H24,
            leading_zero: true,
            passed: PassedEventMode::default(),
            footer: None,
        }
    }
}

/// Markup delimiters for a destination.
#[derive(Debug, Clone, Copy)]
pub struct Markup {
    pub bold: (&'static str, &'static str),
    pub italic: (&'static str, &'static str),
    pub strike: (&'static str, &'static str),
}

impl Markup {
    fn bold(&self, text: &str) -> String {
        format!("{}{}{}", self.bold.0, text, self.bold.1)
    }

    fn italic(&self, text: &str) -> String {
        format!("{}{}{}", self.italic.0, text, self.italic.1)
    }

    fn strike(&self, text: &str) -> String {
        format!("{}{}{}", self.strike.0, text, self.strike.1)
    }
}

/// A rendered day, ready to become an embed or attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayBlock {
    /// The day title, e.g. "Monday, March 10".
    pub title: String,
    /// The rendered event lines.
    pub body: String,
    /// The accent color for this day.
    pub color: u32,
}

/// Fixed per-weekday accent palette, shared by both destinations.
pub fn day_color(weekday: Weekday) -> u32 {
    match weekday {
        Weekday::Mon => 0x3498DB,
        Weekday::Tue => 0x2ECC71,
        Weekday::Wed => 0x9B59B6,
        Weekday::Thu => 0xE67E22,
        Weekday::Fri => 0xF1C40F,
        Weekday::Sat => 0xE91E63,
        Weekday::Sun => 0xE74C3C,
    }
}

/// Formats an event's start time for display, honoring the clock options.
///
/// Returns `None` for all-day events or when time display is disabled.
pub fn time_label(time: &EventTime, tz: &Tz, options: &FormatOptions) -> Option<String> {
    if !options.display_time {
        return None;
    }
    let dt = match time {
        EventTime::DateTime(dt) => dt.with_timezone(tz),
        EventTime::AllDay(_) => return None,
    };

    let pattern = match (options.time_format, options.leading_zero) {
        (TimeFormat::H24, true) => "%H:%M",
        (TimeFormat::H24, false) => "%-H:%M",
        (TimeFormat::H12, true) => "%I:%M %p",
        (TimeFormat::H12, false) => "%-I:%M %p",
    };
    Some(dt.format(pattern).to_string())
}

/// Builds the digest header line, optionally with the window's date range.
pub fn header_text(digest: &Digest, options: &FormatOptions, tz: &Tz) -> String {
    if !options.show_date_range {
        return options.header.clone();
    }
    let start = digest.window.start_date(tz).format("%b %-d");
    let end = digest.window.end_date(tz).format("%b %-d");
    format!("{} ({} - {})", options.header, start, end)
}

/// Builds the totals subheader, e.g. "**3** new episodes and **1** movie release".
pub fn subheader_text(digest: &Digest, markup: &Markup) -> String {
    let episodes = format!(
        "{} new episode{}",
        markup.bold(&digest.tv_count.to_string()),
        if digest.tv_count == 1 { "" } else { "s" }
    );
    let movies = format!(
        "{} movie release{}",
        markup.bold(&digest.movie_count.to_string()),
        if digest.movie_count == 1 { "" } else { "s" }
    );
    let mut text = format!("{episodes} and {movies}");
    if digest.premiere_count > 0 {
        text.push_str(&format!(
            ", including {} premiere{} 🎉",
            markup.bold(&digest.premiere_count.to_string()),
            if digest.premiere_count == 1 { "" } else { "s" }
        ));
    }
    text
}

/// The "times shown in ..." line.
pub fn timezone_line(tz: &Tz, markup: &Markup) -> String {
    markup.italic(&format!("Times shown in {}", tz.name()))
}

/// Renders one event as a single line in the destination's markup.
pub fn event_line(event: &DigestEvent, markup: &Markup, options: &FormatOptions, tz: &Tz) -> String {
    let time_prefix = time_label(&event.start, tz, options)
        .map(|t| format!("{t}: "))
        .unwrap_or_default();
    let show = markup.bold(&event.show);

    let mut line = match event.kind {
        CalendarKind::Movie => format!("{time_prefix}{show}"),
        CalendarKind::Tv => {
            let details = match (&event.episode_number, &event.episode_title) {
                (Some(number), Some(title)) if is_standard_episode_number(number) => {
                    format!(" - {number} - {}", markup.italic(title))
                }
                (Some(number), Some(title)) => {
                    format!(" - {}", markup.italic(&format!("{number} - {title}")))
                }
                (Some(number), None) if is_standard_episode_number(number) => {
                    format!(" - {number}")
                }
                (Some(number), None) => format!(" - {}", markup.italic(number)),
                (None, Some(title)) => format!(" - {}", markup.italic(title)),
                (None, None) => String::new(),
            };
            format!("{time_prefix}{show}{details}")
        }
    };

    if event.is_premiere {
        line.push_str(" 🎉");
    }
    if event.is_past && options.passed == PassedEventMode::Strike {
        line = markup.strike(&line);
    }
    line
}

/// Renders the body of a day: TV lines, then a MOVIES section.
pub fn day_body(day: &Day, markup: &Markup, options: &FormatOptions, tz: &Tz) -> String {
    let tv_lines: Vec<String> = day
        .tv
        .iter()
        .map(|e| event_line(e, markup, options, tz))
        .collect();
    let movie_lines: Vec<String> = day
        .movies
        .iter()
        .map(|e| event_line(e, markup, options, tz))
        .collect();

    let mut body = String::new();
    if !tv_lines.is_empty() {
        body.push_str(&tv_lines.join("\n"));
        if !movie_lines.is_empty() {
            body.push_str("\n\n");
        }
    }
    if !movie_lines.is_empty() {
        body.push_str(&markup.bold("MOVIES"));
        body.push('\n');
        body.push_str(&movie_lines.join("\n"));
    }
    body
}

/// Truncates `text` to at most `limit` characters, cutting at line
/// boundaries and appending an explicit "and N more" indicator.
///
/// Events are never dropped silently: the indicator always states how many
/// lines were omitted.
pub fn truncate_lines(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }

    let lines: Vec<&str> = text.lines().collect();
    // Reserve room for the worst-case indicator.
    let reserve = "\n… and 9999 more".chars().count();
    let budget = limit.saturating_sub(reserve);

    let mut kept = 0;
    let mut used = 0;
    for line in &lines {
        let cost = line.chars().count() + if kept > 0 { 1 } else { 0 };
        if used + cost > budget {
            break;
        }
        used += cost;
        kept += 1;
    }

    if kept == 0 {
        // A single line can blow the budget on its own (a long custom header,
        // say). Keep what fits of it rather than dropping all content.
        let mut result: String = lines[0].chars().take(budget).collect();
        result.push_str(&format!("\n… and {} more", lines.len() - 1));
        return result;
    }

    let omitted = lines.len() - kept;
    let mut result = lines[..kept].join("\n");
    result.push_str(&format!("\n… and {omitted} more"));
    result
}

/// Renders all days of a digest into blocks, bounding each body to
/// `body_limit` characters.
pub fn render_day_blocks(
    digest: &Digest,
    markup: &Markup,
    options: &FormatOptions,
    tz: &Tz,
    body_limit: usize,
) -> Vec<DayBlock> {
    digest
        .days
        .iter()
        .map(|day| DayBlock {
            title: day.title(),
            body: truncate_lines(&day_body(day, markup, options, tz), body_limit),
            color: day_color(day.date.weekday()),
        })
        .collect()
}
