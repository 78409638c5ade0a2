//! Slack rendering: header blocks plus per-day attachments.

use chrono_tz::Tz;

use crate::digest::Digest;
use crate::format::{
    DayBlock, FormatOptions, Markup, header_text, render_day_blocks, subheader_text, timezone_line,
    truncate_lines,
};

/// Slack section text limit.
pub const TEXT_LIMIT: usize = 3000;
/// Maximum attachments per message.
pub const ATTACHMENTS_PER_MESSAGE: usize = 20;

/// Slack mrkdwn delimiters.
pub const MARKUP: Markup = Markup {
    bold: ("*", "*"),
    italic: ("_", "_"),
    strike: ("~", "~"),
};

/// A digest rendered for Slack, not yet wrapped in webhook JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlackDigest {
    /// Header text (title, subheader, optional timezone line).
    pub header: String,
    /// One block per day, in date order.
    pub attachments: Vec<DayBlock>,
    /// Optional trailing footer text.
    pub footer: Option<String>,
}

impl SlackDigest {
    /// Splits the day blocks into message-sized batches of at most
    /// [`ATTACHMENTS_PER_MESSAGE`] attachments.
    pub fn attachment_batches(&self) -> Vec<Vec<&DayBlock>> {
        self.attachments
            .chunks(ATTACHMENTS_PER_MESSAGE)
            .map(|chunk| chunk.iter().collect())
            .collect()
    }

    /// Slack attachment colors are hex strings.
    pub fn color_hex(color: u32) -> String {
        format!("#{color:06X}")
    }
}

/// Renders a digest for Slack.
pub fn render_slack(digest: &Digest, options: &FormatOptions, tz: &Tz) -> SlackDigest {
    let mut header = format!(
        "{}\n\n{}",
        MARKUP.bold(&header_text(digest, options, tz)),
        subheader_text(digest, &MARKUP)
    );
    if options.show_timezone {
        header.push('\n');
        header.push_str(&timezone_line(tz, &MARKUP));
    }

    SlackDigest {
        header: truncate_lines(&header, TEXT_LIMIT),
        attachments: render_day_blocks(digest, &MARKUP, options, tz, TEXT_LIMIT),
        footer: options
            .footer
            .as_ref()
            .map(|f| truncate_lines(f, TEXT_LIMIT)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{CalendarKind, DigestEvent, Occurrence};
    use crate::time::{EventTime, TimeWindow};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    fn digest_with_days(day_count: i64) -> Digest {
        let now = utc(2025, 3, 10, 0, 0, 0);
        let mut events = Vec::new();
        for d in 0..day_count {
            let start = utc(2025, 3, 10, 20, 0, 0) + Duration::days(d);
            let occ = Occurrence::new(
                format!("Show {d} - S01E02 - Title"),
                EventTime::from_utc(start),
                EventTime::from_utc(start + Duration::hours(1)),
                CalendarKind::Tv,
                "https://example.com/feed.ics",
            );
            events.push(DigestEvent::from_occurrence(&occ, now, &chrono_tz::UTC));
        }
        let window = TimeWindow::new(
            utc(2025, 3, 10, 0, 0, 0),
            utc(2025, 3, 10, 0, 0, 0) + Duration::days(day_count.max(1)),
        );
        Digest::build(events, window, &chrono_tz::UTC)
    }

    #[test]
    fn header_uses_slack_markup() {
        let digest = digest_with_days(1);
        let rendered = render_slack(&digest, &FormatOptions::default(), &chrono_tz::UTC);

        assert!(rendered.header.starts_with("*New Releases (Mar 10 - Mar 10)*"));
        assert!(rendered.header.contains("*1* new episode and *0* movie releases"));
        // Discord bold must not leak in
        assert!(!rendered.header.contains("**"));
    }

    #[test]
    fn attachment_batches_chunk_at_limit() {
        let digest = digest_with_days(45);
        let rendered = render_slack(&digest, &FormatOptions::default(), &chrono_tz::UTC);

        let batches = rendered.attachment_batches();
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].len(), ATTACHMENTS_PER_MESSAGE);
        assert_eq!(batches[2].len(), 5);
    }

    #[test]
    fn color_hex_format() {
        assert_eq!(SlackDigest::color_hex(0x3498DB), "#3498DB");
        assert_eq!(SlackDigest::color_hex(0x00000F), "#00000F");
    }

    #[test]
    fn footer_is_carried() {
        let digest = digest_with_days(1);
        let opts = FormatOptions {
            footer: Some("Brought to you by upnext".to_string()),
            ..Default::default()
        };
        let rendered = render_slack(&digest, &opts, &chrono_tz::UTC);
        assert_eq!(rendered.footer.as_deref(), Some("Brought to you by upnext"));
    }
}
