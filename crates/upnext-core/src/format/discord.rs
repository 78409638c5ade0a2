//! Discord rendering: header content plus per-day embeds.

use chrono_tz::Tz;

use crate::digest::Digest;
use crate::format::{
    DayBlock, FormatOptions, Markup, header_text, render_day_blocks, subheader_text, timezone_line,
    truncate_lines,
};

/// Discord message content limit.
pub const CONTENT_LIMIT: usize = 2000;
/// Discord embed description limit.
pub const EMBED_DESCRIPTION_LIMIT: usize = 4096;
/// Maximum embeds per webhook message.
pub const EMBEDS_PER_MESSAGE: usize = 10;
/// Character budget across all embeds of one message (hard limit is 6000;
/// titles and the indicator line need headroom).
pub const MESSAGE_EMBED_BUDGET: usize = 5500;

/// Discord markdown delimiters.
pub const MARKUP: Markup = Markup {
    bold: ("**", "**"),
    italic: ("*", "*"),
    strike: ("~~", "~~"),
};

/// A digest rendered for Discord, not yet wrapped in webhook JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscordDigest {
    /// Header message content (title, subheader, optional timezone line).
    pub header: String,
    /// One block per day, in date order.
    pub embeds: Vec<DayBlock>,
    /// Optional trailing footer content.
    pub footer: Option<String>,
}

impl DiscordDigest {
    /// Splits the day blocks into webhook-sized batches: at most
    /// [`EMBEDS_PER_MESSAGE`] embeds and [`MESSAGE_EMBED_BUDGET`] characters
    /// per message.
    pub fn embed_batches(&self) -> Vec<Vec<&DayBlock>> {
        let mut batches: Vec<Vec<&DayBlock>> = Vec::new();
        let mut current: Vec<&DayBlock> = Vec::new();
        let mut current_chars = 0;

        for block in &self.embeds {
            let cost = block.title.chars().count() + block.body.chars().count();
            let full = current.len() >= EMBEDS_PER_MESSAGE
                || (!current.is_empty() && current_chars + cost > MESSAGE_EMBED_BUDGET);
            if full {
                batches.push(std::mem::take(&mut current));
                current_chars = 0;
            }
            current_chars += cost;
            current.push(block);
        }
        if !current.is_empty() {
            batches.push(current);
        }
        batches
    }
}

/// Renders a digest for Discord.
pub fn render_discord(digest: &Digest, options: &FormatOptions, tz: &Tz) -> DiscordDigest {
    let mut header = format!(
        "{}\n\n{}",
        MARKUP.bold(&header_text(digest, options, tz)),
        subheader_text(digest, &MARKUP)
    );
    if options.show_timezone {
        header.push_str("\n\n");
        header.push_str(&timezone_line(tz, &MARKUP));
    }

    DiscordDigest {
        header: truncate_lines(&header, CONTENT_LIMIT),
        embeds: render_day_blocks(digest, &MARKUP, options, tz, EMBED_DESCRIPTION_LIMIT),
        footer: options
            .footer
            .as_ref()
            .map(|f| truncate_lines(f, CONTENT_LIMIT)),
    }
}
