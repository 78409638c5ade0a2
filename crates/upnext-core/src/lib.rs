//! Core types: time windows, events, filtering, digest assembly, formatting

pub mod digest;
pub mod event;
pub mod filter;
pub mod format;
pub mod time;
pub mod tracing;

pub use digest::{Day, Digest};
pub use event::{CalendarKind, DigestEvent, EpisodeInfo, Occurrence, is_standard_episode_number};
pub use filter::{FilterOptions, PassedEventMode, filter_events};
pub use format::{
    DayBlock, DiscordDigest, FormatOptions, Markup, SlackDigest, TimeFormat, render_discord,
    render_slack,
};
pub use time::{CalendarRange, EventTime, ScheduleKind, TimeWindow, resolve_window};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
