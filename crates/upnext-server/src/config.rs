//! Environment configuration.
//!
//! Everything is read once at startup into an immutable [`Config`]. Required
//! settings that are missing or invalid fail startup; optional settings fall
//! back to defaults with a warning where that is safer than dying.

use std::time::Duration;

use chrono::Weekday;
use chrono_tz::Tz;
use thiserror::Error;
use tracing::warn;
use upnext_core::{CalendarRange, PassedEventMode, ScheduleKind, TimeFormat};
use upnext_sources::{CalendarSource, parse_calendar_urls};
use url::Url;

use crate::scheduler::ScheduleSpec;

/// Default header when `CUSTOM_HEADER` is not set.
pub const DEFAULT_HEADER: &str = "New Releases";
/// Default `RUN_TIME`.
pub const DEFAULT_RUN_TIME: (u32, u32) = (9, 0);
/// Default `HEALTH_PORT`.
pub const DEFAULT_HEALTH_PORT: u16 = 5000;
/// Default `HTTP_TIMEOUT` in seconds.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Errors raised while loading configuration. All fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("CALENDAR_URLS is required")]
    MissingCalendarUrls,

    #[error("no valid calendar sources: {details}")]
    NoValidSources { details: String },

    #[error("at least one of USE_DISCORD or USE_SLACK must be enabled")]
    NoTargetsEnabled,

    #[error("{key} is required when {target} is enabled")]
    MissingWebhookUrl {
        key: &'static str,
        target: &'static str,
    },

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: String, reason: String },

    #[error("failed to read footer file {path}: {source}")]
    FooterFile {
        path: String,
        source: std::io::Error,
    },
}

impl ConfigError {
    fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

/// Discord delivery settings.
#[derive(Debug, Clone)]
pub struct DiscordTarget {
    pub webhook_url: String,
    pub mention_role_id: Option<String>,
    pub hide_mention_instructions: bool,
    pub footer: Option<String>,
}

/// Slack delivery settings.
#[derive(Debug, Clone)]
pub struct SlackTarget {
    pub webhook_url: String,
    pub footer: Option<String>,
}

/// The full, immutable service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub sources: Vec<CalendarSource>,
    pub discord: Option<DiscordTarget>,
    pub slack: Option<SlackTarget>,

    pub schedule: ScheduleSpec,
    pub schedule_kind: Option<ScheduleKind>,
    pub run_on_startup: bool,

    pub range: CalendarRange,
    pub passed: PassedEventMode,
    pub deduplicate: bool,
    pub start_week_on_monday: bool,
    pub tz: Tz,

    pub custom_header: String,
    pub show_date_range: bool,
    pub show_timezone: bool,
    pub display_time: bool,
    pub time_format: TimeFormat,
    pub leading_zero: bool,

    pub http_timeout: Duration,
    pub health_port: u16,
}

impl Config {
    /// Loads configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through an arbitrary lookup function.
    ///
    /// The seam exists so tests can supply settings without touching process
    /// environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let sources = load_sources(&lookup)?;

        let use_discord = parse_bool(&lookup, "USE_DISCORD", false)?;
        let use_slack = parse_bool(&lookup, "USE_SLACK", false)?;
        if !use_discord && !use_slack {
            return Err(ConfigError::NoTargetsEnabled);
        }

        let discord = if use_discord {
            Some(load_discord_target(&lookup)?)
        } else {
            None
        };
        let slack = if use_slack {
            Some(load_slack_target(&lookup)?)
        } else {
            None
        };

        let tz = match lookup("TIMEZONE").or_else(|| lookup("TZ")) {
            Some(name) => name
                .trim()
                .parse::<Tz>()
                .map_err(|_| ConfigError::invalid("TIMEZONE", format!("unknown timezone {name:?}")))?,
            None => chrono_tz::UTC,
        };

        let schedule_kind = parse_optional(&lookup, "SCHEDULE_TYPE")?;
        let (run_hour, run_minute) = match lookup("RUN_TIME") {
            Some(value) => parse_run_time(&value)?,
            None => DEFAULT_RUN_TIME,
        };
        let schedule_day: Weekday = match lookup("SCHEDULE_DAY") {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| ConfigError::invalid("SCHEDULE_DAY", format!("unknown day {value:?}")))?,
            None => Weekday::Mon,
        };

        let schedule = build_schedule(
            lookup("CRON_SCHEDULE").as_deref(),
            schedule_kind.unwrap_or(ScheduleKind::Daily),
            schedule_day,
            run_hour,
            run_minute,
        );

        let range = match parse_optional::<CalendarRange, _>(&lookup, "CALENDAR_RANGE")? {
            Some(range) => range,
            None => CalendarRange::Auto,
        };
        let passed = match parse_optional::<PassedEventMode, _>(&lookup, "PASSED_EVENT_HANDLING")? {
            Some(mode) => mode,
            None => PassedEventMode::Display,
        };

        let use_24_hour = parse_bool(&lookup, "USE_24_HOUR", true)?;

        Ok(Self {
            sources,
            discord,
            slack,
            schedule,
            schedule_kind,
            run_on_startup: parse_bool(&lookup, "RUN_ON_STARTUP", false)?,
            range,
            passed,
            deduplicate: parse_bool(&lookup, "DEDUPLICATE_EVENTS", true)?,
            start_week_on_monday: parse_bool(&lookup, "START_WEEK_ON_MONDAY", true)?,
            tz,
            custom_header: lookup("CUSTOM_HEADER").unwrap_or_else(|| DEFAULT_HEADER.to_string()),
            show_date_range: parse_bool(&lookup, "SHOW_DATE_RANGE", true)?,
            show_timezone: parse_bool(&lookup, "SHOW_TIMEZONE_IN_SUBHEADER", false)?,
            display_time: parse_bool(&lookup, "DISPLAY_TIME", true)?,
            time_format: if use_24_hour {
                TimeFormat::H24
            } else {
                TimeFormat::H12
            },
            leading_zero: parse_bool(&lookup, "ADD_LEADING_ZERO", true)?,
            http_timeout: Duration::from_secs(parse_u64(
                &lookup,
                "HTTP_TIMEOUT",
                DEFAULT_HTTP_TIMEOUT_SECS,
            )?),
            health_port: parse_u64(&lookup, "HEALTH_PORT", u64::from(DEFAULT_HEALTH_PORT))?
                .try_into()
                .map_err(|_| ConfigError::invalid("HEALTH_PORT", "port out of range"))?,
        })
    }
}

fn load_sources<F>(lookup: &F) -> Result<Vec<CalendarSource>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup("CALENDAR_URLS").ok_or(ConfigError::MissingCalendarUrls)?;

    let (sources, rejected) = parse_calendar_urls(&raw)
        .map_err(|reason| ConfigError::invalid("CALENDAR_URLS", reason))?;

    if sources.is_empty() {
        let details = if rejected.is_empty() {
            "the array is empty".to_string()
        } else {
            rejected.join("; ")
        };
        return Err(ConfigError::NoValidSources { details });
    }

    Ok(sources)
}

fn load_discord_target<F>(lookup: &F) -> Result<DiscordTarget, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let webhook_url = require_webhook_url(lookup, "DISCORD_WEBHOOK_URL", "Discord")?;
    if !webhook_url.contains("discord.com/api/webhooks") {
        warn!(url = %webhook_url, "DISCORD_WEBHOOK_URL does not look like a Discord webhook URL");
    }
    let mention_role_id = lookup("DISCORD_MENTION_ROLE_ID").filter(|id| !id.trim().is_empty());

    Ok(DiscordTarget {
        webhook_url,
        mention_role_id,
        hide_mention_instructions: parse_bool(lookup, "DISCORD_HIDE_MENTION_INSTRUCTIONS", false)?,
        footer: load_footer(
            lookup,
            "ENABLE_CUSTOM_DISCORD_FOOTER",
            "CUSTOM_DISCORD_FOOTER_PATH",
        )?,
    })
}

fn load_slack_target<F>(lookup: &F) -> Result<SlackTarget, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    Ok(SlackTarget {
        webhook_url: require_webhook_url(lookup, "SLACK_WEBHOOK_URL", "Slack")?,
        footer: load_footer(
            lookup,
            "ENABLE_CUSTOM_SLACK_FOOTER",
            "CUSTOM_SLACK_FOOTER_PATH",
        )?,
    })
}

fn require_webhook_url<F>(
    lookup: &F,
    key: &'static str,
    target: &'static str,
) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = lookup(key)
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::MissingWebhookUrl { key, target })?;

    let url = Url::parse(value.trim())
        .map_err(|e| ConfigError::invalid(key, e.to_string()))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::invalid(
            key,
            format!("unsupported scheme {:?}", url.scheme()),
        ));
    }

    Ok(url.to_string())
}

fn load_footer<F>(
    lookup: &F,
    enable_key: &'static str,
    path_key: &'static str,
) -> Result<Option<String>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if !parse_bool(lookup, enable_key, false)? {
        return Ok(None);
    }

    let path = lookup(path_key)
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| ConfigError::invalid(path_key, format!("required when {enable_key} is true")))?;

    let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::FooterFile {
        path: path.clone(),
        source,
    })?;

    let text = text.trim_end().to_string();
    Ok(if text.is_empty() { None } else { Some(text) })
}

/// Builds the schedule, preferring a cron expression when one parses.
///
/// An invalid `CRON_SCHEDULE` is a warning, not a fatal error; the service
/// falls back to the derived daily/weekly schedule rather than refusing to
/// start.
fn build_schedule(
    cron_expr: Option<&str>,
    kind: ScheduleKind,
    day: Weekday,
    hour: u32,
    minute: u32,
) -> ScheduleSpec {
    if let Some(expr) = cron_expr.map(str::trim).filter(|e| !e.is_empty()) {
        match ScheduleSpec::cron(expr) {
            Ok(spec) => return spec,
            Err(e) => {
                warn!(
                    expression = expr,
                    error = %e,
                    "Invalid CRON_SCHEDULE, falling back to derived schedule"
                );
            }
        }
    }

    match kind {
        ScheduleKind::Daily => ScheduleSpec::Daily { hour, minute },
        ScheduleKind::Weekly => ScheduleSpec::Weekly { day, hour, minute },
    }
}

fn parse_run_time(value: &str) -> Result<(u32, u32), ConfigError> {
    let invalid = || ConfigError::invalid("RUN_TIME", format!("expected HH:MM, got {value:?}"));

    let (hour, minute) = value.trim().split_once(':').ok_or_else(invalid)?;
    let hour: u32 = hour.parse().map_err(|_| invalid())?;
    let minute: u32 = minute.parse().map_err(|_| invalid())?;
    if hour > 23 || minute > 59 {
        return Err(invalid());
    }

    Ok((hour, minute))
}

fn parse_bool<F>(lookup: &F, key: &str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => match value.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            other => Err(ConfigError::invalid(
                key,
                format!("expected a boolean, got {other:?}"),
            )),
        },
    }
}

fn parse_u64<F>(lookup: &F, key: &str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::invalid(key, format!("expected a number, got {value:?}"))),
    }
}

fn parse_optional<T, F>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr<Err = String>,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|reason| ConfigError::invalid(key, reason)),
    }
}
