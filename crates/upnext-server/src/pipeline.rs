//! The digest pipeline: fetch, parse, expand, filter, format, deliver.
//!
//! One [`Pipeline::run_once`] call is one digest run. Failed sources and
//! failed targets degrade the run instead of aborting it; the run only errors
//! when nothing could be fetched or nothing could be delivered.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::{info, warn};
use upnext_core::{
    Digest, FilterOptions, FormatOptions, Occurrence, TimeWindow, filter_events, render_discord,
    render_slack, resolve_window,
};
use upnext_notify::{DiscordNotifier, SlackNotifier, WebhookSender};
use upnext_sources::{
    CalendarSource, FetchOptions, IcsFetcher, SourceError, SourceResult, expand_events, parse_ics,
};

use crate::config::Config;
use crate::error::{ServerError, ServerResult};

/// Summary of one digest run, for logging and diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub sources_ok: usize,
    pub sources_failed: usize,
    pub events: usize,
    pub days: usize,
    pub targets_ok: usize,
    pub targets_failed: usize,
}

/// Parses and expands fetched feed bodies into occurrences.
///
/// Sources that failed to fetch or parse are collected as errors; the
/// occurrences from the remaining sources are merged chronologically.
pub fn collect_occurrences(
    fetched: Vec<(CalendarSource, SourceResult<String>)>,
    window: &TimeWindow,
    tz: &Tz,
) -> (Vec<Occurrence>, usize, Vec<SourceError>) {
    let mut occurrences = Vec::new();
    let mut sources_ok = 0;
    let mut errors = Vec::new();

    for (source, result) in fetched {
        let body = match result {
            Ok(body) => body,
            Err(e) => {
                errors.push(e);
                continue;
            }
        };

        match parse_ics(&body, source.url.as_str()) {
            Ok(events) => {
                sources_ok += 1;
                occurrences.extend(expand_events(events, &source, window, tz));
            }
            Err(e) => errors.push(e),
        }
    }

    occurrences.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.title.cmp(&b.title)));
    (occurrences, sources_ok, errors)
}

/// Builds the per-target format options from the shared display settings.
fn format_options(config: &Config, footer: Option<String>) -> FormatOptions {
    FormatOptions {
        header: config.custom_header.clone(),
        show_date_range: config.show_date_range,
        show_timezone: config.show_timezone,
        display_time: config.display_time,
        time_format: config.time_format,
        leading_zero: config.leading_zero,
        passed: config.passed,
        footer,
    }
}

/// Owns the HTTP clients and runs the digest end to end.
pub struct Pipeline {
    config: Arc<Config>,
    fetcher: IcsFetcher,
    sender: WebhookSender,
}

impl Pipeline {
    pub fn new(config: Arc<Config>) -> ServerResult<Self> {
        let fetcher = IcsFetcher::new(FetchOptions {
            timeout: config.http_timeout,
            ..Default::default()
        })
        .map_err(|e| ServerError::init(e.to_string()))?;

        let sender =
            WebhookSender::new(config.http_timeout).map_err(|e| ServerError::init(e.to_string()))?;

        Ok(Self {
            config,
            fetcher,
            sender,
        })
    }

    /// Runs one digest cycle at the current time.
    pub async fn run_once(&self) -> Result<RunReport, String> {
        self.run_at(Utc::now()).await
    }

    /// Runs one digest cycle with an explicit "now" (injected for tests).
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<RunReport, String> {
        let config = &self.config;
        let window = resolve_window(
            config.range,
            config.schedule_kind,
            config.start_week_on_monday,
            &config.tz,
            now,
        );
        info!(start = %window.start, end = %window.end, "Starting digest run");

        let fetched = self.fetcher.fetch_all(&config.sources).await;
        let total_sources = fetched.len();
        let (occurrences, sources_ok, source_errors) =
            collect_occurrences(fetched, &window, &config.tz);

        for error in &source_errors {
            warn!(error = %error, "Calendar source skipped");
        }
        if sources_ok == 0 {
            return Err(format!("all {total_sources} calendar sources failed"));
        }

        let events = filter_events(
            occurrences,
            &FilterOptions {
                window,
                passed: config.passed,
                deduplicate: config.deduplicate,
            },
            now,
            &config.tz,
        );
        let digest = Digest::build(events, window, &config.tz);

        let mut report = RunReport {
            sources_ok,
            sources_failed: total_sources - sources_ok,
            events: digest.total_count(),
            days: digest.days.len(),
            ..Default::default()
        };

        if let Some(ref target) = config.discord {
            let options = format_options(config, target.footer.clone());
            let rendered = render_discord(&digest, &options, &config.tz);

            let mut notifier = DiscordNotifier::new(&target.webhook_url);
            if let Some(ref role_id) = target.mention_role_id {
                notifier = notifier.with_mention_role(role_id, target.hide_mention_instructions);
            }

            match notifier.send(&self.sender, &rendered).await {
                Ok(()) => report.targets_ok += 1,
                Err(e) => {
                    warn!(error = %e, "Discord delivery failed");
                    report.targets_failed += 1;
                }
            }
        }

        if let Some(ref target) = config.slack {
            let options = format_options(config, target.footer.clone());
            let rendered = render_slack(&digest, &options, &config.tz);

            match SlackNotifier::new(&target.webhook_url)
                .send(&self.sender, &rendered)
                .await
            {
                Ok(()) => report.targets_ok += 1,
                Err(e) => {
                    warn!(error = %e, "Slack delivery failed");
                    report.targets_failed += 1;
                }
            }
        }

        if report.targets_ok == 0 {
            return Err(format!(
                "all {} delivery targets failed",
                report.targets_failed
            ));
        }

        info!(
            sources_ok = report.sources_ok,
            sources_failed = report.sources_failed,
            events = report.events,
            days = report.days,
            targets_ok = report.targets_ok,
            targets_failed = report.targets_failed,
            "Digest run finished"
        );
        Ok(report)
    }
}
