//! upnext: scheduled TV/movie release digests for Discord and Slack.

use std::str::FromStr;
use std::sync::Arc;

use tracing::{Level, error, info};
use upnext_core::{TracingConfig, TracingOutputFormat, init_tracing};
use upnext_server::{AppState, Config, Pipeline, Scheduler, ServerResult, http};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("upnext: {e}");
        std::process::exit(1);
    }
}

async fn run() -> ServerResult<()> {
    init_logging()?;

    let config = Arc::new(Config::from_env()?);
    info!(
        sources = config.sources.len(),
        discord = config.discord.is_some(),
        slack = config.slack.is_some(),
        timezone = %config.tz,
        "Configuration loaded"
    );

    let pipeline = Arc::new(Pipeline::new(config.clone())?);

    let scheduler = Scheduler::new(config.schedule.clone(), config.tz, config.run_on_startup);
    let state = AppState::new(scheduler.state());

    let port = config.health_port;
    tokio::spawn(async move {
        if let Err(e) = http::serve(port, state).await {
            error!(error = %e, "Health endpoint failed");
        }
    });

    scheduler
        .run(move || {
            let pipeline = pipeline.clone();
            async move { pipeline.run_once().await.map(|_| ()) }
        })
        .await;

    Ok(())
}

/// Initializes tracing from `DEBUG`, `LOG_LEVEL`, `LOG_FORMAT`, `RUST_LOG`.
fn init_logging() -> ServerResult<()> {
    let debug_mode = std::env::var("DEBUG")
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes" | "on"))
        .unwrap_or(false);

    let mut config = if debug_mode {
        TracingConfig::debug()
    } else {
        TracingConfig::default()
    };

    if let Ok(level) = std::env::var("LOG_LEVEL")
        && let Ok(level) = Level::from_str(level.trim())
    {
        config = config.with_level(level);
    }
    if let Ok(format) = std::env::var("LOG_FORMAT")
        && let Ok(format) = format.parse::<TracingOutputFormat>()
    {
        config = config.with_format(format);
    }

    init_tracing(config)?;
    Ok(())
}
