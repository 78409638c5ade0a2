//! Daemon: configuration, scheduling, the digest pipeline, health endpoint.

pub mod config;
pub mod error;
pub mod http;
pub mod pipeline;
pub mod scheduler;

pub use config::{Config, ConfigError, DiscordTarget, SlackTarget};
pub use error::{ServerError, ServerResult};
pub use http::AppState;
pub use pipeline::{Pipeline, RunReport, collect_occurrences};
pub use scheduler::{
    ScheduleSpec, Scheduler, SchedulerCommand, SchedulerHandle, SchedulerState,
    SharedSchedulerState, new_scheduler_state,
};
