//! Digest run scheduling.
//!
//! A run fires from an explicit cron expression or a derived daily/weekly
//! schedule, with an optional delayed run at startup. Exactly one run is in
//! flight at a time; triggers arriving mid-run are dropped, not queued.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Datelike, Duration as ChronoDuration, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info, warn};

/// Delay before the `RUN_ON_STARTUP` run, giving the health endpoint and
/// container networking a moment to come up.
pub const STARTUP_RUN_DELAY: Duration = Duration::from_secs(5);

/// When a digest run fires.
#[derive(Debug, Clone)]
pub enum ScheduleSpec {
    /// Explicit cron expression.
    Cron(cron::Schedule),
    /// Every day at the given local time.
    Daily { hour: u32, minute: u32 },
    /// Once a week at the given local time.
    Weekly { day: Weekday, hour: u32, minute: u32 },
}

impl PartialEq for ScheduleSpec {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Cron(a), Self::Cron(b)) => a.to_string() == b.to_string(),
            (Self::Daily { hour, minute }, Self::Daily { hour: h, minute: m }) => {
                hour == h && minute == m
            }
            (
                Self::Weekly { day, hour, minute },
                Self::Weekly {
                    day: d,
                    hour: h,
                    minute: m,
                },
            ) => day == d && hour == h && minute == m,
            _ => false,
        }
    }
}

impl Eq for ScheduleSpec {}

impl ScheduleSpec {
    /// Parses a cron expression.
    ///
    /// Five-field expressions (minute first) are accepted by prepending a
    /// seconds field, so classic crontab syntax keeps working.
    pub fn cron(expr: &str) -> Result<Self, cron::error::Error> {
        let expr = expr.trim();
        let normalized = if expr.split_whitespace().count() == 5 {
            format!("0 {expr}")
        } else {
            expr.to_string()
        };

        cron::Schedule::from_str(&normalized).map(Self::Cron)
    }

    /// Returns the next fire time strictly after `after`.
    ///
    /// `None` means the schedule has no future fire times (possible with
    /// finite cron expressions).
    pub fn next_fire(&self, after: DateTime<Tz>) -> Option<DateTime<Tz>> {
        match self {
            Self::Cron(schedule) => schedule.after(&after).next(),
            Self::Daily { hour, minute } => {
                let mut date = after.date_naive();
                for _ in 0..4 {
                    // A day can lack this wall-clock time across a DST gap.
                    if let Some(candidate) = local_time(after.timezone(), date, *hour, *minute)
                        && candidate > after
                    {
                        return Some(candidate);
                    }
                    date = date.succ_opt()?;
                }
                None
            }
            Self::Weekly { day, hour, minute } => {
                let today = after.date_naive();
                let ahead = i64::from(
                    (day.num_days_from_monday() as i32
                        - today.weekday().num_days_from_monday() as i32)
                        .rem_euclid(7) as u32,
                );
                let date = today + ChronoDuration::days(ahead);
                match local_time(after.timezone(), date, *hour, *minute) {
                    Some(candidate) if candidate > after => Some(candidate),
                    _ => local_time(
                        after.timezone(),
                        date + ChronoDuration::days(7),
                        *hour,
                        *minute,
                    ),
                }
            }
        }
    }
}

fn local_time(tz: Tz, date: chrono::NaiveDate, hour: u32, minute: u32) -> Option<DateTime<Tz>> {
    tz.with_ymd_and_hms(date.year(), date.month(), date.day(), hour, minute, 0)
        .earliest()
}

/// Commands that can be sent to a running scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerCommand {
    /// Trigger an immediate run.
    RunNow,
    /// Stop the scheduler.
    Stop,
}

/// Observable scheduler state, surfaced by the health endpoint.
#[derive(Debug, Clone, Default)]
pub struct SchedulerState {
    /// Whether a run is currently in flight.
    pub running: bool,
    /// Completed run count.
    pub runs_completed: u32,
    /// Last run completion time.
    pub last_run: Option<DateTime<Utc>>,
    /// Last run error, if the most recent run failed.
    pub last_error: Option<String>,
}

impl SchedulerState {
    fn record_success(&mut self) {
        self.runs_completed += 1;
        self.last_run = Some(Utc::now());
        self.last_error = None;
    }

    fn record_failure(&mut self, error: impl Into<String>) {
        self.runs_completed += 1;
        self.last_run = Some(Utc::now());
        self.last_error = Some(error.into());
    }
}

/// Shared scheduler state.
pub type SharedSchedulerState = Arc<RwLock<SchedulerState>>;

/// Creates a new shared scheduler state.
pub fn new_scheduler_state() -> SharedSchedulerState {
    Arc::new(RwLock::new(SchedulerState::default()))
}

/// Drives digest runs according to a [`ScheduleSpec`].
pub struct Scheduler {
    spec: ScheduleSpec,
    tz: Tz,
    run_on_startup: bool,
    state: SharedSchedulerState,
    command_tx: mpsc::Sender<SchedulerCommand>,
    command_rx: Option<mpsc::Receiver<SchedulerCommand>>,
}

impl Scheduler {
    pub fn new(spec: ScheduleSpec, tz: Tz, run_on_startup: bool) -> Self {
        let (command_tx, command_rx) = mpsc::channel(16);
        Self {
            spec,
            tz,
            run_on_startup,
            state: new_scheduler_state(),
            command_tx,
            command_rx: Some(command_rx),
        }
    }

    /// Returns a handle for sending commands to the scheduler.
    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            command_tx: self.command_tx.clone(),
            state: self.state.clone(),
        }
    }

    /// Returns the shared state.
    pub fn state(&self) -> SharedSchedulerState {
        self.state.clone()
    }

    /// Runs the scheduler loop with the given job.
    ///
    /// The job is called for each fire and returns `Ok(())` or an error
    /// message; either way the loop continues to the next fire time.
    pub async fn run<F, Fut>(mut self, job: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<(), String>> + Send,
    {
        let mut command_rx = self.command_rx.take().expect("run called twice");

        info!(schedule = ?self.spec, timezone = %self.tz, "Scheduler started");

        if self.run_on_startup {
            debug!(
                delay_secs = STARTUP_RUN_DELAY.as_secs(),
                "Startup run scheduled"
            );
            tokio::select! {
                _ = tokio::time::sleep(STARTUP_RUN_DELAY) => {
                    self.do_run(&job).await;
                }
                cmd = command_rx.recv() => {
                    if self.handle_command(cmd, &job).await {
                        return;
                    }
                }
            }
        }

        loop {
            let now = Utc::now().with_timezone(&self.tz);
            let Some(next) = self.spec.next_fire(now) else {
                warn!("Schedule has no future fire times, stopping scheduler");
                return;
            };

            let delay = (next - now).to_std().unwrap_or(Duration::ZERO);
            debug!(next = %next, delay_secs = delay.as_secs(), "Next run scheduled");

            tokio::select! {
                _ = tokio::time::sleep(delay) => {
                    self.do_run(&job).await;
                }
                cmd = command_rx.recv() => {
                    if self.handle_command(cmd, &job).await {
                        return;
                    }
                }
            }

            // A run takes time; triggers that piled up while it ran are
            // dropped so one slow run cannot cause a burst of digests.
            loop {
                match command_rx.try_recv() {
                    Ok(SchedulerCommand::RunNow) => {
                        debug!("Dropping RunNow received during a run");
                    }
                    Ok(SchedulerCommand::Stop) => {
                        info!("Scheduler stopping");
                        return;
                    }
                    Err(_) => break,
                }
            }
        }
    }

    /// Returns true when the loop should exit.
    async fn handle_command<F, Fut>(&self, cmd: Option<SchedulerCommand>, job: &F) -> bool
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<(), String>>,
    {
        match cmd {
            Some(SchedulerCommand::RunNow) => {
                debug!("Received RunNow command");
                self.do_run(job).await;
                false
            }
            Some(SchedulerCommand::Stop) | None => {
                info!("Scheduler stopping");
                true
            }
        }
    }

    async fn do_run<F, Fut>(&self, job: &F)
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<(), String>>,
    {
        self.state.write().await.running = true;

        match job().await {
            Ok(()) => {
                info!("Digest run completed");
                let mut state = self.state.write().await;
                state.running = false;
                state.record_success();
            }
            Err(e) => {
                warn!(error = %e, "Digest run failed");
                let mut state = self.state.write().await;
                state.running = false;
                state.record_failure(e);
            }
        }
    }
}

/// Handle for sending commands to a running scheduler.
#[derive(Clone)]
pub struct SchedulerHandle {
    command_tx: mpsc::Sender<SchedulerCommand>,
    state: SharedSchedulerState,
}

impl SchedulerHandle {
    /// Triggers an immediate run.
    pub async fn run_now(&self) -> Result<(), mpsc::error::SendError<SchedulerCommand>> {
        self.command_tx.send(SchedulerCommand::RunNow).await
    }

    /// Stops the scheduler.
    pub async fn stop(&self) -> Result<(), mpsc::error::SendError<SchedulerCommand>> {
        self.command_tx.send(SchedulerCommand::Stop).await
    }

    /// Returns a snapshot of the current state.
    pub async fn state(&self) -> SchedulerState {
        self.state.read().await.clone()
    }
}
