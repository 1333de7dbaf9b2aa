//! Scheduler background loops.
//!
//! Each registered job gets its own timer task. Every firing is spawned as a
//! separate task so a slow run never delays the next tick, and all of them
//! are tracked so shutdown can wait for in-flight work.

use crate::error::{CollectorError, Result};
use crate::scheduler::tasks::{Schedule, ScheduledJob};
use chrono::Local;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

/// Lifecycle of a [`Scheduler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Jobs may be added; no timers running.
    NotStarted,
    /// Timers are firing.
    Running,
    /// Shutdown requested and all in-flight jobs drained.
    Stopped,
}

/// Runs jobs on interval and weekly schedules until cancelled.
pub struct Scheduler {
    jobs: Vec<(Schedule, Arc<dyn ScheduledJob>)>,
    state: SchedulerState,
    cancel: CancellationToken,
    tracker: TaskTracker,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            jobs: Vec::new(),
            state: SchedulerState::NotStarted,
            cancel: CancellationToken::new(),
            tracker: TaskTracker::new(),
        }
    }

    /// Register a job. Only valid before [`start`](Self::start).
    pub fn add<J: ScheduledJob + 'static>(&mut self, schedule: Schedule, job: J) -> Result<()> {
        self.add_shared(schedule, Arc::new(job))
    }

    /// Register an already shared job.
    pub fn add_shared(&mut self, schedule: Schedule, job: Arc<dyn ScheduledJob>) -> Result<()> {
        if self.state != SchedulerState::NotStarted {
            return Err(CollectorError::Scheduler(format!(
                "cannot add job '{}' after start",
                job.name()
            )));
        }
        if let Schedule::Interval { secs: 0 } = schedule {
            return Err(CollectorError::Scheduler(format!(
                "job '{}' has a zero interval",
                job.name()
            )));
        }
        info!(job = job.name(), schedule = %schedule, "job registered");
        self.jobs.push((schedule, job));
        Ok(())
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Token that stops the scheduler when cancelled. Jobs receive child
    /// tokens of it.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Start one timer per registered job.
    ///
    /// # Errors
    ///
    /// Returns [`CollectorError::Scheduler`] if already started, if no jobs
    /// are registered, or if called outside a Tokio runtime.
    pub fn start(&mut self) -> Result<()> {
        if self.state != SchedulerState::NotStarted {
            return Err(CollectorError::Scheduler(format!(
                "cannot start scheduler in state {:?}",
                self.state
            )));
        }
        if self.jobs.is_empty() {
            return Err(CollectorError::Scheduler("no jobs registered".to_owned()));
        }
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|e| CollectorError::Scheduler(format!("no async runtime: {e}")))?;

        for (schedule, job) in &self.jobs {
            let timer = timer_loop(
                *schedule,
                Arc::clone(job),
                self.cancel.clone(),
                self.tracker.clone(),
            );
            self.tracker.spawn_on(timer, &handle);
        }

        self.state = SchedulerState::Running;
        info!("scheduler started with {} jobs", self.jobs.len());
        Ok(())
    }

    /// Block until the shutdown token is cancelled, then wait for every
    /// in-flight job to finish.
    ///
    /// # Errors
    ///
    /// Returns [`CollectorError::Scheduler`] if the scheduler was never started.
    pub async fn wait(&mut self) -> Result<()> {
        match self.state {
            SchedulerState::Running => {}
            SchedulerState::Stopped => return Ok(()),
            SchedulerState::NotStarted => {
                return Err(CollectorError::Scheduler(
                    "cannot wait on a scheduler that was not started".to_owned(),
                ));
            }
        }

        self.cancel.cancelled().await;
        info!("scheduler shutting down, waiting for in-flight jobs");
        self.tracker.close();
        self.tracker.wait().await;
        self.state = SchedulerState::Stopped;
        info!("scheduler stopped");
        Ok(())
    }

    /// Request shutdown and wait for it to complete.
    pub async fn stop(&mut self) -> Result<()> {
        self.cancel.cancel();
        self.wait().await
    }
}

async fn timer_loop(
    schedule: Schedule,
    job: Arc<dyn ScheduledJob>,
    cancel: CancellationToken,
    tracker: TaskTracker,
) {
    match schedule {
        Schedule::Interval { .. } => {
            let Some(period) = schedule.period() else {
                return;
            };
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => dispatch(&tracker, &job, &cancel),
                }
            }
        }
        Schedule::Weekly { .. } => {
            let mut last_fired = None;
            loop {
                let now = Local::now();
                let Some(next) = schedule.next_weekly_since(now, last_fired) else {
                    error!(job = job.name(), schedule = %schedule, "cannot compute next run, timer stopped");
                    return;
                };
                let delay = (next - now).to_std().unwrap_or(Duration::ZERO);
                debug!(job = job.name(), next = %next, delay_secs = delay.as_secs(), "next weekly run scheduled");
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {
                        last_fired = Some(next);
                        dispatch(&tracker, &job, &cancel);
                    }
                }
            }
        }
    }
    debug!(job = job.name(), "timer stopped");
}

fn dispatch(tracker: &TaskTracker, job: &Arc<dyn ScheduledJob>, cancel: &CancellationToken) {
    let job = Arc::clone(job);
    let cancel = cancel.child_token();
    tracker.spawn(async move {
        let started = Instant::now();
        match job.run(cancel).await {
            Ok(()) => debug!(
                job = job.name(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "job finished"
            ),
            Err(CollectorError::Cancelled) => warn!(job = job.name(), "job cancelled by shutdown"),
            // Jobs log their own failures with context; one error line per failure.
            Err(e) => debug!(job = job.name(), error = %e, "job failed"),
        }
    });
}
