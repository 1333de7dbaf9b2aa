//! Occupancy collector: polls a study-space occupancy endpoint and keeps a
//! weekly-rotated CSV log.
//!
//! # Architecture
//!
//! Two independent timers drive everything:
//! - **Fetch** (every `poll_interval_secs`): [`fetcher::OccupancyClient`] GETs
//!   the endpoint and [`log_writer::LogWriter`] appends one row.
//! - **Rotate** (weekly): [`rotator::LogRotator`] renames the active log to
//!   `occupancy_<YYYY-MM-DD>.csv`.
//!
//! The only shared state is the log file, coordinated by a single injected
//! [`guard::LogGuard`]: appends hold it shared, rotation holds it exclusive.

pub mod config;
pub mod error;
pub mod fetcher;
pub mod guard;
pub mod jobs;
pub mod log_writer;
pub mod occupancy;
pub mod rotator;
pub mod scheduler;

#[cfg(test)]
mod test_utils;

pub use config::CollectorConfig;
pub use error::{CollectorError, Result};
pub use occupancy::{LevelReading, OccupancyReading};

use guard::LogGuard;
use jobs::{FetchJob, RotateJob};
use log_writer::LogWriter;
use rotator::LogRotator;
use scheduler::{Schedule, Scheduler};

/// Build a scheduler with the fetch and rotate jobs wired to one shared guard.
///
/// The returned scheduler is not started.
///
/// # Errors
///
/// Returns an error if the config is invalid or the HTTP client cannot be built.
pub fn build_scheduler(config: &CollectorConfig) -> Result<Scheduler> {
    config.validate()?;

    let guard = LogGuard::new();
    let client = fetcher::OccupancyClient::new(&config.fetch)?;
    let writer = LogWriter::new(&config.log.path, config.log.levels.clone(), guard.clone());
    let rotator = LogRotator::new(&config.log.path, guard);

    let mut scheduler = Scheduler::new();
    scheduler.add(
        Schedule::Interval {
            secs: config.fetch.poll_interval_secs,
        },
        FetchJob::new(client, writer),
    )?;
    scheduler.add(
        Schedule::Weekly {
            weekday: config.rotation.weekday,
            hour: config.rotation.hour,
            minute: config.rotation.minute,
            second: config.rotation.second,
        },
        RotateJob::new(rotator),
    )?;
    Ok(scheduler)
}
