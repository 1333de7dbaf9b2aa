//! Schedule definitions and the job trait.
//!
//! Defines the [`Schedule`] enum for timing and the [`ScheduledJob`] trait
//! implemented by the fetch and rotate jobs.

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Datelike, Days, Local, LocalResult, NaiveDateTime, NaiveTime, TimeZone, Weekday};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// When a job should run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Run every N seconds, starting immediately.
    Interval {
        /// Interval in seconds between runs.
        secs: u64,
    },
    /// Run once a week at a given local time.
    Weekly {
        /// Day of week.
        weekday: Weekday,
        /// Hour of day (0-23, local).
        hour: u8,
        /// Minute of hour (0-59).
        minute: u8,
        /// Second of minute (0-59).
        second: u8,
    },
}

impl std::fmt::Display for Schedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Interval { secs } => {
                if *secs >= 3600 && secs % 3600 == 0 {
                    write!(f, "every {} hours", secs / 3600)
                } else if *secs >= 60 && secs % 60 == 0 {
                    write!(f, "every {} minutes", secs / 60)
                } else {
                    write!(f, "every {secs} seconds")
                }
            }
            Self::Weekly {
                weekday,
                hour,
                minute,
                second,
            } => write!(f, "weekly on {weekday} at {hour:02}:{minute:02}:{second:02}"),
        }
    }
}

impl Schedule {
    /// Interval period, or `None` for weekly schedules.
    pub fn period(&self) -> Option<Duration> {
        match self {
            Self::Interval { secs } => Some(Duration::from_secs(*secs)),
            Self::Weekly { .. } => None,
        }
    }

    /// Next weekly firing strictly after `now` (wall-clock, no zone).
    ///
    /// Returns `None` for interval schedules or an out-of-range time of day.
    pub fn next_weekly_after(&self, now: NaiveDateTime) -> Option<NaiveDateTime> {
        let Self::Weekly {
            weekday,
            hour,
            minute,
            second,
        } = *self
        else {
            return None;
        };

        let at = NaiveTime::from_hms_opt(u32::from(hour), u32::from(minute), u32::from(second))?;
        let days_ahead = (weekday.num_days_from_monday() + 7
            - now.weekday().num_days_from_monday())
            % 7;
        let candidate = now
            .date()
            .checked_add_days(Days::new(u64::from(days_ahead)))?
            .and_time(at);

        if candidate > now {
            Some(candidate)
        } else {
            candidate.checked_add_days(Days::new(7))
        }
    }

    /// Next weekly firing strictly after `now` in local time.
    pub fn next_weekly_local(&self, now: DateTime<Local>) -> Option<DateTime<Local>> {
        let naive = self.next_weekly_after(now.naive_local())?;
        resolve_local(naive)
    }

    /// Next weekly firing after both `now` and the previous firing `last`.
    ///
    /// Anchoring on `last` keeps a clock stepped backwards, or a timer that
    /// wakes just short of its wall-clock target, from firing the same slot twice.
    pub fn next_weekly_since(
        &self,
        now: DateTime<Local>,
        last: Option<DateTime<Local>>,
    ) -> Option<DateTime<Local>> {
        let from = last.map_or(now, |last| last.max(now));
        self.next_weekly_local(from)
    }
}

/// Map a wall-clock time to a local instant: the earlier instant when the
/// time is ambiguous (clocks going back), one hour later when it falls in a
/// gap (clocks going forward).
fn resolve_local(naive: NaiveDateTime) -> Option<DateTime<Local>> {
    match Local.from_local_datetime(&naive) {
        LocalResult::Single(t) => Some(t),
        LocalResult::Ambiguous(earliest, _) => Some(earliest),
        LocalResult::None => Local
            .from_local_datetime(&(naive + chrono::Duration::hours(1)))
            .earliest(),
    }
}

/// A unit of work run by the [`Scheduler`](super::Scheduler) on each firing.
///
/// Firings of the same job may overlap; implementations coordinate any
/// shared state themselves. Implementations log their own failures; the
/// scheduler records a returned error only at debug level.
#[async_trait]
pub trait ScheduledJob: Send + Sync {
    /// Short name used in log lines.
    fn name(&self) -> &str;

    /// Run once. `cancel` fires when the scheduler is shutting down.
    async fn run(&self, cancel: CancellationToken) -> Result<()>;
}
