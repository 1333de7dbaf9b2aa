//! Background job scheduler.
//!
//! Runs the occupancy fetch on a fixed interval and log rotation once a
//! week. Firings are independent and may overlap.

pub mod runner;
pub mod tasks;

pub use runner::{Scheduler, SchedulerState};
pub use tasks::{Schedule, ScheduledJob};
