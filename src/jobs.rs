//! Scheduled jobs: fetch-and-append and weekly rotation.

use crate::error::{CollectorError, Result};
use crate::fetcher::OccupancyClient;
use crate::log_writer::LogWriter;
use crate::rotator::LogRotator;
use crate::scheduler::ScheduledJob;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

/// Fetches one reading and appends it to the active log.
pub struct FetchJob {
    client: OccupancyClient,
    writer: LogWriter,
}

impl FetchJob {
    pub fn new(client: OccupancyClient, writer: LogWriter) -> Self {
        Self { client, writer }
    }
}

#[async_trait]
impl ScheduledJob for FetchJob {
    fn name(&self) -> &str {
        "fetch_occupancy"
    }

    async fn run(&self, cancel: CancellationToken) -> Result<()> {
        let reading = tokio::select! {
            _ = cancel.cancelled() => return Err(CollectorError::Cancelled),
            fetched = self.client.fetch() => fetched,
        };
        let reading = match reading {
            Ok(r) => r,
            Err(e) => {
                error!(url = self.client.url(), error = %e, "occupancy fetch failed");
                return Err(e);
            }
        };

        let inconsistent = reading.inconsistent_areas();
        if !inconsistent.is_empty() {
            warn!(areas = ?inconsistent, "reading has inconsistent counts, logging anyway");
        }

        if let Err(e) = self.writer.append(&reading, &cancel).await {
            if !matches!(e, CollectorError::Cancelled) {
                error!(path = %self.writer.path().display(), error = %e, "failed to write occupancy row");
            }
            return Err(e);
        }
        Ok(())
    }
}

/// Archives the active log under a dated name.
pub struct RotateJob {
    rotator: LogRotator,
}

impl RotateJob {
    pub fn new(rotator: LogRotator) -> Self {
        Self { rotator }
    }
}

#[async_trait]
impl ScheduledJob for RotateJob {
    fn name(&self) -> &str {
        "rotate_log"
    }

    async fn run(&self, cancel: CancellationToken) -> Result<()> {
        match self.rotator.rotate(&cancel).await {
            Ok(_) => Ok(()),
            Err(e) => {
                if !matches!(e, CollectorError::Cancelled) {
                    error!(path = %self.rotator.path().display(), error = %e, "failed to rotate log");
                }
                Err(e)
            }
        }
    }
}
