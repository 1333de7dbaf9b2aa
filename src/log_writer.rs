//! Append-only CSV occupancy log.

use crate::error::{CollectorError, Result};
use crate::guard::LogGuard;
use crate::occupancy::{LevelReading, OccupancyReading};
use chrono::{DateTime, Local, SecondsFormat};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Appends one row per reading to the active log, writing the header first
/// when the file is new.
#[derive(Debug, Clone)]
pub struct LogWriter {
    path: PathBuf,
    levels: Vec<String>,
    guard: LogGuard,
}

impl LogWriter {
    /// `levels` fixes both the header and the per-row column order.
    pub fn new(path: impl Into<PathBuf>, levels: Vec<String>, guard: LogGuard) -> Self {
        Self {
            path: path.into(),
            levels,
            guard,
        }
    }

    /// Path of the active log.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Header columns: timestamp, four telepen columns, then four per level.
    pub fn header(&self) -> Vec<String> {
        let mut header = vec![
            "timestamp".to_owned(),
            "telepen_free".to_owned(),
            "telepen_total".to_owned(),
            "telepen_free_pct".to_owned(),
            "telepen_used_pct".to_owned(),
        ];
        for level in &self.levels {
            header.push(format!("{level}_free"));
            header.push(format!("{level}_total"));
            header.push(format!("{level}_free_pct"));
            header.push(format!("{level}_used_pct"));
        }
        header
    }

    /// Data row for `reading` stamped with `timestamp`.
    pub fn row(&self, timestamp: &str, reading: &OccupancyReading) -> Vec<String> {
        let mut row = Vec::with_capacity(5 + 4 * self.levels.len());
        row.push(timestamp.to_owned());
        push_level(&mut row, &reading.telepen);
        for level in &self.levels {
            push_level(&mut row, &reading.level(level));
        }
        row
    }

    /// Append `reading` stamped with the current local time.
    ///
    /// Returns the timestamp written.
    ///
    /// # Errors
    ///
    /// [`CollectorError::Io`] if the file cannot be opened or written,
    /// [`CollectorError::Cancelled`] if `cancel` fires while waiting for the guard.
    pub async fn append(
        &self,
        reading: &OccupancyReading,
        cancel: &CancellationToken,
    ) -> Result<String> {
        self.append_at(Local::now(), reading, cancel).await
    }

    /// Same as [`append`](Self::append) with an explicit timestamp.
    pub async fn append_at(
        &self,
        now: DateTime<Local>,
        reading: &OccupancyReading,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let timestamp = now.to_rfc3339_opts(SecondsFormat::Secs, false);

        for name in reading.affluence.keys() {
            if !self.levels.iter().any(|l| l == name) {
                debug!(level = %name, "ignoring level not in configured column list");
            }
        }

        let shared = self.guard.append_permit(cancel).await?;
        if tokio::fs::try_exists(&self.path).await? {
            let buf = self.encode(false, &timestamp, reading)?;
            self.write_buf(&buf).await?;
            drop(shared);
        } else {
            // Creating the file writes the header, which only one append may do.
            drop(shared);
            let _exclusive = self.guard.exclusive_permit(cancel).await?;
            let file_exists = tokio::fs::try_exists(&self.path).await?;
            let buf = self.encode(!file_exists, &timestamp, reading)?;
            if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent).await?;
            }
            self.write_buf(&buf).await?;
        }

        info!(timestamp = %timestamp, "logged occupancy data");
        Ok(timestamp)
    }

    async fn write_buf(&self, buf: &[u8]) -> Result<()> {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        // One write per append so concurrent appends never interleave within a row.
        file.write_all(buf).await?;
        file.flush().await?;
        Ok(())
    }

    fn encode(
        &self,
        with_header: bool,
        timestamp: &str,
        reading: &OccupancyReading,
    ) -> Result<Vec<u8>> {
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        if with_header {
            wtr.write_record(self.header()).map_err(csv_to_io)?;
        }
        wtr.write_record(self.row(timestamp, reading))
            .map_err(csv_to_io)?;
        wtr.into_inner()
            .map_err(|e| CollectorError::Io(std::io::Error::other(e.to_string())))
    }
}

fn push_level(row: &mut Vec<String>, level: &LevelReading) {
    row.push(level.free.to_string());
    row.push(level.total.to_string());
    row.push(format!("{:.1}", level.free_percentage));
    row.push(format!("{:.1}", level.used_percentage));
}

fn csv_to_io(e: csv::Error) -> CollectorError {
    CollectorError::Io(e.into())
}
