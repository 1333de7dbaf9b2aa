//! Weekly archival of the active occupancy log.

use crate::error::Result;
use crate::guard::LogGuard;
use chrono::{Local, NaiveDate};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Prefix of archived log names: `occupancy_<YYYY-MM-DD>.csv`.
pub const ARCHIVE_PREFIX: &str = "occupancy";

/// Result of a rotation attempt. Every variant is a success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RotationOutcome {
    /// No active log existed; nothing to do.
    NoActiveLog,
    /// An archive for this date already exists; left untouched.
    TargetExists(PathBuf),
    /// The active log was renamed to the contained path.
    Rotated(PathBuf),
}

/// Renames the active log to a dated archive, holding the exclusive side of
/// the [`LogGuard`] throughout.
#[derive(Debug, Clone)]
pub struct LogRotator {
    path: PathBuf,
    guard: LogGuard,
}

impl LogRotator {
    pub fn new(path: impl Into<PathBuf>, guard: LogGuard) -> Self {
        Self {
            path: path.into(),
            guard,
        }
    }

    /// Path of the active log.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Archive path for `date`, in the same directory as the active log.
    pub fn archive_path(&self, date: NaiveDate) -> PathBuf {
        let name = format!("{ARCHIVE_PREFIX}_{}.csv", date.format("%Y-%m-%d"));
        match self.path.parent() {
            Some(dir) => dir.join(name),
            None => Path::new(&name).to_path_buf(),
        }
    }

    /// Rotate using today's local date.
    pub async fn rotate(&self, cancel: &CancellationToken) -> Result<RotationOutcome> {
        self.rotate_on(Local::now().date_naive(), cancel).await
    }

    /// Rotate using an explicit date.
    ///
    /// # Errors
    ///
    /// [`CollectorError::Io`] if the rename fails, [`CollectorError::Cancelled`]
    /// if `cancel` fires while waiting for in-flight appends.
    pub async fn rotate_on(
        &self,
        date: NaiveDate,
        cancel: &CancellationToken,
    ) -> Result<RotationOutcome> {
        let _permit = self.guard.exclusive_permit(cancel).await?;

        let target = self.archive_path(date);

        if !tokio::fs::try_exists(&self.path).await? {
            info!(path = %self.path.display(), "no file to rotate");
            return Ok(RotationOutcome::NoActiveLog);
        }

        if tokio::fs::try_exists(&target).await? {
            warn!(target = %target.display(), "rotation target already exists");
            return Ok(RotationOutcome::TargetExists(target));
        }

        tokio::fs::rename(&self.path, &target).await?;

        info!(new = %target.display(), "rotated log file");
        Ok(RotationOutcome::Rotated(target))
    }
}
