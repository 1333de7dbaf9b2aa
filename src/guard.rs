//! Coordination between log appends and log rotation.
//!
//! The lock is used as "appends vs. rotation" rather than as a literal
//! reader/writer lock: appends take the *shared* side (they may overlap each
//! other since each one is a single `O_APPEND` write) and rotation takes the
//! *exclusive* side so it never renames the file under an in-flight append.
//! Creating a fresh log (header + first row) also takes the exclusive side so
//! only one append ever writes the header.

use crate::error::{CollectorError, Result};
use std::sync::Arc;
use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};
use tokio_util::sync::CancellationToken;

/// Held for the duration of one append.
pub type AppendPermit = OwnedRwLockReadGuard<()>;

/// Held for the duration of one rotation or log creation.
pub type ExclusivePermit = OwnedRwLockWriteGuard<()>;

/// Shared guard handed to both the writer and the rotator. Cloning shares
/// the same underlying lock.
#[derive(Debug, Clone, Default)]
pub struct LogGuard {
    lock: Arc<RwLock<()>>,
}

impl LogGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the shared (append) side, or fail with
    /// [`CollectorError::Cancelled`] if `cancel` fires first.
    pub async fn append_permit(&self, cancel: &CancellationToken) -> Result<AppendPermit> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(CollectorError::Cancelled),
            permit = Arc::clone(&self.lock).read_owned() => Ok(permit),
        }
    }

    /// Acquire the exclusive (rotate / create) side, or fail with
    /// [`CollectorError::Cancelled`] if `cancel` fires first.
    pub async fn exclusive_permit(&self, cancel: &CancellationToken) -> Result<ExclusivePermit> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(CollectorError::Cancelled),
            permit = Arc::clone(&self.lock).write_owned() => Ok(permit),
        }
    }
}
