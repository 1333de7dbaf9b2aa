//! Error types for the occupancy collector.

/// Top-level error type for fetching, logging and rotating occupancy data.
#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    /// The request could not be sent, the connection failed or timed out.
    #[error("network error: {0}")]
    Network(String),

    /// The endpoint answered with a non-200 status.
    #[error("bad status code: {0}")]
    BadStatus(u16),

    /// The response body was not the expected occupancy JSON.
    #[error("decode error: {0}")]
    Decode(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Scheduler error (startup, lifecycle misuse).
    #[error("scheduler error: {0}")]
    Scheduler(String),

    /// The operation was aborted by the shutdown signal.
    #[error("operation cancelled")]
    Cancelled,
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, CollectorError>;
