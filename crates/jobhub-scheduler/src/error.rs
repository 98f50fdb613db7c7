//! Error types for the scheduler

use thiserror::Error;

/// Scheduler error types
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The backing schedule store failed
    #[error("schedule store error: {0}")]
    Store(String),

    /// The registry was shut down and cannot be started again
    #[error("scheduler has been shut down")]
    Stopped,
}

impl SchedulerError {
    /// Wrap any displayable store failure.
    pub fn store(err: impl std::fmt::Display) -> Self {
        Self::Store(err.to_string())
    }
}

/// Result type alias for scheduler operations
pub type Result<T> = std::result::Result<T, SchedulerError>;
