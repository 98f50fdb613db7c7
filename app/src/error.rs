//! Error types for the service facade.

use jobhub_core::ConfigError;
use jobhub_db::DatabaseError;
use jobhub_platforms::ScrapeError;
use jobhub_scheduler::SchedulerError;
use serde::Serialize;
use thiserror::Error;

/// Errors surfaced by [`ScrapingService`](crate::ScrapingService).
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration could not be loaded or is invalid
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Database open, migration or query failure
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// Platform adapters could not be built
    #[error("platform setup failed: {0}")]
    Platform(#[from] ScrapeError),

    /// Scheduler could not reconcile its entries
    #[error("scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),
}

/// Result type for service operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Serializable form of an [`AppError`] for status output.
#[derive(Debug, Serialize)]
pub struct ErrorReport {
    /// Stable code, e.g. `DATABASE_ERROR`
    pub code: String,
    /// Human-readable message
    pub message: String,
}

impl From<&AppError> for ErrorReport {
    fn from(err: &AppError) -> Self {
        let code = match err {
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Platform(_) => "PLATFORM_ERROR",
            AppError::Scheduler(_) => "SCHEDULER_ERROR",
        };
        Self {
            code: code.to_string(),
            message: err.to_string(),
        }
    }
}
