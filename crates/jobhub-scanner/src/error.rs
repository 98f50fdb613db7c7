//! Error types for search execution.

use jobhub_core::PlatformName;
use jobhub_db::DatabaseError;
use jobhub_platforms::ScrapeError;
use thiserror::Error;

/// Failures while executing a search.
///
/// `Platform` and `Persistence` are contained to one platform of a run;
/// `Fault` aborts the run and is recorded against the `system` platform.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The adapter failed for this platform
    #[error("{source}")]
    Platform {
        /// Platform that failed
        platform: PlatformName,
        /// Underlying scrape error
        #[source]
        source: ScrapeError,
    },

    /// Saving listings failed; the batch was rolled back
    #[error("failed to save listings: {0}")]
    Persistence(#[from] DatabaseError),

    /// Unexpected failure outside any single platform
    #[error("orchestration fault: {0}")]
    Fault(String),
}

/// Result type alias for scan operations
pub type Result<T> = std::result::Result<T, ScanError>;
