//! Error types for the platform adapters.

use jobhub_core::PlatformName;
use jobhub_fetch::FetchError;
use thiserror::Error;

/// Errors that end a platform scrape.
#[derive(Error, Debug)]
pub enum ScrapeError {
    /// The first results page could not be fetched
    #[error("{platform}: fetch failed: {source}")]
    Fetch {
        /// Platform being scraped
        platform: PlatformName,
        /// Underlying fetch error
        #[source]
        source: FetchError,
    },

    /// No adapter registered under this name
    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),

    /// The search URL could not be built
    #[error("{platform}: invalid query: {reason}")]
    InvalidQuery {
        /// Platform being scraped
        platform: PlatformName,
        /// Why the URL was rejected
        reason: String,
    },
}

/// Result type for platform operations.
pub type Result<T> = std::result::Result<T, ScrapeError>;
