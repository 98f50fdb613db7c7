//! Resilient fetch layer for job-listing sites.
//!
//! Provides paced HTTP GETs with a rotating browser-like identity and
//! bounded exponential backoff on rate limiting and transient failures.

pub mod backoff;
pub mod error;
pub mod fetcher;
pub mod identity;
pub mod source;

pub use backoff::{BackoffPolicy, Pacing};
pub use error::{FetchError, Result};
pub use fetcher::Fetcher;
pub use identity::Identity;
pub use source::{PageSource, Session};
