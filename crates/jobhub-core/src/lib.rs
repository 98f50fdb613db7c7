//! JobHub Core - Foundation crate for the JobHub scraping engine.
//!
//! This crate provides shared types, error handling and configuration
//! management that all other JobHub crates depend on.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths
//! - [`types`] - Shared newtypes and domain records (`SearchId`, `PlatformName`,
//!   `Cadence`, `SearchCriteria`, `JobListing`, `ExecutionStatus`)
//!
//! # Example
//!
//! ```rust
//! use jobhub_core::{AppConfig, Cadence};
//!
//! let config = AppConfig::default();
//! assert_eq!(config.scraping.default_limit, 50);
//!
//! // Out-of-range cadences are clamped into [5, 60] minutes.
//! assert_eq!(Cadence::new(120).minutes(), 60);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{
    AppConfig, DatabaseConfig, FetchConfig, RetentionConfig, SchedulerConfig, ScrapingConfig,
};
pub use error::{ConfigError, ConfigResult, JobHubError, Result};
pub use types::{
    Cadence, ExecutionStatus, JobListing, ParsedListing, PlatformName, SearchCriteria, SearchId,
};
