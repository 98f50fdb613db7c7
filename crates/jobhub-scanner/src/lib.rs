//! JobHub Scanner - Execution of saved searches.
//!
//! The [`ExecutionOrchestrator`] loads a search, scrapes each of its
//! platforms in order, saves new listings and appends one execution record
//! per platform. It implements [`jobhub_scheduler::SearchRunner`] so the
//! scheduler can drive it.
//!
//! # Example
//!
//! ```rust,ignore
//! use jobhub_scanner::ExecutionOrchestrator;
//! use std::sync::Arc;
//!
//! let orchestrator = ExecutionOrchestrator::new(
//!     Arc::new(database),
//!     platform_registry,
//!     config.scraping.clone(),
//! );
//!
//! let report = orchestrator.run(search_id).await;
//! println!("{} new listings", report.total_new());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod error;
pub mod orchestrator;
pub mod report;

// Re-export commonly used types
pub use error::{Result, ScanError};
pub use orchestrator::ExecutionOrchestrator;
pub use report::{PlatformOutcome, RunReport};
