//! JobHub Platforms - Adapters turning job-board result pages into listings.
//!
//! Each supported job board implements [`PlatformAdapter`]: it knows how to
//! build a search URL from stored criteria, find listing elements on a
//! results page and normalize one listing. Pagination, since-cursor
//! filtering and partial-result handling are shared by every adapter.
//!
//! # Architecture
//!
//! - **Adapter** ([`adapter`]): The adapter trait and the pagination driver
//! - **Indeed** ([`indeed`]) and **LinkedIn** ([`linkedin`]): Concrete platforms
//! - **Registry** ([`registry`]): Name to adapter lookup
//! - **Selectors** ([`selectors`]): Priority-ordered CSS helpers
//! - **Dates** ([`dates`]): Relative and absolute posting-date parsing
//! - **Errors** ([`error`]): Scrape error types
//!
//! # Example
//!
//! ```rust,no_run
//! use jobhub_core::{FetchConfig, PlatformName};
//! use jobhub_platforms::PlatformRegistry;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = PlatformRegistry::with_defaults(&FetchConfig::default())?;
//! let indeed = registry.get(&PlatformName::new("indeed")?)?;
//! println!("Scraping {}", indeed.base_url());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod adapter;
pub mod dates;
pub mod error;
pub mod indeed;
pub mod linkedin;
pub mod registry;
pub mod selectors;

// Re-export commonly used types
pub use adapter::{PlatformAdapter, ScrapeOutcome, MAX_PAGES};
pub use error::{Result, ScrapeError};
pub use indeed::IndeedAdapter;
pub use linkedin::LinkedInAdapter;
pub use registry::PlatformRegistry;
