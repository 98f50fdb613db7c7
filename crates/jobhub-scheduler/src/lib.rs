//! JobHub Scheduler - Recurring execution of saved searches.
//!
//! The [`SchedulerRegistry`] keeps one timer per active search and fires
//! the configured [`SearchRunner`] every cadence interval. Firings for a
//! search that is still running are coalesced, a semaphore bounds the
//! number of concurrent runs, and firings missed beyond a grace window are
//! skipped instead of replayed. Entries are persisted through a
//! [`ScheduleStore`] and reconciled on startup.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod entry;
pub mod error;
pub mod registry;
pub mod store;
pub mod timing;

pub use entry::{FireOutcome, RunSummary, ScheduleEntry, ScheduledSearch};
pub use error::{Result, SchedulerError};
pub use registry::SchedulerRegistry;
pub use store::{ScheduleStore, SearchRunner};
pub use timing::{is_due, next_run_after, next_slot, resolve_next_fire, FireDecision};
