//! Schedule entries and run summaries.

use chrono::{DateTime, Utc};
use jobhub_core::{Cadence, SearchId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Durable trigger for one search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    /// Search this trigger fires for
    pub search_id: SearchId,
    /// Interval between firings
    pub cadence: Cadence,
    /// Next planned firing
    pub next_run_at: DateTime<Utc>,
    /// When the entry was last written
    pub updated_at: DateTime<Utc>,
}

impl ScheduleEntry {
    /// New entry stamped with the current time.
    #[must_use]
    pub fn new(search_id: SearchId, cadence: Cadence, next_run_at: DateTime<Utc>) -> Self {
        Self {
            search_id,
            cadence,
            next_run_at,
            updated_at: Utc::now(),
        }
    }
}

/// Public view of an installed trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledSearch {
    /// Search id
    pub search_id: SearchId,
    /// Interval between firings
    pub cadence: Cadence,
    /// Next planned firing
    pub next_run_at: DateTime<Utc>,
}

/// Result of a single execution as seen by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Whether the run completed without any platform or system error
    pub success: bool,
    /// Wall time spent in the run
    pub duration: Duration,
    /// First error message, if any
    pub error: Option<String>,
}

impl RunSummary {
    /// Summary for a run that did not happen or failed outright.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            duration: Duration::ZERO,
            error: Some(error.into()),
        }
    }
}

/// What happened when a trigger fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireOutcome {
    /// A new execution was spawned
    Started,
    /// The previous execution for this search is still active; skipped
    Coalesced,
}
