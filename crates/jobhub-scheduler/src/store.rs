//! Seams between the scheduler and the rest of the system.

use crate::entry::{RunSummary, ScheduleEntry};
use crate::error::Result;
use async_trait::async_trait;
use jobhub_core::{SearchCriteria, SearchId};

/// Durable storage for criteria lookups and schedule entries.
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    /// Load the criteria for a search, if it exists.
    async fn load_criteria(&self, search_id: SearchId) -> Result<Option<SearchCriteria>>;

    /// Ids of every active search.
    async fn active_search_ids(&self) -> Result<Vec<SearchId>>;

    /// All persisted schedule entries.
    async fn load_entries(&self) -> Result<Vec<ScheduleEntry>>;

    /// Insert or replace the entry for `entry.search_id`.
    async fn upsert_entry(&self, entry: &ScheduleEntry) -> Result<()>;

    /// Delete the entry for a search. Returns `true` if one existed.
    async fn remove_entry(&self, search_id: SearchId) -> Result<bool>;
}

/// Executes one search run. Implementations must not panic across this
/// boundary and report every failure through the summary.
#[async_trait]
pub trait SearchRunner: Send + Sync {
    /// Run the search once.
    async fn run(&self, search_id: SearchId) -> RunSummary;
}
