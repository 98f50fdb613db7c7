//! Staleness report over active searches.

use chrono::{DateTime, Duration, Utc};
use jobhub_core::{Cadence, SearchCriteria, SearchId};
use jobhub_db::{executions, searches, Database, PlatformStats};
use serde::Serialize;

/// A search is stale once its last run is older than this many cadences.
pub const STALE_CADENCE_FACTOR: i32 = 2;

/// An active search that has not run recently enough.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StaleSearch {
    /// Search identifier
    pub search_id: SearchId,
    /// Search keywords, for display
    pub keywords: String,
    /// Configured cadence
    pub cadence: Cadence,
    /// Latest execution record, if the search ever ran
    pub last_executed_at: Option<DateTime<Utc>>,
}

/// Result of [`ScrapingService::health`](crate::ScrapingService::health).
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    /// When the report was computed
    pub checked_at: DateTime<Utc>,
    /// Number of active searches inspected
    pub active_searches: usize,
    /// Active searches overdue by more than two cadences
    pub stale: Vec<StaleSearch>,
    /// Share of non-error records over the last 24 hours
    pub success_rate_24h: Option<f64>,
    /// Mean platform duration over the last 24 hours, in seconds
    pub average_duration_24h: Option<f64>,
    /// Per-platform aggregates over the last 24 hours
    pub platforms: Vec<PlatformStats>,
}

impl HealthReport {
    /// `true` when no active search is stale.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.stale.is_empty()
    }
}

/// Whether `search` is overdue at `now`.
///
/// A search that never ran is measured from its creation time.
#[must_use]
pub fn is_stale(
    search: &SearchCriteria,
    last_executed_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    let reference = last_executed_at.unwrap_or(search.created_at);
    now - reference > search.cadence.as_duration() * STALE_CADENCE_FACTOR
}

pub(crate) async fn build_report(db: &Database, now: DateTime<Utc>) -> jobhub_db::Result<HealthReport> {
    let pool = db.pool();
    let active = searches::list_active(pool).await?;

    let mut stale = Vec::new();
    for search in &active {
        let last = executions::last_executed_at(pool, search.id).await?;
        if is_stale(search, last, now) {
            stale.push(StaleSearch {
                search_id: search.id,
                keywords: search.keywords.clone(),
                cadence: search.cadence,
                last_executed_at: last,
            });
        }
    }

    let window = now - Duration::hours(24);
    Ok(HealthReport {
        checked_at: now,
        active_searches: active.len(),
        stale,
        success_rate_24h: executions::success_rate(pool, window).await?,
        average_duration_24h: executions::average_duration(pool, window).await?,
        platforms: executions::platform_stats(pool, window).await?,
    })
}
