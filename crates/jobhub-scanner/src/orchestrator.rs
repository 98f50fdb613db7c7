//! Execution orchestrator for saved searches.
//!
//! One run walks the platforms of a search in order: scrape, save the
//! listings, append an execution record. A failing platform never stops the
//! others, and nothing escapes [`ExecutionOrchestrator::run`]: faults outside
//! the per-platform boundary, panics included, become a `system` record.

use crate::error::{Result, ScanError};
use crate::report::{PlatformOutcome, RunReport};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use futures::FutureExt;
use jobhub_core::{ExecutionStatus, PlatformName, ScrapingConfig, SearchCriteria, SearchId};
use jobhub_db::{executions, jobs, searches, Database, NewExecution};
use jobhub_platforms::PlatformRegistry;
use jobhub_scheduler::{RunSummary, SearchRunner};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

struct SavedScrape {
    found: u32,
    new: u32,
    truncated: Option<String>,
}

/// Runs searches against the registered platforms.
pub struct ExecutionOrchestrator {
    db: Arc<Database>,
    platforms: PlatformRegistry,
    config: ScrapingConfig,
}

impl ExecutionOrchestrator {
    /// Create a new orchestrator.
    #[must_use]
    pub fn new(db: Arc<Database>, platforms: PlatformRegistry, config: ScrapingConfig) -> Self {
        Self {
            db,
            platforms,
            config,
        }
    }

    /// Platforms available to searches.
    #[must_use]
    pub fn platforms(&self) -> &PlatformRegistry {
        &self.platforms
    }

    /// Execute a search once. Never fails; problems are reported in the
    /// returned [`RunReport`] and in the execution log.
    pub async fn run(&self, search_id: SearchId) -> RunReport {
        let started = Instant::now();

        match AssertUnwindSafe(self.execute(search_id)).catch_unwind().await {
            Ok(Ok(report)) => report,
            Ok(Err(fault)) => {
                self.record_fault(search_id, started.elapsed(), fault.to_string())
                    .await
            }
            Err(panic) => {
                let message = format!("panic during run: {}", panic_message(panic.as_ref()));
                self.record_fault(search_id, started.elapsed(), message).await
            }
        }
    }

    async fn execute(&self, search_id: SearchId) -> Result<RunReport> {
        let started = Instant::now();

        let criteria = searches::get(self.db.pool(), search_id)
            .await
            .map_err(|e| ScanError::Fault(format!("failed to load search {search_id}: {e}")))?;
        let Some(criteria) = criteria else {
            debug!(search_id = %search_id, "search not found, skipping run");
            return Ok(RunReport::skipped(search_id));
        };
        if !criteria.is_active {
            debug!(search_id = %search_id, "search inactive, skipping run");
            return Ok(RunReport::skipped(search_id));
        }

        let since = self.since_cursor(search_id).await?;
        info!(
            search_id = %search_id,
            keywords = %criteria.keywords,
            platforms = criteria.platforms.len(),
            since = ?since,
            "executing search"
        );

        let mut outcomes = Vec::with_capacity(criteria.platforms.len());
        for platform in &criteria.platforms {
            outcomes.push(self.run_platform(&criteria, platform, since).await);
        }

        let report = RunReport::from_outcomes(search_id, started.elapsed(), outcomes);
        info!(
            search_id = %search_id,
            found = report.total_found(),
            new = report.total_new(),
            success = report.success,
            duration_ms = report.duration.as_millis(),
            "search run finished"
        );
        Ok(report)
    }

    async fn since_cursor(&self, search_id: SearchId) -> Result<Option<DateTime<Utc>>> {
        let last = executions::last_executed_at(self.db.pool(), search_id)
            .await
            .map_err(|e| ScanError::Fault(format!("failed to read last execution: {e}")))?;

        Ok(last.map(|at| at - ChronoDuration::minutes(self.config.since_margin_minutes)))
    }

    async fn run_platform(
        &self,
        criteria: &SearchCriteria,
        platform: &PlatformName,
        since: Option<DateTime<Utc>>,
    ) -> PlatformOutcome {
        let started = Instant::now();
        let result = self.scrape_and_save(criteria, platform, since).await;
        let duration = started.elapsed();

        let outcome = match result {
            Ok(saved) => {
                let status = if saved.truncated.is_some() {
                    ExecutionStatus::Partial
                } else {
                    ExecutionStatus::Success
                };
                info!(
                    search_id = %criteria.id,
                    platform = %platform,
                    found = saved.found,
                    new = saved.new,
                    status = %status,
                    "platform finished"
                );
                PlatformOutcome {
                    platform: platform.clone(),
                    status,
                    jobs_found: saved.found,
                    new_jobs_found: saved.new,
                    duration,
                    error: saved.truncated,
                }
            }
            Err(e) => {
                warn!(
                    search_id = %criteria.id,
                    platform = %platform,
                    error = %e,
                    "platform failed"
                );
                PlatformOutcome {
                    platform: platform.clone(),
                    status: ExecutionStatus::Error,
                    jobs_found: 0,
                    new_jobs_found: 0,
                    duration,
                    error: Some(e.to_string()),
                }
            }
        };

        self.record(criteria.id, &outcome).await;
        outcome
    }

    async fn scrape_and_save(
        &self,
        criteria: &SearchCriteria,
        platform: &PlatformName,
        since: Option<DateTime<Utc>>,
    ) -> Result<SavedScrape> {
        let adapter = self
            .platforms
            .get(platform)
            .map_err(|source| ScanError::Platform {
                platform: platform.clone(),
                source,
            })?;

        let outcome = adapter
            .scrape(criteria, since, self.config.default_limit)
            .await
            .map_err(|source| ScanError::Platform {
                platform: platform.clone(),
                source,
            })?;

        let new = jobs::save_listings(self.db.pool(), criteria.id, &outcome.listings).await?;

        Ok(SavedScrape {
            found: u32::try_from(outcome.listings.len()).unwrap_or(u32::MAX),
            new: u32::try_from(new).unwrap_or(u32::MAX),
            truncated: outcome.truncated,
        })
    }

    async fn record(&self, search_id: SearchId, outcome: &PlatformOutcome) {
        let execution = NewExecution {
            search_id,
            platform: outcome.platform.clone(),
            jobs_found: outcome.jobs_found,
            new_jobs_found: outcome.new_jobs_found,
            duration: outcome.duration,
            status: outcome.status,
            error_message: outcome.error.clone(),
        };

        if let Err(e) = executions::record(self.db.pool(), &execution).await {
            error!(
                search_id = %search_id,
                platform = %outcome.platform,
                error = %e,
                "failed to write execution record"
            );
        }
    }

    async fn record_fault(
        &self,
        search_id: SearchId,
        duration: Duration,
        message: String,
    ) -> RunReport {
        error!(search_id = %search_id, error = %message, "search run aborted");

        let outcome = PlatformOutcome {
            platform: PlatformName::system(),
            status: ExecutionStatus::Error,
            jobs_found: 0,
            new_jobs_found: 0,
            duration,
            error: Some(message),
        };
        self.record(search_id, &outcome).await;

        RunReport::from_outcomes(search_id, duration, vec![outcome])
    }
}

#[async_trait]
impl SearchRunner for ExecutionOrchestrator {
    async fn run(&self, search_id: SearchId) -> RunSummary {
        Self::run(self, search_id).await.summary()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
