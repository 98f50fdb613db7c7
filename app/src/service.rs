//! Service facade wiring storage, adapters, orchestration and scheduling.

use crate::error::Result;
use crate::health::{self, HealthReport};
use chrono::Utc;
use jobhub_core::{AppConfig, SearchId};
use jobhub_db::{executions, jobs, DashboardStats, Database};
use jobhub_platforms::PlatformRegistry;
use jobhub_scanner::ExecutionOrchestrator;
use jobhub_scheduler::{RunSummary, ScheduleStore, ScheduledSearch, SchedulerRegistry, SearchRunner};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Result of [`ScrapingService::status`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceStatus {
    /// Whether the scheduler has been started and not shut down
    pub running: bool,
    /// Number of installed triggers
    pub scheduled_count: usize,
    /// Registered platform names
    pub available_platforms: Vec<String>,
    /// Reachability probe result per platform
    pub platform_connectivity: BTreeMap<String, bool>,
}

/// The public surface of the scraping engine.
///
/// Everything is constructed once and shared by `Arc`; there is no global
/// instance.
pub struct ScrapingService {
    config: AppConfig,
    db: Arc<Database>,
    platforms: PlatformRegistry,
    orchestrator: Arc<ExecutionOrchestrator>,
    scheduler: SchedulerRegistry,
}

impl ScrapingService {
    /// Open the database from `config`, apply migrations and register the
    /// default platform adapters.
    pub async fn open(config: AppConfig) -> Result<Self> {
        let db = Database::open(&config.database).await?;
        db.run_migrations().await?;
        let platforms = PlatformRegistry::with_defaults(&config.fetch)?;

        Ok(Self::from_parts(config, Arc::new(db), platforms))
    }

    /// Assemble a service from an already migrated database and a registry.
    #[must_use]
    pub fn from_parts(config: AppConfig, db: Arc<Database>, platforms: PlatformRegistry) -> Self {
        let orchestrator = Arc::new(ExecutionOrchestrator::new(
            Arc::clone(&db),
            platforms.clone(),
            config.scraping.clone(),
        ));
        let store: Arc<dyn ScheduleStore> = Arc::clone(&db) as Arc<dyn ScheduleStore>;
        let runner: Arc<dyn SearchRunner> = Arc::clone(&orchestrator) as Arc<dyn SearchRunner>;
        let scheduler = SchedulerRegistry::new(store, runner, &config.scheduler);

        Self {
            config,
            db,
            platforms,
            orchestrator,
            scheduler,
        }
    }

    /// Prune old execution records, then reconcile and install triggers for
    /// every active search. Returns the number of installed triggers.
    pub async fn start(&self) -> Result<usize> {
        let days = self.config.retention.execution_log_days;
        if let Err(e) = executions::delete_older_than(self.db.pool(), days).await {
            warn!(error = %e, days, "execution record pruning failed");
        }

        let installed = self.scheduler.start().await?;
        info!(
            installed,
            platforms = self.platforms.count(),
            "scraping service started"
        );
        Ok(installed)
    }

    /// Stop every timer and close the database pool. Runs waiting for a
    /// concurrency slot fail. The service cannot be started again.
    pub async fn shutdown(&self) {
        self.scheduler.shutdown();
        self.db.pool().close().await;
        info!("scraping service stopped");
    }

    /// Install or replace the trigger for an active search.
    pub async fn schedule(&self, search_id: SearchId) -> bool {
        self.scheduler.schedule(search_id).await
    }

    /// Remove the trigger for a search.
    pub async fn unschedule(&self, search_id: SearchId) -> bool {
        self.scheduler.unschedule(search_id).await
    }

    /// Run a search immediately and wait for it to finish.
    pub async fn run_now(&self, search_id: SearchId) -> RunSummary {
        self.scheduler.run_now(search_id).await
    }

    /// Installed triggers, ordered by search.
    #[must_use]
    pub fn list_scheduled(&self) -> Vec<ScheduledSearch> {
        self.scheduler.list_scheduled()
    }

    /// Scheduler state and a connectivity probe of every platform.
    pub async fn status(&self) -> ServiceStatus {
        ServiceStatus {
            running: self.scheduler.is_running(),
            scheduled_count: self.scheduler.scheduled_count(),
            available_platforms: self
                .platforms
                .names()
                .into_iter()
                .map(|name| name.to_string())
                .collect(),
            platform_connectivity: self.platforms.test_connections().await,
        }
    }

    /// Active searches whose last run is older than twice their cadence,
    /// plus 24-hour telemetry aggregates.
    pub async fn health(&self) -> Result<HealthReport> {
        let report = health::build_report(&self.db, Utc::now()).await?;
        if !report.is_healthy() {
            warn!(stale = report.stale.len(), "stale searches detected");
        }
        Ok(report)
    }

    /// Totals for the jobs table.
    pub async fn dashboard(&self) -> Result<DashboardStats> {
        Ok(jobs::dashboard_stats(self.db.pool()).await?)
    }

    /// The shared database handle.
    #[must_use]
    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    /// The orchestrator backing scheduled and manual runs.
    #[must_use]
    pub fn orchestrator(&self) -> &Arc<ExecutionOrchestrator> {
        &self.orchestrator
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}
