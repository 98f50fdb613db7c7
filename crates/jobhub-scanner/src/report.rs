//! Per-run and per-platform outcomes.

use jobhub_core::{ExecutionStatus, PlatformName, SearchId};
use jobhub_scheduler::RunSummary;
use std::time::Duration;

/// What one platform produced during a run.
#[derive(Debug, Clone, PartialEq)]
pub struct PlatformOutcome {
    /// Platform name, or `system` for run-level faults
    pub platform: PlatformName,
    /// Recorded status
    pub status: ExecutionStatus,
    /// Listings returned by the scrape
    pub jobs_found: u32,
    /// Listings not stored before
    pub new_jobs_found: u32,
    /// Time spent on this platform
    pub duration: Duration,
    /// Error or truncation reason
    pub error: Option<String>,
}

/// Result of one execution of a search.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    /// Search that was executed
    pub search_id: SearchId,
    /// The search was missing or inactive and nothing ran
    pub skipped: bool,
    /// No platform errored and no fault occurred
    pub success: bool,
    /// Wall time of the whole run
    pub duration: Duration,
    /// One outcome per attempted platform, in order
    pub platforms: Vec<PlatformOutcome>,
    /// First error message, if any
    pub error: Option<String>,
}

impl RunReport {
    /// Report for a search that was not executed.
    #[must_use]
    pub fn skipped(search_id: SearchId) -> Self {
        Self {
            search_id,
            skipped: true,
            success: true,
            duration: Duration::ZERO,
            platforms: Vec::new(),
            error: None,
        }
    }

    pub(crate) fn from_outcomes(
        search_id: SearchId,
        duration: Duration,
        platforms: Vec<PlatformOutcome>,
    ) -> Self {
        let error = platforms
            .iter()
            .find(|p| p.status == ExecutionStatus::Error)
            .and_then(|p| p.error.clone());

        Self {
            search_id,
            skipped: false,
            success: error.is_none(),
            duration,
            platforms,
            error,
        }
    }

    /// Listings found across platforms.
    #[must_use]
    pub fn total_found(&self) -> u32 {
        self.platforms.iter().map(|p| p.jobs_found).sum()
    }

    /// New listings across platforms.
    #[must_use]
    pub fn total_new(&self) -> u32 {
        self.platforms.iter().map(|p| p.new_jobs_found).sum()
    }

    /// Condensed form for the scheduler.
    #[must_use]
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            success: self.success,
            duration: self.duration,
            error: self.error.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(name: &str, status: ExecutionStatus, found: u32, new: u32) -> PlatformOutcome {
        PlatformOutcome {
            platform: PlatformName::new(name).expect("valid"),
            status,
            jobs_found: found,
            new_jobs_found: new,
            duration: Duration::from_millis(10),
            error: (status != ExecutionStatus::Success).then(|| format!("{name} trouble")),
        }
    }

    #[test]
    fn test_partial_is_still_success() {
        let report = RunReport::from_outcomes(
            SearchId::new(1),
            Duration::from_secs(1),
            vec![
                outcome("indeed", ExecutionStatus::Partial, 5, 2),
                outcome("linkedin", ExecutionStatus::Success, 3, 3),
            ],
        );

        assert!(report.success);
        assert!(report.error.is_none());
        assert_eq!(report.total_found(), 8);
        assert_eq!(report.total_new(), 5);
    }

    #[test]
    fn test_platform_error_fails_run() {
        let report = RunReport::from_outcomes(
            SearchId::new(1),
            Duration::from_secs(1),
            vec![
                outcome("indeed", ExecutionStatus::Error, 0, 0),
                outcome("linkedin", ExecutionStatus::Success, 3, 3),
            ],
        );

        let summary = report.summary();
        assert!(!summary.success);
        assert_eq!(summary.error.as_deref(), Some("indeed trouble"));
    }
}
