//! Shared types used across the JobHub engine.
//!
//! This module defines common newtypes and records that provide type safety
//! and clear domain modeling.

use crate::error::JobHubError;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Identifier of a stored search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SearchId(i64);

impl SearchId {
    /// Wrap a raw database identifier.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the raw identifier.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for SearchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for SearchId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Newtype for platform names with validation.
///
/// Platform names are lowercase ASCII, 2-32 characters, starting with a letter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PlatformName(String);

impl PlatformName {
    /// Platform label used for execution records of orchestration faults.
    pub const SYSTEM: &'static str = "system";

    /// Create a new `PlatformName`, lowercasing the input.
    ///
    /// # Errors
    /// Returns error if the name doesn't match the required format.
    pub fn new(name: impl Into<String>) -> Result<Self, JobHubError> {
        let name = name.into().trim().to_ascii_lowercase();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    /// The pseudo-platform used for system-level execution records.
    #[must_use]
    pub fn system() -> Self {
        Self(Self::SYSTEM.to_string())
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(name: &str) -> Result<(), JobHubError> {
        static PLATFORM_REGEX: OnceLock<Regex> = OnceLock::new();
        let regex = PLATFORM_REGEX
            .get_or_init(|| Regex::new(r"^[a-z][a-z0-9_-]{1,31}$").expect("valid regex"));

        if regex.is_match(name) {
            Ok(())
        } else {
            Err(JobHubError::Validation(format!(
                "invalid platform name: must be 2-32 lowercase alphanumeric characters, got '{name}'"
            )))
        }
    }
}

impl fmt::Display for PlatformName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for PlatformName {
    type Error = JobHubError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PlatformName> for String {
    fn from(name: PlatformName) -> Self {
        name.0
    }
}

/// Recurrence interval of a search, in minutes.
///
/// Always within [`Cadence::MIN_MINUTES`, `Cadence::MAX_MINUTES`]; every
/// construction path clamps, so a bypassed upstream validation cannot
/// produce a tighter or looser schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub struct Cadence(u32);

impl Cadence {
    /// Shortest allowed cadence.
    pub const MIN_MINUTES: u32 = 5;
    /// Longest allowed cadence.
    pub const MAX_MINUTES: u32 = 60;
    /// Cadence used when none is configured.
    pub const DEFAULT_MINUTES: u32 = 15;

    /// Build a cadence, clamping out-of-range values.
    #[must_use]
    pub fn new(minutes: i64) -> Self {
        let clamped = minutes.clamp(i64::from(Self::MIN_MINUTES), i64::from(Self::MAX_MINUTES));
        if clamped != minutes {
            tracing::warn!(
                requested = minutes,
                clamped,
                "cadence outside [{}, {}] minutes, clamping",
                Self::MIN_MINUTES,
                Self::MAX_MINUTES
            );
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Self(clamped as u32)
    }

    /// Build a cadence, rejecting out-of-range values.
    ///
    /// # Errors
    /// Returns a validation error when `minutes` is outside [5, 60].
    pub fn try_new(minutes: i64) -> Result<Self, JobHubError> {
        if (i64::from(Self::MIN_MINUTES)..=i64::from(Self::MAX_MINUTES)).contains(&minutes) {
            Ok(Self::new(minutes))
        } else {
            Err(JobHubError::Validation(format!(
                "cadence must be between {} and {} minutes, got {minutes}",
                Self::MIN_MINUTES,
                Self::MAX_MINUTES
            )))
        }
    }

    /// Minutes between runs.
    #[must_use]
    pub const fn minutes(self) -> u32 {
        self.0
    }

    /// Interval as a `chrono` duration.
    #[must_use]
    pub fn as_duration(self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.0))
    }

    /// Interval as a std duration.
    #[must_use]
    pub fn as_std(self) -> std::time::Duration {
        std::time::Duration::from_secs(u64::from(self.0) * 60)
    }
}

impl Default for Cadence {
    fn default() -> Self {
        Self(Self::DEFAULT_MINUTES)
    }
}

impl From<i64> for Cadence {
    fn from(minutes: i64) -> Self {
        Self::new(minutes)
    }
}

impl From<Cadence> for i64 {
    fn from(cadence: Cadence) -> Self {
        i64::from(cadence.0)
    }
}

impl fmt::Display for Cadence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}min", self.0)
    }
}

/// Stored search criteria. Owned by the external CRUD layer; the engine only
/// reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchCriteria {
    /// Search identifier
    pub id: SearchId,
    /// Free-text keywords
    pub keywords: String,
    /// Abstract job-type tags (`stage`, `alternance`, `cdi`, `cdd`, `freelance`)
    pub job_types: Vec<String>,
    /// Platforms to scrape, in order
    pub platforms: Vec<PlatformName>,
    /// Recurrence interval
    pub cadence: Cadence,
    /// Whether the search should be scheduled
    pub is_active: bool,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

/// A listing as normalized by a platform adapter, before persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedListing {
    /// Job title (never empty)
    pub title: String,
    /// Hiring company, when shown
    pub company: Option<String>,
    /// Canonical URL; the deduplication key
    pub url: String,
    /// Platform the listing came from
    pub platform: PlatformName,
    /// Location text
    pub location: Option<String>,
    /// Short description
    pub snippet: Option<String>,
    /// Salary text
    pub salary: Option<String>,
    /// Normalized job-type tag
    pub job_type: Option<String>,
    /// Publication time as best understood from the page
    pub date_posted: Option<DateTime<Utc>>,
    /// Platform-scoped identifier such as `indeed_<jk>`
    pub external_id: Option<String>,
}

/// A persisted job listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobListing {
    /// Row identifier
    pub id: i64,
    /// Search that first found this listing
    pub search_id: SearchId,
    /// Job title
    pub title: String,
    /// Hiring company
    pub company: Option<String>,
    /// Canonical URL (unique)
    pub url: String,
    /// Source platform
    pub platform: String,
    /// Location text
    pub location: Option<String>,
    /// Short description
    pub snippet: Option<String>,
    /// Salary text
    pub salary: Option<String>,
    /// Normalized job-type tag
    pub job_type: Option<String>,
    /// Publication time
    pub date_posted: Option<DateTime<Utc>>,
    /// When the engine first saw the listing
    pub date_found: DateTime<Utc>,
    /// Unseen flag, cleared externally
    pub is_new: bool,
    /// Platform-scoped identifier
    pub external_id: Option<String>,
}

/// Outcome of one platform (or system) execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Scrape and save completed
    Success,
    /// Scrape was truncated by a mid-pagination failure
    Partial,
    /// Platform or system failed
    Error,
}

impl ExecutionStatus {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Partial => "partial",
            Self::Error => "error",
        }
    }

    /// Parse from string representation; unknown values map to `Error`.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "success" => Self::Success,
            "partial" => Self::Partial,
            _ => Self::Error,
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
