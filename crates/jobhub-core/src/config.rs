//! Configuration management for JobHub.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration.
///
/// This is loaded from `~/.config/jobhub/config.toml` (or platform equivalent).
/// If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Database location and pool settings
    pub database: DatabaseConfig,
    /// Network fetch behavior (pacing, retries, timeouts)
    pub fetch: FetchConfig,
    /// Scraping limits
    pub scraping: ScrapingConfig,
    /// Recurring scheduler settings
    pub scheduler: SchedulerConfig,
    /// Telemetry retention
    pub retention: RetentionConfig,
}

impl AppConfig {
    /// Load configuration from disk, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            tracing::debug!("Loading config from {}", config_path.display());
            let contents = fs::read_to_string(&config_path)?;
            let config: Self = toml::from_str(&contents)?;
            config.validate()?;
            Ok(config)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `JOBHUB_DATABASE_PATH`: Override the SQLite database path
    /// - `JOBHUB_MAX_CONCURRENT_RUNS`: Override the scheduler concurrency ceiling
    /// - `JOBHUB_REQUEST_DELAY_MS`: Override both pacing bounds with a fixed delay
    /// - `JOBHUB_MAX_RETRIES`: Override the fetch retry budget
    pub fn load_with_env() -> ConfigResult<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply `JOBHUB_*` environment overrides in place.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("JOBHUB_DATABASE_PATH") {
            tracing::debug!("Override database.path from env: {}", val);
            self.database.path = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("JOBHUB_MAX_CONCURRENT_RUNS") {
            if let Ok(max) = val.parse() {
                self.scheduler.max_concurrent_runs = max;
                tracing::debug!("Override scheduler.max_concurrent_runs from env: {}", max);
            }
        }

        if let Ok(val) = std::env::var("JOBHUB_REQUEST_DELAY_MS") {
            if let Ok(delay) = val.parse() {
                self.fetch.min_delay_ms = delay;
                self.fetch.max_delay_ms = delay;
                tracing::debug!("Override fetch delay from env: {}ms", delay);
            }
        }

        if let Ok(val) = std::env::var("JOBHUB_MAX_RETRIES") {
            if let Ok(retries) = val.parse() {
                self.fetch.max_retries = retries;
                tracing::debug!("Override fetch.max_retries from env: {}", retries);
            }
        }
    }

    /// Check cross-field invariants.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.fetch.min_delay_ms > self.fetch.max_delay_ms {
            return Err(ConfigError::InvalidValue {
                field: "fetch.max_delay_ms".to_string(),
                reason: "must be >= min_delay_ms".to_string(),
            });
        }
        if self.scheduler.max_concurrent_runs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "scheduler.max_concurrent_runs".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.scraping.default_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "scraping.default_limit".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Save configuration to disk.
    ///
    /// Creates the config directory if it doesn't exist.
    pub fn save(&self) -> ConfigResult<()> {
        let config_path = Self::config_path()?;
        let config_dir = config_path
            .parent()
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "config_path".to_string(),
                reason: "no parent directory".to_string(),
            })?;

        fs::create_dir_all(config_dir)?;
        tracing::debug!("Saving config to {}", config_path.display());

        let contents = toml::to_string_pretty(self)?;
        fs::write(config_path, contents)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/jobhub/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs = ProjectDirs::from("com", "jobhub", "jobhub").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Get the data directory path.
    ///
    /// Uses XDG base directories: `~/.local/share/jobhub`
    pub fn data_dir() -> ConfigResult<PathBuf> {
        let dirs = ProjectDirs::from("com", "jobhub", "jobhub").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.data_dir().to_path_buf())
    }
}

/// Database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Path to the SQLite file; relative paths resolve against the data dir
    pub path: PathBuf,
    /// Maximum pooled connections
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("jobhub.db"),
            max_connections: 5,
        }
    }
}

impl DatabaseConfig {
    /// Resolve the database path, anchoring relative paths in the data dir.
    pub fn resolved_path(&self) -> ConfigResult<PathBuf> {
        if self.path.is_absolute() || self.path.as_os_str() == ":memory:" {
            Ok(self.path.clone())
        } else {
            Ok(AppConfig::data_dir()?.join(&self.path))
        }
    }
}

/// Network fetch behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Lower bound of the randomized pacing delay before each request
    pub min_delay_ms: u64,
    /// Upper bound of the randomized pacing delay before each request
    pub max_delay_ms: u64,
    /// Retries allowed after the initial attempt
    pub max_retries: u32,
    /// Base wait for transient network failures (doubles per attempt)
    pub retry_backoff_ms: u64,
    /// Base wait after HTTP 429 (doubles per attempt)
    pub rate_limit_backoff_ms: u64,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// `Accept-Language` sent with every request
    pub accept_language: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: 1000,
            max_delay_ms: 3000,
            max_retries: 3,
            retry_backoff_ms: 1000,
            rate_limit_backoff_ms: 60_000,
            timeout_secs: 15,
            accept_language: "fr-FR,fr;q=0.9,en;q=0.8".to_string(),
        }
    }
}

impl FetchConfig {
    /// Per-request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Base wait for transient failures.
    #[must_use]
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    /// Base wait after a 429.
    #[must_use]
    pub fn rate_limit_backoff(&self) -> Duration {
        Duration::from_millis(self.rate_limit_backoff_ms)
    }
}

/// Scraping limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapingConfig {
    /// Listings requested per platform per run
    pub default_limit: usize,
    /// Safety margin subtracted from the last execution time
    pub since_margin_minutes: i64,
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            default_limit: 50,
            since_margin_minutes: 60,
        }
    }
}

/// Recurring scheduler settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Ceiling on concurrent executions across all searches
    pub max_concurrent_runs: usize,
    /// Firings later than this are skipped rather than run
    pub misfire_grace_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_runs: 3,
            misfire_grace_secs: 300,
        }
    }
}

impl SchedulerConfig {
    /// Misfire grace window.
    #[must_use]
    pub fn misfire_grace(&self) -> Duration {
        Duration::from_secs(self.misfire_grace_secs)
    }
}

/// Telemetry retention.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Execution records older than this many days may be purged
    pub execution_log_days: u32,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            execution_log_days: 30,
        }
    }
}
