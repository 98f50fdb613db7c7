//! Core error types for the JobHub engine.
//!
//! This module defines the central error type shared by the crates that sit
//! on top of `jobhub-core`. Subsystem crates keep their own error enums and
//! convert into this one at their boundaries when needed.

use thiserror::Error;

/// Central error type for shared JobHub operations.
#[derive(Error, Debug)]
pub enum JobHubError {
    /// Configuration errors (file loading, parsing, validation)
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors (invalid identifiers, malformed criteria)
    #[error("validation error: {0}")]
    Validation(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to determine config directory path
    #[error("could not determine config directory (XDG base directories not available)")]
    NoConfigDir,

    /// Failed to parse TOML
    #[error("failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Failed to serialize config
    #[error("failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    /// I/O error reading/writing config
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration value
    #[error("invalid config value for {field}: {reason}")]
    InvalidValue {
        /// Field name
        field: String,
        /// Reason for invalidity
        reason: String,
    },
}

/// Result type alias using `JobHubError`.
pub type Result<T> = std::result::Result<T, JobHubError>;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = JobHubError::Validation("empty keywords".to_string());
        assert_eq!(err.to_string(), "validation error: empty keywords");

        let err = ConfigError::InvalidValue {
            field: "fetch.max_delay_ms".to_string(),
            reason: "must be >= min_delay_ms".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid config value for fetch.max_delay_ms: must be >= min_delay_ms"
        );
    }

    #[test]
    fn test_error_from_config() {
        let config_err = ConfigError::NoConfigDir;
        let err: JobHubError = config_err.into();
        assert!(matches!(err, JobHubError::Config(_)));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: JobHubError = io_err.into();
        assert!(matches!(err, JobHubError::Io(_)));
    }
}
