use thiserror::Error;

pub type Result<T> = std::result::Result<T, FetchError>;

#[derive(Debug, Error)]
pub enum FetchError {
    /// Connect failure, timeout or body read failure; retryable.
    #[error("transient failure fetching {url}: {reason}")]
    Transient { url: String, reason: String },

    /// Retry budget spent on rate limiting or transient failures.
    #[error("gave up on {url} after {attempts} attempts: {last_error}")]
    Exhausted {
        url: String,
        attempts: u32,
        last_error: String,
    },

    /// Non-retryable HTTP status.
    #[error("unexpected status {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl FetchError {
    /// Whether another attempt could succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FetchError::Status {
            url: "https://fr.indeed.com/jobs".to_string(),
            status: 403,
        };
        assert_eq!(
            err.to_string(),
            "unexpected status 403 from https://fr.indeed.com/jobs"
        );
    }

    #[test]
    fn test_exhausted_mentions_attempts() {
        let err = FetchError::Exhausted {
            url: "https://www.linkedin.com/jobs/search".to_string(),
            attempts: 4,
            last_error: "rate limited (429)".to_string(),
        };
        assert!(err.to_string().contains("4 attempts"));
        assert!(!err.is_retryable());
    }
}
