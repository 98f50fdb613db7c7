use crate::backoff::{BackoffPolicy, Pacing};
use crate::error::{FetchError, Result};
use crate::identity::Identity;
use crate::source::{build_url, PageSource, Session};
use jobhub_core::FetchConfig;
use reqwest::StatusCode;
use url::Url;

/// Outcome of a single HTTP attempt.
#[derive(Debug)]
enum AttemptError {
    RateLimited,
    Transient(String),
    Fatal(FetchError),
}

impl AttemptError {
    fn describe(&self) -> String {
        match self {
            Self::RateLimited => "rate limited (429)".to_string(),
            Self::Transient(reason) => reason.clone(),
            Self::Fatal(err) => err.to_string(),
        }
    }
}

/// HTTP fetcher with pacing, identity rotation and bounded retries.
///
/// One fetcher is shared by every search scraping the same platform. Each
/// scrape opens its own [`Session`]; requests outside a session use the
/// identity drawn at construction.
pub struct Fetcher {
    client: reqwest::Client,
    policy: BackoffPolicy,
    pacing: Pacing,
    accept_language: String,
    identity: Identity,
    extra_headers: Vec<(String, String)>,
}

impl Fetcher {
    /// Create a fetcher from configuration with a freshly drawn identity.
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| FetchError::InvalidRequest(format!("failed to build client: {e}")))?;

        Ok(Self {
            client,
            policy: BackoffPolicy::new(
                config.max_retries,
                config.retry_backoff(),
                config.rate_limit_backoff(),
            ),
            pacing: Pacing::new(config.min_delay_ms, config.max_delay_ms),
            accept_language: config.accept_language.clone(),
            identity: Identity::randomized(&config.accept_language),
            extra_headers: Vec::new(),
        })
    }

    /// Add platform-specific headers sent after the identity headers.
    #[must_use]
    pub fn with_headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.extra_headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    #[must_use]
    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: BackoffPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Identity used for requests made outside a session.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn policy(&self) -> BackoffPolicy {
        self.policy
    }

    async fn attempt(
        &self,
        identity: &Identity,
        url: &Url,
    ) -> std::result::Result<String, AttemptError> {
        let mut request = self.client.get(url.clone());
        for (name, value) in identity.headers() {
            request = request.header(name, value);
        }
        for (name, value) in &self.extra_headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await.map_err(|e| {
            if e.is_builder() {
                AttemptError::Fatal(FetchError::InvalidRequest(e.to_string()))
            } else if e.is_timeout() {
                AttemptError::Transient(format!("request timed out: {e}"))
            } else {
                AttemptError::Transient(format!("request failed: {e}"))
            }
        })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(AttemptError::RateLimited);
        }
        if status != StatusCode::OK {
            return Err(AttemptError::Fatal(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }));
        }

        response
            .text()
            .await
            .map_err(|e| AttemptError::Transient(format!("failed to read body: {e}")))
    }
}

#[async_trait::async_trait]
impl PageSource for Fetcher {
    async fn fetch(&self, url: &str, params: &[(&str, &str)]) -> Result<String> {
        self.fetch_in(&Session::default(), url, params).await
    }

    fn open_session(&self) -> Session {
        let identity = Identity::randomized(&self.accept_language);
        tracing::debug!(user_agent = %identity.user_agent, "new fetch session");
        Session::with_identity(identity)
    }

    async fn fetch_in(
        &self,
        session: &Session,
        url: &str,
        params: &[(&str, &str)],
    ) -> Result<String> {
        let url = build_url(url, params)?;
        let identity = session.identity().unwrap_or(&self.identity);
        let mut retries = 0u32;

        loop {
            self.pacing.wait().await;
            tracing::debug!(url = %url, attempt = retries + 1, "fetching page");

            let err = match self.attempt(identity, &url).await {
                Ok(body) => return Ok(body),
                Err(AttemptError::Fatal(err)) => {
                    tracing::debug!(url = %url, error = %err, "fetch failed without retry");
                    return Err(err);
                }
                Err(err) => err,
            };

            if retries >= self.policy.max_retries {
                tracing::warn!(
                    url = %url,
                    attempts = retries + 1,
                    error = %err.describe(),
                    "retries exhausted"
                );
                return Err(FetchError::Exhausted {
                    url: url.to_string(),
                    attempts: retries + 1,
                    last_error: err.describe(),
                });
            }

            let delay = match &err {
                AttemptError::RateLimited => self.policy.rate_limit_delay(retries),
                _ => self.policy.transient_delay(retries),
            };
            tracing::warn!(
                url = %url,
                error = %err.describe(),
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "fetch attempt failed, backing off"
            );
            tokio::time::sleep(delay).await;
            retries += 1;
        }
    }
}
