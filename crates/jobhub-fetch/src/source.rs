use crate::error::{FetchError, Result};
use crate::identity::Identity;
use url::Url;

/// Identity pinned for every page of one scrape.
///
/// Concurrent scrapes through the same source each hold their own session.
/// Sources without identities hand out an empty one.
#[derive(Debug, Clone, Default)]
pub struct Session {
    identity: Option<Identity>,
}

impl Session {
    /// Session presenting `identity` on each request.
    #[must_use]
    pub fn with_identity(identity: Identity) -> Self {
        Self {
            identity: Some(identity),
        }
    }

    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }
}

/// Anything that can return the body of a page.
///
/// Platform adapters depend on this trait rather than on [`crate::Fetcher`]
/// so tests can substitute scripted sources.
#[async_trait::async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch `url` with the given query parameters and return the body.
    async fn fetch(&self, url: &str, params: &[(&str, &str)]) -> Result<String>;

    /// Open a session whose requests share one freshly drawn identity.
    fn open_session(&self) -> Session {
        Session::default()
    }

    /// Fetch a page as part of `session`.
    async fn fetch_in(
        &self,
        _session: &Session,
        url: &str,
        params: &[(&str, &str)],
    ) -> Result<String> {
        self.fetch(url, params).await
    }
}

/// Join query parameters onto a URL.
pub fn build_url(url: &str, params: &[(&str, &str)]) -> Result<Url> {
    let parsed = if params.is_empty() {
        Url::parse(url)
    } else {
        Url::parse_with_params(url, params)
    };
    parsed.map_err(|e| FetchError::InvalidRequest(format!("invalid URL {url}: {e}")))
}

/// Extract the host of a URL, for log fields.
pub fn extract_domain(url: &str) -> Result<String> {
    let url = build_url(url, &[])?;

    url.host_str()
        .ok_or_else(|| FetchError::InvalidRequest("no host in URL".to_string()))
        .map(ToString::to_string)
}
