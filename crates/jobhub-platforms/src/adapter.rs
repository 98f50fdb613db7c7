//! The platform adapter contract and the shared pagination driver.

use crate::error::{Result, ScrapeError};
use chrono::{DateTime, Utc};
use jobhub_core::{ParsedListing, PlatformName, SearchCriteria};
use jobhub_fetch::PageSource;
use scraper::{ElementRef, Html};
use std::collections::HashSet;
use tracing::{debug, info, warn};
use url::Url;

/// Hard ceiling on result pages fetched per scrape.
pub const MAX_PAGES: u32 = 10;

/// Number of trailing listings inspected for the stale-page stop.
pub const STALE_WINDOW: usize = 5;

/// Listings collected by one scrape.
#[derive(Debug, Clone, Default)]
pub struct ScrapeOutcome {
    /// Valid, in-range listings in page order
    pub listings: Vec<ParsedListing>,
    /// Set when pagination stopped early on a fetch failure
    pub truncated: Option<String>,
    /// Result pages fetched
    pub pages_fetched: u32,
}

impl ScrapeOutcome {
    /// Whether the scrape stopped on a fetch failure after the first page.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        self.truncated.is_some()
    }
}

/// A job board the engine knows how to scrape.
///
/// Implementors supply URL construction and per-listing parsing; the
/// provided [`PlatformAdapter::scrape`] runs the shared pagination loop.
#[async_trait::async_trait]
pub trait PlatformAdapter: Send + Sync {
    /// Registry name of the platform.
    fn name(&self) -> PlatformName;

    /// Origin used to resolve relative links.
    fn base_url(&self) -> &Url;

    /// Listings per results page, used for the `start` offset.
    fn page_size(&self) -> usize;

    /// Upper bound applied to every requested limit.
    fn limit_ceiling(&self) -> Option<usize> {
        None
    }

    /// Fetch layer used by this adapter.
    fn source(&self) -> &dyn PageSource;

    /// Build the search URL for a 1-based page number.
    fn build_query(&self, criteria: &SearchCriteria, page: u32) -> Result<Url>;

    /// Raw listing elements of a results page.
    fn extract_listings<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>>;

    /// Normalize one listing; `None` when title or link is missing.
    fn parse_listing(&self, listing: ElementRef<'_>, now: DateTime<Utc>) -> Option<ParsedListing>;

    /// Collect up to `limit` listings posted at or after `since`.
    async fn scrape(
        &self,
        criteria: &SearchCriteria,
        since: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<ScrapeOutcome> {
        scrape_pages(self, criteria, since, limit).await
    }

    /// Whether the platform currently answers with a usable page.
    async fn test_connection(&self) -> bool {
        match self.source().fetch(self.base_url().as_str(), &[]).await {
            Ok(_) => true,
            Err(e) => {
                warn!(platform = %self.name(), error = %e, "connection test failed");
                false
            }
        }
    }
}

/// What one results page yielded.
#[derive(Debug, Default)]
pub struct PageScan {
    /// Listing elements found on the page
    pub raw_count: usize,
    /// Listings that parsed, in page order
    pub parsed: Vec<ParsedListing>,
}

impl PageScan {
    /// True when the last few parsed listings all predate `since`.
    #[must_use]
    pub fn trailing_stale(&self, since: Option<DateTime<Utc>>) -> bool {
        let Some(since) = since else {
            return false;
        };
        if self.parsed.is_empty() {
            return false;
        }
        let window = self.parsed.len().min(STALE_WINDOW);
        self.parsed[self.parsed.len() - window..]
            .iter()
            .all(|listing| listing.date_posted.is_some_and(|posted| posted < since))
    }
}

/// Parse a results page. Kept synchronous: `Html` is not `Send`.
pub fn scan_page<A>(adapter: &A, body: &str, now: DateTime<Utc>) -> PageScan
where
    A: PlatformAdapter + ?Sized,
{
    let document = Html::parse_document(body);
    let elements = adapter.extract_listings(&document);
    let raw_count = elements.len();

    let parsed = elements
        .into_iter()
        .filter_map(|element| {
            let listing = adapter.parse_listing(element, now);
            if listing.is_none() {
                debug!(platform = %adapter.name(), "skipping listing without title or link");
            }
            listing
        })
        .collect();

    PageScan { raw_count, parsed }
}

/// Whether a listing falls inside the requested window.
#[must_use]
pub fn in_range(listing: &ParsedListing, since: Option<DateTime<Utc>>) -> bool {
    match (since, listing.date_posted) {
        (Some(since), Some(posted)) => posted >= since,
        _ => true,
    }
}

/// Shared pagination loop behind [`PlatformAdapter::scrape`].
pub async fn scrape_pages<A>(
    adapter: &A,
    criteria: &SearchCriteria,
    since: Option<DateTime<Utc>>,
    limit: usize,
) -> Result<ScrapeOutcome>
where
    A: PlatformAdapter + ?Sized,
{
    let platform = adapter.name();
    let limit = adapter.limit_ceiling().map_or(limit, |ceiling| limit.min(ceiling));
    let session = adapter.source().open_session();

    info!(
        platform = %platform,
        search_id = %criteria.id,
        keywords = %criteria.keywords,
        limit,
        "starting scrape"
    );

    let mut outcome = ScrapeOutcome::default();
    let mut seen_urls = HashSet::new();

    for page in 1..=MAX_PAGES {
        if outcome.listings.len() >= limit {
            break;
        }

        let url = adapter.build_query(criteria, page)?;
        let body = match adapter.source().fetch_in(&session, url.as_str(), &[]).await {
            Ok(body) => body,
            Err(source) if page == 1 => {
                return Err(ScrapeError::Fetch { platform, source });
            }
            Err(e) => {
                warn!(
                    platform = %platform,
                    page,
                    error = %e,
                    collected = outcome.listings.len(),
                    "stopping pagination early, keeping listings collected so far"
                );
                outcome.truncated = Some(format!("page {page}: {e}"));
                break;
            }
        };
        outcome.pages_fetched = page;

        let scan = scan_page(adapter, &body, Utc::now());
        if scan.raw_count == 0 {
            debug!(platform = %platform, page, "no listings on page");
            break;
        }
        let stale = scan.trailing_stale(since);

        for listing in scan.parsed {
            if outcome.listings.len() >= limit {
                break;
            }
            if in_range(&listing, since) && seen_urls.insert(listing.url.clone()) {
                outcome.listings.push(listing);
            }
        }

        if stale {
            debug!(platform = %platform, page, "reached listings older than since cursor");
            break;
        }
    }

    info!(
        platform = %platform,
        found = outcome.listings.len(),
        pages = outcome.pages_fetched,
        partial = outcome.is_partial(),
        "scrape finished"
    );

    Ok(outcome)
}

/// Map abstract job-type tags to platform codes, dropping unknown tags and
/// repeated codes.
#[must_use]
pub fn map_job_types(job_types: &[String], table: &[(&str, &'static str)]) -> Vec<&'static str> {
    let mut codes: Vec<&'static str> = Vec::new();
    for tag in job_types {
        let tag = tag.trim().to_lowercase();
        if let Some((_, code)) = table.iter().find(|(key, _)| *key == tag) {
            if !codes.contains(code) {
                codes.push(*code);
            }
        }
    }
    codes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indeed::IndeedAdapter;
    use chrono::Duration;
    use jobhub_core::{Cadence, SearchId};
    use jobhub_fetch::FetchError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tracing_test::traced_test;

    /// Serves one listing, then fails every later page.
    struct FlakySource {
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl PageSource for FlakySource {
        async fn fetch(&self, url: &str, _params: &[(&str, &str)]) -> jobhub_fetch::Result<String> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(r#"<div data-jk="1"><h2 class="jobTitle"><a href="/viewjob?jk=1">Dev</a></h2></div>"#
                    .to_string())
            } else {
                Err(FetchError::Exhausted {
                    url: url.to_string(),
                    attempts: 4,
                    last_error: "rate limited (429)".to_string(),
                })
            }
        }
    }

    fn listing(url: &str, posted: Option<DateTime<Utc>>) -> ParsedListing {
        ParsedListing {
            title: "Developer".to_string(),
            company: None,
            url: url.to_string(),
            platform: PlatformName::new("indeed").unwrap(),
            location: None,
            snippet: None,
            salary: None,
            job_type: None,
            date_posted: posted,
            external_id: None,
        }
    }

    #[test]
    fn test_in_range() {
        let now = Utc::now();
        let since = Some(now - Duration::hours(1));

        assert!(in_range(&listing("a", Some(now)), since));
        assert!(!in_range(&listing("a", Some(now - Duration::hours(2))), since));
        assert!(in_range(&listing("a", None), since));
        assert!(in_range(&listing("a", Some(now - Duration::days(30))), None));
    }

    #[test]
    fn test_trailing_stale() {
        let now = Utc::now();
        let since = Some(now - Duration::hours(1));
        let old = Some(now - Duration::days(2));

        let mut parsed = vec![listing("fresh", Some(now))];
        parsed.extend((0..5).map(|i| listing(&format!("old-{i}"), old)));
        let scan = PageScan {
            raw_count: parsed.len(),
            parsed,
        };
        assert!(scan.trailing_stale(since));
        assert!(!scan.trailing_stale(None));

        let scan = PageScan {
            raw_count: 2,
            parsed: vec![listing("old", old), listing("undated", None)],
        };
        assert!(!scan.trailing_stale(since));
    }

    #[test]
    fn test_map_job_types_drops_unknown_and_duplicates() {
        let table = [("stage", "I"), ("alternance", "I"), ("cdi", "F")];
        let tags = vec![
            "stage".to_string(),
            "interim".to_string(),
            "alternance".to_string(),
            "CDI".to_string(),
        ];
        assert_eq!(map_job_types(&tags, &table), vec!["I", "F"]);
        assert!(map_job_types(&[], &table).is_empty());
    }

    #[tokio::test]
    #[traced_test]
    async fn test_truncated_scrape_logs_warning() {
        let source = Arc::new(FlakySource {
            calls: AtomicUsize::new(0),
        });
        let adapter = IndeedAdapter::new(source).unwrap();
        let criteria = SearchCriteria {
            id: SearchId::new(3),
            keywords: "rust".to_string(),
            job_types: Vec::new(),
            platforms: vec![adapter.name()],
            cadence: Cadence::default(),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let outcome = adapter.scrape(&criteria, None, 50).await.unwrap();

        assert_eq!(outcome.listings.len(), 1);
        assert!(outcome.is_partial());
        assert!(logs_contain("stopping pagination early"));
    }
}
