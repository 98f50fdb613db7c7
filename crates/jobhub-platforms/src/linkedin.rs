//! LinkedIn public job search adapter.
//!
//! LinkedIn throttles anonymous traffic aggressively, so every scrape is
//! capped at 25 listings and an empty results page is reported as likely
//! bot detection.

use crate::adapter::{map_job_types, PlatformAdapter};
use crate::dates::parse_posted_date;
use crate::error::{Result, ScrapeError};
use crate::selectors::{
    first_attr, first_text, resolve_url, select_listings, strip_query_params, truncate_chars,
};
use chrono::{DateTime, Utc};
use jobhub_core::{ParsedListing, PlatformName, SearchCriteria};
use jobhub_fetch::PageSource;
use scraper::{ElementRef, Html};
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

/// Public origin of LinkedIn.
pub const DEFAULT_BASE_URL: &str = "https://www.linkedin.com";

/// Extra headers LinkedIn expects from a browser.
pub const EXTRA_HEADERS: [(&str, &str); 3] = [
    (
        "Accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
    ),
    ("Cache-Control", "no-cache"),
    ("Pragma", "no-cache"),
];

const PAGE_SIZE: usize = 25;
const LIMIT_CEILING: usize = 25;
const SNIPPET_MAX_CHARS: usize = 300;
const DEFAULT_LOCATION: &str = "France";

const JOB_TYPE_CODES: [(&str, &str); 5] = [
    ("cdi", "F"),
    ("cdd", "C"),
    ("stage", "I"),
    ("alternance", "I"),
    ("freelance", "C"),
];

const TRACKING_PARAMS: [&str; 5] = ["refId", "trackingId", "position", "pageNum", "trk"];

const LISTING_SELECTORS: [&str; 4] = [
    ".jobs-search__results-list li",
    ".job-result-card",
    "div[data-job-id]",
    ".search-results__list li",
];
const TITLE_SELECTORS: [&str; 5] = [
    ".job-result-card__title",
    "h3.job-result-card__title a",
    ".sr-only",
    "h3 a",
    ".job-title a",
];
const URL_SELECTORS: [&str; 3] = [".job-result-card__title a", "h3 a", "a[data-job-id]"];
const FALLBACK_URL_SELECTORS: [&str; 1] = ["a[href*=\"/jobs/view/\"]"];
const COMPANY_SELECTORS: [&str; 4] = [
    ".job-result-card__subtitle",
    "h4.job-result-card__subtitle a",
    ".company-name",
    "h4 a",
];
const LOCATION_SELECTORS: [&str; 3] = [".job-result-card__location", ".location", "span.location"];
const DATE_SELECTORS: [&str; 3] = ["time", ".job-result-card__listdate", ".listed-time"];
const SNIPPET_SELECTORS: [&str; 2] = [".job-result-card__snippet", ".job-snippet"];

/// Job id embedded in a `/jobs/view/<slug-or-id>` link.
fn job_id_from_url(url: &Url) -> Option<String> {
    let mut segments = url.path_segments()?;
    segments.find(|segment| *segment == "view")?;
    let slug = segments.next().filter(|s| !s.is_empty())?;

    // Slugs look like `rust-engineer-at-acme-3812345678`
    let trailing_digits: String = slug
        .rsplit('-')
        .next()
        .filter(|tail| !tail.is_empty() && tail.chars().all(|c| c.is_ascii_digit()))
        .unwrap_or(slug)
        .to_string();
    Some(trailing_digits)
}

/// Scrapes LinkedIn's public job search pages.
pub struct LinkedInAdapter {
    base_url: Url,
    search_url: Url,
    source: Arc<dyn PageSource>,
    location: String,
}

impl LinkedInAdapter {
    /// Adapter for the public LinkedIn site.
    pub fn new(source: Arc<dyn PageSource>) -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL, source)
    }

    /// Adapter against another origin, e.g. a mock server.
    pub fn with_base_url(base_url: &str, source: Arc<dyn PageSource>) -> Result<Self> {
        let invalid = |reason: String| ScrapeError::InvalidQuery {
            platform: Self::platform_name(),
            reason,
        };
        let base_url = Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
        let search_url = base_url
            .join("/jobs/search")
            .map_err(|e| invalid(e.to_string()))?;

        Ok(Self {
            base_url,
            search_url,
            source,
            location: DEFAULT_LOCATION.to_string(),
        })
    }

    /// Search a location other than France.
    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    fn platform_name() -> PlatformName {
        PlatformName::new("linkedin").expect("static platform name is valid")
    }
}

#[async_trait::async_trait]
impl PlatformAdapter for LinkedInAdapter {
    fn name(&self) -> PlatformName {
        Self::platform_name()
    }

    fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn page_size(&self) -> usize {
        PAGE_SIZE
    }

    fn limit_ceiling(&self) -> Option<usize> {
        Some(LIMIT_CEILING)
    }

    fn source(&self) -> &dyn PageSource {
        self.source.as_ref()
    }

    fn build_query(&self, criteria: &SearchCriteria, page: u32) -> Result<Url> {
        let mut url = self.search_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("keywords", criteria.keywords.trim())
                .append_pair("sortBy", "DD")
                .append_pair("location", &self.location);

            let codes = map_job_types(&criteria.job_types, &JOB_TYPE_CODES);
            if !codes.is_empty() {
                query.append_pair("f_JT", &codes.join(","));
            }

            let start = (page.max(1) as usize - 1) * PAGE_SIZE;
            query.append_pair("start", &start.to_string());
        }
        Ok(url)
    }

    fn extract_listings<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>> {
        if let Some((selector, elements)) = select_listings(document, &LISTING_SELECTORS) {
            debug!(platform = "linkedin", selector, count = elements.len(), "found listings");
            return elements;
        }

        let preview: String = document.root_element().html().chars().take(500).collect();
        warn!(platform = "linkedin", "no job listings found, possible bot detection");
        debug!(platform = "linkedin", preview = %preview, "page preview");
        Vec::new()
    }

    fn parse_listing(&self, listing: ElementRef<'_>, now: DateTime<Utc>) -> Option<ParsedListing> {
        let title = first_text(listing, &TITLE_SELECTORS)?;
        let href = first_attr(listing, &URL_SELECTORS, "href")
            .or_else(|| first_attr(listing, &FALLBACK_URL_SELECTORS, "href"))?;
        let mut url = resolve_url(&self.base_url, &href)?;
        strip_query_params(&mut url, &TRACKING_PARAMS);

        // Prefer the machine-readable attribute over the displayed text
        let date_posted = first_attr(listing, &["time"], "datetime")
            .and_then(|value| parse_posted_date(&value, now))
            .or_else(|| {
                first_text(listing, &DATE_SELECTORS).and_then(|text| parse_posted_date(&text, now))
            })
            .unwrap_or(now);

        let job_id = listing
            .value()
            .attr("data-job-id")
            .map(ToString::to_string)
            .or_else(|| job_id_from_url(&url));

        Some(ParsedListing {
            title,
            company: first_text(listing, &COMPANY_SELECTORS),
            url: url.to_string(),
            platform: self.name(),
            location: first_text(listing, &LOCATION_SELECTORS),
            snippet: first_text(listing, &SNIPPET_SELECTORS)
                .map(|text| truncate_chars(&text, SNIPPET_MAX_CHARS)),
            salary: None,
            job_type: Some("autre".to_string()),
            date_posted: Some(date_posted),
            external_id: job_id.map(|id| format!("linkedin_{id}")),
        })
    }

    async fn test_connection(&self) -> bool {
        let mut probe = self.search_url.clone();
        probe
            .query_pairs_mut()
            .append_pair("keywords", "test")
            .append_pair("location", &self.location);

        match self.source.fetch(probe.as_str(), &[]).await {
            Ok(body) => {
                let body = body.to_lowercase();
                if body.contains("challenge") || body.contains("captcha") {
                    warn!(platform = "linkedin", "connection test hit a bot challenge");
                    false
                } else {
                    true
                }
            }
            Err(e) => {
                warn!(platform = "linkedin", error = %e, "connection test failed");
                false
            }
        }
    }
}
