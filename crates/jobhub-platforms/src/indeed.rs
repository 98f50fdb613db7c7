//! Indeed France adapter.

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
use tracing::debug;
use url::Url;

/// Public origin of Indeed France.
pub const DEFAULT_BASE_URL: &str = "https://fr.indeed.com";

const PAGE_SIZE: usize = 50;
const SNIPPET_MAX_CHARS: usize = 500;

const JOB_TYPE_CODES: [(&str, &str); 5] = [
    ("stage", "internship"),
    ("alternance", "apprenticeship"),
    ("cdi", "fulltime"),
    ("cdd", "contract"),
    ("freelance", "freelance"),
];

const TRACKING_PARAMS: [&str; 4] = ["tk", "from", "alid", "rgtk"];

const LISTING_SELECTORS: [&str; 4] = [
    "div[data-result-id]",
    ".jobsearch-SerpJobCard",
    ".slider_container .slider_item",
    "div[data-jk]",
];
const TITLE_SELECTORS: [&str; 5] = [
    "h2.jobTitle a span",
    "h2[data-testid=\"job-title\"]",
    ".jobTitle a",
    "h2.jobTitle",
    "[data-testid=\"job-title\"]",
];
const URL_SELECTORS: [&str; 4] = [
    "h2.jobTitle a",
    "h2[data-testid=\"job-title\"] a",
    ".jobTitle a",
    "a[data-jk]",
];
const COMPANY_SELECTORS: [&str; 4] = [
    "span.companyName a",
    "span.companyName",
    "[data-testid=\"company-name\"]",
    ".companyName",
];
const LOCATION_SELECTORS: [&str; 3] = [
    "[data-testid=\"job-location\"]",
    ".companyLocation",
    ".locationsContainer",
];
const SALARY_SELECTORS: [&str; 3] = [
    "[data-testid=\"attribute_snippet_testid\"]",
    ".salary-snippet-container",
    ".salaryText",
];
const SNIPPET_SELECTORS: [&str; 3] = ["[data-testid=\"job-snippet\"]", ".job-snippet", ".summary"];
const DATE_SELECTORS: [&str; 3] = ["[data-testid=\"myJobsStateDate\"]", ".date", "span.date"];
const JOB_TYPE_SELECTORS: [&str; 1] = ["[data-testid=\"attribute_snippet_testid\"]"];

/// Map a free-text contract description to a job-type tag.
pub fn normalize_job_type(text: &str) -> &'static str {
    let text = text.to_lowercase();
    if text.contains("stage") {
        "stage"
    } else if text.contains("alternance") || text.contains("apprentissage") {
        "alternance"
    } else if text.contains("cdi") || text.contains("temps plein") {
        "cdi"
    } else if text.contains("cdd") || text.contains("temporaire") {
        "cdd"
    } else if text.contains("freelance") || text.contains("indépendant") {
        "freelance"
    } else {
        "autre"
    }
}

/// Scrapes `fr.indeed.com` search results, newest first.
pub struct IndeedAdapter {
    base_url: Url,
    search_url: Url,
    source: Arc<dyn PageSource>,
    location: Option<String>,
}

impl IndeedAdapter {
    /// Adapter for the public Indeed France site.
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
        let search_url = base_url.join("/jobs").map_err(|e| invalid(e.to_string()))?;

        Ok(Self {
            base_url,
            search_url,
            source,
            location: None,
        })
    }

    /// Restrict results to a location (`l` parameter).
    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    fn platform_name() -> PlatformName {
        PlatformName::new("indeed").expect("static platform name is valid")
    }
}

#[async_trait::async_trait]
impl PlatformAdapter for IndeedAdapter {
    fn name(&self) -> PlatformName {
        Self::platform_name()
    }

    fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn page_size(&self) -> usize {
        PAGE_SIZE
    }

    fn source(&self) -> &dyn PageSource {
        self.source.as_ref()
    }

    fn build_query(&self, criteria: &SearchCriteria, page: u32) -> Result<Url> {
        let mut url = self.search_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("q", criteria.keywords.trim())
                .append_pair("sort", "date")
                .append_pair("limit", &PAGE_SIZE.to_string());

            if let Some(location) = &self.location {
                query.append_pair("l", location);
            }

            let codes = map_job_types(&criteria.job_types, &JOB_TYPE_CODES);
            if !codes.is_empty() {
                query.append_pair("jt", &codes.join(","));
            }

            let start = (page.max(1) as usize - 1) * PAGE_SIZE;
            query.append_pair("start", &start.to_string());
        }
        Ok(url)
    }

    fn extract_listings<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>> {
        match select_listings(document, &LISTING_SELECTORS) {
            Some((selector, elements)) => {
                debug!(platform = "indeed", selector, count = elements.len(), "found listings");
                elements
            }
            None => Vec::new(),
        }
    }

    fn parse_listing(&self, listing: ElementRef<'_>, now: DateTime<Utc>) -> Option<ParsedListing> {
        let title = first_text(listing, &TITLE_SELECTORS)?;
        let href = first_attr(listing, &URL_SELECTORS, "href")?;
        let mut url = resolve_url(&self.base_url, &href)?;
        strip_query_params(&mut url, &TRACKING_PARAMS);

        let date_posted = first_text(listing, &DATE_SELECTORS)
            .map(|text| parse_posted_date(&text, now).unwrap_or(now));

        let job_type = first_text(listing, &JOB_TYPE_SELECTORS)
            .map(|text| normalize_job_type(&text).to_string());

        let external_id = listing
            .value()
            .attr("data-result-id")
            .or_else(|| listing.value().attr("data-jk"))
            .map(|id| format!("indeed_{id}"));

        Some(ParsedListing {
            title,
            company: first_text(listing, &COMPANY_SELECTORS),
            url: url.to_string(),
            platform: self.name(),
            location: first_text(listing, &LOCATION_SELECTORS),
            snippet: first_text(listing, &SNIPPET_SELECTORS)
                .map(|text| truncate_chars(&text, SNIPPET_MAX_CHARS)),
            salary: first_text(listing, &SALARY_SELECTORS),
            job_type,
            date_posted,
            external_id,
        })
    }
}
