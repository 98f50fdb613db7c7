use chrono::{DateTime, Duration, Utc};
use jobhub_core::{Cadence, FetchConfig, PlatformName, SearchCriteria, SearchId};
use jobhub_fetch::{BackoffPolicy, FetchError, Fetcher, PageSource, Pacing};
use jobhub_platforms::{IndeedAdapter, LinkedInAdapter, PlatformAdapter, ScrapeError, MAX_PAGES};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Replays canned responses and records requested URLs.
struct ScriptedSource {
    responses: Mutex<VecDeque<Result<String, FetchError>>>,
    fallback: Option<Box<dyn Fn(usize) -> String + Send + Sync>>,
    requested: Mutex<Vec<String>>,
}

impl ScriptedSource {
    fn new(responses: Vec<Result<String, FetchError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            fallback: None,
            requested: Mutex::new(Vec::new()),
        }
    }

    fn endless(page: impl Fn(usize) -> String + Send + Sync + 'static) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            fallback: Some(Box::new(page)),
            requested: Mutex::new(Vec::new()),
        }
    }

    fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl PageSource for ScriptedSource {
    async fn fetch(&self, url: &str, _params: &[(&str, &str)]) -> jobhub_fetch::Result<String> {
        let call = {
            let mut requested = self.requested.lock().unwrap();
            requested.push(url.to_string());
            requested.len()
        };
        if let Some(next) = self.responses.lock().unwrap().pop_front() {
            return next;
        }
        match &self.fallback {
            Some(page) => Ok(page(call)),
            None => Ok("<html><body></body></html>".to_string()),
        }
    }
}

fn criteria(platform: &str) -> SearchCriteria {
    SearchCriteria {
        id: SearchId::new(1),
        keywords: "python developer".to_string(),
        job_types: vec!["cdi".to_string()],
        platforms: vec![PlatformName::new(platform).unwrap()],
        cadence: Cadence::new(15),
        is_active: true,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn indeed_card(id: &str, title: &str, posted: &str) -> String {
    format!(
        r#"<div data-jk="{id}">
             <h2 class="jobTitle"><a href="/viewjob?jk={id}&tk=t"><span>{title}</span></a></h2>
             <span class="companyName">Acme</span>
             <span class="date">{posted}</span>
           </div>"#
    )
}

fn indeed_page(cards: &[String]) -> String {
    format!("<html><body>{}</body></html>", cards.join("\n"))
}

fn fresh_indeed_page(prefix: &str, count: usize) -> String {
    let cards: Vec<String> = (0..count)
        .map(|i| indeed_card(&format!("{prefix}{i}"), &format!("Job {prefix}{i}"), "Aujourd'hui"))
        .collect();
    indeed_page(&cards)
}

fn exhausted() -> FetchError {
    FetchError::Exhausted {
        url: "https://fr.indeed.com/jobs".to_string(),
        attempts: 4,
        last_error: "rate limited (429)".to_string(),
    }
}

#[tokio::test]
async fn test_listing_without_title_is_skipped() {
    let mut cards: Vec<String> = (0..4)
        .map(|i| indeed_card(&format!("ok{i}"), &format!("Developer {i}"), "Aujourd'hui"))
        .collect();
    cards.push(indeed_card("empty", "", "Aujourd'hui"));

    let source = Arc::new(ScriptedSource::new(vec![Ok(indeed_page(&cards))]));
    let adapter = IndeedAdapter::new(source.clone()).unwrap();

    let outcome = adapter.scrape(&criteria("indeed"), None, 50).await.unwrap();

    assert_eq!(outcome.listings.len(), 4);
    assert!(!outcome.is_partial());
    assert!(outcome
        .listings
        .iter()
        .all(|l| l.url.starts_with("https://fr.indeed.com/viewjob?jk=ok")));
    // Page 2 came back empty, which ends pagination
    assert_eq!(source.requested().len(), 2);
}

#[tokio::test]
async fn test_later_page_failure_keeps_earlier_listings() {
    let source = Arc::new(ScriptedSource::new(vec![
        Ok(fresh_indeed_page("p1-", 3)),
        Err(exhausted()),
        Ok(fresh_indeed_page("p3-", 3)),
    ]));
    let adapter = IndeedAdapter::new(source.clone()).unwrap();

    let outcome = adapter.scrape(&criteria("indeed"), None, 50).await.unwrap();

    assert_eq!(outcome.listings.len(), 3);
    assert!(outcome.listings.iter().all(|l| l.title.starts_with("Job p1-")));
    assert!(outcome.truncated.as_deref().unwrap().starts_with("page 2"));
    assert_eq!(source.requested().len(), 2);
}

#[tokio::test]
async fn test_first_page_failure_is_an_error() {
    let source = Arc::new(ScriptedSource::new(vec![Err(exhausted())]));
    let adapter = IndeedAdapter::new(source).unwrap();

    let result = adapter.scrape(&criteria("indeed"), None, 50).await;

    assert!(matches!(
        result,
        Err(ScrapeError::Fetch {
            source: FetchError::Exhausted { .. },
            ..
        })
    ));
}

#[tokio::test]
async fn test_requests_carry_pagination_offsets() {
    let source = Arc::new(ScriptedSource::new(vec![
        Ok(fresh_indeed_page("a", 2)),
        Ok(fresh_indeed_page("b", 2)),
    ]));
    let adapter = IndeedAdapter::new(source.clone()).unwrap();

    adapter.scrape(&criteria("indeed"), None, 50).await.unwrap();

    let requested = source.requested();
    assert_eq!(requested.len(), 3);
    assert!(requested[0].ends_with("start=0"));
    assert!(requested[1].ends_with("start=50"));
    assert!(requested[2].ends_with("start=100"));
    assert!(requested[0].contains("jt=fulltime"));
}

#[tokio::test]
async fn test_stops_at_limit() {
    let source = Arc::new(ScriptedSource::endless(|call| {
        fresh_indeed_page(&format!("c{call}-"), 20)
    }));
    let adapter = IndeedAdapter::new(source.clone()).unwrap();

    let outcome = adapter.scrape(&criteria("indeed"), None, 30).await.unwrap();

    assert_eq!(outcome.listings.len(), 30);
    assert_eq!(source.requested().len(), 2);
}

#[tokio::test]
async fn test_page_ceiling() {
    let source = Arc::new(ScriptedSource::endless(|call| {
        fresh_indeed_page(&format!("c{call}-"), 5)
    }));
    let adapter = IndeedAdapter::new(source.clone()).unwrap();

    let outcome = adapter.scrape(&criteria("indeed"), None, 1000).await.unwrap();

    assert_eq!(source.requested().len(), MAX_PAGES as usize);
    assert_eq!(outcome.listings.len(), 5 * MAX_PAGES as usize);
}

#[tokio::test]
async fn test_since_cursor_filters_and_stops() {
    let since: DateTime<Utc> = Utc::now() - Duration::hours(2);
    let mut cards = vec![
        indeed_card("new1", "Fresh one", "Aujourd'hui"),
        indeed_card("new2", "Fresh two", "Aujourd'hui"),
    ];
    cards.extend((0..5).map(|i| indeed_card(&format!("old{i}"), "Old", "Il y a 3 jours")));

    let source = Arc::new(ScriptedSource::endless(move |_| indeed_page(&cards)));
    let adapter = IndeedAdapter::new(source.clone()).unwrap();

    let outcome = adapter
        .scrape(&criteria("indeed"), Some(since), 50)
        .await
        .unwrap();

    assert_eq!(outcome.listings.len(), 2);
    assert_eq!(source.requested().len(), 1);
}

#[tokio::test]
async fn test_linkedin_caps_limit() {
    let page = |call: usize| {
        let items: String = (0..25)
            .map(|i| {
                format!(
                    r#"<li><h3><a href="/jobs/view/job-{call}-{i}">Role {i}</a></h3><h4><a>Acme</a></h4></li>"#
                )
            })
            .collect();
        format!(r#"<ul class="jobs-search__results-list">{items}</ul>"#)
    };
    let source = Arc::new(ScriptedSource::endless(page));
    let adapter = LinkedInAdapter::new(source.clone()).unwrap();

    let outcome = adapter.scrape(&criteria("linkedin"), None, 100).await.unwrap();

    assert_eq!(outcome.listings.len(), 25);
    assert_eq!(source.requested().len(), 1);
    assert!(outcome
        .listings
        .iter()
        .all(|l| l.external_id.as_deref().is_some_and(|id| id.starts_with("linkedin_"))));
}

#[tokio::test]
async fn test_indeed_over_http() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/jobs"))
        .and(query_param("q", "python developer"))
        .and(query_param("start", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_string(fresh_indeed_page("h", 3)))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/jobs"))
        .and(query_param("start", "50"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body></body></html>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let fetcher = Fetcher::new(&FetchConfig::default())
        .unwrap()
        .with_pacing(Pacing::none())
        .with_policy(BackoffPolicy::new(
            1,
            std::time::Duration::from_millis(5),
            std::time::Duration::from_millis(5),
        ));
    let adapter = IndeedAdapter::with_base_url(&mock_server.uri(), Arc::new(fetcher)).unwrap();

    let outcome = adapter.scrape(&criteria("indeed"), None, 50).await.unwrap();

    assert_eq!(outcome.listings.len(), 3);
    let expected_prefix = format!("{}/viewjob?jk=h", mock_server.uri());
    assert!(outcome.listings[0].url.starts_with(&expected_prefix));
    assert!(!outcome.listings[0].url.contains("tk="));
}
