//! Integration tests for the harvester
//!
//! These tests use wiremock to stand in for the search and detail endpoints
//! and run the harvest end-to-end against a temporary output file.

use chrono::NaiveDate;
use pubmed_harvester::checkpoint::{Checkpoint, JsonFileStore, RecordStore};
use pubmed_harvester::config::{Config, RetryConfig};
use pubmed_harvester::harvest::{
    CountEstimator, EutilsClient, Harvester, IdPaginator, RetryPolicy, Window,
};
use pubmed_harvester::{HarvestError, Record};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

const SEARCH_PATH: &str = "/entrez/eutils/esearch.fcgi";
const FETCH_PATH: &str = "/entrez/eutils/efetch.fcgi";

/// Search endpoint that pages through a fixed result list per query term
struct FakeSearch {
    results: HashMap<String, Vec<String>>,
}

impl Respond for FakeSearch {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let params = query_params(request);
        let term = params.get("term").cloned().unwrap_or_default();
        let retmax: usize = params.get("retmax").and_then(|v| v.parse().ok()).unwrap_or(20);
        let retstart: usize = params.get("retstart").and_then(|v| v.parse().ok()).unwrap_or(0);

        let ids = self.results.get(&term).cloned().unwrap_or_default();
        let page: Vec<String> = ids.iter().skip(retstart).take(retmax).cloned().collect();

        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "header": {"type": "esearch", "version": "0.3"},
            "esearchresult": {
                "count": ids.len().to_string(),
                "retmax": page.len().to_string(),
                "retstart": retstart.to_string(),
                "idlist": page,
            }
        }))
    }
}

/// Detail endpoint that returns one article per requested identifier
struct FakeFetch;

impl Respond for FakeFetch {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let params = query_params(request);
        let ids = params.get("id").cloned().unwrap_or_default();

        let mut xml = String::from("<?xml version=\"1.0\" ?>\n<PubmedArticleSet>\n");
        for id in ids.split(',').filter(|id| !id.is_empty()) {
            xml.push_str(&format!(
                r#"<PubmedArticle><MedlineCitation><PMID Version="1">{id}</PMID><Article>
<Journal><JournalIssue><PubDate><Year>2020</Year></PubDate></JournalIssue></Journal>
<ArticleTitle>Title {id}</ArticleTitle>
<Abstract><AbstractText>Abstract {id}.</AbstractText></Abstract>
<AuthorList><Author><LastName>Doe</LastName><ForeName>Jane</ForeName></Author></AuthorList>
</Article></MedlineCitation></PubmedArticle>
"#
            ));
        }
        xml.push_str("</PubmedArticleSet>");

        ResponseTemplate::new(200)
            .insert_header("content-type", "text/xml")
            .set_body_string(xml)
    }
}

fn query_params(request: &Request) -> HashMap<String, String> {
    request.url.query_pairs().into_owned().collect()
}

fn ids(range: std::ops::RangeInclusive<u32>) -> Vec<String> {
    range.map(|n| (30_000_000 + n).to_string()).collect()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Creates a test configuration pointing at the mock server
fn create_test_config(server: &MockServer, output: &Path) -> Config {
    let mut config = Config::default();
    config.query.term = "x[Title]".to_string();
    config.endpoint.search_url = format!("{}{}", server.uri(), SEARCH_PATH);
    config.endpoint.fetch_url = format!("{}{}", server.uri(), FETCH_PATH);
    config.endpoint.timeout_secs = 5;
    config.pacing.page_delay_ms = 0;
    config.pacing.batch_delay_ms = 0;
    config.retry = RetryConfig {
        max_retries: 3,
        base_delay_ms: 1,
        max_delay_ms: 5,
    };
    config.output.records_path = output.display().to_string();
    config
}

async fn mount_search(server: &MockServer, results: HashMap<String, Vec<String>>) {
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(FakeSearch { results })
        .mount(server)
        .await;
}

async fn mount_fetch(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(FETCH_PATH))
        .respond_with(FakeFetch)
        .mount(server)
        .await;
}

async fn requests_to(server: &MockServer, endpoint: &str) -> Vec<HashMap<String, String>> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == endpoint)
        .map(query_params)
        .collect()
}

fn pmids(records: &[Record]) -> Vec<String> {
    records.iter().map(|r| r.pmid.clone()).collect()
}

#[tokio::test]
async fn test_two_window_harvest_end_to_end() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("articles.json");

    let first = Window::new(date(2020, 1, 1), date(2020, 1, 30));
    let second = Window::new(date(2020, 1, 31), date(2020, 2, 29));

    // 20 identifiers appear in both windows
    let mut results = HashMap::new();
    results.insert(first.scoped_query("x[Title]"), ids(1..=120));
    results.insert(second.scoped_query("x[Title]"), ids(101..=220));
    mount_search(&server, results).await;
    mount_fetch(&server).await;

    let mut config = create_test_config(&server, &output);
    config.query.start_date = Some(date(2020, 1, 1));
    config.query.end_date = Some(date(2020, 2, 29));
    config.endpoint.result_cap = 250;

    let mut harvester = Harvester::new(config).expect("Failed to create harvester");
    assert_eq!(harvester.planned_windows(), Some(vec![first, second]));
    let report = harvester.run().await.expect("Harvest failed");

    assert_eq!(report.identifiers_found, 220);
    assert_eq!(report.fetched, 220);
    assert_eq!(report.failed_batches, 0);
    assert_eq!(report.total_records, 220);

    // Each window: one count request, then pages of 100 and 20
    let searches = requests_to(&server, SEARCH_PATH).await;
    let page_sizes: Vec<&str> = searches
        .iter()
        .map(|p| p.get("retmax").map(String::as_str).unwrap_or(""))
        .collect();
    assert_eq!(page_sizes, vec!["0", "100", "20", "0", "100", "20"]);

    // ceil(220 / 100) detail batches
    let fetches = requests_to(&server, FETCH_PATH).await;
    assert_eq!(fetches.len(), 3);
    assert!(fetches.iter().all(|p| p.get("retmode").map(String::as_str) == Some("xml")));

    let stored = JsonFileStore::new(&output).load().unwrap();
    let distinct: HashSet<String> = pmids(&stored).into_iter().collect();
    assert_eq!(stored.len(), 220);
    assert_eq!(distinct.len(), 220);

    let sample = stored.iter().find(|r| r.pmid == "30000005").unwrap();
    assert_eq!(sample.title, "Title 30000005");
    assert_eq!(sample.abstract_text, "Abstract 30000005.");
    assert_eq!(sample.authors, vec!["Jane Doe".to_string()]);
    assert_eq!(sample.pub_date, "2020");
}

#[tokio::test]
async fn test_rerun_is_idempotent() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("articles.json");

    let mut results = HashMap::new();
    results.insert("x[Title]".to_string(), ids(1..=150));
    mount_search(&server, results).await;
    mount_fetch(&server).await;

    let config = create_test_config(&server, &output);

    let first = Harvester::new(config.clone()).unwrap().run().await.unwrap();
    assert_eq!(first.fetched, 150);
    let fetches_after_first = requests_to(&server, FETCH_PATH).await.len();
    assert_eq!(fetches_after_first, 2);

    let second = Harvester::new(config).unwrap().run().await.unwrap();
    assert_eq!(second.already_present, 150);
    assert_eq!(second.fetched, 0);
    assert_eq!(second.total_records, 150);

    // No detail requests on the second run
    assert_eq!(requests_to(&server, FETCH_PATH).await.len(), fetches_after_first);

    let stored = JsonFileStore::new(&output).load().unwrap();
    let distinct: HashSet<String> = pmids(&stored).into_iter().collect();
    assert_eq!(stored.len(), 150);
    assert_eq!(distinct.len(), 150);
}

#[tokio::test]
async fn test_only_missing_identifiers_are_requested() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("articles.json");

    let existing: Vec<Record> = ["A", "B"]
        .iter()
        .map(|id| Record {
            title: format!("Existing {}", id),
            abstract_text: String::new(),
            authors: vec![],
            pub_date: "2019".to_string(),
            pmid: id.to_string(),
        })
        .collect();
    JsonFileStore::new(&output).save(&existing).unwrap();

    let mut results = HashMap::new();
    results.insert(
        "x[Title]".to_string(),
        vec!["A".to_string(), "B".to_string(), "C".to_string()],
    );
    mount_search(&server, results).await;
    mount_fetch(&server).await;

    let report = Harvester::new(create_test_config(&server, &output))
        .unwrap()
        .run()
        .await
        .unwrap();

    let fetches = requests_to(&server, FETCH_PATH).await;
    assert_eq!(fetches.len(), 1);
    assert_eq!(fetches[0].get("id").map(String::as_str), Some("C"));

    assert_eq!(report.already_present, 2);
    assert_eq!(report.fetched, 1);

    let checkpoint = Checkpoint::open(&output).unwrap();
    assert_eq!(pmids(checkpoint.records()), vec!["A", "B", "C"]);
    assert_eq!(checkpoint.records()[0].title, "Existing A");
}

#[tokio::test]
async fn test_pagination_stops_at_end_of_results() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let mut results = HashMap::new();
    results.insert("x[Title]".to_string(), ids(1..=250));
    mount_search(&server, results).await;

    let config = create_test_config(&server, &dir.path().join("unused.json"));
    let client = EutilsClient::new(&config).unwrap();
    let retry = RetryPolicy::from_config(&config.retry);
    let paginator = IdPaginator::new(&client, &retry, 100, Duration::ZERO);

    let found = paginator.paginate("x[Title]", 1_000).await;

    assert_eq!(found, ids(1..=250));
    // Three full or partial pages, then one empty page
    let offsets: Vec<String> = requests_to(&server, SEARCH_PATH)
        .await
        .iter()
        .filter_map(|p| p.get("retstart").cloned())
        .collect();
    assert_eq!(offsets, vec!["0", "100", "200", "250"]);
}

#[tokio::test]
async fn test_pagination_returns_partial_result_after_failures() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    // Second page always fails
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(wiremock::matchers::query_param("retstart", "100"))
        .respond_with(ResponseTemplate::new(502))
        .with_priority(1)
        .mount(&server)
        .await;
    let mut results = HashMap::new();
    results.insert("x[Title]".to_string(), ids(1..=250));
    mount_search(&server, results).await;

    let config = create_test_config(&server, &dir.path().join("unused.json"));
    let client = EutilsClient::new(&config).unwrap();
    let retry = RetryPolicy::from_config(&config.retry);
    let paginator = IdPaginator::new(&client, &retry, 100, Duration::ZERO);

    let found = paginator.paginate("x[Title]", 250).await;

    assert_eq!(found, ids(1..=100));
    let second_page_attempts = requests_to(&server, SEARCH_PATH)
        .await
        .iter()
        .filter(|p| p.get("retstart").map(String::as_str) == Some("100"))
        .count();
    assert_eq!(second_page_attempts, 3);
}

#[tokio::test]
async fn test_count_failure_reports_zero() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let config = create_test_config(&server, &dir.path().join("unused.json"));
    let client = EutilsClient::new(&config).unwrap();
    let retry = RetryPolicy::from_config(&config.retry);
    let counter = CountEstimator::new(&client, &retry);

    let window = Window::new(date(2021, 1, 1), date(2021, 1, 30));
    assert_eq!(counter.count("x[Title]", Some(&window)).await, 0);
    assert_eq!(requests_to(&server, SEARCH_PATH).await.len(), 3);
}

#[tokio::test]
async fn test_count_requests_are_paced() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let mut results = HashMap::new();
    results.insert("x[Title]".to_string(), ids(1..=7));
    mount_search(&server, results).await;

    let config = create_test_config(&server, &dir.path().join("unused.json"));
    let client = EutilsClient::new(&config).unwrap();
    let retry = RetryPolicy::from_config(&config.retry);
    let counter = CountEstimator::new(&client, &retry).with_delay(Duration::from_millis(150));

    let started = Instant::now();
    assert_eq!(counter.count("x[Title]", None).await, 7);
    assert_eq!(counter.count("y[Title]", None).await, 0);

    assert!(started.elapsed() >= Duration::from_millis(300));
    assert_eq!(requests_to(&server, SEARCH_PATH).await.len(), 2);
}

#[tokio::test]
async fn test_rate_limited_request_is_retried() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    let mut results = HashMap::new();
    results.insert("x[Title]".to_string(), ids(1..=42));
    mount_search(&server, results).await;

    let config = create_test_config(&server, &dir.path().join("unused.json"));
    let client = EutilsClient::new(&config).unwrap();
    let retry = RetryPolicy::from_config(&config.retry);
    let counter = CountEstimator::new(&client, &retry);

    assert_eq!(counter.count("x[Title]", None).await, 42);
    assert_eq!(requests_to(&server, SEARCH_PATH).await.len(), 2);
}

#[tokio::test]
async fn test_failed_batch_is_skipped() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("articles.json");

    let mut results = HashMap::new();
    results.insert("x[Title]".to_string(), ids(1..=150));
    mount_search(&server, results).await;

    // Batches containing the first identifier fail every time
    Mock::given(method("GET"))
        .and(path(FETCH_PATH))
        .and(FirstBatchMatcher)
        .respond_with(ResponseTemplate::new(503))
        .with_priority(1)
        .mount(&server)
        .await;
    mount_fetch(&server).await;

    let report = Harvester::new(create_test_config(&server, &output))
        .unwrap()
        .run()
        .await
        .expect("Batch failures must not abort the harvest");

    assert_eq!(report.failed_batches, 1);
    assert_eq!(report.fetched, 50);
    assert_eq!(requests_to(&server, FETCH_PATH).await.len(), 3 + 1);

    let stored = JsonFileStore::new(&output).load().unwrap();
    assert_eq!(stored.len(), 50);
}

#[tokio::test]
async fn test_checkpoint_write_failure_aborts_harvest() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("articles.json");

    // The sibling temp file cannot be created when a directory has its name
    std::fs::create_dir(dir.path().join("articles.json.tmp")).unwrap();

    let mut results = HashMap::new();
    results.insert("x[Title]".to_string(), ids(1..=150));
    mount_search(&server, results).await;
    mount_fetch(&server).await;

    let result = Harvester::new(create_test_config(&server, &output))
        .unwrap()
        .run()
        .await;

    assert!(
        matches!(result, Err(HarvestError::Store(_))),
        "expected a store error, got {:?}",
        result
    );
    // Aborted after the first batch: the second is never requested
    assert_eq!(requests_to(&server, FETCH_PATH).await.len(), 1);
    assert!(!output.exists());
}

/// Matches detail requests whose id list starts with the first identifier
struct FirstBatchMatcher;

impl wiremock::Match for FirstBatchMatcher {
    fn matches(&self, request: &Request) -> bool {
        query_params(request)
            .get("id")
            .is_some_and(|ids| ids.starts_with("30000001,"))
    }
}

#[tokio::test]
async fn test_oversized_window_is_truncated_or_split() {
    let window = Window::new(date(2020, 1, 1), date(2020, 1, 30));
    let (left, right) = window.bisect().unwrap();

    let mut results = HashMap::new();
    results.insert(window.scoped_query("x[Title]"), ids(1..=150));
    results.insert(left.scoped_query("x[Title]"), ids(1..=75));
    results.insert(right.scoped_query("x[Title]"), ids(76..=150));

    for (split, expected) in [(false, 100), (true, 150)] {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        mount_search(&server, results.clone()).await;
        mount_fetch(&server).await;

        let mut config = create_test_config(&server, &dir.path().join("articles.json"));
        config.query.start_date = Some(window.start);
        config.query.end_date = Some(window.end);
        config.query.split_oversized_windows = split;
        config.endpoint.result_cap = 100;

        let report = Harvester::new(config).unwrap().run().await.unwrap();
        assert_eq!(report.identifiers_found, expected, "split = {}", split);
        assert_eq!(report.total_records, expected, "split = {}", split);
    }
}

#[tokio::test]
async fn test_api_key_and_tool_are_sent() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let mut results = HashMap::new();
    results.insert("x[Title]".to_string(), ids(1..=3));
    mount_search(&server, results).await;
    mount_fetch(&server).await;

    let mut config = create_test_config(&server, &dir.path().join("articles.json"));
    config.endpoint.api_key = Some("secret-key".to_string());
    config.user_agent.contact_email = Some("team@example.org".to_string());

    Harvester::new(config).unwrap().run().await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert!(!requests.is_empty());
    for request in &requests {
        let params = query_params(request);
        assert_eq!(params.get("api_key").map(String::as_str), Some("secret-key"));
        assert_eq!(params.get("db").map(String::as_str), Some("pubmed"));
        assert_eq!(params.get("tool").map(String::as_str), Some("PubMedDownloader"));
        assert_eq!(params.get("email").map(String::as_str), Some("team@example.org"));
    }
}
