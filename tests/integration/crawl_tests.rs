//! Integration tests for the crawler
//!
//! These tests use wiremock to serve a small paginated catalog and run the full
//! plan, walk and persist cycle end-to-end.

use listing_harvest::catalog::{HttpFetcher, HttpFetcherFactory, Query, ScraperExtractor};
use listing_harvest::config::{FetcherConfig, SelectorConfig, WalkerConfig};
use listing_harvest::crawler::{
    CrawlOrchestrator, OrchestratorSettings, PageWalker, PlannerConfig, WalkPolicy,
};
use listing_harvest::record::{Fingerprint, RecordField};
use listing_harvest::state::StopReason;
use listing_harvest::storage::{
    CsvDestination, Destination, OutputFormat, OutputTarget, SqliteDestination,
};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Walker settings without any delays
fn instant_walker() -> WalkerConfig {
    WalkerConfig {
        block_cooldown_secs: 0,
        empty_retry_secs: 0,
        transport_retry_secs: 0,
        pacing_min_ms: 0,
        pacing_max_ms: 0,
        ..WalkerConfig::default()
    }
}

fn orchestrator() -> CrawlOrchestrator {
    let settings = OrchestratorSettings {
        planner: PlannerConfig {
            max_pages: 500,
            first_year: 2000,
            last_year: 2024,
            window_years: 2,
        },
        walk: WalkPolicy::from(&instant_walker()),
        max_concurrent_queries: 1,
    };
    CrawlOrchestrator::new(
        Arc::new(HttpFetcherFactory::new(FetcherConfig::default())),
        Arc::new(ScraperExtractor::new(&SelectorConfig::default()).unwrap()),
        settings,
    )
}

/// Renders a results page with the given (id, title) listings and pagination
fn results_page(listings: &[(&str, &str)], pages: u32) -> String {
    let articles: String = listings
        .iter()
        .map(|(id, title)| {
            format!(
                r#"<article data-id="{id}"><section>
                    <h2><a href="/oferta/{id}.html">{title}</a></h2>
                    <p>1598 cm3 • 110 KM</p>
                    <dl><dd data-parameter="mileage">120 000 km</dd>
                        <dd data-parameter="fuel_type">Benzyna</dd>
                        <dd data-parameter="gearbox">Manualna</dd>
                        <dd data-parameter="year">2015</dd></dl>
                    <h3>31 500</h3><p>PLN</p>
                </section></article>"#
            )
        })
        .collect();
    let pagination: String = (1..=pages).map(|n| format!("<li>{}</li>", n)).collect();
    format!(
        r#"<html><body><main>{}</main><ul class="ooa-1vdlgt7">{}</ul></body></html>"#,
        articles, pagination
    )
}

async fn serve_page(server: &MockServer, page: &str, body: String) {
    Mock::given(method("GET"))
        .and(path("/osobowe"))
        .and(query_param("page", page))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

/// Serves a two-page catalog holding three listings
async fn two_page_catalog() -> MockServer {
    let server = MockServer::start().await;
    serve_page(
        &server,
        "1",
        results_page(&[("1", "Opel Astra"), ("2", "Ford Focus")], 2),
    )
    .await;
    serve_page(&server, "2", results_page(&[("3", "Kia Ceed")], 2)).await;
    server
}

fn catalog_query(server: &MockServer) -> Query {
    Query::parse(&format!("{}/osobowe", server.uri())).unwrap()
}

fn csv_titles(path: &Path) -> Vec<String> {
    CsvDestination::new(path)
        .load()
        .unwrap()
        .iter()
        .filter_map(|r| r.get(RecordField::Title).map(str::to_string))
        .collect()
}

#[tokio::test]
async fn test_crawl_to_csv() {
    let server = two_page_catalog().await;
    let dir = TempDir::new().unwrap();
    let target = OutputTarget::new(dir.path().join("listings_1.csv"), OutputFormat::Csv);

    let report = orchestrator()
        .run(vec![catalog_query(&server)], |_, _| target.clone(), 500)
        .await;

    let summary = &report.queries[0];
    assert!(summary.error.is_none(), "crawl failed: {:?}", summary.error);
    assert_eq!(summary.partitions, 1);
    assert_eq!(summary.pages_visited, 2);
    assert_eq!(summary.records_added, 3);

    assert_eq!(
        csv_titles(&target.path),
        vec!["Opel Astra", "Ford Focus", "Kia Ceed"]
    );

    let content = std::fs::read_to_string(&target.path).unwrap();
    assert!(content.starts_with("ID,Title,Link,Description,Mileage,"));
    assert_eq!(content.lines().count(), 4);
}

#[tokio::test]
async fn test_rerun_persists_each_listing_once() {
    let server = two_page_catalog().await;
    let dir = TempDir::new().unwrap();
    let target = OutputTarget::new(dir.path().join("listings_1.csv"), OutputFormat::Csv);

    for expected in [3, 0] {
        let report = orchestrator()
            .run(vec![catalog_query(&server)], |_, _| target.clone(), 500)
            .await;
        assert_eq!(report.queries[0].records_added, expected);
    }

    assert_eq!(csv_titles(&target.path).len(), 3);
    let content = std::fs::read_to_string(&target.path).unwrap();
    assert_eq!(content.matches("ID,Title").count(), 1);
}

#[tokio::test]
async fn test_resume_after_torn_write() {
    let server = two_page_catalog().await;
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("listings_1.csv");
    let target = OutputTarget::new(&path, OutputFormat::Csv);

    orchestrator()
        .run(vec![catalog_query(&server)], |_, _| target.clone(), 1)
        .await;

    // Simulate a process killed halfway through writing a row
    let mut content = std::fs::read_to_string(&path).unwrap();
    content.push_str("9,Half writ");
    std::fs::write(&path, content).unwrap();

    let report = orchestrator()
        .run(vec![catalog_query(&server)], |_, _| target.clone(), 500)
        .await;

    assert_eq!(report.queries[0].records_added, 1);
    let titles = csv_titles(&path);
    assert!(titles.contains(&"Kia Ceed".to_string()));
    assert_eq!(
        titles.iter().filter(|t| t.as_str() == "Opel Astra").count(),
        1
    );
}

#[tokio::test]
async fn test_crawl_to_sqlite() {
    let server = two_page_catalog().await;
    let dir = TempDir::new().unwrap();
    let target = OutputTarget::new(dir.path().join("listings.db"), OutputFormat::Sqlite);

    for expected in [3, 0] {
        let report = orchestrator()
            .run(vec![catalog_query(&server)], |_, _| target.clone(), 500)
            .await;
        assert_eq!(report.queries[0].records_added, expected);
    }

    let rows = SqliteDestination::open(&target.path).unwrap().load().unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].get(RecordField::ListingId), Some("1"));
    assert_eq!(rows[0].get(RecordField::Currency), Some("PLN"));
}

#[tokio::test]
async fn test_redirect_to_fixed_page_ends_partition() {
    let server = MockServer::start().await;
    serve_page(&server, "1", results_page(&[("1", "Opel Astra")], 9)).await;
    let end_url = format!("{}/end", server.uri());
    for page in ["2", "3", "4", "5"] {
        Mock::given(method("GET"))
            .and(path("/osobowe"))
            .and(query_param("page", page))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", end_url.as_str()))
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/end"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(results_page(&[("2", "Ford Focus"), ("3", "Kia Ceed")], 9)),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let target = OutputTarget::new(dir.path().join("out.csv"), OutputFormat::Csv);
    let report = orchestrator()
        .run(vec![catalog_query(&server)], |_, _| target.clone(), 500)
        .await;

    let summary = &report.queries[0];
    assert_eq!(summary.records_added, 3);
    assert_eq!(summary.stop_reasons.get(&StopReason::RedirectRepeat), Some(&1));
    assert_eq!(summary.pages_visited, 3);
}

#[tokio::test]
async fn test_captcha_page_is_retried_then_skipped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/osobowe"))
        .and(query_param("page", "1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><body><h1>Zbyt wiele zapytań</h1></body></html>"),
        )
        .expect(3)
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new(&FetcherConfig::default()).unwrap();
    let extractor = ScraperExtractor::new(&SelectorConfig::default()).unwrap();
    let policy = WalkPolicy::from(&instant_walker());
    let mut walker = PageWalker::new(
        catalog_query(&server),
        &fetcher,
        &extractor,
        &policy,
        1,
        CancellationToken::new(),
    );

    let known: HashSet<Fingerprint> = HashSet::new();
    let mut records = 0;
    while let Some(walked) = walker.next_page(&known).await {
        records += walked.records.len();
    }

    assert_eq!(records, 0);
    assert_eq!(walker.stats().blocked, 3);
    assert_eq!(walker.stats().skipped, 1);
    server.verify().await;
}

#[tokio::test]
async fn test_cancelled_crawl_leaves_destination_untouched() {
    let server = two_page_catalog().await;
    let dir = TempDir::new().unwrap();
    let target = OutputTarget::new(dir.path().join("out.csv"), OutputFormat::Csv);

    let orchestrator = orchestrator();
    orchestrator.cancellation_token().cancel();
    let report = orchestrator
        .run(vec![catalog_query(&server)], |_, _| target.clone(), 500)
        .await;

    assert!(report.was_cancelled());
    assert!(!target.path.exists());
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}
