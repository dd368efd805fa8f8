//! HTTP fetcher and extractor tests
//!
//! These tests run the real reqwest fetcher and scraper extractor against wiremock.

use listing_harvest::catalog::{
    Catalog, Extractor, FetchError, Fetcher, HttpFetcher, PageCounter, Query, ScraperExtractor,
};
use listing_harvest::config::{FetcherConfig, SelectorConfig};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fetcher() -> HttpFetcher {
    HttpFetcher::new(&FetcherConfig::default()).expect("Failed to build fetcher")
}

fn query(server: &MockServer) -> Query {
    Query::parse(&format!("{}/osobowe", server.uri())).expect("Failed to parse query")
}

#[tokio::test]
async fn test_successful_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/osobowe"))
        .and(query_param("page", "2"))
        .and(header("accept-language", "pl-PL,pl;q=0.9,en-US;q=0.8,en;q=0.7"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let page = fetcher().get(&query(&server), 2).await.unwrap();
    assert_eq!(page.html, "<html>ok</html>");
    assert_eq!(page.effective_url, query(&server).page_url(2));
}

#[tokio::test]
async fn test_redirect_reports_effective_url() {
    let server = MockServer::start().await;
    let end_url = format!("{}/end", server.uri());
    Mock::given(method("GET"))
        .and(path("/osobowe"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", end_url.as_str()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/end"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>last</html>"))
        .mount(&server)
        .await;

    let page = fetcher().get(&query(&server), 9).await.unwrap();
    assert_eq!(page.effective_url.path(), "/end");
}

#[tokio::test]
async fn test_rate_limit_is_blocked() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let result = fetcher().get(&query(&server), 1).await;
    assert!(matches!(result, Err(FetchError::Blocked { .. })));
}

#[tokio::test]
async fn test_redirect_to_block_page_reports_landing_url() {
    let server = MockServer::start().await;
    let block_url = format!("{}/zbyt-wiele-zapytan", server.uri());
    Mock::given(method("GET"))
        .and(path("/osobowe"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", block_url.as_str()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/zbyt-wiele-zapytan"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    match fetcher().get(&query(&server), 3).await {
        Err(FetchError::Blocked { url }) => assert_eq!(url, block_url),
        other => panic!("expected a blocked error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_forbidden_is_blocked() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let result = fetcher().get(&query(&server), 1).await;
    assert!(matches!(result, Err(FetchError::Blocked { .. })));
}

#[tokio::test]
async fn test_server_error_is_transport() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    match fetcher().get(&query(&server), 1).await {
        Err(FetchError::Transport { message, .. }) => assert_eq!(message, "HTTP 503"),
        other => panic!("expected a transport error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unreachable_host_is_transport() {
    // Nothing listens on the discard port
    let query = Query::parse("http://127.0.0.1:9/osobowe").unwrap();
    let result = fetcher().get(&query, 1).await;
    assert!(matches!(result, Err(FetchError::Transport { .. })));
}

#[tokio::test]
async fn test_catalog_page_count_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/osobowe"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body><ul class="ooa-1vdlgt7"><li>1</li><li>2</li><li>14</li></ul></body></html>"#,
        ))
        .mount(&server)
        .await;

    let fetcher = fetcher();
    let extractor = ScraperExtractor::new(&SelectorConfig::default()).unwrap();
    let catalog = Catalog::new(&fetcher, &extractor);

    assert_eq!(catalog.page_count(&query(&server)).await.unwrap(), 14);
}

#[tokio::test]
async fn test_captcha_page_is_blocked() {
    let extractor = ScraperExtractor::new(&SelectorConfig::default()).unwrap();
    assert!(extractor.is_blocked("<html><body><div>Potwierdź, że nie jesteś robotem (CAPTCHA)</div></body></html>"));
}
