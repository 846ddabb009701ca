//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end through the real HTTP fetcher.

use std::time::Duration;
use sumi_lens::config::{parse_config, CrawlConfig};
use sumi_lens::state::{CrawlPhase, SnapshotCursors};
use sumi_lens::CrawlEngine;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a fast, robots-ignoring configuration for tests
fn create_test_config() -> CrawlConfig {
    let mut config = CrawlConfig::default();
    config.crawler.crawl_delay = 0;
    config.crawler.concurrency = 2;
    config.crawler.respect_robots = false;
    config.http.retries = 0;
    config.http.retry_backoff = 1;
    config.http.retry_backoff_max = 10;
    config.http.timeout = 5;
    config
}

/// An HTML page response; wiremock's `set_body_string` would force text/plain
fn html_page(title: &str, body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(
        format!(
            "<!DOCTYPE html><html lang=\"en\"><head><title>{}</title></head><body>{}</body></html>",
            title, body
        ),
        "text/html",
    )
}

async fn mount_page(server: &MockServer, page_path: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(response)
        .mount(server)
        .await;
}

async fn run_to_end(engine: &CrawlEngine) -> CrawlPhase {
    tokio::time::timeout(Duration::from_secs(30), engine.wait())
        .await
        .expect("crawl did not finish in time")
}

#[tokio::test]
async fn test_full_crawl_single_site() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        html_page(
            "Home",
            r#"<h1>Home</h1><a href="/page1">Page 1</a><a href="/page2">Page 2</a>
               <a href="https://elsewhere.example/">Elsewhere</a>"#,
        ),
    )
    .await;
    mount_page(&server, "/page1", html_page("Page 1", r#"<a href="/page2">Page 2</a>"#)).await;
    mount_page(&server, "/page2", html_page("Page 2", r#"<a href="/">Home</a>"#)).await;

    let engine = CrawlEngine::new();
    engine
        .start(&format!("{}/", server.uri()), create_test_config())
        .unwrap();
    assert_eq!(run_to_end(&engine).await, CrawlPhase::Completed);

    let snapshot = engine.status_snapshot(SnapshotCursors::default());
    assert_eq!(snapshot.urls.len(), 3);
    assert_eq!(snapshot.stats.counters.crawled, 3);
    assert_eq!(snapshot.stats.counters.failed, 0);
    assert_eq!(snapshot.progress, 1.0);

    let home = snapshot
        .urls
        .iter()
        .find(|p| p.depth == 0)
        .expect("seed page recorded");
    assert_eq!(home.status_code, 200);
    assert_eq!(home.title.as_deref(), Some("Home"));
    assert_eq!(home.internal_links, 2);
    assert_eq!(home.external_links, 1);

    // The external link is recorded but not crawled
    assert!(snapshot
        .links
        .iter()
        .any(|link| link.target_url.starts_with("https://elsewhere.example")));
    assert!(snapshot
        .urls
        .iter()
        .all(|p| !p.url.contains("elsewhere.example")));
}

#[tokio::test]
async fn test_server_error_retried_then_recorded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let mut config = create_test_config();
    config.http.retries = 2;

    let engine = CrawlEngine::new();
    engine.start(&format!("{}/", server.uri()), config).unwrap();
    // A response, even an error one, means the seed was reachable
    assert_eq!(run_to_end(&engine).await, CrawlPhase::Completed);

    let pages = engine.pages();
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].status_code, 500);
    assert_eq!(pages[0].error.as_deref(), Some("HTTP status 500"));
    assert_eq!(engine.stats().counters.failed, 1);
    assert!(engine
        .issues()
        .iter()
        .any(|issue| issue.issue_type == "server_error"));
}

#[tokio::test]
async fn test_robots_disallow_skips_urls() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private"),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_page(
        &server,
        "/",
        html_page(
            "Home",
            r#"<a href="/public">Public</a><a href="/private/area">Private</a>"#,
        ),
    )
    .await;
    mount_page(&server, "/public", html_page("Public", "")).await;
    Mock::given(method("GET"))
        .and(path("/private/area"))
        .respond_with(html_page("Private", ""))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = create_test_config();
    config.crawler.respect_robots = true;

    let engine = CrawlEngine::new();
    engine.start(&format!("{}/", server.uri()), config).unwrap();
    assert_eq!(run_to_end(&engine).await, CrawlPhase::Completed);

    let stats = engine.stats();
    assert_eq!(stats.counters.crawled, 2);
    assert_eq!(stats.counters.skipped, 1);
    assert!(engine.pages().iter().all(|p| !p.url.contains("/private")));
}

#[tokio::test]
async fn test_oversized_page_recorded_as_failure() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        ResponseTemplate::new(200).set_body_raw(r#"<a href="/big">big</a>"#, "text/html"),
    )
    .await;
    mount_page(
        &server,
        "/big",
        ResponseTemplate::new(200).set_body_raw("x".repeat(1000), "text/html"),
    )
    .await;

    let mut config = create_test_config();
    config.crawler.max_file_size = 200;

    let engine = CrawlEngine::new();
    engine.start(&format!("{}/", server.uri()), config).unwrap();
    assert_eq!(run_to_end(&engine).await, CrawlPhase::Completed);

    let pages = engine.pages();
    let big = pages
        .iter()
        .find(|p| p.url.ends_with("/big"))
        .expect("oversized page recorded");
    assert_eq!(big.status_code, 0);
    assert!(big.error.as_deref().unwrap().contains("too large"));
    assert!(engine
        .issues()
        .iter()
        .any(|issue| issue.issue_type == "fetch_failed" && issue.url == big.url));
}

#[tokio::test]
async fn test_redirect_records_final_url() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        ResponseTemplate::new(301).insert_header("location", format!("{}/home", server.uri()).as_str()),
    )
    .await;
    mount_page(&server, "/home", html_page("Home", "")).await;

    let engine = CrawlEngine::new();
    engine
        .start(&format!("{}/", server.uri()), create_test_config())
        .unwrap();
    assert_eq!(run_to_end(&engine).await, CrawlPhase::Completed);

    let pages = engine.pages();
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].status_code, 200);
    assert_eq!(pages[0].final_url, format!("{}/home", server.uri()));
}

#[tokio::test]
async fn test_unreachable_seed_fails() {
    let engine = CrawlEngine::new();
    // Nothing listens on port 1
    engine
        .start("http://127.0.0.1:1/", create_test_config())
        .unwrap();
    assert_eq!(run_to_end(&engine).await, CrawlPhase::Failed);

    let snapshot = engine.status_snapshot(SnapshotCursors::default());
    assert_eq!(snapshot.urls.len(), 1);
    assert!(snapshot.error.is_some());
}

#[tokio::test]
async fn test_crawl_with_parsed_config() {
    let server = MockServer::start().await;
    mount_page(&server, "/", html_page("Home", r#"<a href="/deep">Deep</a>"#)).await;
    mount_page(&server, "/deep", html_page("Deep", "")).await;

    let config = parse_config(
        r#"
[crawler]
max-depth = 0
crawl-delay = 0
respect-robots = false

[http]
retries = 0
"#,
    )
    .unwrap();

    let engine = CrawlEngine::new();
    engine.start(&format!("{}/", server.uri()), config).unwrap();
    assert_eq!(run_to_end(&engine).await, CrawlPhase::Completed);
    assert_eq!(engine.pages().len(), 1);
    assert_eq!(engine.links().len(), 1);
}
