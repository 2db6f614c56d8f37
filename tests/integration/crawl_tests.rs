//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and exercise the
//! fetch client, the page crawler and the domain detector end-to-end.

use domain_spider::config::{Config, CrawlerConfig, DetectorConfig, ProxyConfig, UserAgentConfig};
use domain_spider::crawler::{
    crawl_and_detect, DomainDetector, Fetch, FetchClient, PageCrawler, MAX_ATTEMPTS,
};
use domain_spider::{BlockingMode, DomainPolicy};
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a user agent config with a fixed identity
fn test_user_agent() -> UserAgentConfig {
    UserAgentConfig {
        crawler_name: "TestBot".to_string(),
        crawler_version: "1.0.0".to_string(),
        contact_url: Some("https://example.com/contact".to_string()),
        random: false,
        ..UserAgentConfig::default()
    }
}

fn test_client() -> FetchClient {
    FetchClient::new(Duration::from_secs(5), &test_user_agent(), &ProxyConfig::default())
        .expect("Failed to build fetch client")
}

/// Creates a config with no delays and DNS validation off
fn create_test_config() -> Config {
    let mut config = Config::default();
    config.crawler = CrawlerConfig {
        delay: 0.0,
        max_depth: 2,
        max_urls: 50,
        timeout: 5,
        excluded_extensions: Some(vec![".pdf".to_string()]),
    };
    config.detector = DetectorConfig {
        delay: 0.0,
        timeout: 5,
        validate_domains: false,
    };
    config.user_agent = test_user_agent();
    config
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=utf-8")
}

async fn mount_page(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(html(body))
        .mount(server)
        .await;
}

fn page_url(server: &MockServer, route: &str) -> Url {
    Url::parse(&format!("{}{}", server.uri(), route)).expect("Failed to parse mock URL")
}

#[tokio::test]
async fn test_fetch_returns_html_body() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, "/", "<html><body>hello</body></html>".to_string()).await;

    let mut client = test_client();
    let body = client.fetch(&page_url(&mock_server, "/")).await;

    assert_eq!(body.as_deref(), Some("<html><body>hello</body></html>"));
}

#[tokio::test]
async fn test_fetch_sends_identity_user_agent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/ua"))
        .and(header(
            "user-agent",
            "TestBot/1.0.0 (+https://example.com/contact)",
        ))
        .respond_with(html("<html></html>".to_string()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut client = test_client();
    assert!(client.fetch(&page_url(&mock_server, "/ua")).await.is_some());
}

#[tokio::test]
async fn test_fetch_rejects_non_html() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("{}")
                .insert_header("content-type", "application/json"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut client = test_client();
    assert!(client.fetch(&page_url(&mock_server, "/data.json")).await.is_none());
}

#[tokio::test]
async fn test_fetch_does_not_retry_client_errors() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut client = test_client();
    assert!(client.fetch(&page_url(&mock_server, "/missing")).await.is_none());
}

#[tokio::test]
async fn test_fetch_retries_server_errors() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .expect(MAX_ATTEMPTS as u64)
        .mount(&mock_server)
        .await;

    let mut client = test_client();
    assert!(client.fetch(&page_url(&mock_server, "/flaky")).await.is_none());
}

#[tokio::test]
async fn test_fetch_retries_timeouts() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(html("<html></html>".to_string()).set_delay(Duration::from_secs(3)))
        .expect(MAX_ATTEMPTS as u64)
        .mount(&mock_server)
        .await;

    let mut client =
        FetchClient::new(Duration::from_secs(1), &test_user_agent(), &ProxyConfig::default())
            .expect("Failed to build fetch client");
    assert!(client.fetch(&page_url(&mock_server, "/slow")).await.is_none());
}

#[tokio::test]
async fn test_dead_proxies_fall_back_to_direct() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html("<html>direct</html>".to_string()))
        .expect(2)
        .mount(&mock_server)
        .await;

    // Nothing listens on these ports, so every proxy connect is refused
    let proxy = ProxyConfig {
        enabled: true,
        rotation: false,
        list: vec![
            "127.0.0.1:9".to_string(),
            "127.0.0.1:19".to_string(),
            "127.0.0.1:29".to_string(),
            "127.0.0.1:39".to_string(),
        ],
    };
    let mut client = FetchClient::new(Duration::from_secs(5), &test_user_agent(), &proxy)
        .expect("Failed to build fetch client");
    assert!(client.current_proxy().is_some());

    let url = page_url(&mock_server, "/");

    // three attempts burn three proxies; the fourth is already in place
    assert!(client.fetch(&url).await.is_none());
    assert!(client.current_proxy().is_some());

    // the last proxy fails, the pool is exhausted and the retry goes direct
    assert_eq!(client.fetch(&url).await.as_deref(), Some("<html>direct</html>"));
    assert!(client.current_proxy().is_none());

    assert_eq!(client.fetch(&url).await.as_deref(), Some("<html>direct</html>"));
}

#[tokio::test]
async fn test_page_crawl_follows_same_site_links() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();

    mount_page(
        &mock_server,
        "/",
        format!(
            r#"<html><body>
            <a href="{base}/page1">Page 1</a>
            <a href="/page2">Page 2</a>
            <a href="/report.pdf">Report</a>
            <a href="https://elsewhere.test/">Elsewhere</a>
            </body></html>"#
        ),
    )
    .await;
    mount_page(
        &mock_server,
        "/page1",
        r#"<html><body><a href="/page3">Page 3</a></body></html>"#.to_string(),
    )
    .await;
    mount_page(&mock_server, "/page2", "<html><body></body></html>".to_string()).await;
    mount_page(
        &mock_server,
        "/page3",
        r#"<html><body><a href="/page4">Page 4</a></body></html>"#.to_string(),
    )
    .await;

    let config = create_test_config();
    let mut crawler = PageCrawler::new(test_client(), Arc::new(DomainPolicy::disabled()), &config.crawler);
    let result = crawler.crawl(&[format!("{}/", base)]).await;

    let visited: Vec<String> = result
        .visited_urls
        .iter()
        .map(|u| u.trim_start_matches(&base).to_string())
        .collect();
    assert_eq!(visited, vec!["/", "/page1", "/page3", "/page2"]);

    // /page4 is linked from depth 2, so it is found but never visited
    assert!(result.found_urls.iter().any(|u| u.ends_with("/page4")));
    assert!(result.found_urls.iter().any(|u| u.starts_with("https://elsewhere.test")));
    assert!(!result.found_urls.iter().any(|u| u.ends_with(".pdf")));
    assert_eq!(result.total_found, result.found_urls.len());
    assert_eq!(result.blocked_urls_count, 0);
}

#[tokio::test]
async fn test_page_crawl_counts_blocked_links() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();

    mount_page(
        &mock_server,
        "/",
        r#"<html><body>
        <a href="https://www.facebook.com/share">Share</a>
        <a href="https://cdn.ads.test/pixel">Pixel</a>
        <a href="https://news.test/">News</a>
        </body></html>"#
            .to_string(),
    )
    .await;

    let policy = DomainPolicy::new(
        true,
        BlockingMode::Subdomain,
        vec!["facebook.com".to_string(), "ads.test".to_string()],
        Duration::from_secs(1),
    );

    let config = create_test_config();
    let mut crawler = PageCrawler::new(test_client(), Arc::new(policy), &config.crawler);
    let result = crawler.crawl(&[format!("{}/", base)]).await;

    assert_eq!(result.found_urls, vec!["https://news.test/"]);
    assert_eq!(result.blocked_urls_count, 2);
    assert_eq!(result.blocked_domains_count, 2);
}

#[tokio::test]
async fn test_detector_collects_linked_domains() {
    let mock_server = MockServer::start().await;

    mount_page(
        &mock_server,
        "/a",
        r#"<html><head>
        <link rel="stylesheet" href="https://static.example.org/site.css">
        <script src="https://cdn.example.net/app.js"></script>
        </head><body>
        <a href="https://Alpha.Test/about">Alpha</a>
        <img src="https://images.example.com/logo.png">
        <a href="mailto:someone@example.com">Mail</a>
        </body></html>"#
            .to_string(),
    )
    .await;
    mount_page(
        &mock_server,
        "/b",
        r#"<html><body><a href="https://alpha.test/other">Alpha again</a></body></html>"#.to_string(),
    )
    .await;

    let config = create_test_config();
    let mut detector = DomainDetector::new(test_client(), Arc::new(DomainPolicy::disabled()), &config.detector);
    let urls = vec![
        page_url(&mock_server, "/a").to_string(),
        page_url(&mock_server, "/b").to_string(),
    ];
    let result = detector.detect(&urls).await;

    assert_eq!(
        result.valid_domains,
        vec![
            "alpha.test",
            "cdn.example.net",
            "images.example.com",
            "static.example.org",
        ]
    );
    assert_eq!(result.total_domains_found, 4);
    assert_eq!(result.total_invalid_domains, 0);
    assert_eq!(result.total_urls_processed, 2);
    assert!(!result.validation_enabled);

    let sources = &detector.domain_urls()["alpha.test"];
    assert_eq!(sources.len(), 2);
}

#[tokio::test]
async fn test_crawl_and_detect_single_pass() {
    let mock_server = MockServer::start().await;
    let base = mock_server.uri();

    mount_page(
        &mock_server,
        "/",
        r#"<html><body>
        <a href="/inner">Inner</a>
        <a href="https://first.test/">First</a>
        </body></html>"#
            .to_string(),
    )
    .await;
    mount_page(
        &mock_server,
        "/inner",
        r#"<html><body><a href="https://second.test/page">Second</a></body></html>"#.to_string(),
    )
    .await;

    let config = Arc::new(create_test_config());
    let report = crawl_and_detect(config, &[format!("{}/", base)])
        .await
        .expect("Crawl failed");

    assert_eq!(report.crawl_stats.total_visited, 2);
    // the mock server's own host is linked from the seed page
    assert_eq!(
        report.detection.valid_domains,
        vec!["127.0.0.1", "first.test", "second.test"]
    );
    // seed plus every found URL
    assert_eq!(
        report.detection.total_urls_processed,
        1 + report.crawl_stats.found_urls.len()
    );

    let json = serde_json::to_value(&report).expect("Failed to serialize report");
    assert_eq!(json["total_valid_domains"], 3);
    assert_eq!(json["crawl_stats"]["total_visited"], 2);
}
