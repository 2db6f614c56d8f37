//! Integration tests for the spider
//!
//! A scripted in-memory fetcher stands in for the network so the chained
//! crawl can be followed level by level.

use domain_spider::config::Config;
use domain_spider::crawler::{Fetch, Spider, SpiderMode};
use domain_spider::{ConfigError, SpiderError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

/// Serves canned pages and records every request
#[derive(Clone, Default)]
struct ScriptedFetcher {
    pages: Arc<HashMap<String, String>>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl ScriptedFetcher {
    fn new(pages: &[(&str, &str)]) -> Self {
        Self {
            pages: Arc::new(
                pages
                    .iter()
                    .map(|(url, html)| (url.to_string(), html.to_string()))
                    .collect(),
            ),
            requests: Arc::default(),
        }
    }

    fn request_count(&self, url: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.as_str() == url)
            .count()
    }

    fn total_requests(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl Fetch for ScriptedFetcher {
    async fn fetch(&mut self, url: &Url) -> Option<String> {
        self.requests.lock().unwrap().push(url.to_string());
        self.pages.get(url.as_str()).cloned()
    }
}

/// seed -> a, b ; a -> c ; c -> seed, d
fn small_web() -> ScriptedFetcher {
    ScriptedFetcher::new(&[
        (
            "https://seed.test/",
            r#"<a href="https://a.test/">A</a> <a href="https://b.test/x">B</a>"#,
        ),
        ("https://a.test/", r#"<a href="https://c.test/">C</a>"#),
        (
            "https://c.test/",
            r#"<a href="https://seed.test/about">Seed</a> <a href="https://d.test/">D</a>"#,
        ),
    ])
}

/// Creates a config with every delay zeroed and DNS validation off
fn create_test_config(depth: u32, per_level: usize, max_total: usize) -> Arc<Config> {
    let mut config = Config::default();
    config.crawler.delay = 0.0;
    config.detector.delay = 0.0;
    config.detector.validate_domains = false;
    config.spider.depth = depth;
    config.spider.max_domains_per_level = per_level;
    config.spider.max_total_domains = max_total;
    config.spider.item_delay = 0.0;
    config.spider.level_delay = 0.0;
    Arc::new(config)
}

fn spider_over(
    fetcher: &ScriptedFetcher,
    config: Arc<Config>,
    mode: SpiderMode,
) -> Spider<impl FnMut(Duration, &Config) -> Result<ScriptedFetcher, SpiderError>> {
    let fetcher = fetcher.clone();
    Spider::new(config, mode, move |_: Duration, _: &Config| {
        Ok::<_, SpiderError>(fetcher.clone())
    })
}

fn seeds(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_zero_domain_cap_runs_no_level() {
    let web = small_web();
    let mut spider = spider_over(&web, create_test_config(3, 10, 0), SpiderMode::Basic);

    let result = spider.run(&seeds(&["https://seed.test/"])).await;

    assert_eq!(result.spider_depth, 0);
    assert_eq!(result.total_domains_found, 0);
    assert!(result.valid_domains.is_empty());
    assert_eq!(result.processed_domains, 0);
    assert_eq!(result.total_urls_processed, 1);
    assert_eq!(web.total_requests(), 0);
}

#[tokio::test]
async fn test_single_level_basic_spider() {
    let web = small_web();
    let mut spider = spider_over(&web, create_test_config(1, 10, 100), SpiderMode::Basic);

    let result = spider.run(&seeds(&["https://seed.test/"])).await;

    assert_eq!(result.spider_depth, 1);
    assert_eq!(result.valid_domains, vec!["a.test", "b.test", "c.test"]);
    assert_eq!(result.total_valid_domains, 3);
    assert_eq!(result.processed_domains, 1);
    assert_eq!(result.crawl_strategy, "spider_domain_chaining");
    assert!(result.found_pages.is_none());

    // basic results carry no page fields
    let json = serde_json::to_value(&result).unwrap();
    assert!(json.get("found_pages").is_none());
    assert!(json.get("total_pages_found").is_none());
    assert_eq!(json["spider_depth"], 1);
}

#[tokio::test]
async fn test_basic_spider_chains_without_reprocessing() {
    let web = small_web();
    let mut spider = spider_over(&web, create_test_config(3, 10, 100), SpiderMode::Basic);

    let result = spider.run(&seeds(&["https://seed.test/"])).await;

    // level 1: seed ; level 2: a, b, c ; level 3: d
    assert_eq!(result.spider_depth, 3);
    assert_eq!(
        result.valid_domains,
        vec!["a.test", "b.test", "c.test", "d.test", "seed.test"]
    );
    assert_eq!(result.processed_domains, 5);
    assert!(result.invalid_domains.is_empty());

    // seed.test was found again at level 2 but never queued a second time
    assert_eq!(web.request_count("https://seed.test/"), 2);
    // found by the detector at level 2, then crawled and detected at level 3
    assert_eq!(web.request_count("https://d.test/"), 3);
}

#[tokio::test]
async fn test_per_level_cap_limits_frontier() {
    let web = small_web();
    let mut spider = spider_over(&web, create_test_config(2, 1, 100), SpiderMode::Basic);

    let result = spider.run(&seeds(&["https://seed.test/"])).await;

    assert_eq!(result.spider_depth, 2);
    // only a.test is processed at level 2
    assert_eq!(result.processed_domains, 2);
    assert_eq!(web.request_count("https://b.test/"), 0);
    assert_eq!(web.request_count("https://a.test/"), 3);
}

#[tokio::test]
async fn test_global_cap_stops_after_first_level() {
    let web = small_web();
    let mut spider = spider_over(&web, create_test_config(3, 10, 2), SpiderMode::Basic);

    let result = spider.run(&seeds(&["https://seed.test/"])).await;

    assert_eq!(result.spider_depth, 1);
    assert_eq!(result.total_valid_domains, 3);
    assert_eq!(web.request_count("https://a.test/"), 1);
}

#[tokio::test]
async fn test_enhanced_spider_follows_pages_and_domains() {
    let web = small_web();
    let mut spider = spider_over(&web, create_test_config(2, 4, 100), SpiderMode::Enhanced);

    let result = spider.run(&seeds(&["https://seed.test/"])).await;

    assert_eq!(result.spider_depth, 2);
    assert_eq!(result.crawl_strategy, "enhanced_spider_both_page_and_domain");
    assert_eq!(
        result.found_pages.as_deref(),
        Some(
            &[
                "https://a.test/".to_string(),
                "https://b.test/x".to_string(),
                "https://c.test/".to_string(),
            ][..]
        )
    );
    assert_eq!(result.total_pages_found, Some(3));
    assert_eq!(result.max_pages_per_domain, Some(50));
    assert_eq!(
        result.valid_domains,
        vec!["a.test", "b.test", "c.test", "d.test", "seed.test"]
    );

    // b.test/x was queued as a page in its own right
    assert!(web.request_count("https://b.test/x") >= 2);
}

#[tokio::test]
async fn test_failed_item_does_not_stop_the_level() {
    let web = small_web();
    let fetcher = web.clone();
    let mut calls = 0;
    let mut spider = Spider::new(
        create_test_config(1, 10, 100),
        SpiderMode::Basic,
        move |_: Duration, _: &Config| {
            calls += 1;
            if calls == 1 {
                Err(SpiderError::Config(ConfigError::Validation(
                    "no client".to_string(),
                )))
            } else {
                Ok(fetcher.clone())
            }
        },
    );

    let result = spider
        .run(&seeds(&["https://seed.test/", "https://c.test/"]))
        .await;

    assert_eq!(result.spider_depth, 1);
    assert_eq!(result.valid_domains, vec!["d.test", "seed.test"]);
    assert_eq!(result.processed_domains, 2);
    assert_eq!(web.request_count("https://seed.test/"), 0);
}
