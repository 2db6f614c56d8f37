//! Chained domain discovery
//!
//! The spider runs a page crawl followed by a domain detection pass for
//! every URL of the current level, then seeds the next level with the
//! domains (and, in enhanced mode, the pages) that level discovered.

use crate::config::Config;
use crate::crawler::detector::{DetectionResult, DomainDetector};
use crate::crawler::fetcher::{Fetch, FetchClient};
use crate::crawler::page::{PageCrawlResult, PageCrawler};
use crate::policy::DomainPolicy;
use crate::url::extract_domain;
use crate::SpiderError;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

/// Page crawl limits for each frontier item in basic mode
const BASIC_PAGE_DEPTH: u32 = 2;
const BASIC_PAGE_CAP: usize = 30;

/// Page crawl depth for each frontier item in enhanced mode
const ENHANCED_PAGE_DEPTH: u32 = 3;

/// Which frontier strategy the spider uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpiderMode {
    /// Next level is seeded from newly found domains only
    Basic,
    /// Next level is seeded from newly found domains and pages
    Enhanced,
}

impl SpiderMode {
    fn strategy(&self) -> &'static str {
        match self {
            SpiderMode::Basic => "spider_domain_chaining",
            SpiderMode::Enhanced => "enhanced_spider_both_page_and_domain",
        }
    }
}

/// Single-pass result: detection output plus the crawl that fed it
#[derive(Debug, Clone, Serialize)]
pub struct CrawlReport {
    #[serde(flatten)]
    pub detection: DetectionResult,
    pub crawl_stats: PageCrawlResult,
}

/// Final result of a spider run
#[derive(Debug, Clone, Default, Serialize)]
pub struct SpiderResult {
    pub total_domains_found: usize,
    pub total_valid_domains: usize,
    pub total_invalid_domains: usize,
    pub total_urls_processed: usize,
    pub valid_domains: Vec<String>,
    pub invalid_domains: Vec<String>,
    pub validation_enabled: bool,
    /// Levels actually executed
    pub spider_depth: u32,
    /// Distinct hosts of all processed frontier items
    pub processed_domains: usize,
    pub max_domains_per_level: usize,
    pub max_total_domains: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_pages_found: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub found_pages: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_pages_per_domain: Option<usize>,
    pub crawl_strategy: String,
}

/// Runs one page crawl and one detection pass over the seeds and every page
/// the crawl found
///
/// `limits` overrides the crawler's `(max_depth, max_urls)`.
pub async fn crawl_then_detect<F: Fetch>(
    config: &Config,
    policy: Arc<DomainPolicy>,
    crawl_fetcher: F,
    detect_fetcher: F,
    seeds: &[String],
    limits: Option<(u32, usize)>,
) -> (PageCrawlResult, DetectionResult) {
    let mut crawler = PageCrawler::new(crawl_fetcher, policy.clone(), &config.crawler);
    if let Some((max_depth, max_urls)) = limits {
        crawler = crawler.with_limits(max_depth, max_urls);
    }
    let crawl = crawler.crawl(seeds).await;

    let mut seen = HashSet::new();
    let targets: Vec<String> = seeds
        .iter()
        .chain(crawl.found_urls.iter())
        .filter(|u| seen.insert(u.as_str()))
        .cloned()
        .collect();

    info!("Detecting domains over {} URL(s)", targets.len());
    let mut detector = DomainDetector::new(detect_fetcher, policy, &config.detector);
    let detection = detector.detect(&targets).await;

    (crawl, detection)
}

/// The single-pass "normal" mode over HTTP
///
/// Uses the configured crawler limits.
pub async fn crawl_and_detect(
    config: Arc<Config>,
    seeds: &[String],
) -> Result<CrawlReport, SpiderError> {
    let policy = Arc::new(DomainPolicy::from_config(&config));
    let crawl_fetcher = FetchClient::for_crawler(&config)?;
    let detect_fetcher = FetchClient::for_detector(&config)?;

    let (crawl, detection) =
        crawl_then_detect(&config, policy, crawl_fetcher, detect_fetcher, seeds, None).await;

    Ok(CrawlReport {
        detection,
        crawl_stats: crawl,
    })
}

/// Level-by-level domain chaining
///
/// `make_fetcher` is called twice per frontier item with the per-attempt
/// timeout of the crawler and of the detector respectively, so every item
/// starts with fresh proxy state.
pub struct Spider<M> {
    config: Arc<Config>,
    policy: Arc<DomainPolicy>,
    mode: SpiderMode,
    make_fetcher: M,
}

/// Factory building an HTTP `FetchClient` for a given per-attempt timeout
pub type HttpFetcherFactory = fn(Duration, &Config) -> Result<FetchClient, SpiderError>;

impl Spider<HttpFetcherFactory> {
    /// Spider that fetches over HTTP with `FetchClient`
    pub fn http(config: Arc<Config>, mode: SpiderMode) -> Self {
        fn build(timeout: Duration, config: &Config) -> Result<FetchClient, SpiderError> {
            FetchClient::new(timeout, &config.user_agent, &config.proxy)
        }
        Spider::new(config, mode, build as HttpFetcherFactory)
    }
}

impl<M, F> Spider<M>
where
    M: FnMut(Duration, &Config) -> Result<F, SpiderError>,
    F: Fetch,
{
    pub fn new(config: Arc<Config>, mode: SpiderMode, make_fetcher: M) -> Self {
        let policy = Arc::new(DomainPolicy::from_config(&config));
        Self {
            config,
            policy,
            mode,
            make_fetcher,
        }
    }

    /// Crawl limits for one frontier item
    fn item_limits(&self) -> (u32, usize) {
        match self.mode {
            SpiderMode::Basic => (BASIC_PAGE_DEPTH, BASIC_PAGE_CAP),
            SpiderMode::Enhanced => (
                ENHANCED_PAGE_DEPTH,
                self.config.spider.max_pages_per_domain,
            ),
        }
    }

    async fn process_item(
        &mut self,
        url: &str,
    ) -> Result<(PageCrawlResult, DetectionResult), SpiderError> {
        let crawl_fetcher = (self.make_fetcher)(
            Duration::from_secs(self.config.crawler.timeout),
            &self.config,
        )?;
        let detect_fetcher = (self.make_fetcher)(
            Duration::from_secs(self.config.detector.timeout),
            &self.config,
        )?;

        Ok(crawl_then_detect(
            &self.config,
            self.policy.clone(),
            crawl_fetcher,
            detect_fetcher,
            &[url.to_string()],
            Some(self.item_limits()),
        )
        .await)
    }

    /// Runs the chained crawl from the initial URLs
    pub async fn run(&mut self, initial_urls: &[String]) -> SpiderResult {
        let settings = self.config.spider.clone();
        let enhanced = self.mode == SpiderMode::Enhanced;

        info!(
            "Starting {} spider crawl: depth {}, {} domains per level, {} domains total, {} seed URL(s)",
            if enhanced { "enhanced" } else { "basic" },
            settings.depth,
            settings.max_domains_per_level,
            settings.max_total_domains,
            initial_urls.len()
        );

        let mut all_domains: BTreeSet<String> = BTreeSet::new();
        let mut invalid_domains: BTreeSet<String> = BTreeSet::new();
        let mut all_pages: BTreeSet<String> = BTreeSet::new();
        let mut processed: HashSet<String> = HashSet::new();
        let mut frontier: Vec<String> = initial_urls.to_vec();
        let mut levels_run = 0;

        for level in 0..settings.depth {
            if all_domains.len() >= settings.max_total_domains {
                warn!(
                    "Maximum domain count reached ({})",
                    settings.max_total_domains
                );
                break;
            }
            if frontier.is_empty() {
                info!("No URLs left to process");
                break;
            }

            levels_run = level + 1;
            info!("Level {}: {} URL(s) to process", level + 1, frontier.len());

            let mut level_domains: BTreeSet<String> = BTreeSet::new();
            let mut level_pages: BTreeSet<String> = BTreeSet::new();

            for (i, url) in frontier.iter().enumerate() {
                if all_domains.len() >= settings.max_total_domains {
                    warn!("Maximum domain count reached, stopping level");
                    break;
                }

                info!("({}/{}) Processing: {}", i + 1, frontier.len(), url);

                match self.process_item(url).await {
                    Ok((crawl, detection)) => {
                        let mut new_domains = 0;
                        for domain in detection.valid_domains {
                            if all_domains.insert(domain.clone()) {
                                level_domains.insert(domain);
                                new_domains += 1;
                            }
                        }
                        invalid_domains.extend(detection.invalid_domains);

                        let mut new_pages = 0;
                        if enhanced {
                            for page in crawl.found_urls {
                                if all_pages.insert(page.clone()) {
                                    level_pages.insert(page);
                                    new_pages += 1;
                                }
                            }
                        }

                        info!(
                            "{} new domain(s), {} new page(s), {} URL(s) crawled",
                            new_domains, new_pages, crawl.total_found
                        );
                    }
                    Err(e) => {
                        error!("Failed to process {}: {}", url, e);
                    }
                }

                if i + 1 < frontier.len() {
                    sleep_secs(settings.item_delay).await;
                }
            }

            info!(
                "Level {} complete: {} new domain(s), {} total",
                level + 1,
                level_domains.len(),
                all_domains.len()
            );

            for url in &frontier {
                if let Some(domain) = Url::parse(url).ok().as_ref().and_then(extract_domain) {
                    processed.insert(domain);
                }
            }

            frontier = self.next_frontier(
                &level_domains,
                &level_pages,
                &processed,
                all_domains.len(),
            );
            debug!("Next frontier: {:?}", frontier);
            info!("{} URL(s) prepared for the next level", frontier.len());

            if level + 1 < settings.depth && !frontier.is_empty() {
                sleep_secs(settings.level_delay).await;
            }
        }

        // A domain that validated for one item is valid overall.
        invalid_domains.retain(|d| !all_domains.contains(d));

        info!(
            "Spider crawl complete: {} domain(s) over {} level(s), {} domain(s) processed",
            all_domains.len(),
            levels_run,
            processed.len()
        );

        SpiderResult {
            total_domains_found: all_domains.len() + invalid_domains.len(),
            total_valid_domains: all_domains.len(),
            total_invalid_domains: invalid_domains.len(),
            total_urls_processed: initial_urls.len(),
            valid_domains: all_domains.into_iter().collect(),
            invalid_domains: invalid_domains.into_iter().collect(),
            validation_enabled: self.config.detector.validate_domains,
            spider_depth: levels_run,
            processed_domains: processed.len(),
            max_domains_per_level: settings.max_domains_per_level,
            max_total_domains: settings.max_total_domains,
            total_pages_found: enhanced.then_some(all_pages.len()),
            found_pages: enhanced.then(|| all_pages.into_iter().collect()),
            max_pages_per_domain: enhanced.then_some(settings.max_pages_per_domain),
            crawl_strategy: self.mode.strategy().to_string(),
        }
    }

    /// Picks the next level's URLs from what this level discovered
    ///
    /// Nothing is taken once the global domain cap is reached. In enhanced
    /// mode the per-level cap is split in half (integer division) between
    /// domains and pages, domains first.
    fn next_frontier(
        &self,
        level_domains: &BTreeSet<String>,
        level_pages: &BTreeSet<String>,
        processed: &HashSet<String>,
        total_domains: usize,
    ) -> Vec<String> {
        let settings = &self.config.spider;
        if total_domains >= settings.max_total_domains {
            return Vec::new();
        }

        let domain_cap = match self.mode {
            SpiderMode::Basic => settings.max_domains_per_level,
            SpiderMode::Enhanced => settings.max_domains_per_level / 2,
        };

        let mut next: Vec<String> = level_domains
            .iter()
            .filter(|domain| !processed.contains(*domain))
            .take(domain_cap)
            .map(|domain| format!("https://{}", domain))
            .collect();

        if self.mode == SpiderMode::Enhanced {
            let page_cap = settings.max_domains_per_level / 2;
            next.extend(
                level_pages
                    .iter()
                    .filter(|page| {
                        Url::parse(page)
                            .ok()
                            .as_ref()
                            .and_then(extract_domain)
                            .map_or(false, |domain| !processed.contains(&domain))
                    })
                    .take(page_cap)
                    .cloned(),
            );
        }

        next
    }
}

async fn sleep_secs(seconds: f64) {
    if seconds > 0.0 {
        tokio::time::sleep(Duration::from_secs_f64(seconds)).await;
    }
}
