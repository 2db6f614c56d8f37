//! Bounded same-site page crawler
//!
//! Starting from seed URLs, the crawler walks same-site links depth first,
//! records every link it sees (cross-site ones included) and stops at the
//! configured depth or URL cap.

use crate::config::CrawlerConfig;
use crate::crawler::fetcher::Fetch;
use crate::crawler::parser::LinkExtractor;
use crate::policy::DomainPolicy;
use crate::url::{extract_domain, parse_crawlable, same_site};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Summary of one page crawl
#[derive(Debug, Clone, Default, Serialize)]
pub struct PageCrawlResult {
    pub start_urls: Vec<String>,
    pub total_found: usize,
    pub total_visited: usize,
    /// Found URLs in discovery order
    pub found_urls: Vec<String>,
    /// Visited URLs in visit order
    pub visited_urls: Vec<String>,
    pub blocked_urls_count: usize,
    pub blocked_domains_count: usize,
}

/// A page whose same-site links are still being walked
struct Frame {
    url: Url,
    depth: u32,
    candidates: Vec<Url>,
    next: usize,
}

/// Depth-first crawler over same-site links
///
/// Visited and found sets belong to a single `crawl` call and are reset at
/// its start.
pub struct PageCrawler<F> {
    fetcher: F,
    extractor: LinkExtractor,
    policy: Arc<DomainPolicy>,
    excluded_extensions: HashSet<String>,
    delay: Duration,
    max_depth: u32,
    max_urls: usize,

    visited: HashSet<Url>,
    visit_order: Vec<Url>,
    found: HashSet<Url>,
    found_order: Vec<Url>,
    blocked_urls: usize,
}

impl<F: Fetch> PageCrawler<F> {
    pub fn new(fetcher: F, policy: Arc<DomainPolicy>, config: &CrawlerConfig) -> Self {
        let excluded_extensions = config.excluded_extension_set();
        Self {
            fetcher,
            extractor: LinkExtractor::new(excluded_extensions.clone()),
            policy,
            excluded_extensions,
            delay: config.delay_duration(),
            max_depth: config.max_depth,
            max_urls: config.max_urls,
            visited: HashSet::new(),
            visit_order: Vec::new(),
            found: HashSet::new(),
            found_order: Vec::new(),
            blocked_urls: 0,
        }
    }

    /// Overrides depth and URL cap (used by the spider's per-item crawls)
    pub fn with_limits(mut self, max_depth: u32, max_urls: usize) -> Self {
        self.max_depth = max_depth;
        self.max_urls = max_urls;
        self
    }

    /// Crawls from each seed in order until the URL cap is reached
    ///
    /// Seeds that are malformed, not HTTP(S) or carry an excluded extension
    /// are skipped with a warning. Blocked seeds are counted and skipped.
    pub async fn crawl(&mut self, seeds: &[String]) -> PageCrawlResult {
        self.reset();
        info!("Starting crawl with {} seed URL(s)", seeds.len());

        for seed in seeds {
            if self.found.len() >= self.max_urls {
                break;
            }

            let url = match parse_crawlable(seed, &self.excluded_extensions) {
                Ok(url) => url,
                Err(e) => {
                    warn!("Skipping seed {}: {}", seed, e);
                    continue;
                }
            };

            if self.policy.is_blocked(&url) {
                self.log_blocked(&url);
                continue;
            }

            self.crawl_from(url).await;
        }

        let result = PageCrawlResult {
            start_urls: seeds.to_vec(),
            total_found: self.found_order.len(),
            total_visited: self.visit_order.len(),
            found_urls: self.found_order.iter().map(Url::to_string).collect(),
            visited_urls: self.visit_order.iter().map(Url::to_string).collect(),
            blocked_urls_count: self.blocked_urls,
            blocked_domains_count: self.policy.blocked_count(),
        };

        if self.policy.blocked_count() > 0 {
            info!(
                "Crawl complete: {} URLs found, {} URLs blocked",
                result.total_found, result.blocked_urls_count
            );
        } else {
            info!("Crawl complete: {} URLs found", result.total_found);
        }

        result
    }

    fn reset(&mut self) {
        self.visited.clear();
        self.visit_order.clear();
        self.found.clear();
        self.found_order.clear();
        self.blocked_urls = 0;
    }

    /// Walks one seed with an explicit stack
    ///
    /// Pages are entered in the same order a recursive walk would enter
    /// them: a page's candidates are scanned in document order and each
    /// same-site one is fully explored before the next is considered.
    async fn crawl_from(&mut self, seed: Url) {
        let mut stack: Vec<Frame> = Vec::new();
        if let Some(frame) = self.enter(seed, 0).await {
            stack.push(frame);
        }

        loop {
            let Some(frame) = stack.last_mut() else {
                break;
            };

            let mut child = None;
            while frame.next < frame.candidates.len() {
                if self.found.len() >= self.max_urls {
                    frame.next = frame.candidates.len();
                    break;
                }

                let candidate = &frame.candidates[frame.next];
                frame.next += 1;

                if self.policy.is_blocked(candidate) {
                    continue;
                }

                if same_site(candidate, &frame.url) {
                    child = Some((candidate.clone(), frame.depth + 1));
                    break;
                }
            }

            match child {
                Some((url, depth)) => {
                    if !self.delay.is_zero() {
                        tokio::time::sleep(self.delay).await;
                    }
                    if let Some(frame) = self.enter(url, depth).await {
                        stack.push(frame);
                    }
                }
                None => {
                    stack.pop();
                }
            }
        }
    }

    /// Visits a page and records its links
    ///
    /// Returns a frame when the page's same-site links should be followed.
    async fn enter(&mut self, url: Url, depth: u32) -> Option<Frame> {
        if self.found.len() >= self.max_urls || depth > self.max_depth || self.visited.contains(&url) {
            return None;
        }

        if self.policy.is_blocked(&url) {
            self.log_blocked(&url);
            return None;
        }

        self.visited.insert(url.clone());
        self.visit_order.push(url.clone());
        info!("Crawling: {} (depth {})", url, depth);

        let html = self.fetcher.fetch(&url).await?;
        if html.is_empty() {
            return None;
        }

        let candidates = self.extractor.extract(&html, &url);
        for candidate in &candidates {
            if self.found.contains(candidate) || self.found.len() >= self.max_urls {
                continue;
            }
            if self.policy.is_blocked(candidate) {
                self.log_blocked(candidate);
            } else {
                debug!("New URL found: {}", candidate);
                self.found.insert(candidate.clone());
                self.found_order.push(candidate.clone());
            }
        }

        if depth < self.max_depth {
            Some(Frame {
                url,
                depth,
                candidates,
                next: 0,
            })
        } else {
            None
        }
    }

    fn log_blocked(&mut self, url: &Url) {
        self.blocked_urls += 1;
        info!(
            "Blocked domain: {} (URL: {})",
            extract_domain(url).unwrap_or_default(),
            url
        );
        debug!("Blocked URLs so far: {}", self.blocked_urls);
    }
}
