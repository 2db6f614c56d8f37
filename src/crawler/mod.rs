//! Crawler module for page fetching and domain discovery
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with retry logic and proxy rotation
//! - HTML parsing and link extraction
//! - Bounded same-site page crawling
//! - Domain detection and validation
//! - Level-by-level spider orchestration

mod detector;
mod fetcher;
mod page;
mod parser;
mod proxy;
mod spider;

pub use detector::{filter_domains, DetectionResult, DomainDetector};
pub use fetcher::{build_http_client, Fetch, FetchClient, FetchResult, MAX_ATTEMPTS};
pub use page::{PageCrawlResult, PageCrawler};
pub use parser::LinkExtractor;
pub use proxy::{normalize_proxy_url, ProxyPool};
pub use spider::{
    crawl_and_detect, crawl_then_detect, CrawlReport, HttpFetcherFactory, Spider, SpiderMode,
    SpiderResult,
};
