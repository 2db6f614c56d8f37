//! Domain detection over a list of pages
//!
//! Each page is fetched once and every domain it links to (anchors,
//! stylesheets, images, scripts) is collected. Found domains are then
//! optionally checked against DNS.

use crate::config::DetectorConfig;
use crate::crawler::fetcher::Fetch;
use crate::crawler::parser::LinkExtractor;
use crate::policy::DomainPolicy;
use crate::url::extract_domain;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

/// Pause between consecutive DNS queries
const DNS_QUERY_DELAY: Duration = Duration::from_millis(100);

/// Summary of one detection pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct DetectionResult {
    pub total_domains_found: usize,
    pub total_valid_domains: usize,
    pub total_invalid_domains: usize,
    pub total_urls_processed: usize,
    pub valid_domains: Vec<String>,
    pub invalid_domains: Vec<String>,
    pub validation_enabled: bool,
    pub blocked_urls_count: usize,
}

/// Collects and validates the domains linked from a set of pages
pub struct DomainDetector<F> {
    fetcher: F,
    extractor: LinkExtractor,
    policy: Arc<DomainPolicy>,
    delay: Duration,
    validate_domains: bool,

    found: BTreeSet<String>,
    valid: BTreeSet<String>,
    invalid: BTreeSet<String>,
    domain_urls: BTreeMap<String, BTreeSet<String>>,
    blocked_urls: usize,
}

impl<F: Fetch> DomainDetector<F> {
    pub fn new(fetcher: F, policy: Arc<DomainPolicy>, config: &DetectorConfig) -> Self {
        Self {
            fetcher,
            extractor: LinkExtractor::default(),
            policy,
            delay: config.delay_duration(),
            validate_domains: config.validate_domains,
            found: BTreeSet::new(),
            valid: BTreeSet::new(),
            invalid: BTreeSet::new(),
            domain_urls: BTreeMap::new(),
            blocked_urls: 0,
        }
    }

    /// Fetches every URL, gathers linked domains, then validates them
    ///
    /// State from a previous call is discarded first.
    pub async fn detect(&mut self, urls: &[String]) -> DetectionResult {
        self.reset();
        info!("Starting domain detection over {} URL(s)", urls.len());

        for (i, raw) in urls.iter().enumerate() {
            debug!("Processing ({}/{}): {}", i + 1, urls.len(), raw);

            match Url::parse(raw) {
                Ok(url) => self.detect_from_url(&url).await,
                Err(e) => error!("Failed to process {}: {}", raw, e),
            }

            if i + 1 < urls.len() && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
        }

        self.validate_all().await;

        let result = DetectionResult {
            total_domains_found: self.found.len(),
            total_valid_domains: self.valid.len(),
            total_invalid_domains: self.invalid.len(),
            total_urls_processed: urls.len(),
            valid_domains: self.valid.iter().cloned().collect(),
            invalid_domains: self.invalid.iter().cloned().collect(),
            validation_enabled: self.validate_domains,
            blocked_urls_count: self.blocked_urls,
        };

        info!(
            "Domain detection complete: {} valid domain(s) found",
            result.total_valid_domains
        );
        result
    }

    fn reset(&mut self) {
        self.found.clear();
        self.valid.clear();
        self.invalid.clear();
        self.domain_urls.clear();
        self.blocked_urls = 0;
    }

    async fn detect_from_url(&mut self, url: &Url) {
        if self.policy.is_blocked(url) {
            self.blocked_urls += 1;
            info!(
                "Blocked domain: {} (URL: {})",
                extract_domain(url).unwrap_or_default(),
                url
            );
            return;
        }

        let Some(html) = self.fetcher.fetch(url).await else {
            return;
        };

        for (domain, sources) in self.extractor.extract_domains(&html, url) {
            if self.policy.is_blocked_str(&format!("https://{}", domain)) {
                info!("Blocked domain: {}", domain);
                continue;
            }

            if self.found.insert(domain.clone()) {
                debug!("New domain found: {}", domain);
            }
            self.domain_urls.entry(domain).or_default().extend(sources);
        }
    }

    async fn validate_all(&mut self) {
        if !self.validate_domains {
            self.valid = self.found.clone();
            return;
        }

        let total = self.found.len();
        info!("Validating {} domain(s)", total);

        for (i, domain) in self.found.iter().enumerate() {
            if self.policy.exists(domain).await {
                debug!("Valid domain: {}", domain);
                self.valid.insert(domain.clone());
            } else {
                warn!("Invalid domain: {}", domain);
                self.invalid.insert(domain.clone());
            }

            if i + 1 < total {
                tokio::time::sleep(DNS_QUERY_DELAY).await;
            }
        }

        info!(
            "Domain validation complete: {} valid, {} invalid",
            self.valid.len(),
            self.invalid.len()
        );
    }

    /// URLs that referenced each found domain during the last `detect`
    pub fn domain_urls(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.domain_urls
    }

    /// Valid domains of the last `detect`, filtered
    ///
    /// A domain is dropped when it contains any `exclude` fragment. When
    /// `tlds` is non-empty, only domains whose last label is listed survive.
    pub fn filter_domains(&self, exclude: &[String], tlds: &[String]) -> Vec<String> {
        filter_domains(self.valid.iter(), exclude, tlds)
    }
}

/// Filters domains by excluded fragments and an optional TLD allow list
pub fn filter_domains<'a, I>(domains: I, exclude: &[String], tlds: &[String]) -> Vec<String>
where
    I: IntoIterator<Item = &'a String>,
{
    domains
        .into_iter()
        .filter(|domain| !exclude.iter().any(|fragment| domain.contains(fragment.as_str())))
        .filter(|domain| {
            if tlds.is_empty() {
                return true;
            }
            let tld = domain.rsplit_once('.').map(|(_, tld)| tld).unwrap_or("");
            tlds.iter().any(|allowed| allowed.trim_start_matches('.') == tld)
        })
        .cloned()
        .collect()
}
