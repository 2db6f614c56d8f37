//! HTML parser for extracting links and linked domains
//!
//! Links are read from four places:
//! - `<a href="...">`
//! - `<link href="...">`
//! - `<img src="...">`
//! - `<script src="...">`
//!
//! Every value is resolved against the page URL. Only HTTP(S) results are
//! kept.

use crate::policy::DomainPolicy;
use crate::url::{extract_domain, has_excluded_extension, normalize_parsed};
use scraper::{Html, Selector};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use url::Url;

/// Selector matching every element that carries a link, in document order
const LINK_SELECTOR: &str = "a[href], link[href], img[src], script[src]";

/// Extracts candidate URLs and linked domains from HTML
#[derive(Debug, Clone, Default)]
pub struct LinkExtractor {
    excluded_extensions: HashSet<String>,
}

impl LinkExtractor {
    /// Creates an extractor that drops URLs whose path ends with one of the
    /// given (lowercase) suffixes
    pub fn new(excluded_extensions: HashSet<String>) -> Self {
        Self {
            excluded_extensions,
        }
    }

    /// Extracts crawlable candidate URLs from a page
    ///
    /// Results are fragment-free, deduplicated and in document order.
    ///
    /// # Example
    ///
    /// ```
    /// use domain_spider::crawler::LinkExtractor;
    /// use std::collections::HashSet;
    /// use url::Url;
    ///
    /// let extractor = LinkExtractor::new([".pdf".to_string()].into_iter().collect::<HashSet<_>>());
    /// let base = Url::parse("https://example.com/").unwrap();
    /// let html = r#"<a href="/a#top">A</a><a href="/doc.pdf">Doc</a><a href="/a">Again</a>"#;
    ///
    /// let links = extractor.extract(html, &base);
    /// assert_eq!(links.len(), 1);
    /// assert_eq!(links[0].as_str(), "https://example.com/a");
    /// ```
    pub fn extract(&self, html: &str, base_url: &Url) -> Vec<Url> {
        let mut seen = HashSet::new();

        link_values(html)
            .into_iter()
            .filter_map(|raw| resolve_link(&raw, base_url))
            .filter(|url| !has_excluded_extension(url, &self.excluded_extensions))
            .filter(|url| seen.insert(url.clone()))
            .collect()
    }

    /// Extracts linked domains, each with the URLs that referenced it
    ///
    /// Domains are lowercase hosts without port. Hosts failing the hostname
    /// grammar are dropped. No extension filtering happens here: an image on
    /// a CDN still proves the CDN domain exists.
    pub fn extract_domains(&self, html: &str, base_url: &Url) -> BTreeMap<String, BTreeSet<String>> {
        let mut domains: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

        for url in link_values(html)
            .into_iter()
            .filter_map(|raw| resolve_link(&raw, base_url))
        {
            if let Some(domain) = extract_domain(&url) {
                if DomainPolicy::is_valid_format(&domain) {
                    domains.entry(domain).or_default().insert(url.to_string());
                }
            }
        }

        domains
    }
}

/// Raw link attribute values in document order
fn link_values(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);

    let Ok(selector) = Selector::parse(LINK_SELECTOR) else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|element| {
            let attr = match element.value().name() {
                "img" | "script" => "src",
                _ => "href",
            };
            element.value().attr(attr).map(str::to_string)
        })
        .collect()
}

/// Resolves a link value to an absolute, fragment-free URL
///
/// Returns None if the link should be excluded:
/// - empty values
/// - javascript:, mailto:, tel:, data: values
/// - fragment-only links (same page anchors)
/// - invalid URLs
/// - non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
    {
        return None;
    }

    let absolute = base_url.join(href).ok()?;
    normalize_parsed(absolute).ok()
}
