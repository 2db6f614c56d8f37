//! URL handling module for Domain-Spider
//!
//! This module provides URL normalization, domain extraction, block-list
//! matching, extension filtering and same-site comparison.

mod domain;
mod matcher;
mod normalize;

use crate::UrlError;
use std::collections::HashSet;
use url::Url;

// Re-export main functions
pub use domain::{blocking_host, extract_domain, same_site};
pub use matcher::matches_entry;
pub use normalize::{normalize_parsed, normalize_url};

/// Checks if the URL path ends with one of the excluded suffixes
///
/// Only the path is inspected; query and fragment never trigger exclusion.
/// Suffixes are expected lowercase, the path is lowercased before matching.
///
/// # Examples
///
/// ```
/// use std::collections::HashSet;
/// use url::Url;
/// use domain_spider::url::has_excluded_extension;
///
/// let excluded: HashSet<String> = [".pdf".to_string()].into_iter().collect();
/// let url = Url::parse("https://a.test/Report.PDF").unwrap();
/// assert!(has_excluded_extension(&url, &excluded));
///
/// let url = Url::parse("https://a.test/view?file=report.pdf").unwrap();
/// assert!(!has_excluded_extension(&url, &excluded));
/// ```
pub fn has_excluded_extension(url: &Url, excluded: &HashSet<String>) -> bool {
    if excluded.is_empty() {
        return false;
    }

    let path = url.path().to_lowercase();
    excluded.iter().any(|ext| path.ends_with(ext.as_str()))
}

/// Parses, normalizes and extension-checks a seed or candidate URL string
///
/// # Returns
///
/// * `Ok(Url)` - The normalized URL, safe to fetch
/// * `Err(UrlError)` - Malformed, non-HTTP(S), host-less or excluded
pub fn parse_crawlable(url_str: &str, excluded: &HashSet<String>) -> Result<Url, UrlError> {
    let url = normalize_url(url_str)?;
    if has_excluded_extension(&url, excluded) {
        return Err(UrlError::ExcludedExtension(url.to_string()));
    }
    Ok(url)
}
