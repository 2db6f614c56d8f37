//! Domain policy: block list matching, hostname grammar and DNS existence
//!
//! A `DomainPolicy` is built once from the configuration and shared read-only
//! by the page crawler and the domain detector.

use crate::config::Config;
use crate::url::{blocking_host, matches_entry};
use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;
use tokio::net::lookup_host;
use tracing::debug;
use url::Url;

pub use crate::config::BlockingMode;

/// RFC 1123 style hostname: dot-separated labels of 1-63 alphanumerics and
/// inner hyphens
const HOSTNAME_PATTERN: &str =
    r"^[a-zA-Z0-9]([a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(\.[a-zA-Z0-9]([a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$";

fn hostname_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(HOSTNAME_PATTERN).expect("hostname pattern is a valid regex"))
}

/// Decides which hosts are blocked and which domains exist
#[derive(Debug, Clone)]
pub struct DomainPolicy {
    enabled: bool,
    mode: BlockingMode,
    blocked: Vec<String>,
    dns_timeout: Duration,
}

impl Default for DomainPolicy {
    fn default() -> Self {
        Self::disabled()
    }
}

impl DomainPolicy {
    /// Creates a policy from explicit parts
    ///
    /// Entries are trimmed and lowercased; blank entries are dropped.
    pub fn new(enabled: bool, mode: BlockingMode, blocked: Vec<String>, dns_timeout: Duration) -> Self {
        let blocked = blocked
            .into_iter()
            .map(|d| d.trim().to_lowercase())
            .filter(|d| !d.is_empty())
            .collect();

        Self {
            enabled,
            mode,
            blocked,
            dns_timeout,
        }
    }

    /// A policy that blocks nothing
    pub fn disabled() -> Self {
        Self::new(false, BlockingMode::Exact, Vec::new(), Duration::from_secs(10))
    }

    /// Builds the policy from the `[blocking]` and `[detector]` sections
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.blocking.enabled,
            config.blocking.mode,
            config.blocking.effective_domains(),
            Duration::from_secs(config.detector.timeout),
        )
    }

    pub fn mode(&self) -> BlockingMode {
        self.mode
    }

    /// Number of entries actually used for matching
    pub fn blocked_count(&self) -> usize {
        if self.enabled {
            self.blocked.len()
        } else {
            0
        }
    }

    /// Returns true if the URL's host matches a block-list entry
    ///
    /// The host is lowercased, its port dropped and one leading `www.`
    /// removed before matching. URLs without a host are never blocked.
    pub fn is_blocked(&self, url: &Url) -> bool {
        if !self.enabled || self.blocked.is_empty() {
            return false;
        }

        let Some(host) = blocking_host(url) else {
            return false;
        };

        self.blocked
            .iter()
            .any(|entry| matches_entry(self.mode, entry, &host))
    }

    /// String variant of [`is_blocked`](Self::is_blocked); unparseable input
    /// is not blocked
    pub fn is_blocked_str(&self, url: &str) -> bool {
        Url::parse(url).map(|u| self.is_blocked(&u)).unwrap_or(false)
    }

    /// Checks hostname syntax
    pub fn is_valid_format(domain: &str) -> bool {
        !domain.is_empty() && domain.len() <= 253 && hostname_regex().is_match(domain)
    }

    /// Resolves the domain, bounded by the configured timeout
    ///
    /// Any failure (bad syntax, no records, resolver error, timeout) yields
    /// `false`.
    pub async fn exists(&self, domain: &str) -> bool {
        if !Self::is_valid_format(domain) {
            return false;
        }

        match tokio::time::timeout(self.dns_timeout, lookup_host((domain, 80))).await {
            Ok(Ok(mut addrs)) => addrs.next().is_some(),
            Ok(Err(e)) => {
                debug!("DNS lookup failed for {}: {}", domain, e);
                false
            }
            Err(_) => {
                debug!("DNS lookup timed out for {}", domain);
                false
            }
        }
    }
}
