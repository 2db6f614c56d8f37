use crate::config::defaults::{DEFAULT_BLOCKED_DOMAINS, DEFAULT_EXCLUDED_EXTENSIONS};
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;

/// Main configuration structure for Domain-Spider
///
/// Every section is optional in the TOML file; missing sections fall back to
/// their `Default` implementations.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub spider: SpiderConfig,
    #[serde(default, rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub proxy: ProxyConfig,
    #[serde(default)]
    pub blocking: BlockingConfig,
}

/// Page crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Delay between same-site fetches (seconds)
    pub delay: f64,

    /// Maximum link depth followed from each seed
    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    /// Maximum number of URLs collected per crawl
    #[serde(rename = "max-urls")]
    pub max_urls: usize,

    /// Per-attempt HTTP timeout (seconds)
    pub timeout: u64,

    /// Path suffixes to skip; `None` means the built-in list
    #[serde(rename = "excluded-extensions")]
    pub excluded_extensions: Option<Vec<String>>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            delay: 1.0,
            max_depth: 2,
            max_urls: 50,
            timeout: 10,
            excluded_extensions: None,
        }
    }
}

impl CrawlerConfig {
    /// Returns the lowercased set of excluded path suffixes
    pub fn excluded_extension_set(&self) -> HashSet<String> {
        match &self.excluded_extensions {
            Some(list) => list.iter().map(|e| e.trim().to_lowercase()).collect(),
            None => DEFAULT_EXCLUDED_EXTENSIONS
                .iter()
                .map(|e| e.to_string())
                .collect(),
        }
    }

    pub fn delay_duration(&self) -> Duration {
        Duration::from_secs_f64(self.delay)
    }
}

/// Domain detector configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Delay between processed URLs (seconds)
    pub delay: f64,

    /// Per-attempt HTTP timeout, also bounds each DNS lookup (seconds)
    pub timeout: u64,

    /// Whether found domains are checked against DNS
    #[serde(rename = "validate-domains")]
    pub validate_domains: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            delay: 0.5,
            timeout: 10,
            validate_domains: true,
        }
    }
}

impl DetectorConfig {
    pub fn delay_duration(&self) -> Duration {
        Duration::from_secs_f64(self.delay)
    }
}

/// Chained (spider) crawl configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SpiderConfig {
    /// Number of levels to expand
    pub depth: u32,

    #[serde(rename = "max-domains-per-level")]
    pub max_domains_per_level: usize,

    #[serde(rename = "max-total-domains")]
    pub max_total_domains: usize,

    /// Page cap for each per-item crawl in enhanced mode
    #[serde(rename = "max-pages-per-domain")]
    pub max_pages_per_domain: usize,

    /// Pause between frontier items (seconds)
    #[serde(rename = "item-delay")]
    pub item_delay: f64,

    /// Pause between levels (seconds)
    #[serde(rename = "level-delay")]
    pub level_delay: f64,
}

impl Default for SpiderConfig {
    fn default() -> Self {
        Self {
            depth: 3,
            max_domains_per_level: 20,
            max_total_domains: 100,
            max_pages_per_domain: 50,
            item_delay: 1.0,
            level_delay: 3.0,
        }
    }
}

/// How often a random user agent is drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UserAgentRotation {
    /// A new agent for every request attempt
    #[default]
    PerRequest,
    /// One agent for the lifetime of a fetch client
    PerSession,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: Option<String>,

    /// Draw user agents from the built-in browser pool instead
    pub random: bool,

    pub rotation: UserAgentRotation,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "DomainSpider".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: None,
            random: false,
            rotation: UserAgentRotation::PerRequest,
        }
    }
}

impl UserAgentConfig {
    /// Formats the fixed identity: `Name/Version` or `Name/Version (+ContactURL)`
    pub fn identity(&self) -> String {
        match &self.contact_url {
            Some(contact) => format!(
                "{}/{} (+{})",
                self.crawler_name, self.crawler_version, contact
            ),
            None => format!("{}/{}", self.crawler_name, self.crawler_version),
        }
    }
}

/// Proxy pool configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub enabled: bool,

    /// Pick a different proxy on every retry
    pub rotation: bool,

    /// Proxy URLs (`http://`, `https://`, `socks4://`, `socks5://` or bare `host:port`)
    pub list: Vec<String>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            rotation: true,
            list: Vec::new(),
        }
    }
}

/// Host matching semantics for the block list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockingMode {
    /// Host equals the entry
    #[default]
    Exact,
    /// Host equals the entry or is one of its subdomains
    Subdomain,
    /// Entry appears anywhere in the host
    Contains,
}

impl std::str::FromStr for BlockingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "exact" => Ok(Self::Exact),
            "subdomain" => Ok(Self::Subdomain),
            "contains" => Ok(Self::Contains),
            other => Err(format!(
                "unknown blocking mode '{}', expected exact, subdomain or contains",
                other
            )),
        }
    }
}

/// Domain blocking configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BlockingConfig {
    pub enabled: bool,

    pub mode: BlockingMode,

    /// Blocked host entries
    pub domains: Vec<String>,

    /// Also block the built-in list of social, ad and video hosts
    #[serde(rename = "use-defaults")]
    pub use_defaults: bool,
}

impl BlockingConfig {
    /// Returns the configured entries plus the defaults when requested,
    /// lowercased, trimmed and deduplicated in first-seen order
    pub fn effective_domains(&self) -> Vec<String> {
        let defaults = if self.use_defaults {
            DEFAULT_BLOCKED_DOMAINS
        } else {
            &[]
        };

        let mut seen = HashSet::new();
        self.domains
            .iter()
            .map(|d| d.as_str())
            .chain(defaults.iter().copied())
            .map(|d| d.trim().to_lowercase())
            .filter(|d| !d.is_empty() && seen.insert(d.clone()))
            .collect()
    }
}
