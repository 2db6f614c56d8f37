//! Proxy pool with failure tracking
//!
//! The pool hands out a random usable proxy. Entries that fail are never
//! picked again by the same pool. Once every entry has failed, proxying is
//! switched off for the rest of the pool's life.

use crate::config::ProxyConfig;
use rand::seq::SliceRandom;
use std::collections::HashSet;
use tracing::{debug, info, warn};
use url::Url;

const PROXY_SCHEMES: &[&str] = &["http", "https", "socks4", "socks5", "socks5h"];

/// Turns a proxy list entry into a URL
///
/// Accepts `http://`, `https://`, `socks4://`, `socks5://` and `socks5h://`
/// URLs. A bare `host:port` is treated as `http://host:port`.
///
/// # Examples
///
/// ```
/// use domain_spider::crawler::normalize_proxy_url;
///
/// let proxy = normalize_proxy_url("10.0.0.1:3128").unwrap();
/// assert_eq!(proxy.as_str(), "http://10.0.0.1:3128/");
///
/// assert!(normalize_proxy_url("socks5://127.0.0.1:9050").is_ok());
/// assert!(normalize_proxy_url("ftp://proxy.test:21").is_err());
/// ```
pub fn normalize_proxy_url(entry: &str) -> Result<Url, String> {
    let entry = entry.trim();
    if entry.is_empty() {
        return Err("proxy entry is empty".to_string());
    }

    let candidate = if entry.contains("://") {
        entry.to_string()
    } else {
        format!("http://{}", entry)
    };

    let url = Url::parse(&candidate).map_err(|e| format!("'{}': {}", entry, e))?;

    if !PROXY_SCHEMES.contains(&url.scheme()) {
        return Err(format!(
            "'{}': unsupported proxy scheme '{}'",
            entry,
            url.scheme()
        ));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(format!("'{}': missing proxy host", entry));
    }

    Ok(url)
}

/// Random proxy selection over a list with a growing failed set
#[derive(Debug, Default)]
pub struct ProxyPool {
    entries: Vec<String>,
    failed: HashSet<String>,
    current: Option<String>,
    enabled: bool,
    rotation: bool,
}

impl ProxyPool {
    pub fn from_config(config: &ProxyConfig) -> Self {
        let entries: Vec<String> = config
            .list
            .iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();

        let mut enabled = config.enabled;
        if enabled && entries.is_empty() {
            warn!("Proxy use requested but the proxy list is empty, connecting directly");
            enabled = false;
        } else if enabled {
            info!("Proxy mode enabled: {} proxies available", entries.len());
        }

        Self {
            entries,
            failed: HashSet::new(),
            current: None,
            enabled,
            rotation: config.rotation,
        }
    }

    /// True while proxies are still in use
    pub fn is_active(&self) -> bool {
        self.enabled
    }

    /// True when a new proxy should be drawn before every retry
    pub fn rotates(&self) -> bool {
        self.enabled && self.rotation
    }

    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    /// Picks a random entry outside the failed set and makes it current
    ///
    /// `accept` turns the chosen entry into whatever the caller needs (a
    /// rebuilt HTTP client, typically); entries it rejects are marked failed
    /// and another one is drawn. Returns `None` and disables the pool once no
    /// entry is left.
    pub fn select<T, F>(&mut self, mut accept: F) -> Option<T>
    where
        F: FnMut(&Url) -> Result<T, String>,
    {
        loop {
            if !self.enabled {
                return None;
            }

            let available: Vec<&String> = self
                .entries
                .iter()
                .filter(|p| !self.failed.contains(*p))
                .collect();

            let Some(choice) = available.choose(&mut rand::thread_rng()).map(|p| p.to_string())
            else {
                warn!("All proxies have failed, continuing without a proxy");
                self.enabled = false;
                self.current = None;
                return None;
            };

            let accepted = normalize_proxy_url(&choice).and_then(|url| accept(&url));
            match accepted {
                Ok(value) => {
                    debug!("Proxy selected: {}", choice);
                    self.current = Some(choice);
                    return Some(value);
                }
                Err(e) => {
                    warn!("Unusable proxy {}: {}", choice, e);
                    self.failed.insert(choice);
                }
            }
        }
    }

    /// Adds the current proxy to the failed set
    pub fn mark_current_failed(&mut self) {
        if let Some(current) = self.current.take() {
            warn!("Proxy marked as failed: {}", current);
            self.failed.insert(current);
        }
    }
}
