//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients, optionally routed through a proxy
//! - User agent selection (fixed identity or random browser agents)
//! - GET requests gated on an HTML Content-Type
//! - Retry logic with proxy rotation for transient failures
//! - Error classification

use crate::config::defaults::RANDOM_USER_AGENTS;
use crate::config::{Config, ProxyConfig, UserAgentConfig, UserAgentRotation};
use crate::crawler::proxy::ProxyPool;
use crate::SpiderError;
use rand::seq::SliceRandom;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, Proxy, Response, StatusCode};
use std::time::Duration;
use tracing::{debug, error, warn};
use url::Url;

/// Attempts per `fetch` call
pub const MAX_ATTEMPTS: usize = 3;

/// Source of page bodies
///
/// The page crawler, domain detector and spider only need "give me the HTML
/// behind this URL, or nothing". `FetchClient` is the HTTP implementation.
#[allow(async_fn_in_trait)]
pub trait Fetch {
    /// Returns the body of an HTML page, or `None` for anything else
    async fn fetch(&mut self, url: &Url) -> Option<String>;
}

impl<F: Fetch + ?Sized> Fetch for &mut F {
    async fn fetch(&mut self, url: &Url) -> Option<String> {
        (**self).fetch(url).await
    }
}

/// Outcome of a single request attempt
#[derive(Debug)]
pub enum FetchResult {
    /// HTML body received
    Success { body: String },

    /// Response was not HTML
    ContentMismatch { content_type: String },

    /// Status that is worth another attempt (5xx, 429)
    RetryableStatus { status_code: u16 },

    /// Status that ends the call
    HttpError { status_code: u16 },

    /// The proxy refused or broke the connection
    ProxyError { error: String },

    /// The attempt ran out of time
    Timeout,

    /// Any other transport failure
    NetworkError { error: String },
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `user_agent` - Default user agent; requests may override it per call
/// * `timeout` - Per-request timeout
/// * `proxy` - Optional proxy that all traffic is routed through
///
/// # Example
///
/// ```no_run
/// use domain_spider::crawler::build_http_client;
/// use std::time::Duration;
///
/// let client = build_http_client("DomainSpider/0.1.0", Duration::from_secs(10), None).unwrap();
/// ```
pub fn build_http_client(
    user_agent: &str,
    timeout: Duration,
    proxy: Option<&Url>,
) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(timeout)
        .gzip(true)
        .brotli(true);

    if let Some(proxy) = proxy {
        builder = builder.proxy(Proxy::all(proxy.as_str())?);
    }

    builder.build()
}

/// HTTP fetch client with user agent selection and a proxy pool
///
/// Each instance owns its proxy failure state; nothing is shared between
/// clients.
#[derive(Debug)]
pub struct FetchClient {
    client: Client,
    timeout: Duration,
    user_agent: UserAgentConfig,
    session_agent: Option<String>,
    proxies: ProxyPool,
    /// True while `client` is bound to a proxy
    proxied: bool,
}

impl FetchClient {
    /// Creates a client with the given per-attempt timeout
    pub fn new(
        timeout: Duration,
        user_agent: &UserAgentConfig,
        proxy: &ProxyConfig,
    ) -> Result<Self, SpiderError> {
        let identity = user_agent.identity();
        let session_agent = match (user_agent.random, user_agent.rotation) {
            (true, UserAgentRotation::PerSession) => Some(random_user_agent()),
            _ => None,
        };

        let mut fetcher = Self {
            client: build_http_client(&identity, timeout, None)?,
            timeout,
            user_agent: user_agent.clone(),
            session_agent,
            proxies: ProxyPool::from_config(proxy),
            proxied: false,
        };

        if fetcher.proxies.is_active() {
            fetcher.switch_proxy();
        }

        Ok(fetcher)
    }

    /// Client for the page crawler (`[crawler].timeout`)
    pub fn for_crawler(config: &Config) -> Result<Self, SpiderError> {
        Self::new(
            Duration::from_secs(config.crawler.timeout),
            &config.user_agent,
            &config.proxy,
        )
    }

    /// Client for the domain detector (`[detector].timeout`)
    pub fn for_detector(config: &Config) -> Result<Self, SpiderError> {
        Self::new(
            Duration::from_secs(config.detector.timeout),
            &config.user_agent,
            &config.proxy,
        )
    }

    /// Proxy currently in use, if any
    pub fn current_proxy(&self) -> Option<&str> {
        self.proxies.current()
    }

    /// User agent for the next attempt
    fn next_user_agent(&self) -> String {
        if !self.user_agent.random {
            return self.user_agent.identity();
        }
        match &self.session_agent {
            Some(agent) => agent.clone(),
            None => random_user_agent(),
        }
    }

    /// Draws a new proxy and rebuilds the client around it
    ///
    /// Falls back to a direct client once the pool is exhausted.
    fn switch_proxy(&mut self) {
        let identity = self.user_agent.identity();
        let timeout = self.timeout;

        let rebuilt = self.proxies.select(|proxy| {
            build_http_client(&identity, timeout, Some(proxy)).map_err(|e| e.to_string())
        });

        match rebuilt {
            Some(client) => {
                self.client = client;
                self.proxied = true;
            }
            None => match build_http_client(&identity, timeout, None) {
                Ok(client) => {
                    self.client = client;
                    self.proxied = false;
                }
                Err(e) => error!("Failed to rebuild direct HTTP client: {}", e),
            },
        }
    }

    /// Performs one GET request and classifies the outcome
    async fn attempt(&self, url: &Url, user_agent: &str) -> FetchResult {
        match self
            .client
            .get(url.clone())
            .header(USER_AGENT, user_agent)
            .send()
            .await
        {
            Ok(response) => self.classify_response(response).await,
            Err(e) => self.classify_error(e),
        }
    }

    async fn classify_response(&self, response: Response) -> FetchResult {
        let status = response.status();

        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            return FetchResult::RetryableStatus {
                status_code: status.as_u16(),
            };
        }

        if !status.is_success() {
            return FetchResult::HttpError {
                status_code: status.as_u16(),
            };
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_lowercase();

        if !content_type.contains("text/html") {
            return FetchResult::ContentMismatch { content_type };
        }

        match response.text().await {
            Ok(body) => FetchResult::Success { body },
            Err(e) => self.classify_error(e),
        }
    }

    fn classify_error(&self, e: reqwest::Error) -> FetchResult {
        if e.is_timeout() {
            return FetchResult::Timeout;
        }

        let message = e.to_string();
        let proxy_related = self.proxied
            && (e.is_connect() || message.to_lowercase().contains("proxy"));

        if proxy_related {
            FetchResult::ProxyError { error: message }
        } else {
            FetchResult::NetworkError { error: message }
        }
    }
}

impl Fetch for FetchClient {
    /// Fetches a URL with retry logic
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | Non-HTML Content-Type | Immediate `None` |
    /// | HTTP 5xx / 429 | Retry |
    /// | Other HTTP error | Immediate `None` |
    /// | Proxy failure | Mark proxy failed, switch now, retry |
    /// | Timeout | Switch proxy if proxying, retry |
    /// | Other transport error | Retry |
    ///
    /// With rotation enabled a new proxy is drawn before every retry. A
    /// failed proxy is replaced at once, so the next call never starts on it;
    /// an exhausted pool leaves the client connecting directly.
    async fn fetch(&mut self, url: &Url) -> Option<String> {
        let mut switch_before_retry = false;

        for attempt in 1..=MAX_ATTEMPTS {
            if switch_before_retry {
                self.switch_proxy();
            }
            switch_before_retry = self.proxies.rotates();

            let user_agent = self.next_user_agent();
            match self.attempt(url, &user_agent).await {
                FetchResult::Success { body } => {
                    debug!("Fetched {} ({} bytes)", url, body.len());
                    return Some(body);
                }
                FetchResult::ContentMismatch { content_type } => {
                    debug!("Skipping non-HTML content at {}: {}", url, content_type);
                    return None;
                }
                FetchResult::HttpError { status_code } => {
                    debug!("HTTP {} for {}", status_code, url);
                    return None;
                }
                FetchResult::RetryableStatus { status_code } => {
                    warn!(
                        "HTTP {} for {} (attempt {}/{})",
                        status_code, url, attempt, MAX_ATTEMPTS
                    );
                }
                FetchResult::ProxyError { error: message } => {
                    warn!(
                        "Proxy error for {} (attempt {}/{}): {}",
                        url, attempt, MAX_ATTEMPTS, message
                    );
                    self.proxies.mark_current_failed();
                    self.switch_proxy();
                    switch_before_retry = false;
                    if attempt == MAX_ATTEMPTS {
                        error!("All proxy attempts failed for {}", url);
                    }
                }
                FetchResult::Timeout => {
                    warn!("Timeout for {} (attempt {}/{})", url, attempt, MAX_ATTEMPTS);
                    switch_before_retry = self.proxies.is_active();
                }
                FetchResult::NetworkError { error: message } => {
                    warn!(
                        "Failed to fetch {} (attempt {}/{}): {}",
                        url, attempt, MAX_ATTEMPTS, message
                    );
                }
            }
        }

        None
    }
}

fn random_user_agent() -> String {
    RANDOM_USER_AGENTS
        .choose(&mut rand::thread_rng())
        .map(|ua| ua.to_string())
        .unwrap_or_default()
}
