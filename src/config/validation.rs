use crate::config::types::{
    BlockingConfig, BlockingMode, Config, CrawlerConfig, DetectorConfig, ProxyConfig,
    SpiderConfig, UserAgentConfig,
};
use crate::crawler::normalize_proxy_url;
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_detector_config(&config.detector)?;
    validate_spider_config(&config.spider)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_proxy_config(&config.proxy)?;
    validate_blocking_config(&config.blocking)?;
    Ok(())
}

/// Validates page crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    validate_delay("crawler.delay", config.delay)?;
    validate_timeout("crawler.timeout", config.timeout)?;

    if config.max_urls < 1 {
        return Err(ConfigError::Validation(format!(
            "crawler.max_urls must be >= 1, got {}",
            config.max_urls
        )));
    }

    if let Some(extensions) = &config.excluded_extensions {
        for ext in extensions {
            let ext = ext.trim();
            if ext.len() < 2 || !ext.starts_with('.') {
                return Err(ConfigError::Validation(format!(
                    "excluded extension '{}' must start with '.' and name a suffix",
                    ext
                )));
            }
        }
    }

    Ok(())
}

fn validate_detector_config(config: &DetectorConfig) -> Result<(), ConfigError> {
    validate_delay("detector.delay", config.delay)?;
    validate_timeout("detector.timeout", config.timeout)
}

fn validate_spider_config(config: &SpiderConfig) -> Result<(), ConfigError> {
    // Zero caps are legal: they make the spider stop before the first level.
    validate_delay("spider.item_delay", config.item_delay)?;
    validate_delay("spider.level_delay", config.level_delay)?;

    if config.max_pages_per_domain < 1 {
        return Err(ConfigError::Validation(format!(
            "spider.max_pages_per_domain must be >= 1, got {}",
            config.max_pages_per_domain
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    if let Some(contact) = &config.contact_url {
        Url::parse(contact)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;
    }

    Ok(())
}

fn validate_proxy_config(config: &ProxyConfig) -> Result<(), ConfigError> {
    for entry in &config.list {
        normalize_proxy_url(entry).map_err(ConfigError::InvalidProxy)?;
    }
    Ok(())
}

/// Validates block list entries against the selected matching mode
fn validate_blocking_config(config: &BlockingConfig) -> Result<(), ConfigError> {
    for entry in &config.domains {
        let entry = entry.trim();
        match config.mode {
            // A fragment such as "tracker" is a useful substring entry.
            BlockingMode::Contains => validate_domain_chars(entry)?,
            BlockingMode::Exact | BlockingMode::Subdomain => validate_domain_string(entry)?,
        }
    }
    Ok(())
}

fn validate_delay(name: &str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ConfigError::Validation(format!(
            "{} must be a non-negative number of seconds, got {}",
            name, value
        )));
    }
    Ok(())
}

fn validate_timeout(name: &str, value: u64) -> Result<(), ConfigError> {
    if value < 1 {
        return Err(ConfigError::Validation(format!(
            "{} must be >= 1 second, got {}",
            name, value
        )));
    }
    Ok(())
}

fn validate_domain_chars(domain: &str) -> Result<(), ConfigError> {
    if domain.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Domain cannot be empty".to_string(),
        ));
    }

    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    Ok(())
}

/// Validates a full domain string
fn validate_domain_string(domain: &str) -> Result<(), ConfigError> {
    validate_domain_chars(domain)?;

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            domain
        )));
    }

    if domain.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Domain '{}' cannot contain consecutive dots",
            domain
        )));
    }

    Ok(())
}
