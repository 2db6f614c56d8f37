//! Configuration module for Domain-Spider
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every section is optional; the command line overrides whatever the file sets.
//!
//! # Example
//!
//! ```no_run
//! use domain_spider::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("spider.toml")).unwrap();
//! println!("Crawler will use max depth: {}", config.crawler.max_depth);
//! ```

pub mod defaults;
mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    BlockingConfig, BlockingMode, Config, CrawlerConfig, DetectorConfig, ProxyConfig,
    SpiderConfig, UserAgentConfig, UserAgentRotation,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, load_list_file};
pub use validation::validate;
