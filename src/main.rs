//! Domain-Spider main entry point
//!
//! This is the command-line interface for the Domain-Spider crawler.

use anyhow::Context;
use clap::Parser;
use domain_spider::config::{
    load_config_with_hash, load_list_file, validate, Config, UserAgentRotation,
};
use domain_spider::crawler::{crawl_and_detect, Spider, SpiderMode};
use domain_spider::output::{print_summary, save_results, RunSummary};
use domain_spider::BlockingMode;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Exit status after Ctrl-C
const INTERRUPTED: u8 = 130;

/// Domain-Spider: a chained domain discovery crawler
///
/// Crawls the seed URLs, collects every domain their pages link to and
/// optionally keeps going level by level from the newly found domains.
#[derive(Parser, Debug)]
#[command(name = "domain-spider")]
#[command(version)]
#[command(about = "A chained domain discovery crawler", long_about = None)]
struct Cli {
    /// Seed URLs
    #[arg(value_name = "URL", required = true)]
    urls: Vec<String>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Chain the crawl across newly found domains
    #[arg(long, conflicts_with = "enhanced_spider")]
    spider: bool,

    /// Chain the crawl across newly found domains and pages
    #[arg(long)]
    enhanced_spider: bool,

    /// Number of spider levels
    #[arg(long, value_name = "N")]
    spider_depth: Option<u32>,

    /// Maximum frontier size per spider level
    #[arg(long, value_name = "N")]
    spider_domains_per_level: Option<usize>,

    /// Stop once this many domains are known
    #[arg(long, value_name = "N")]
    spider_max_domains: Option<usize>,

    /// Page cap for each item in enhanced spider mode
    #[arg(long, value_name = "N")]
    spider_max_pages_per_domain: Option<usize>,

    /// Seconds between same-site page fetches
    #[arg(long, value_name = "SECONDS")]
    crawler_delay: Option<f64>,

    /// Link depth followed from each seed
    #[arg(long, value_name = "N")]
    crawler_depth: Option<u32>,

    /// Maximum URLs collected by the page crawler
    #[arg(long, value_name = "N")]
    crawler_max_urls: Option<usize>,

    /// Seconds between detector page fetches
    #[arg(long, value_name = "SECONDS")]
    detector_delay: Option<f64>,

    /// Detector HTTP timeout in seconds
    #[arg(long, value_name = "SECONDS")]
    detector_timeout: Option<u64>,

    /// Skip DNS validation of found domains
    #[arg(long)]
    no_validation: bool,

    /// Path suffixes to skip (e.g. .pdf .jpg)
    #[arg(long, num_args = 0.., value_name = "EXT", conflicts_with = "include_all_extensions")]
    exclude_extensions: Option<Vec<String>>,

    /// Do not filter any file extension
    #[arg(long)]
    include_all_extensions: bool,

    /// Draw a random browser user agent for every request
    #[arg(long)]
    random_user_agent: bool,

    /// Draw one random browser user agent per client
    #[arg(long)]
    random_user_agent_per_session: bool,

    /// Proxies to route requests through
    #[arg(long, num_args = 0.., value_name = "PROXY")]
    proxy: Option<Vec<String>>,

    /// File with one proxy per line
    #[arg(long, value_name = "FILE")]
    proxy_file: Option<PathBuf>,

    /// Keep the same proxy across retries
    #[arg(long)]
    no_proxy_rotation: bool,

    /// Hosts to block
    #[arg(long, num_args = 0.., value_name = "DOMAIN")]
    block_domains: Option<Vec<String>>,

    /// File with one blocked host per line
    #[arg(long, value_name = "FILE")]
    block_domains_file: Option<PathBuf>,

    /// Also block the built-in social, ad and video hosts
    #[arg(long)]
    use_default_blocked_domains: bool,

    /// How block entries match hosts: exact, subdomain or contains
    #[arg(long, value_name = "MODE")]
    blocking_mode: Option<BlockingMode>,

    /// Result file name (placed under data/) or absolute path
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = match build_config(&cli) {
        Ok(config) => Arc::new(config),
        Err(e) => {
            error!("Failed to load configuration: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    tokio::select! {
        result = run(&cli, config) => match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!("Run failed: {:#}", e);
                ExitCode::FAILURE
            }
        },
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted by user, partial results discarded");
            ExitCode::from(INTERRUPTED)
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("domain_spider=info,warn"),
            1 => EnvFilter::new("domain_spider=debug,info"),
            2 => EnvFilter::new("domain_spider=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads the optional config file, then applies command-line overrides
fn build_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("cannot use {}", path.display()))?;
            info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => Config::default(),
    };

    // Spider
    if let Some(depth) = cli.spider_depth {
        config.spider.depth = depth;
    }
    if let Some(per_level) = cli.spider_domains_per_level {
        config.spider.max_domains_per_level = per_level;
    }
    if let Some(max) = cli.spider_max_domains {
        config.spider.max_total_domains = max;
    }
    if let Some(pages) = cli.spider_max_pages_per_domain {
        config.spider.max_pages_per_domain = pages;
    }

    // Page crawler
    if let Some(delay) = cli.crawler_delay {
        config.crawler.delay = delay;
    }
    if let Some(depth) = cli.crawler_depth {
        config.crawler.max_depth = depth;
    }
    if let Some(max_urls) = cli.crawler_max_urls {
        config.crawler.max_urls = max_urls;
    }
    if cli.include_all_extensions {
        config.crawler.excluded_extensions = Some(Vec::new());
    } else if let Some(extensions) = &cli.exclude_extensions {
        config.crawler.excluded_extensions = Some(extensions.clone());
    }

    // Detector
    if let Some(delay) = cli.detector_delay {
        config.detector.delay = delay;
    }
    if let Some(timeout) = cli.detector_timeout {
        config.detector.timeout = timeout;
    }
    if cli.no_validation {
        config.detector.validate_domains = false;
    }

    // User agent
    if cli.random_user_agent_per_session {
        config.user_agent.random = true;
        config.user_agent.rotation = UserAgentRotation::PerSession;
    } else if cli.random_user_agent {
        config.user_agent.random = true;
        config.user_agent.rotation = UserAgentRotation::PerRequest;
    }

    // Proxies
    if let Some(proxies) = &cli.proxy {
        config.proxy.list.extend(proxies.iter().cloned());
        config.proxy.enabled = true;
    }
    if let Some(path) = &cli.proxy_file {
        let proxies = load_list_file(path)
            .with_context(|| format!("cannot read proxy file {}", path.display()))?;
        info!("Loaded {} proxies from {}", proxies.len(), path.display());
        config.proxy.list.extend(proxies);
        config.proxy.enabled = true;
    }
    if cli.no_proxy_rotation {
        config.proxy.rotation = false;
    }

    // Blocking
    if let Some(domains) = &cli.block_domains {
        config.blocking.domains.extend(domains.iter().cloned());
        config.blocking.enabled = true;
    }
    if let Some(path) = &cli.block_domains_file {
        let domains = load_list_file(path)
            .with_context(|| format!("cannot read block list {}", path.display()))?;
        info!("Loaded {} blocked domains from {}", domains.len(), path.display());
        config.blocking.domains.extend(domains);
        config.blocking.enabled = true;
    }
    if cli.use_default_blocked_domains {
        config.blocking.use_defaults = true;
        config.blocking.enabled = true;
    }
    if let Some(mode) = cli.blocking_mode {
        config.blocking.mode = mode;
    }

    validate(&config).context("invalid settings")?;
    Ok(config)
}

/// Runs the selected mode, then saves and summarizes the results
async fn run(cli: &Cli, config: Arc<Config>) -> anyhow::Result<()> {
    log_settings(cli, &config);
    let started = Instant::now();

    let mut excluded: Vec<String> = config.crawler.excluded_extension_set().into_iter().collect();
    excluded.sort();

    if cli.enhanced_spider || cli.spider {
        let mode = if cli.enhanced_spider {
            SpiderMode::Enhanced
        } else {
            SpiderMode::Basic
        };
        let result = Spider::http(config.clone(), mode).run(&cli.urls).await;
        finish(
            &result,
            RunSummary::from(&result),
            cli.output.as_deref(),
            started.elapsed(),
            &excluded,
        )
    } else {
        let report = crawl_and_detect(config.clone(), &cli.urls).await?;
        finish(
            &report,
            RunSummary::from(&report),
            cli.output.as_deref(),
            started.elapsed(),
            &excluded,
        )
    }
}

fn finish<T: Serialize>(
    results: &T,
    summary: RunSummary<'_>,
    output: Option<&Path>,
    elapsed: Duration,
    excluded: &[String],
) -> anyhow::Result<()> {
    info!("Total run time: {:.2} seconds", elapsed.as_secs_f64());

    let path = save_results(results, output, elapsed, excluded).context("failed to save results")?;
    info!("Results saved to {}", path.display());

    print_summary(&summary, excluded.len(), &path);
    Ok(())
}

fn log_settings(cli: &Cli, config: &Config) {
    let mode = if cli.enhanced_spider {
        "enhanced spider"
    } else if cli.spider {
        "spider"
    } else {
        "normal"
    };
    info!("Starting {} crawl with {} seed URL(s)", mode, cli.urls.len());

    if config.user_agent.random {
        info!("Random user agents: {:?}", config.user_agent.rotation);
    } else {
        info!("User agent: {}", config.user_agent.identity());
    }

    if config.proxy.enabled {
        info!(
            "Proxies: {} configured, rotation {}",
            config.proxy.list.len(),
            if config.proxy.rotation { "on" } else { "off" }
        );
    }

    if config.blocking.enabled {
        info!(
            "Domain blocking ({:?}): {} entries",
            config.blocking.mode,
            config.blocking.effective_domains().len()
        );
    }

    match &config.crawler.excluded_extensions {
        Some(list) if list.is_empty() => info!("All file extensions included"),
        Some(list) => info!("Excluded extensions: {:?}", list),
        None => info!(
            "Using the built-in excluded extension list ({} entries)",
            config.crawler.excluded_extension_set().len()
        ),
    }
}
