//! Console summary of a finished run

use crate::crawler::{CrawlReport, SpiderResult};
use std::path::Path;

/// Domains listed in the console summary
const DOMAINS_SHOWN: usize = 10;

/// Pages listed in the console summary (enhanced spider only)
const PAGES_SHOWN: usize = 5;

/// The parts of any result record the summary prints
#[derive(Debug, Clone)]
pub struct RunSummary<'a> {
    pub total_domains_found: usize,
    pub total_valid_domains: usize,
    pub total_invalid_domains: usize,
    pub validation_enabled: bool,
    pub valid_domains: &'a [String],
    /// `(levels executed, domains processed)` for spider runs
    pub spider: Option<(u32, usize)>,
    pub found_pages: Option<&'a [String]>,
    pub max_pages_per_domain: Option<usize>,
    pub crawl_strategy: Option<&'a str>,
}

impl<'a> From<&'a CrawlReport> for RunSummary<'a> {
    fn from(report: &'a CrawlReport) -> Self {
        let detection = &report.detection;
        Self {
            total_domains_found: detection.total_domains_found,
            total_valid_domains: detection.total_valid_domains,
            total_invalid_domains: detection.total_invalid_domains,
            validation_enabled: detection.validation_enabled,
            valid_domains: &detection.valid_domains,
            spider: None,
            found_pages: None,
            max_pages_per_domain: None,
            crawl_strategy: None,
        }
    }
}

impl<'a> From<&'a SpiderResult> for RunSummary<'a> {
    fn from(result: &'a SpiderResult) -> Self {
        Self {
            total_domains_found: result.total_domains_found,
            total_valid_domains: result.total_valid_domains,
            total_invalid_domains: result.total_invalid_domains,
            validation_enabled: result.validation_enabled,
            valid_domains: &result.valid_domains,
            spider: Some((result.spider_depth, result.processed_domains)),
            found_pages: result.found_pages.as_deref(),
            max_pages_per_domain: result.max_pages_per_domain,
            crawl_strategy: Some(result.crawl_strategy.as_str()),
        }
    }
}

/// Formats the summary block
///
/// # Arguments
///
/// * `summary` - Counts and lists to show
/// * `excluded_extensions` - Number of extensions filtered during the run
/// * `output_path` - Where the JSON results were written
pub fn format_summary(summary: &RunSummary<'_>, excluded_extensions: usize, output_path: &Path) -> String {
    let mut out = String::new();

    out.push_str("=== Summary ===\n");
    out.push_str(&format!("  Total domains found: {}\n", summary.total_domains_found));
    out.push_str(&format!("  Valid domains: {}\n", summary.total_valid_domains));
    if summary.validation_enabled {
        out.push_str(&format!("  Invalid domains: {}\n", summary.total_invalid_domains));
    } else {
        out.push_str("  Domain validation: disabled\n");
    }
    out.push_str(&format!("  Excluded extensions: {}\n", excluded_extensions));

    if let Some(pages) = summary.found_pages {
        out.push_str(&format!("  Total pages found: {}\n", pages.len()));
    }
    if let Some((depth, processed)) = summary.spider {
        out.push_str(&format!("  Spider depth: {}\n", depth));
        out.push_str(&format!("  Domains processed: {}\n", processed));
    }
    if let Some(max_pages) = summary.max_pages_per_domain {
        out.push_str(&format!("  Max pages per domain: {}\n", max_pages));
    }
    if let Some(strategy) = summary.crawl_strategy {
        out.push_str(&format!("  Crawl strategy: {}\n", strategy));
    }

    push_list(&mut out, "Valid domains", summary.valid_domains, DOMAINS_SHOWN, "domains");
    if let Some(pages) = summary.found_pages {
        push_list(&mut out, "Found pages", pages, PAGES_SHOWN, "pages");
    }

    out.push('\n');
    out.push_str(&format!("Results saved to {}\n", output_path.display()));
    out
}

fn push_list(out: &mut String, title: &str, items: &[String], shown: usize, noun: &str) {
    if items.is_empty() {
        return;
    }

    out.push('\n');
    out.push_str(&format!("{} (first {}):\n", title, shown.min(items.len())));
    for (i, item) in items.iter().take(shown).enumerate() {
        out.push_str(&format!("  {:2}. {}\n", i + 1, item));
    }
    if items.len() > shown {
        out.push_str(&format!("  ... and {} more {}\n", items.len() - shown, noun));
    }
}

/// Prints the summary block to stdout
pub fn print_summary(summary: &RunSummary<'_>, excluded_extensions: usize, output_path: &Path) {
    println!();
    print!("{}", format_summary(summary, excluded_extensions, output_path));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::{DetectionResult, PageCrawlResult};

    fn domains(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("d{:02}.test", i)).collect()
    }

    #[test]
    fn test_report_summary_lists_first_ten() {
        let report = CrawlReport {
            detection: DetectionResult {
                total_domains_found: 12,
                total_valid_domains: 12,
                valid_domains: domains(12),
                validation_enabled: false,
                ..DetectionResult::default()
            },
            crawl_stats: PageCrawlResult::default(),
        };

        let text = format_summary(&RunSummary::from(&report), 70, Path::new("data/r.json"));

        assert!(text.contains("Valid domains: 12"));
        assert!(text.contains("Domain validation: disabled"));
        assert!(text.contains("d09.test"));
        assert!(!text.contains("d10.test"));
        assert!(text.contains("... and 2 more domains"));
        assert!(text.contains("Results saved to data/r.json"));
        assert!(!text.contains("Spider depth"));
    }

    #[test]
    fn test_enhanced_spider_summary() {
        let pages = vec![
            "https://a.test/1".to_string(),
            "https://a.test/2".to_string(),
        ];
        let result = SpiderResult {
            total_domains_found: 3,
            total_valid_domains: 2,
            total_invalid_domains: 1,
            valid_domains: domains(2),
            invalid_domains: vec!["gone.test".to_string()],
            validation_enabled: true,
            spider_depth: 2,
            processed_domains: 4,
            total_pages_found: Some(2),
            found_pages: Some(pages),
            max_pages_per_domain: Some(50),
            crawl_strategy: "enhanced_spider_both_page_and_domain".to_string(),
            ..SpiderResult::default()
        };

        let text = format_summary(&RunSummary::from(&result), 0, Path::new("out.json"));

        assert!(text.contains("Invalid domains: 1"));
        assert!(text.contains("Spider depth: 2"));
        assert!(text.contains("Domains processed: 4"));
        assert!(text.contains("Total pages found: 2"));
        assert!(text.contains("https://a.test/2"));
        assert!(!text.contains("more pages"));
    }
}
