use crate::config::BlockingMode;

/// Checks whether a host matches one block-list entry under the given mode
///
/// Both arguments are expected to be normalized already (lowercase, no port,
/// leading `www.` removed from the host).
///
/// # Examples
///
/// ```
/// use domain_spider::config::BlockingMode;
/// use domain_spider::url::matches_entry;
///
/// assert!(matches_entry(BlockingMode::Exact, "example.com", "example.com"));
/// assert!(!matches_entry(BlockingMode::Exact, "example.com", "a.example.com"));
///
/// assert!(matches_entry(BlockingMode::Subdomain, "example.com", "a.example.com"));
/// assert!(!matches_entry(BlockingMode::Subdomain, "example.com", "notexample.com"));
///
/// assert!(matches_entry(BlockingMode::Contains, "example.com", "example.com.tr"));
/// ```
pub fn matches_entry(mode: BlockingMode, entry: &str, host: &str) -> bool {
    match mode {
        BlockingMode::Exact => host == entry,
        BlockingMode::Subdomain => {
            host == entry
                || (host.len() > entry.len()
                    && host.ends_with(entry)
                    && host.as_bytes()[host.len() - entry.len() - 1] == b'.')
        }
        BlockingMode::Contains => host.contains(entry),
    }
}
