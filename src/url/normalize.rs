use crate::UrlError;
use url::Url;

/// Parses and normalizes a URL string
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Reject anything that is not `http` or `https`
/// 3. Reject URLs without a host
/// 4. Remove the fragment (everything after #)
///
/// The parser already lowercases the host and turns an empty path into `/`.
/// Query strings are kept: `?page=2` and `?page=3` are different pages.
///
/// # Examples
///
/// ```
/// use domain_spider::url::normalize_url;
///
/// let url = normalize_url("https://EXAMPLE.com/page?x=1#top").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/page?x=1");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    let url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;
    normalize_parsed(url)
}

/// Normalizes an already parsed URL
pub fn normalize_parsed(mut url: Url) -> Result<Url, UrlError> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => {}
        _ => return Err(UrlError::MissingDomain),
    }

    url.set_fragment(None);
    Ok(url)
}
