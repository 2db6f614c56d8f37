use url::Url;

/// Extracts the domain from a URL
///
/// Returns the lowercased host without the port. `www.` is kept: this is the
/// canonical value stored in found and valid domain sets.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use domain_spider::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM:8080/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
///
/// let url = Url::parse("https://www.example.com/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("www.example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str()
        .filter(|h| !h.is_empty())
        .map(|h| h.to_lowercase())
}

/// Host form used for block-list comparison: lowercase, no port, one leading
/// `www.` removed
pub fn blocking_host(url: &Url) -> Option<String> {
    extract_domain(url).map(|host| {
        host.strip_prefix("www.")
            .map(str::to_string)
            .unwrap_or(host)
    })
}

/// Returns true when both URLs share host and explicit port
///
/// Scheme is ignored and default ports compare equal to no port, so
/// `http://a.test/` and `https://a.test:443/` are the same site.
pub fn same_site(a: &Url, b: &Url) -> bool {
    extract_domain(a) == extract_domain(b) && a.port() == b.port()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_extract_simple_domain() {
        assert_eq!(
            extract_domain(&url("https://example.com/")),
            Some("example.com".to_string())
        );
    }

    #[test]
    fn test_extract_nested_subdomain() {
        assert_eq!(
            extract_domain(&url("https://api.v2.example.com/endpoint")),
            Some("api.v2.example.com".to_string())
        );
    }

    #[test]
    fn test_extract_strips_port() {
        assert_eq!(
            extract_domain(&url("http://127.0.0.1:8080/")),
            Some("127.0.0.1".to_string())
        );
    }

    #[test]
    fn test_extract_mixed_case() {
        assert_eq!(
            extract_domain(&url("https://Example.COM/")),
            Some("example.com".to_string())
        );
    }

    #[test]
    fn test_blocking_host_strips_single_www() {
        assert_eq!(
            blocking_host(&url("https://WWW.Example.com:443/x")),
            Some("example.com".to_string())
        );
        assert_eq!(
            blocking_host(&url("https://www.www.example.com/")),
            Some("www.example.com".to_string())
        );
        assert_eq!(
            blocking_host(&url("https://wwwexample.com/")),
            Some("wwwexample.com".to_string())
        );
    }

    #[test]
    fn test_same_site() {
        assert!(same_site(
            &url("https://a.test/x"),
            &url("https://a.test/y?z=1")
        ));
        assert!(same_site(&url("https://a.test/"), &url("https://a.test:443/")));
        assert!(same_site(&url("https://a.test/"), &url("http://a.test/")));
        assert!(!same_site(&url("https://a.test/"), &url("https://b.a.test/")));
        assert!(!same_site(
            &url("http://127.0.0.1:4000/"),
            &url("http://127.0.0.1:4001/")
        ));
    }
}
