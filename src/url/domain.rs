use url::Url;

/// Extracts the host of a URL with any leading `www.` removed
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sumi_lens::url::site_host;
///
/// let url = Url::parse("https://www.example.com/path").unwrap();
/// assert_eq!(site_host(&url), Some("example.com".to_string()));
/// ```
pub fn site_host(url: &Url) -> Option<String> {
    url.host_str().map(|h| {
        let host = h.to_lowercase();
        match host.strip_prefix("www.") {
            Some(bare) => bare.to_string(),
            None => host,
        }
    })
}

/// Whether two URLs belong to the same site
///
/// Hosts are compared without a `www.` prefix. An explicit port must match;
/// default ports count as absent, so `http` and `https` on the same host
/// are the same site.
pub fn same_site(url: &Url, root: &Url) -> bool {
    match (site_host(url), site_host(root)) {
        (Some(a), Some(b)) => a == b && url.port() == root.port(),
        _ => false,
    }
}

/// Key identifying a URL's origin, e.g. `https://example.com:8080`
pub fn origin_key(url: &Url) -> String {
    url.origin().ascii_serialization()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_site_host_strips_www() {
        assert_eq!(
            site_host(&parse("https://www.example.com/")),
            Some("example.com".to_string())
        );
        assert_eq!(
            site_host(&parse("https://blog.example.com/")),
            Some("blog.example.com".to_string())
        );
    }

    #[test]
    fn test_same_site_www_and_scheme() {
        let root = parse("https://example.com/");
        assert!(same_site(&parse("http://www.example.com/a"), &root));
        assert!(same_site(&parse("https://example.com/b"), &root));
    }

    #[test]
    fn test_same_site_rejects_subdomain_and_port() {
        let root = parse("https://example.com/");
        assert!(!same_site(&parse("https://blog.example.com/"), &root));
        assert!(!same_site(&parse("https://example.com:8443/"), &root));
        assert!(!same_site(&parse("https://example.org/"), &root));
    }

    #[test]
    fn test_same_site_with_ports() {
        let root = parse("http://127.0.0.1:4000/");
        assert!(same_site(&parse("http://127.0.0.1:4000/page"), &root));
        assert!(!same_site(&parse("http://127.0.0.1:4001/page"), &root));
    }

    #[test]
    fn test_origin_key() {
        assert_eq!(
            origin_key(&parse("https://example.com/a/b?c")),
            "https://example.com"
        );
        assert_eq!(
            origin_key(&parse("http://127.0.0.1:8080/")),
            "http://127.0.0.1:8080"
        );
    }
}
