use crate::UrlError;
use url::Url;

/// Normalizes a URL according to Sumi-Lens's canonicalization rules
///
/// # Normalization Steps
///
/// 1. Resolve `raw` against `base` when one is given; reject if malformed
/// 2. Accept only `http` and `https`
/// 3. Lowercase scheme and host, drop default ports (done by the parser)
/// 4. Remove fragment (everything after #)
/// 5. Normalize path:
///    - Remove dot segments (. and ..)
///    - Collapse duplicate slashes
///    - Remove trailing slash (except for root /)
/// 6. Remove an empty query string (trailing ?)
///
/// The host keeps any `www.` prefix and the query keeps its parameters in
/// their original order, so two URLs only collide when a server would treat
/// them as the same resource.
///
/// # Arguments
///
/// * `raw` - The URL string to normalize, absolute or relative
/// * `base` - URL used to resolve relative references
///
/// # Returns
///
/// * `Ok(Url)` - Normalized URL
/// * `Err(UrlError)` - Failed to parse or normalize the URL
///
/// # Examples
///
/// ```
/// use sumi_lens::url::normalize;
///
/// let url = normalize("HTTP://Example.COM:80/docs/./guide/#intro", None).unwrap();
/// assert_eq!(url.as_str(), "http://example.com/docs/guide");
/// ```
pub fn normalize(raw: &str, base: Option<&Url>) -> Result<Url, UrlError> {
    let raw = raw.trim();

    let mut url = match base {
        Some(base) => base.join(raw),
        None => Url::parse(raw),
    }
    .map_err(|e| UrlError::Parse(format!("{}: {}", raw, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingDomain);
    }

    url.set_fragment(None);

    let normalized_path = normalize_path(url.path());
    url.set_path(&normalized_path);

    if url.query() == Some("") {
        url.set_query(None);
    }

    Ok(url)
}

/// Normalizes a URL path by removing dot segments, empty segments and
/// trailing slashes
fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        return "/".to_string();
    }

    format!("/{}", segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.com/blog/post").unwrap()
    }

    #[test]
    fn test_keeps_scheme() {
        let result = normalize("http://example.com/page", None).unwrap();
        assert_eq!(result.as_str(), "http://example.com/page");
    }

    #[test]
    fn test_keeps_www() {
        let result = normalize("https://www.example.com/", None).unwrap();
        assert_eq!(result.as_str(), "https://www.example.com/");
    }

    #[test]
    fn test_remove_trailing_slash() {
        let result = normalize("https://example.com/page/", None).unwrap();
        assert_eq!(result.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_keep_root_slash() {
        let result = normalize("https://example.com/", None).unwrap();
        assert_eq!(result.as_str(), "https://example.com/");
    }

    #[test]
    fn test_empty_path_becomes_root() {
        let result = normalize("https://example.com", None).unwrap();
        assert_eq!(result.as_str(), "https://example.com/");
    }

    #[test]
    fn test_remove_fragment() {
        let result = normalize("https://example.com/page#section", None).unwrap();
        assert_eq!(result.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_lowercase_scheme_and_host_only() {
        let result = normalize("HTTPS://EXAMPLE.COM/Page", None).unwrap();
        assert_eq!(result.as_str(), "https://example.com/Page");
    }

    #[test]
    fn test_strip_default_ports() {
        let http = normalize("http://example.com:80/a", None).unwrap();
        assert_eq!(http.as_str(), "http://example.com/a");

        let https = normalize("https://example.com:443/a", None).unwrap();
        assert_eq!(https.as_str(), "https://example.com/a");
    }

    #[test]
    fn test_keeps_custom_port() {
        let result = normalize("http://127.0.0.1:8080/a/", None).unwrap();
        assert_eq!(result.as_str(), "http://127.0.0.1:8080/a");
    }

    #[test]
    fn test_dot_segments() {
        let result = normalize("https://example.com/a/../b/./c", None).unwrap();
        assert_eq!(result.as_str(), "https://example.com/b/c");
    }

    #[test]
    fn test_multiple_slashes() {
        let result = normalize("https://example.com///path//to///page", None).unwrap();
        assert_eq!(result.as_str(), "https://example.com/path/to/page");
    }

    #[test]
    fn test_query_preserved_in_order() {
        let result = normalize("https://example.com/p/?b=2&a=1&utm_source=x", None).unwrap();
        assert_eq!(result.as_str(), "https://example.com/p?b=2&a=1&utm_source=x");
    }

    #[test]
    fn test_empty_query_removed() {
        let result = normalize("https://example.com/p?", None).unwrap();
        assert_eq!(result.as_str(), "https://example.com/p");
    }

    #[test]
    fn test_relative_resolution() {
        assert_eq!(
            normalize("other", Some(&base())).unwrap().as_str(),
            "https://example.com/blog/other"
        );
        assert_eq!(
            normalize("/root/", Some(&base())).unwrap().as_str(),
            "https://example.com/root"
        );
        assert_eq!(
            normalize("../up", Some(&base())).unwrap().as_str(),
            "https://example.com/up"
        );
        assert_eq!(
            normalize("//cdn.example.org/x", Some(&base())).unwrap().as_str(),
            "https://cdn.example.org/x"
        );
    }

    #[test]
    fn test_invalid_scheme() {
        let result = normalize("ftp://example.com/page", None);
        assert!(matches!(result, Err(UrlError::InvalidScheme(_))));

        let result = normalize("mailto:someone@example.com", Some(&base()));
        assert!(matches!(result, Err(UrlError::InvalidScheme(_))));
    }

    #[test]
    fn test_malformed_url() {
        assert!(matches!(
            normalize("not a url", None),
            Err(UrlError::Parse(_))
        ));
    }

    #[test]
    fn test_idempotent() {
        let once = normalize("HTTP://Example.com:80//a/./b/#x", None).unwrap();
        let twice = normalize(once.as_str(), None).unwrap();
        assert_eq!(once, twice);
    }
}
