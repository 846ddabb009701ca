use crate::config::FilterConfig;
use crate::url::matcher::{active_patterns, matches_any};
use url::Url;

/// Returns the lowercase extension of the last path segment, if any
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sumi_lens::url::path_extension;
///
/// let url = Url::parse("https://example.com/docs/Guide.PDF").unwrap();
/// assert_eq!(path_extension(&url), Some("pdf".to_string()));
/// ```
pub fn path_extension(url: &Url) -> Option<String> {
    let last = url.path().rsplit('/').next()?;
    let (stem, ext) = last.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_lowercase())
}

fn list_contains(list: &[String], ext: &str) -> bool {
    list.iter()
        .any(|item| item.trim().trim_start_matches('.').eq_ignore_ascii_case(ext))
}

/// Decides whether a URL may enter the frontier
///
/// # Rules
///
/// - A path extension on the exclude list rejects the URL, even when the
///   same extension is also on the include list.
/// - When the include list is non-empty, a path that carries an extension
///   must use one from it. Extension-less paths are never rejected here.
/// - When include patterns are present the URL must match one of them.
/// - A URL matching any exclude pattern is rejected.
///
/// # Arguments
///
/// * `url` - The normalized candidate URL
/// * `filters` - Include/exclude configuration
///
/// # Returns
///
/// `true` if the URL is crawlable
pub fn matches_filters(url: &Url, filters: &FilterConfig) -> bool {
    if let Some(ext) = path_extension(url) {
        if list_contains(&filters.exclude_extensions, &ext) {
            return false;
        }
        if !filters.include_extensions.is_empty()
            && !list_contains(&filters.include_extensions, &ext)
        {
            return false;
        }
    }

    let has_includes = active_patterns(&filters.include_patterns).next().is_some();
    if has_includes && !matches_any(&filters.include_patterns, url) {
        return false;
    }

    !matches_any(&filters.exclude_patterns, url)
}
