//! URL handling module for Sumi-Lens
//!
//! This module provides URL normalization, glob pattern matching, crawl
//! filters and link classification. Everything here is a pure function.

mod domain;
mod filters;
mod matcher;
mod normalize;

use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

// Re-export main functions
pub use domain::{origin_key, same_site, site_host};
pub use filters::{matches_filters, path_extension};
pub use matcher::{active_patterns, glob_match, matches_any, matches_pattern};
pub use normalize::normalize;

/// Static resources that are recorded as links but never crawled
const ASSET_EXTENSIONS: &[&str] = &[
    "css", "js", "mjs", "map", "png", "jpg", "jpeg", "gif", "webp", "avif", "svg", "ico", "bmp",
    "tif", "tiff", "woff", "woff2", "ttf", "otf", "eot", "mp3", "mp4", "webm", "ogg", "wav",
    "avi", "mov", "pdf", "zip", "gz", "tar", "rar", "7z", "exe", "dmg", "doc", "docx", "xls",
    "xlsx", "ppt", "pptx",
];

/// Link classification types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    /// Same site as the crawl root
    Internal,
    /// Another site
    External,
    /// In-page fragment reference
    Anchor,
    /// Static resource (stylesheet, image, archive, ...)
    Asset,
}

impl LinkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Internal => "internal",
            Self::External => "external",
            Self::Anchor => "anchor",
            Self::Asset => "asset",
        }
    }
}

impl fmt::Display for LinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the URL's path ends in a static-asset extension
pub fn is_asset(url: &Url) -> bool {
    path_extension(url).map_or(false, |ext| ASSET_EXTENSIONS.contains(&ext.as_str()))
}

/// Classifies a URL relative to the crawl root
///
/// Assets are recognized by extension first, regardless of host. Anything
/// else is internal when it shares the root's site (see [`same_site`]) and
/// external otherwise. [`LinkKind::Anchor`] is assigned by the analyzer from
/// the raw `href`, never here.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sumi_lens::url::{classify, LinkKind};
///
/// let root = Url::parse("https://example.com/").unwrap();
/// let page = Url::parse("https://www.example.com/about").unwrap();
/// let logo = Url::parse("https://example.com/logo.png").unwrap();
/// let other = Url::parse("https://example.org/").unwrap();
///
/// assert_eq!(classify(&page, &root), LinkKind::Internal);
/// assert_eq!(classify(&logo, &root), LinkKind::Asset);
/// assert_eq!(classify(&other, &root), LinkKind::External);
/// ```
pub fn classify(url: &Url, root: &Url) -> LinkKind {
    if is_asset(url) {
        LinkKind::Asset
    } else if same_site(url, root) {
        LinkKind::Internal
    } else {
        LinkKind::External
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_classify_internal() {
        let root = parse("https://example.com/");
        assert_eq!(classify(&parse("https://example.com/a"), &root), LinkKind::Internal);
        assert_eq!(classify(&parse("http://example.com/b"), &root), LinkKind::Internal);
        assert_eq!(
            classify(&parse("https://www.example.com/c.html"), &root),
            LinkKind::Internal
        );
    }

    #[test]
    fn test_classify_external() {
        let root = parse("https://example.com/");
        assert_eq!(classify(&parse("https://other.com/"), &root), LinkKind::External);
        assert_eq!(
            classify(&parse("https://shop.example.com/"), &root),
            LinkKind::External
        );
    }

    #[test]
    fn test_classify_assets() {
        let root = parse("https://example.com/");
        assert_eq!(classify(&parse("https://example.com/app.js"), &root), LinkKind::Asset);
        assert_eq!(classify(&parse("https://cdn.net/font.woff2"), &root), LinkKind::Asset);
        assert_eq!(classify(&parse("https://example.com/Photo.JPG"), &root), LinkKind::Asset);
    }

    #[test]
    fn test_link_kind_serde() {
        assert_eq!(serde_json::to_string(&LinkKind::Anchor).unwrap(), "\"anchor\"");
        assert_eq!(LinkKind::External.to_string(), "external");
    }
}
