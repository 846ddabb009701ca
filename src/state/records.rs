//! Records appended to the crawl state
//!
//! Records are immutable once appended. All of them serialize with serde so
//! snapshots and checkpoints can be handed to external collaborators as-is.

use crate::url::LinkKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// How a page body was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// Direct HTTP GET
    Plain,
    /// Through the headless-browser render service
    Rendered,
}

impl RenderMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::Rendered => "rendered",
        }
    }
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A heading in document order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heading {
    /// 1 through 6
    pub level: u8,
    pub text: String,
}

/// Tracking scripts found on a page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyticsTags {
    pub google_analytics: bool,
    pub gtag: bool,
    pub ga4_id: Option<String>,
    pub gtm_id: Option<String>,
    pub facebook_pixel: bool,
    pub hotjar: bool,
    pub mixpanel: bool,
}

/// `<link rel="alternate" hreflang="...">` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HreflangLink {
    pub lang: String,
    pub href: String,
}

/// One fetched URL, successful or not
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    pub url: String,

    /// URL after redirects
    pub final_url: String,

    /// 0 when no HTTP response was received
    pub status_code: u16,

    /// Set when the fetch failed
    pub error: Option<String>,

    pub content_type: Option<String>,
    pub title: Option<String>,
    pub meta_description: Option<String>,
    pub headings: Vec<Heading>,
    pub word_count: usize,
    pub response_time_ms: u64,
    pub size_bytes: u64,

    /// SHA-256 of the normalized visible text
    pub content_hash: Option<String>,

    /// Distinct link targets on the page
    pub outbound_links: usize,
    pub internal_links: usize,
    pub external_links: usize,

    pub canonical_url: Option<String>,
    pub lang: Option<String>,
    pub viewport: Option<String>,
    pub robots: Option<String>,
    pub og_tags: BTreeMap<String, String>,
    pub twitter_tags: BTreeMap<String, String>,
    pub json_ld_blocks: usize,
    pub schema_types: Vec<String>,
    pub analytics: AnalyticsTags,
    pub images: usize,
    pub images_missing_alt: usize,
    pub hreflang: Vec<HreflangLink>,

    /// Recoverable HTML parse errors reported by the parser
    pub parse_errors: usize,

    pub depth: u32,
    pub parent_url: Option<String>,
    pub is_external: bool,
    pub timestamp: DateTime<Utc>,
    pub render_mode: RenderMode,
}

impl PageRecord {
    /// Creates an empty record for a URL; analysis fills in the rest
    pub fn new(url: &str, depth: u32, parent_url: Option<&str>, render_mode: RenderMode) -> Self {
        Self {
            url: url.to_string(),
            final_url: url.to_string(),
            status_code: 0,
            error: None,
            content_type: None,
            title: None,
            meta_description: None,
            headings: Vec::new(),
            word_count: 0,
            response_time_ms: 0,
            size_bytes: 0,
            content_hash: None,
            outbound_links: 0,
            internal_links: 0,
            external_links: 0,
            canonical_url: None,
            lang: None,
            viewport: None,
            robots: None,
            og_tags: BTreeMap::new(),
            twitter_tags: BTreeMap::new(),
            json_ld_blocks: 0,
            schema_types: Vec::new(),
            analytics: AnalyticsTags::default(),
            images: 0,
            images_missing_alt: 0,
            hreflang: Vec::new(),
            parse_errors: 0,
            depth,
            parent_url: parent_url.map(str::to_string),
            is_external: false,
            timestamp: Utc::now(),
            render_mode,
        }
    }

    /// Whether the fetch failed or returned an error status
    pub fn is_failure(&self) -> bool {
        self.error.is_some() || self.status_code == 0 || self.status_code >= 400
    }

    /// Whether the body was HTML
    pub fn is_html(&self) -> bool {
        self.content_type
            .as_deref()
            .map_or(false, |ct| ct.contains("text/html") || ct.contains("xhtml"))
    }

    /// Text of the first H1, if any
    pub fn h1(&self) -> Option<&str> {
        self.headings
            .iter()
            .find(|h| h.level == 1)
            .map(|h| h.text.as_str())
    }
}

/// A hyperlink from one page to another
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub source_url: String,
    pub target_url: String,
    pub link_type: LinkKind,
    /// Text of the first occurrence on the page
    pub anchor_text: String,
    /// How many times the target appears on the source page
    pub occurrences: usize,
}

/// Issue severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A detected SEO or structural defect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRecord {
    pub url: String,
    /// Stable snake_case identifier, e.g. `missing_title`
    pub issue_type: String,
    pub severity: Severity,
    pub category: String,
    pub detail: String,
}

/// A URL waiting in the frontier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontierEntry {
    pub url: String,
    pub depth: u32,
    pub discovered_from: Option<String>,
    pub is_external: bool,
}
