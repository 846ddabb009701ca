use crate::config::defaults;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Main configuration structure for a crawl
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrawlConfig {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub filters: FilterConfig,
    #[serde(default)]
    pub javascript: JavascriptConfig,
    #[serde(default)]
    pub issues: IssueConfig,
}

/// Crawl limits and pacing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Maximum number of link hops from the seed
    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    /// Maximum number of URLs dispatched for fetching
    #[serde(rename = "max-urls")]
    pub max_urls: usize,

    /// Largest response body accepted (bytes)
    #[serde(rename = "max-file-size")]
    pub max_file_size: u64,

    /// Minimum spacing between two requests of the same worker (milliseconds)
    #[serde(rename = "crawl-delay")]
    pub crawl_delay: u64,

    /// Number of concurrent workers
    pub concurrency: usize,

    /// Whether external links are fetched as well
    #[serde(rename = "crawl-external")]
    pub crawl_external: bool,

    /// Whether robots.txt rules are honored
    #[serde(rename = "respect-robots")]
    pub respect_robots: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            max_urls: 1000,
            max_file_size: 50 * 1024 * 1024,
            crawl_delay: 1000,
            concurrency: 5,
            crawl_external: false,
            respect_robots: true,
        }
    }
}

/// Plain HTTP fetch settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    #[serde(rename = "accept-language")]
    pub accept_language: String,

    /// Request timeout (seconds)
    pub timeout: u64,

    /// Retries after the first attempt
    pub retries: u32,

    /// First retry delay (milliseconds), doubled per attempt
    #[serde(rename = "retry-backoff")]
    pub retry_backoff: u64,

    /// Upper bound for a single retry delay (milliseconds)
    #[serde(rename = "retry-backoff-max")]
    pub retry_backoff_max: u64,

    #[serde(rename = "allow-cookies")]
    pub allow_cookies: bool,

    #[serde(rename = "follow-redirects")]
    pub follow_redirects: bool,

    #[serde(rename = "proxy-url")]
    pub proxy_url: Option<String>,

    #[serde(rename = "custom-headers")]
    pub custom_headers: BTreeMap<String, String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: "SumiLens/1.0 (Web Crawler)".to_string(),
            accept_language: "en-US,en;q=0.9".to_string(),
            timeout: 10,
            retries: 3,
            retry_backoff: 500,
            retry_backoff_max: 10_000,
            allow_cookies: true,
            follow_redirects: true,
            proxy_url: None,
            custom_headers: BTreeMap::new(),
        }
    }
}

/// Include/exclude rules deciding which URLs are crawlable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Extensions allowed when a path carries one (without the dot)
    #[serde(rename = "include-extensions")]
    pub include_extensions: Vec<String>,

    /// Extensions never crawled; wins over the include list
    #[serde(rename = "exclude-extensions")]
    pub exclude_extensions: Vec<String>,

    /// Glob patterns; when non-empty a URL must match one of them
    #[serde(rename = "include-patterns")]
    pub include_patterns: Vec<String>,

    /// Glob patterns; a matching URL is never crawled
    #[serde(rename = "exclude-patterns")]
    pub exclude_patterns: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            include_extensions: to_strings(&["html", "htm", "php", "asp", "aspx", "jsp"]),
            exclude_extensions: to_strings(&["pdf", "doc", "docx", "zip", "exe", "dmg"]),
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
        }
    }
}

/// Rendered fetch through an external headless-browser service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JavascriptConfig {
    pub enabled: bool,

    /// Base URL of the render service
    #[serde(rename = "service-url")]
    pub service_url: String,

    /// Wait after DOM content loaded before snapshotting (milliseconds)
    #[serde(rename = "wait-time")]
    pub wait_time: u64,

    /// Whole render timeout (seconds)
    pub timeout: u64,

    #[serde(rename = "viewport-width")]
    pub viewport_width: u32,

    #[serde(rename = "viewport-height")]
    pub viewport_height: u32,

    #[serde(rename = "max-concurrent-pages")]
    pub max_concurrent_pages: usize,

    #[serde(rename = "user-agent")]
    pub user_agent: String,
}

impl Default for JavascriptConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            service_url: "http://localhost:3000".to_string(),
            wait_time: 3000,
            timeout: 30,
            viewport_width: 1920,
            viewport_height: 1080,
            max_concurrent_pages: 3,
            user_agent: "SumiLens/1.0 (Web Crawler with JavaScript)".to_string(),
        }
    }
}

/// Issue reporting settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IssueConfig {
    /// Paths whose issues are suppressed; `#` lines are comments
    #[serde(rename = "exclusion-patterns")]
    pub exclusion_patterns: Vec<String>,

    #[serde(rename = "duplication-check")]
    pub duplication_check: bool,

    /// Similarity at or above which two pages are reported as duplicates
    #[serde(rename = "duplication-threshold")]
    pub duplication_threshold: f64,
}

impl Default for IssueConfig {
    fn default() -> Self {
        Self {
            exclusion_patterns: defaults::issue_exclusion_patterns(),
            duplication_check: true,
            duplication_threshold: 0.85,
        }
    }
}

/// Settings that may change while a crawl is running
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsUpdate {
    pub concurrency: Option<usize>,
    /// Milliseconds
    pub crawl_delay: Option<u64>,
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
