//! Issue exclusion patterns
//!
//! A URL matching any exclusion pattern has all of its issues suppressed.
//! Patterns use the same glob rules as the crawl filters and are evaluated
//! case-sensitively against path + query.

use crate::state::IssueRecord;
use crate::url::{active_patterns, matches_pattern};
use url::Url;

/// Compiled exclusion list
#[derive(Debug, Clone, Default)]
pub struct ExclusionRules {
    patterns: Vec<String>,
}

impl ExclusionRules {
    /// Keeps the active patterns, dropping blank lines and `#` comments
    pub fn new(patterns: &[String]) -> Self {
        Self {
            patterns: active_patterns(patterns).map(str::to_string).collect(),
        }
    }

    pub fn is_excluded(&self, url: &Url) -> bool {
        self.patterns
            .iter()
            .any(|pattern| matches_pattern(pattern, url))
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Drops every issue of `url` when it matches an exclusion pattern
///
/// # Arguments
///
/// * `raw` - Issues detected for the page
/// * `rules` - The exclusion rules of the crawl
/// * `url` - The page URL the issues belong to
pub fn filter_issues(raw: Vec<IssueRecord>, rules: &ExclusionRules, url: &Url) -> Vec<IssueRecord> {
    if raw.is_empty() || !rules.is_excluded(url) {
        return raw;
    }
    tracing::trace!("Suppressing {} issues for excluded URL {}", raw.len(), url);
    Vec::new()
}
