//! Per-origin robots.txt cache
//!
//! Each origin's robots.txt is fetched at most once while fresh. Concurrent
//! workers asking for the same origin wait on the same fetch. Entries expire
//! after 24 hours.

use crate::crawler::Fetcher;
use crate::robots::{fetch_robots, RobotsRules};
use crate::url::origin_key;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;
use url::Url;

/// Robots.txt rules with the time they were fetched
#[derive(Debug, Clone)]
pub struct CachedRobots {
    pub rules: RobotsRules,
    pub fetched_at: DateTime<Utc>,
}

impl CachedRobots {
    pub fn new(rules: RobotsRules) -> Self {
        Self {
            rules,
            fetched_at: Utc::now(),
        }
    }

    /// Checks if the cached robots.txt is older than 24 hours
    pub fn is_stale(&self) -> bool {
        self.age() > Duration::hours(24)
    }

    pub fn age(&self) -> Duration {
        Utc::now() - self.fetched_at
    }
}

/// Result of checking a URL against robots.txt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RobotsVerdict {
    pub allowed: bool,
    /// Crawl-delay requested for our user agent
    pub crawl_delay: Option<std::time::Duration>,
}

impl RobotsVerdict {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            crawl_delay: None,
        }
    }
}

/// Cache of robots.txt rules keyed by origin
pub struct RobotsCache {
    user_agent: String,
    entries: Mutex<HashMap<String, Arc<OnceCell<CachedRobots>>>>,
}

impl RobotsCache {
    pub fn new(user_agent: &str) -> Self {
        Self {
            user_agent: user_agent.to_string(),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Number of origins with a cached or pending robots.txt
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Checks `url` against its origin's robots.txt, fetching it if needed
    ///
    /// # Arguments
    ///
    /// * `url` - The URL about to be fetched
    /// * `fetcher` - Used through its plain path to fetch robots.txt
    pub async fn check(&self, url: &Url, fetcher: &dyn Fetcher) -> RobotsVerdict {
        let origin = origin_key(url);
        let cell = {
            let mut entries = self.entries.lock();
            let entry = entries.entry(origin).or_default();
            if entry.get().map_or(false, CachedRobots::is_stale) {
                *entry = Arc::new(OnceCell::new());
            }
            Arc::clone(entry)
        };

        let cached = cell
            .get_or_init(|| async { CachedRobots::new(fetch_robots(url, fetcher).await) })
            .await;

        RobotsVerdict {
            allowed: cached.rules.is_allowed(url, &self.user_agent),
            crawl_delay: cached.rules.crawl_delay(&self.user_agent),
        }
    }
}
