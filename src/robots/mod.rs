//! Robots.txt handling module
//!
//! This module provides functionality for fetching, parsing, and caching
//! robots.txt files. Fetching is lenient: a missing, unreadable or
//! erroring robots.txt allows everything.

mod cache;
mod parser;

pub use cache::{CachedRobots, RobotsCache, RobotsVerdict};
pub use parser::{agent_token, RobotsRules};

use crate::crawler::Fetcher;
use url::Url;

/// Fetches the robots.txt of `url`'s origin
///
/// # Arguments
///
/// * `url` - Any URL on the origin
/// * `fetcher` - Used through its plain (non-rendering) path
///
/// # Returns
///
/// The parsed rules for a 2xx response, otherwise `RobotsRules::allow_all()`
pub async fn fetch_robots(url: &Url, fetcher: &dyn Fetcher) -> RobotsRules {
    let robots_url = match url.join("/robots.txt") {
        Ok(robots_url) => robots_url,
        Err(e) => {
            tracing::warn!("Cannot build robots.txt URL for {}: {}", url, e);
            return RobotsRules::allow_all();
        }
    };

    tracing::debug!("Fetching {}", robots_url);
    match fetcher.fetch_plain(&robots_url).await {
        Ok(response) if response.is_success() => RobotsRules::from_content(&response.body),
        Ok(response) => {
            tracing::debug!(
                "{} returned {}, allowing all",
                robots_url,
                response.status
            );
            RobotsRules::allow_all()
        }
        Err(e) => {
            tracing::warn!("Failed to fetch {}: {}, allowing all", robots_url, e);
            RobotsRules::allow_all()
        }
    }
}
