//! Retry with capped exponential backoff
//!
//! Transport errors (timeouts, connection failures) and retryable statuses
//! (5xx, 408, 429) are retried up to `retries` times. Everything else is
//! returned on the first attempt.

use crate::config::HttpConfig;
use crate::crawler::fetcher::{FetchResult, Fetcher};
use crate::{is_retryable_status, FetchError};
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExponentialBackoff {
    base_ms: u64,
    max_ms: u64,
}

impl ExponentialBackoff {
    pub const fn new(base_ms: u64, max_ms: u64) -> Self {
        Self { base_ms, max_ms }
    }

    /// Delay before retry number `attempt + 1`
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponential_delay = self
            .base_ms
            .saturating_mul(2u64.saturating_pow(attempt.min(20)));
        Duration::from_millis(exponential_delay.min(self.max_ms))
    }
}

/// How often and how patiently to retry a fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retries: u32,
    pub backoff: ExponentialBackoff,
}

impl RetryPolicy {
    pub fn from_config(config: &HttpConfig) -> Self {
        Self {
            retries: config.retries,
            backoff: ExponentialBackoff::new(config.retry_backoff, config.retry_backoff_max),
        }
    }
}

/// Outcome of a fetch after retries
#[derive(Debug)]
pub struct FetchAttempt {
    pub result: Result<FetchResult, FetchError>,
    /// Requests issued, at least 1
    pub attempts: u32,
}

/// Fetches `url`, retrying transient failures per `policy`
///
/// A response with a retryable status that survives every attempt is
/// returned as `Ok` so the caller can still record and analyze it.
pub async fn fetch_with_retry(
    fetcher: &dyn Fetcher,
    url: &Url,
    policy: &RetryPolicy,
) -> FetchAttempt {
    let mut attempt = 0;
    loop {
        let result = fetcher.fetch(url).await;
        let retryable = match &result {
            Ok(response) => is_retryable_status(response.status),
            Err(error) => error.is_retryable(),
        };

        if !retryable || attempt >= policy.retries {
            return FetchAttempt {
                result,
                attempts: attempt + 1,
            };
        }

        let delay = policy.backoff.delay(attempt);
        match &result {
            Ok(response) => tracing::debug!(
                "{} returned {}, retrying in {:?} (attempt {}/{})",
                url,
                response.status,
                delay,
                attempt + 1,
                policy.retries
            ),
            Err(error) => tracing::debug!(
                "{} failed: {}, retrying in {:?} (attempt {}/{})",
                url,
                error,
                delay,
                attempt + 1,
                policy.retries
            ),
        }

        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
