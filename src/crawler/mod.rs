//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - Plain HTTP and render-service fetch strategies with retry logic
//! - The depth-ordered frontier and seen-set
//! - Page analysis and link extraction
//! - Duplicate-content detection
//! - The crawl engine coordinating the worker pool

mod coordinator;
mod duplicates;
mod fetcher;
mod frontier;
mod parser;
mod renderer;
mod retry;

pub use coordinator::{ControlOutcome, CrawlEngine};
pub use duplicates::DuplicateIndex;
pub use fetcher::{build_http_client, FetchResult, Fetcher, HttpFetcher};
pub use frontier::{EnqueueOutcome, Frontier, FrontierLimits, QueuedUrl, RejectReason};
pub use parser::{analyze, detect_analytics, PageAnalysis};
pub use renderer::RenderServiceFetcher;
pub use retry::{fetch_with_retry, ExponentialBackoff, FetchAttempt, RetryPolicy};
