//! Point-in-time views of a crawl handed to observers
//!
//! Snapshots are owned copies. Polling clients pass back the cursors of the
//! previous snapshot and receive only the records appended since.

use crate::config::CrawlConfig;
use crate::state::crawl_state::CrawlCounters;
use crate::state::records::{FrontierEntry, IssueRecord, LinkRecord, PageRecord};
use crate::state::CrawlPhase;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Offsets into the three record collections
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotCursors {
    pub urls: usize,
    pub links: usize,
    pub issues: usize,
}

/// Aggregate numbers of a crawl
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlStats {
    #[serde(flatten)]
    pub counters: CrawlCounters,
    pub concurrency: usize,
    pub crawl_delay_ms: u64,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub elapsed_secs: f64,
    pub pages_per_sec: f64,
}

/// Status report for one poll
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub status: CrawlPhase,
    pub stats: CrawlStats,
    /// Page records from `since.urls` onwards
    pub urls: Vec<PageRecord>,
    pub links: Vec<LinkRecord>,
    pub issues: Vec<IssueRecord>,
    /// `crawled / max(discovered, 1)`, between 0 and 1
    pub progress: f64,
    /// Totals to pass as `since` on the next poll
    pub cursors: SnapshotCursors,
    /// Reason for a `Failed` status
    pub error: Option<String>,
}

/// Returns the records past `since`, clamping offsets beyond the end
pub fn tail<T: Clone>(records: &[T], since: usize) -> Vec<T> {
    records[since.min(records.len())..].to_vec()
}

/// `crawled / max(discovered, 1)`
pub fn progress(crawled: usize, discovered: usize) -> f64 {
    (crawled as f64 / discovered.max(1) as f64).clamp(0.0, 1.0)
}

/// Serializable image of a whole crawl, used to persist and resume it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlCheckpoint {
    pub seed: String,
    pub config: CrawlConfig,
    /// Hash of the configuration file the crawl was started from
    pub config_hash: Option<String>,
    pub phase: CrawlPhase,
    pub counters: CrawlCounters,
    /// URLs already charged against `max_urls`
    pub dispatched: usize,
    pub frontier: Vec<FrontierEntry>,
    pub seen: Vec<String>,
    pub pages: Vec<PageRecord>,
    pub links: Vec<LinkRecord>,
    pub issues: Vec<IssueRecord>,
    pub started_at: Option<DateTime<Utc>>,
    pub saved_at: DateTime<Utc>,
}
