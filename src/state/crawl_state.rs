//! Mutable root of a crawl
//!
//! One `CrawlState` lives per engine behind a single lock. Workers mutate it
//! in short critical sections; observers only ever get copies.

use crate::config::CrawlConfig;
use crate::crawler::{Frontier, FrontierLimits, QueuedUrl};
use crate::state::records::{FrontierEntry, IssueRecord, LinkRecord, PageRecord};
use crate::state::snapshot::{
    progress, tail, CrawlCheckpoint, CrawlStats, SnapshotCursors, StatusSnapshot,
};
use crate::state::CrawlPhase;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Crawl counters
///
/// `discovered`, `crawled`, `failed` and `skipped` only ever grow during a
/// crawl. `queued` and `in_flight` describe the current moment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlCounters {
    /// URLs accepted into the frontier
    pub discovered: usize,
    /// Pages recorded with a successful response
    pub crawled: usize,
    /// Pages recorded with a transport error or error status
    pub failed: usize,
    /// URLs waiting in the frontier
    pub queued: usize,
    /// URLs dispatched to workers and not yet recorded
    pub in_flight: usize,
    /// URLs dropped after dispatch, e.g. disallowed by robots.txt
    pub skipped: usize,
    /// Deepest recorded page
    pub max_depth_reached: u32,
}

/// The shared mutable state of one crawl
pub struct CrawlState {
    pub phase: CrawlPhase,
    /// Increases on every start or restore; stale workers compare against it
    pub run_id: u64,
    pub seed: Option<String>,
    pub config: CrawlConfig,
    pub config_hash: Option<String>,
    pub counters: CrawlCounters,
    pub frontier: Frontier,
    /// Dispatched URLs whose page is not recorded yet, keyed by URL
    pub pending: HashMap<String, FrontierEntry>,
    pub pages: Vec<PageRecord>,
    pub links: Vec<LinkRecord>,
    pub issues: Vec<IssueRecord>,

    /// Live settings
    pub concurrency: usize,
    pub crawl_delay_ms: u64,

    /// Workers currently alive for `run_id`
    pub workers_alive: usize,

    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl CrawlState {
    /// Creates an idle state
    pub fn new() -> Self {
        let config = CrawlConfig::default();
        Self {
            phase: CrawlPhase::Idle,
            run_id: 0,
            seed: None,
            frontier: Frontier::new(frontier_limits(&config)),
            pending: HashMap::new(),
            concurrency: config.crawler.concurrency,
            crawl_delay_ms: config.crawler.crawl_delay,
            config,
            config_hash: None,
            counters: CrawlCounters::default(),
            pages: Vec::new(),
            links: Vec::new(),
            issues: Vec::new(),
            workers_alive: 0,
            started_at: None,
            finished_at: None,
            error: None,
        }
    }

    /// Clears everything from a previous run and prepares a fresh one
    pub fn reset(&mut self, seed: &str, config: CrawlConfig, config_hash: Option<String>) {
        let run_id = self.run_id + 1;
        *self = Self::new();
        self.run_id = run_id;
        self.seed = Some(seed.to_string());
        self.frontier = Frontier::new(frontier_limits(&config));
        self.concurrency = config.crawler.concurrency;
        self.crawl_delay_ms = config.crawler.crawl_delay;
        self.config = config;
        self.config_hash = config_hash;
    }

    /// Replaces the state with a checkpoint's contents for a new run
    pub fn load_checkpoint(&mut self, checkpoint: CrawlCheckpoint) {
        let run_id = self.run_id + 1;
        let limits = frontier_limits(&checkpoint.config);
        *self = Self::new();
        self.run_id = run_id;
        self.frontier = Frontier::restore(
            limits,
            &checkpoint.frontier,
            &checkpoint.seen,
            checkpoint.dispatched,
        );
        self.seed = Some(checkpoint.seed);
        self.concurrency = checkpoint.config.crawler.concurrency;
        self.crawl_delay_ms = checkpoint.config.crawler.crawl_delay;
        self.config = checkpoint.config;
        self.config_hash = checkpoint.config_hash;
        self.counters = CrawlCounters {
            discovered: checkpoint.counters.discovered.max(self.frontier.seen_count()),
            queued: self.frontier.len(),
            in_flight: 0,
            ..checkpoint.counters
        };
        self.pages = checkpoint.pages;
        self.links = checkpoint.links;
        self.issues = checkpoint.issues;
        self.started_at = checkpoint.started_at;
    }

    /// Appends a page record and updates the outcome counters
    pub fn record_page(&mut self, record: PageRecord) {
        if record.is_failure() {
            self.counters.failed += 1;
        } else {
            self.counters.crawled += 1;
        }
        self.counters.max_depth_reached = self.counters.max_depth_reached.max(record.depth);
        self.pages.push(record);
    }

    /// Takes the next URL off the frontier and marks it in flight
    pub fn dispatch(&mut self) -> Option<QueuedUrl> {
        let next = self.frontier.pop();
        if let Some(queued) = &next {
            self.pending.insert(queued.url.to_string(), queued.to_entry());
            self.counters.in_flight = self.pending.len();
        }
        self.sync_frontier_counters();
        next
    }

    /// Marks a dispatched URL as no longer in flight
    pub fn settle(&mut self, url: &str) {
        self.pending.remove(url);
        self.counters.in_flight = self.pending.len();
    }

    /// Keeps `queued` and `discovered` in step with the frontier
    pub fn sync_frontier_counters(&mut self) {
        self.counters.queued = self.frontier.len();
        self.counters.discovered = self.counters.discovered.max(self.frontier.seen_count());
    }

    /// Moves to a terminal phase, dropping whatever is still queued
    pub fn finish(&mut self, phase: CrawlPhase, error: Option<String>) {
        self.phase = phase;
        self.error = error;
        self.finished_at = Some(Utc::now());
        self.frontier.clear();
        self.pending.clear();
        self.counters.queued = 0;
        self.counters.in_flight = 0;
    }

    pub fn stats(&self) -> CrawlStats {
        let elapsed_secs = match self.started_at {
            Some(start) => {
                let end = self.finished_at.unwrap_or_else(Utc::now);
                (end - start).num_milliseconds().max(0) as f64 / 1000.0
            }
            None => 0.0,
        };
        let recorded = self.counters.crawled + self.counters.failed;

        CrawlStats {
            counters: self.counters,
            concurrency: self.concurrency,
            crawl_delay_ms: self.crawl_delay_ms,
            started_at: self.started_at,
            finished_at: self.finished_at,
            elapsed_secs,
            pages_per_sec: if elapsed_secs > 0.0 {
                recorded as f64 / elapsed_secs
            } else {
                0.0
            },
        }
    }

    /// Copies the records appended since `since`
    pub fn snapshot(&self, since: SnapshotCursors) -> StatusSnapshot {
        StatusSnapshot {
            status: self.phase,
            stats: self.stats(),
            urls: tail(&self.pages, since.urls),
            links: tail(&self.links, since.links),
            issues: tail(&self.issues, since.issues),
            progress: progress(self.counters.crawled, self.counters.discovered),
            cursors: SnapshotCursors {
                urls: self.pages.len(),
                links: self.links.len(),
                issues: self.issues.len(),
            },
            error: self.error.clone(),
        }
    }

    /// Full serializable copy of the crawl
    ///
    /// In-flight URLs go back to the front of the saved frontier and their
    /// budget slots are returned, so a restored crawl fetches them again.
    pub fn checkpoint(&self) -> CrawlCheckpoint {
        let mut frontier: Vec<FrontierEntry> = self.pending.values().cloned().collect();
        frontier.sort_by(|a, b| a.depth.cmp(&b.depth).then_with(|| a.url.cmp(&b.url)));
        frontier.extend(self.frontier.entries());

        CrawlCheckpoint {
            seed: self.seed.clone().unwrap_or_default(),
            config: self.config.clone(),
            config_hash: self.config_hash.clone(),
            phase: self.phase,
            counters: CrawlCounters {
                in_flight: 0,
                ..self.counters
            },
            dispatched: self.frontier.dispatched().saturating_sub(self.pending.len()),
            frontier,
            seen: self.frontier.seen_urls(),
            pages: self.pages.clone(),
            links: self.links.clone(),
            issues: self.issues.clone(),
            started_at: self.started_at,
            saved_at: Utc::now(),
        }
    }
}

impl Default for CrawlState {
    fn default() -> Self {
        Self::new()
    }
}

/// Frontier admission limits derived from a configuration
pub fn frontier_limits(config: &CrawlConfig) -> FrontierLimits {
    FrontierLimits {
        max_depth: config.crawler.max_depth,
        max_urls: config.crawler.max_urls,
        filters: config.filters.clone(),
    }
}
