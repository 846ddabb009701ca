//! Crawl frontier and seen-set
//!
//! This module handles:
//! - Depth-priority queue of URLs to crawl (shallow first, FIFO within a depth)
//! - The seen-set guaranteeing each URL is enqueued once per crawl
//! - Depth, filter and `max_urls` admission checks
//!
//! The frontier is plain data; the engine owns it behind its state lock, so
//! the seen-check and insert of [`Frontier::enqueue`] are a single step.

use crate::config::FilterConfig;
use crate::state::FrontierEntry;
use crate::url::matches_filters;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};
use url::Url;

/// A URL queued for fetching with its ordering key
#[derive(Debug, Clone)]
pub struct QueuedUrl {
    /// The URL to fetch
    pub url: Url,

    /// Link hops from the seed
    pub depth: u32,

    /// Page the URL was found on
    pub parent: Option<String>,

    /// Whether the URL is outside the seed's site
    pub is_external: bool,

    /// Insertion order, breaks ties within a depth
    seq: u64,
}

impl QueuedUrl {
    pub fn to_entry(&self) -> FrontierEntry {
        FrontierEntry {
            url: self.url.to_string(),
            depth: self.depth,
            discovered_from: self.parent.clone(),
            is_external: self.is_external,
        }
    }
}

// Lower depth first, then lower sequence number (BinaryHeap is a max-heap)
impl Ord for QueuedUrl {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .depth
            .cmp(&self.depth)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for QueuedUrl {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for QueuedUrl {
    fn eq(&self, other: &Self) -> bool {
        self.depth == other.depth && self.seq == other.seq
    }
}

impl Eq for QueuedUrl {}

/// Why an enqueue was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    AlreadySeen,
    DepthExceeded,
    CountExceeded,
    FilteredOut,
}

/// Result of offering a URL to the frontier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    Accepted,
    Rejected(RejectReason),
}

impl EnqueueOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// Admission limits applied by the frontier
#[derive(Debug, Clone)]
pub struct FrontierLimits {
    pub max_depth: u32,
    pub max_urls: usize,
    pub filters: FilterConfig,
}

/// The set of discovered-but-unfetched URLs plus everything ever enqueued
pub struct Frontier {
    heap: BinaryHeap<QueuedUrl>,
    seen: HashSet<String>,
    limits: FrontierLimits,
    /// URLs handed to workers, charged against `max_urls`
    dispatched: usize,
    next_seq: u64,
}

impl Frontier {
    /// Creates an empty frontier
    pub fn new(limits: FrontierLimits) -> Self {
        Self {
            heap: BinaryHeap::new(),
            seen: HashSet::new(),
            limits,
            dispatched: 0,
            next_seq: 0,
        }
    }

    /// Rebuilds a frontier from checkpointed entries
    ///
    /// Entries are re-queued in their saved order; every entry URL is added
    /// to the seen-set even if the saved seen list missed it.
    pub fn restore(
        limits: FrontierLimits,
        entries: &[FrontierEntry],
        seen: &[String],
        dispatched: usize,
    ) -> Self {
        let mut frontier = Self::new(limits);
        frontier.seen.extend(seen.iter().cloned());
        frontier.dispatched = dispatched;

        for entry in entries {
            let Ok(url) = Url::parse(&entry.url) else {
                tracing::warn!("Dropping unparsable frontier entry {}", entry.url);
                continue;
            };
            frontier.seen.insert(url.to_string());
            frontier.push(url, entry.depth, entry.discovered_from.clone(), entry.is_external);
        }

        frontier
    }

    fn push(&mut self, url: Url, depth: u32, parent: Option<String>, is_external: bool) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(QueuedUrl {
            url,
            depth,
            parent,
            is_external,
            seq,
        });
    }

    /// Offers a normalized URL to the frontier
    ///
    /// # Arguments
    ///
    /// * `url` - Normalized URL
    /// * `depth` - Link hops from the seed
    /// * `parent` - Page the URL was found on
    /// * `is_external` - Whether the URL is outside the seed's site
    ///
    /// # Returns
    ///
    /// `Accepted` when the URL was queued and marked seen, otherwise the
    /// first failing check in the order: seen, depth, count, filters.
    pub fn enqueue(
        &mut self,
        url: Url,
        depth: u32,
        parent: Option<&str>,
        is_external: bool,
    ) -> EnqueueOutcome {
        if self.seen.contains(url.as_str()) {
            return EnqueueOutcome::Rejected(RejectReason::AlreadySeen);
        }
        if depth > self.limits.max_depth {
            return EnqueueOutcome::Rejected(RejectReason::DepthExceeded);
        }
        if self.is_exhausted() {
            return EnqueueOutcome::Rejected(RejectReason::CountExceeded);
        }
        if !matches_filters(&url, &self.limits.filters) {
            return EnqueueOutcome::Rejected(RejectReason::FilteredOut);
        }

        self.seen.insert(url.to_string());
        self.push(url, depth, parent.map(str::to_string), is_external);
        EnqueueOutcome::Accepted
    }

    /// Takes the next URL to dispatch and charges it against `max_urls`
    ///
    /// Once the budget is spent the remaining entries are discarded and
    /// `None` is returned from then on.
    pub fn pop(&mut self) -> Option<QueuedUrl> {
        if self.is_exhausted() {
            if !self.heap.is_empty() {
                tracing::info!(
                    "URL limit of {} reached, discarding {} queued URLs",
                    self.limits.max_urls,
                    self.heap.len()
                );
                self.heap.clear();
            }
            return None;
        }

        let next = self.heap.pop()?;
        self.dispatched += 1;
        Some(next)
    }

    /// Returns a dispatched URL's budget slot (e.g. robots.txt refused it)
    pub fn refund(&mut self) {
        self.dispatched = self.dispatched.saturating_sub(1);
    }

    /// Drops every queued entry; the seen-set is kept
    pub fn clear(&mut self) {
        self.heap.clear();
    }

    /// Whether `max_urls` URLs have been dispatched
    pub fn is_exhausted(&self) -> bool {
        self.dispatched >= self.limits.max_urls
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }

    pub fn has_seen(&self, url: &str) -> bool {
        self.seen.contains(url)
    }

    pub fn dispatched(&self) -> usize {
        self.dispatched
    }

    pub fn limits(&self) -> &FrontierLimits {
        &self.limits
    }

    /// Queued entries in dispatch order
    pub fn entries(&self) -> Vec<FrontierEntry> {
        let mut queued: Vec<&QueuedUrl> = self.heap.iter().collect();
        queued.sort_by(|a, b| b.cmp(a));
        queued.into_iter().map(QueuedUrl::to_entry).collect()
    }

    /// Seen URLs, sorted for stable output
    pub fn seen_urls(&self) -> Vec<String> {
        let mut urls: Vec<String> = self.seen.iter().cloned().collect();
        urls.sort();
        urls
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_limits() -> FrontierLimits {
        FrontierLimits {
            max_depth: 3,
            max_urls: 100,
            filters: FilterConfig::default(),
        }
    }

    fn url(path: &str) -> Url {
        Url::parse(&format!("https://example.com{}", path)).unwrap()
    }

    #[test]
    fn test_new_frontier() {
        let frontier = Frontier::new(create_test_limits());
        assert!(frontier.is_empty());
        assert_eq!(frontier.seen_count(), 0);
    }

    #[test]
    fn test_enqueue_and_pop() {
        let mut frontier = Frontier::new(create_test_limits());
        assert!(frontier.enqueue(url("/"), 0, None, false).is_accepted());
        assert_eq!(frontier.len(), 1);

        let next = frontier.pop().unwrap();
        assert_eq!(next.url, url("/"));
        assert_eq!(frontier.dispatched(), 1);
        assert!(frontier.is_empty());
        assert!(frontier.has_seen("https://example.com/"));
    }

    #[test]
    fn test_already_seen() {
        let mut frontier = Frontier::new(create_test_limits());
        frontier.enqueue(url("/a"), 1, Some("https://example.com/"), false);
        assert_eq!(
            frontier.enqueue(url("/a"), 1, Some("https://example.com/b"), false),
            EnqueueOutcome::Rejected(RejectReason::AlreadySeen)
        );

        // Still seen after dispatch
        frontier.pop();
        assert_eq!(
            frontier.enqueue(url("/a"), 2, None, false),
            EnqueueOutcome::Rejected(RejectReason::AlreadySeen)
        );
    }

    #[test]
    fn test_depth_exceeded() {
        let mut frontier = Frontier::new(create_test_limits());
        assert!(frontier.enqueue(url("/deep"), 3, None, false).is_accepted());
        assert_eq!(
            frontier.enqueue(url("/deeper"), 4, None, false),
            EnqueueOutcome::Rejected(RejectReason::DepthExceeded)
        );
        assert!(!frontier.has_seen("https://example.com/deeper"));
    }

    #[test]
    fn test_filtered_out_is_not_marked_seen() {
        let mut frontier = Frontier::new(create_test_limits());
        assert_eq!(
            frontier.enqueue(url("/file.pdf"), 1, None, false),
            EnqueueOutcome::Rejected(RejectReason::FilteredOut)
        );
        assert_eq!(frontier.seen_count(), 0);
    }

    #[test]
    fn test_depth_priority_then_fifo() {
        let mut frontier = Frontier::new(create_test_limits());
        frontier.enqueue(url("/d2-first"), 2, None, false);
        frontier.enqueue(url("/d1-first"), 1, None, false);
        frontier.enqueue(url("/d2-second"), 2, None, false);
        frontier.enqueue(url("/d1-second"), 1, None, false);
        frontier.enqueue(url("/"), 0, None, false);

        let order: Vec<String> = std::iter::from_fn(|| frontier.pop())
            .map(|q| q.url.path().to_string())
            .collect();
        assert_eq!(
            order,
            vec!["/", "/d1-first", "/d1-second", "/d2-first", "/d2-second"]
        );
    }

    #[test]
    fn test_max_urls_discards_remaining() {
        let mut limits = create_test_limits();
        limits.max_urls = 2;
        let mut frontier = Frontier::new(limits);
        for i in 0..5 {
            frontier.enqueue(url(&format!("/p{}", i)), 1, None, false);
        }

        assert!(frontier.pop().is_some());
        assert!(frontier.pop().is_some());
        assert!(frontier.pop().is_none());
        assert!(frontier.is_empty());
        assert_eq!(frontier.seen_count(), 5);
        assert_eq!(
            frontier.enqueue(url("/late"), 1, None, false),
            EnqueueOutcome::Rejected(RejectReason::CountExceeded)
        );
    }

    #[test]
    fn test_refund_restores_budget() {
        let mut limits = create_test_limits();
        limits.max_urls = 1;
        let mut frontier = Frontier::new(limits);
        frontier.enqueue(url("/a"), 1, None, false);
        frontier.enqueue(url("/b"), 1, None, false);

        frontier.pop();
        assert!(frontier.is_exhausted());
        frontier.refund();
        assert!(!frontier.is_exhausted());
        assert_eq!(frontier.pop().unwrap().url, url("/b"));
    }

    #[test]
    fn test_entries_and_restore() {
        let mut frontier = Frontier::new(create_test_limits());
        frontier.enqueue(url("/"), 0, None, false);
        frontier.enqueue(url("/b"), 1, Some("https://example.com/"), false);
        frontier.enqueue(url("/a"), 1, Some("https://example.com/"), false);
        frontier.pop();

        let entries = frontier.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].url, "https://example.com/b");
        assert_eq!(entries[1].url, "https://example.com/a");

        let restored = Frontier::restore(
            create_test_limits(),
            &entries,
            &frontier.seen_urls(),
            frontier.dispatched(),
        );
        assert_eq!(restored.len(), 2);
        assert_eq!(restored.seen_count(), 3);
        assert_eq!(restored.dispatched(), 1);
        assert_eq!(restored.entries(), entries);
    }
}
