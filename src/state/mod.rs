//! State management for Sumi-Lens
//!
//! This module contains the crawl lifecycle phase, the record types, the
//! shared crawl state and the snapshot/checkpoint views derived from it.

mod crawl_state;
mod phase;
mod records;
mod snapshot;

pub use crawl_state::{frontier_limits, CrawlCounters, CrawlState};
pub use phase::CrawlPhase;
pub use records::{
    AnalyticsTags, FrontierEntry, Heading, HreflangLink, IssueRecord, LinkRecord, PageRecord,
    RenderMode, Severity,
};
pub use snapshot::{CrawlCheckpoint, CrawlStats, SnapshotCursors, StatusSnapshot};
