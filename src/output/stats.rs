//! Statistics generation from a crawl snapshot
//!
//! This module aggregates the records of a full snapshot into the numbers
//! shown at the end of a CLI crawl and in the markdown report.

use crate::state::{CrawlPhase, Severity, StatusSnapshot};
use std::collections::BTreeMap;

/// Crawl statistics summary
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    pub status: CrawlPhase,

    /// Total number of page records
    pub total_pages: usize,

    /// Pages that returned a non-error response
    pub pages_ok: usize,

    /// Pages with a transport error or error status
    pub pages_failed: usize,

    /// URLs skipped after dispatch (robots.txt)
    pub pages_skipped: usize,

    /// URLs accepted into the frontier
    pub discovered: usize,

    /// Total number of link records
    pub total_links: usize,

    /// Page count per status class (`2xx`, `3xx`, `4xx`, `5xx`, `no response`)
    pub status_classes: BTreeMap<String, usize>,

    /// Page count per crawl depth
    pub depth_breakdown: BTreeMap<u32, usize>,

    /// Issue count per severity
    pub issues_by_severity: BTreeMap<Severity, usize>,

    /// Issue count per issue type
    pub issues_by_kind: BTreeMap<String, usize>,

    /// Page count per render mode
    pub render_modes: BTreeMap<String, usize>,

    /// Mean response time of pages that got a response
    pub avg_response_time_ms: f64,

    pub elapsed_secs: f64,
    pub pages_per_sec: f64,
}

impl CrawlStatistics {
    /// Aggregates a snapshot taken with zero cursors
    ///
    /// # Arguments
    ///
    /// * `snapshot` - A snapshot holding every record of the crawl
    pub fn from_snapshot(snapshot: &StatusSnapshot) -> Self {
        let mut status_classes = BTreeMap::new();
        let mut depth_breakdown = BTreeMap::new();
        let mut render_modes = BTreeMap::new();
        let mut response_total = 0u64;
        let mut responded = 0usize;

        for page in &snapshot.urls {
            *status_classes
                .entry(status_class(page.status_code))
                .or_insert(0) += 1;
            *depth_breakdown.entry(page.depth).or_insert(0) += 1;
            *render_modes
                .entry(page.render_mode.as_str().to_string())
                .or_insert(0) += 1;
            if page.status_code != 0 {
                response_total += page.response_time_ms;
                responded += 1;
            }
        }

        let mut issues_by_severity = BTreeMap::new();
        let mut issues_by_kind = BTreeMap::new();
        for issue in &snapshot.issues {
            *issues_by_severity.entry(issue.severity).or_insert(0) += 1;
            *issues_by_kind.entry(issue.issue_type.clone()).or_insert(0) += 1;
        }

        let pages_failed = snapshot.urls.iter().filter(|p| p.is_failure()).count();

        Self {
            status: snapshot.status,
            total_pages: snapshot.urls.len(),
            pages_ok: snapshot.urls.len() - pages_failed,
            pages_failed,
            pages_skipped: snapshot.stats.counters.skipped,
            discovered: snapshot.stats.counters.discovered,
            total_links: snapshot.links.len(),
            status_classes,
            depth_breakdown,
            issues_by_severity,
            issues_by_kind,
            render_modes,
            avg_response_time_ms: if responded > 0 {
                response_total as f64 / responded as f64
            } else {
                0.0
            },
            elapsed_secs: snapshot.stats.elapsed_secs,
            pages_per_sec: snapshot.stats.pages_per_sec,
        }
    }

    pub fn total_issues(&self) -> usize {
        self.issues_by_severity.values().sum()
    }

    /// Share of recorded pages that did not fail, in percent
    pub fn success_rate(&self) -> f64 {
        if self.total_pages == 0 {
            return 0.0;
        }
        self.pages_ok as f64 / self.total_pages as f64 * 100.0
    }
}

/// Status class label for a status code; 0 means no response
pub fn status_class(status: u16) -> String {
    match status {
        0 => "no response".to_string(),
        s => format!("{}xx", s / 100),
    }
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Status: {}", stats.status);
    println!("  URLs discovered: {}", stats.discovered);
    println!("  Pages recorded: {}", stats.total_pages);
    println!("  Skipped (robots.txt): {}", stats.pages_skipped);
    println!("  Total links found: {}", stats.total_links);
    println!(
        "  Elapsed: {:.1}s ({:.2} pages/sec)",
        stats.elapsed_secs, stats.pages_per_sec
    );
    println!("  Average response time: {:.0}ms", stats.avg_response_time_ms);
    println!();

    println!("Pages by Status:");
    for (class, count) in &stats.status_classes {
        let percentage = if stats.total_pages > 0 {
            (*count as f64 / stats.total_pages as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", class, count, percentage);
    }
    println!();

    if stats.render_modes.len() > 1 {
        println!("Render Modes:");
        for (mode, count) in &stats.render_modes {
            println!("  {}: {}", mode, count);
        }
        println!();
    }

    if !stats.issues_by_kind.is_empty() {
        println!("Issues ({}):", stats.total_issues());
        for (severity, count) in &stats.issues_by_severity {
            println!("  {}: {}", severity, count);
        }
        println!();

        // Most frequent first
        let mut kinds: Vec<_> = stats.issues_by_kind.iter().collect();
        kinds.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        for (kind, count) in kinds {
            println!("  {}: {}", kind, count);
        }
        println!();
    }

    println!(
        "Success Rate: {:.1}% ({} / {} pages without errors)",
        stats.success_rate(),
        stats.pages_ok,
        stats.total_pages
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{
        CrawlCounters, CrawlStats, IssueRecord, PageRecord, RenderMode, SnapshotCursors,
    };

    fn page(path: &str, status: u16, depth: u32, time_ms: u64) -> PageRecord {
        let mut record = PageRecord::new(
            &format!("https://example.com{}", path),
            depth,
            None,
            RenderMode::Plain,
        );
        record.status_code = status;
        record.response_time_ms = time_ms;
        record
    }

    fn issue(kind: &str, severity: Severity) -> IssueRecord {
        IssueRecord {
            url: "https://example.com/".to_string(),
            issue_type: kind.to_string(),
            severity,
            category: "content".to_string(),
            detail: String::new(),
        }
    }

    fn create_test_snapshot() -> StatusSnapshot {
        StatusSnapshot {
            status: CrawlPhase::Completed,
            stats: CrawlStats {
                counters: CrawlCounters {
                    discovered: 5,
                    crawled: 2,
                    failed: 2,
                    skipped: 1,
                    ..CrawlCounters::default()
                },
                concurrency: 5,
                crawl_delay_ms: 0,
                started_at: None,
                finished_at: None,
                elapsed_secs: 2.0,
                pages_per_sec: 2.0,
            },
            urls: vec![
                page("/", 200, 0, 100),
                page("/a", 200, 1, 300),
                page("/b", 404, 1, 200),
                page("/c", 0, 2, 0),
            ],
            links: Vec::new(),
            issues: vec![
                issue("missing_title", Severity::Error),
                issue("missing_title", Severity::Error),
                issue("missing_lang", Severity::Warning),
            ],
            progress: 0.4,
            cursors: SnapshotCursors::default(),
            error: None,
        }
    }

    #[test]
    fn test_from_snapshot() {
        let stats = CrawlStatistics::from_snapshot(&create_test_snapshot());

        assert_eq!(stats.total_pages, 4);
        assert_eq!(stats.pages_ok, 2);
        assert_eq!(stats.pages_failed, 2);
        assert_eq!(stats.pages_skipped, 1);
        assert_eq!(stats.status_classes.get("2xx"), Some(&2));
        assert_eq!(stats.status_classes.get("4xx"), Some(&1));
        assert_eq!(stats.status_classes.get("no response"), Some(&1));
        assert_eq!(stats.depth_breakdown.get(&1), Some(&2));
        assert_eq!(stats.avg_response_time_ms, 200.0);
        assert_eq!(stats.render_modes.get("plain"), Some(&4));
    }

    #[test]
    fn test_issue_counts() {
        let stats = CrawlStatistics::from_snapshot(&create_test_snapshot());

        assert_eq!(stats.total_issues(), 3);
        assert_eq!(stats.issues_by_severity.get(&Severity::Error), Some(&2));
        assert_eq!(stats.issues_by_kind.get("missing_title"), Some(&2));
    }

    #[test]
    fn test_success_rate() {
        let stats = CrawlStatistics::from_snapshot(&create_test_snapshot());
        assert_eq!(stats.success_rate(), 50.0);
    }

    #[test]
    fn test_status_class() {
        assert_eq!(status_class(200), "2xx");
        assert_eq!(status_class(301), "3xx");
        assert_eq!(status_class(503), "5xx");
        assert_eq!(status_class(0), "no response");
    }
}
