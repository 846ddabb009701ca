//! Markdown report generation
//!
//! This module renders a finished crawl as a human-readable markdown
//! report: run information, page statistics, issue breakdown and the pages
//! that failed.

use crate::output::stats::CrawlStatistics;
use crate::state::StatusSnapshot;
use crate::Result;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Rows shown in the per-URL tables
const MAX_TABLE_ROWS: usize = 50;

/// Writes a markdown report of a crawl
///
/// # Arguments
///
/// * `snapshot` - A snapshot holding every record of the crawl
/// * `seed` - The crawl's seed URL
/// * `output_path` - Path where the markdown file should be written
pub fn write_markdown_report(
    snapshot: &StatusSnapshot,
    seed: &str,
    output_path: &Path,
) -> Result<()> {
    let markdown = format_markdown_report(snapshot, seed);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a crawl as markdown
pub fn format_markdown_report(snapshot: &StatusSnapshot, seed: &str) -> String {
    let stats = CrawlStatistics::from_snapshot(snapshot);
    let mut md = String::new();

    md.push_str("# Sumi-Lens Crawl Report\n\n");

    // Run metadata
    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Seed**: {}\n", seed));
    md.push_str(&format!("- **Status**: {}\n", snapshot.status));
    if let Some(started) = snapshot.stats.started_at {
        md.push_str(&format!("- **Started**: {}\n", started.to_rfc3339()));
    }
    if let Some(finished) = snapshot.stats.finished_at {
        md.push_str(&format!("- **Finished**: {}\n", finished.to_rfc3339()));
    }
    md.push_str(&format!(
        "- **Duration**: {:.1} seconds ({:.2} pages/sec)\n",
        stats.elapsed_secs, stats.pages_per_sec
    ));
    if let Some(error) = &snapshot.error {
        md.push_str(&format!("- **Error**: {}\n", error));
    }
    md.push('\n');

    md.push_str("## Overall Statistics\n\n");
    md.push_str(&format!("- **URLs Discovered**: {}\n", stats.discovered));
    md.push_str(&format!("- **Pages Recorded**: {}\n", stats.total_pages));
    md.push_str(&format!("- **Failed Pages**: {}\n", stats.pages_failed));
    md.push_str(&format!("- **Skipped (robots.txt)**: {}\n", stats.pages_skipped));
    md.push_str(&format!("- **Total Links**: {}\n", stats.total_links));
    md.push_str(&format!("- **Total Issues**: {}\n", stats.total_issues()));
    md.push_str(&format!(
        "- **Average Response Time**: {:.0}ms\n",
        stats.avg_response_time_ms
    ));
    md.push_str(&format!("- **Success Rate**: {:.2}%\n\n", stats.success_rate()));

    if !stats.status_classes.is_empty() {
        md.push_str("## Status Breakdown\n\n");
        md.push_str("| Status | Pages |\n");
        md.push_str("|--------|-------|\n");
        for (class, count) in &stats.status_classes {
            md.push_str(&format!("| {} | {} |\n", class, count));
        }
        md.push('\n');
    }

    if !stats.depth_breakdown.is_empty() {
        md.push_str("## Depth Breakdown\n\n");
        md.push_str("| Depth | Pages |\n");
        md.push_str("|-------|-------|\n");
        for (depth, count) in &stats.depth_breakdown {
            md.push_str(&format!("| {} | {} |\n", depth, count));
        }
        md.push('\n');
    }

    if !stats.issues_by_kind.is_empty() {
        md.push_str("## Issues\n\n");
        md.push_str("| Severity | Count |\n");
        md.push_str("|----------|-------|\n");
        for (severity, count) in &stats.issues_by_severity {
            md.push_str(&format!("| {} | {} |\n", severity, count));
        }
        md.push('\n');

        md.push_str("| Issue | Count |\n");
        md.push_str("|-------|-------|\n");
        let mut kinds: Vec<_> = stats.issues_by_kind.iter().collect();
        kinds.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        for (kind, count) in kinds {
            md.push_str(&format!("| {} | {} |\n", kind, count));
        }
        md.push('\n');
    }

    let failed: Vec<_> = snapshot.urls.iter().filter(|p| p.is_failure()).collect();
    if !failed.is_empty() {
        md.push_str("## Failed Pages\n\n");
        md.push_str("| URL | Status | Error |\n");
        md.push_str("|-----|--------|-------|\n");
        for page in failed.iter().take(MAX_TABLE_ROWS) {
            md.push_str(&format!(
                "| {} | {} | {} |\n",
                page.url,
                page.status_code,
                escape_cell(page.error.as_deref().unwrap_or(""))
            ));
        }
        if failed.len() > MAX_TABLE_ROWS {
            md.push_str(&format!("\n... and {} more\n", failed.len() - MAX_TABLE_ROWS));
        }
        md.push('\n');
    }

    let errors: Vec<_> = snapshot
        .issues
        .iter()
        .filter(|issue| issue.severity == crate::state::Severity::Error)
        .collect();
    if !errors.is_empty() {
        md.push_str("## Error-Level Issues\n\n");
        md.push_str("| URL | Issue | Detail |\n");
        md.push_str("|-----|-------|--------|\n");
        for issue in errors.iter().take(MAX_TABLE_ROWS) {
            md.push_str(&format!(
                "| {} | {} | {} |\n",
                issue.url,
                issue.issue_type,
                escape_cell(&issue.detail)
            ));
        }
        if errors.len() > MAX_TABLE_ROWS {
            md.push_str(&format!("\n... and {} more\n", errors.len() - MAX_TABLE_ROWS));
        }
        md.push('\n');
    }

    md
}

// Pipes and newlines would break the table row
fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{
        CrawlPhase, CrawlStats, IssueRecord, PageRecord, RenderMode, Severity, SnapshotCursors,
    };

    fn create_test_snapshot() -> StatusSnapshot {
        let mut ok = PageRecord::new("https://example.com/", 0, None, RenderMode::Plain);
        ok.status_code = 200;
        let mut broken = PageRecord::new("https://example.com/gone", 1, None, RenderMode::Plain);
        broken.status_code = 404;
        broken.error = Some("HTTP status 404".to_string());

        StatusSnapshot {
            status: CrawlPhase::Completed,
            stats: CrawlStats {
                counters: Default::default(),
                concurrency: 5,
                crawl_delay_ms: 1000,
                started_at: None,
                finished_at: None,
                elapsed_secs: 1.5,
                pages_per_sec: 1.3,
            },
            urls: vec![ok, broken],
            links: Vec::new(),
            issues: vec![IssueRecord {
                url: "https://example.com/gone".to_string(),
                issue_type: "client_error".to_string(),
                severity: Severity::Error,
                category: "status".to_string(),
                detail: "404 Not Found".to_string(),
            }],
            progress: 1.0,
            cursors: SnapshotCursors::default(),
            error: None,
        }
    }

    #[test]
    fn test_format_markdown_report() {
        let markdown = format_markdown_report(&create_test_snapshot(), "https://example.com/");

        assert!(markdown.contains("# Sumi-Lens Crawl Report"));
        assert!(markdown.contains("- **Seed**: https://example.com/"));
        assert!(markdown.contains("- **Status**: completed"));
        assert!(markdown.contains("| 2xx | 1 |"));
        assert!(markdown.contains("| 4xx | 1 |"));
        assert!(markdown.contains("| client_error | 1 |"));
    }

    #[test]
    fn test_failed_pages_table() {
        let markdown = format_markdown_report(&create_test_snapshot(), "https://example.com/");

        assert!(markdown.contains("## Failed Pages"));
        assert!(markdown.contains("| https://example.com/gone | 404 | HTTP status 404 |"));
        assert!(markdown.contains("## Error-Level Issues"));
    }

    #[test]
    fn test_empty_crawl_has_no_tables() {
        let mut snapshot = create_test_snapshot();
        snapshot.urls.clear();
        snapshot.issues.clear();
        let markdown = format_markdown_report(&snapshot, "https://example.com/");

        assert!(!markdown.contains("## Status Breakdown"));
        assert!(!markdown.contains("## Failed Pages"));
        assert!(markdown.contains("- **Pages Recorded**: 0"));
    }

    #[test]
    fn test_write_markdown_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.md");
        write_markdown_report(&create_test_snapshot(), "https://example.com/", &path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("# Sumi-Lens Crawl Report"));
    }

    #[test]
    fn test_escape_cell() {
        assert_eq!(escape_cell("a|b\nc"), "a\\|b c");
    }
}
