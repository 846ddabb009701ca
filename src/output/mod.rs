//! Output module for crawl results
//!
//! This module handles:
//! - Aggregating crawl statistics for the CLI
//! - Generating markdown reports of finished crawls
//! - Writing and reading JSON checkpoints

mod checkpoint;
mod report;
pub mod stats;

pub use checkpoint::{read_checkpoint, write_checkpoint};
pub use report::{format_markdown_report, write_markdown_report};
pub use stats::{print_statistics, CrawlStatistics};
