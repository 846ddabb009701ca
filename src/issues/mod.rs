//! Issue detection for Sumi-Lens
//!
//! This module contains the per-page SEO checks and the exclusion rules
//! that suppress issues for matching URLs.

mod detector;
mod exclusion;

pub use detector::{detect_issues, status_message, IssueKind};
pub use exclusion::{filter_issues, ExclusionRules};
