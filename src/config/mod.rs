//! Configuration module for Sumi-Lens
//!
//! This module handles loading, parsing, and validating TOML crawl
//! configuration. Every key has a default, so partial files are accepted.
//!
//! # Example
//!
//! ```no_run
//! use sumi_lens::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crawl.toml")).unwrap();
//! println!("Crawler will use max depth: {}", config.crawler.max_depth);
//! ```

mod defaults;
mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    CrawlConfig, CrawlerConfig, FilterConfig, HttpConfig, IssueConfig, JavascriptConfig,
    SettingsUpdate,
};

// Re-export parser and validation functions
pub use defaults::issue_exclusion_patterns;
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::{validate, validate_update};
