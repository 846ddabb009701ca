//! Sumi-Lens main entry point
//!
//! This is the command-line interface for the Sumi-Lens SEO crawler.

use anyhow::{bail, Context};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::time::Duration;
use sumi_lens::config::{load_config_with_hash, validate, CrawlConfig};
use sumi_lens::output::{
    print_statistics, read_checkpoint, write_checkpoint, write_markdown_report, CrawlStatistics,
};
use sumi_lens::state::{CrawlPhase, SnapshotCursors, StatusSnapshot};
use sumi_lens::url::active_patterns;
use sumi_lens::{normalize, CrawlEngine};
use tracing_subscriber::EnvFilter;

/// Sumi-Lens: a concurrent SEO crawler
///
/// Sumi-Lens crawls a site from a seed URL, analyzes every page for SEO
/// signals and reports issues such as missing titles, broken links and
/// duplicate content.
#[derive(Parser, Debug)]
#[command(name = "sumi-lens")]
#[command(version = "1.0.0")]
#[command(about = "A concurrent SEO crawler", long_about = None)]
struct Cli {
    /// Seed URL to start crawling from
    #[arg(value_name = "SEED", required_unless_present = "resume")]
    seed: Option<String>,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Write a JSON checkpoint here when the crawl ends or is interrupted
    #[arg(long, value_name = "FILE")]
    checkpoint: Option<PathBuf>,

    /// Resume the crawl saved in a checkpoint file
    #[arg(long, value_name = "FILE", conflicts_with_all = ["seed", "config"])]
    resume: Option<PathBuf>,

    /// Write a markdown report here when the crawl ends
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,

    /// Seconds between progress polls
    #[arg(long, value_name = "SECS", default_value_t = 2)]
    poll_interval: u64,

    /// Validate config and seed without crawling
    #[arg(long, conflicts_with = "resume")]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    let (config, config_hash) = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (config, Some(hash))
        }
        None => {
            tracing::info!("No configuration file given, using defaults");
            (CrawlConfig::default(), None)
        }
    };

    if cli.dry_run {
        let seed = cli.seed.as_deref().unwrap_or_default();
        return handle_dry_run(&config, seed);
    }

    let engine = CrawlEngine::new();
    let seed = match &cli.resume {
        Some(path) => {
            tracing::info!("Resuming crawl from checkpoint {}", path.display());
            let checkpoint = read_checkpoint(path)?;
            let seed = checkpoint.seed.clone();
            engine.restore(checkpoint)?;
            seed
        }
        None => {
            let seed = cli.seed.clone().unwrap_or_default();
            engine.start_with_hash(&seed, config, config_hash)?;
            seed
        }
    };

    let poll_interval = Duration::from_secs(cli.poll_interval.max(1));
    let interrupted = monitor(&engine, poll_interval, cli.checkpoint.as_deref()).await?;
    let phase = engine.wait().await;

    let snapshot = engine.status_snapshot(SnapshotCursors::default());
    if !cli.quiet {
        print_statistics(&CrawlStatistics::from_snapshot(&snapshot));
    }

    if let Some(path) = &cli.checkpoint {
        if !interrupted {
            write_checkpoint(path, &engine.checkpoint())?;
        }
    }
    if let Some(path) = &cli.report {
        write_markdown_report(&snapshot, &seed, path)?;
        tracing::info!("Report written to {}", path.display());
    }

    if phase == CrawlPhase::Failed {
        bail!(
            "Crawl failed: {}",
            snapshot.error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_lens=info,warn"),
            1 => EnvFilter::new("sumi_lens=debug,info"),
            2 => EnvFilter::new("sumi_lens=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Polls the engine until the crawl ends or Ctrl-C is pressed
///
/// On Ctrl-C the crawl is checkpointed (when a path is given) and stopped.
/// Returns whether the crawl was interrupted.
async fn monitor(
    engine: &CrawlEngine,
    interval: Duration,
    checkpoint: Option<&Path>,
) -> anyhow::Result<bool> {
    let mut ticker = tokio::time::interval(interval);
    let mut cursors = SnapshotCursors::default();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                tracing::warn!("Interrupted, stopping crawl");
                // Taken before stopping so queued and in-flight URLs are kept
                if let Some(path) = checkpoint {
                    write_checkpoint(path, &engine.checkpoint())?;
                }
                engine.stop();
                return Ok(true);
            }
            _ = ticker.tick() => {
                let snapshot = engine.status_snapshot(cursors);
                log_progress(&snapshot);
                cursors = snapshot.cursors;
                if snapshot.status.is_terminal() {
                    return Ok(false);
                }
            }
        }
    }
}

/// Logs the records that arrived since the previous poll
fn log_progress(snapshot: &StatusSnapshot) {
    for page in &snapshot.urls {
        match &page.error {
            Some(error) => tracing::debug!("  [{}] {} ({})", page.status_code, page.url, error),
            None => tracing::debug!("  [{}] {}", page.status_code, page.url),
        }
    }
    for issue in &snapshot.issues {
        tracing::trace!("  {} {}: {}", issue.severity, issue.issue_type, issue.url);
    }

    let counters = snapshot.stats.counters;
    tracing::info!(
        "[{}] {:.0}% - {} crawled, {} failed, {} queued, {} in flight, {} discovered (+{} issues)",
        snapshot.status,
        snapshot.progress * 100.0,
        counters.crawled,
        counters.failed,
        counters.queued,
        counters.in_flight,
        counters.discovered,
        snapshot.issues.len()
    );
}

/// Handles the --dry-run mode: validates config and seed, shows the settings
fn handle_dry_run(config: &CrawlConfig, seed: &str) -> anyhow::Result<()> {
    validate(config)?;
    let root = normalize(seed, None).with_context(|| format!("Invalid seed URL: {}", seed))?;

    println!("=== Sumi-Lens Dry Run ===\n");
    println!("Seed: {}\n", root);

    println!("Crawler Configuration:");
    println!("  Max depth: {}", config.crawler.max_depth);
    println!("  Max URLs: {}", config.crawler.max_urls);
    println!("  Concurrency: {}", config.crawler.concurrency);
    println!("  Crawl delay: {}ms", config.crawler.crawl_delay);
    println!("  Max file size: {} bytes", config.crawler.max_file_size);
    println!("  Crawl external links: {}", config.crawler.crawl_external);
    println!("  Respect robots.txt: {}", config.crawler.respect_robots);

    println!("\nHTTP:");
    println!("  User agent: {}", config.http.user_agent);
    println!("  Timeout: {}s", config.http.timeout);
    println!(
        "  Retries: {} (backoff {}ms, max {}ms)",
        config.http.retries, config.http.retry_backoff, config.http.retry_backoff_max
    );
    if let Some(proxy) = &config.http.proxy_url {
        println!("  Proxy: {}", proxy);
    }

    println!("\nJavaScript Rendering:");
    if config.javascript.enabled {
        println!("  Service: {}", config.javascript.service_url);
        println!("  Max concurrent pages: {}", config.javascript.max_concurrent_pages);
    } else {
        println!("  Disabled");
    }

    println!("\nIssues:");
    println!(
        "  Exclusion patterns: {}",
        active_patterns(&config.issues.exclusion_patterns).count()
    );
    if config.issues.duplication_check {
        println!(
            "  Duplicate detection threshold: {:.2}",
            config.issues.duplication_threshold
        );
    } else {
        println!("  Duplicate detection: disabled");
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would start crawling from {}", root);

    Ok(())
}
