//! Checkpoint files
//!
//! Checkpoints are stored as pretty-printed JSON. Writes go to a sibling
//! temporary file that is renamed over the target, so an interrupted write
//! never leaves a truncated checkpoint behind.

use crate::state::CrawlCheckpoint;
use crate::{LensError, Result};
use std::fs;
use std::path::Path;

/// Writes `checkpoint` to `path`
pub fn write_checkpoint(path: &Path, checkpoint: &CrawlCheckpoint) -> Result<()> {
    let json = serde_json::to_string_pretty(checkpoint)?;
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;

    tracing::info!(
        "Checkpoint written to {} ({} pages, {} queued)",
        path.display(),
        checkpoint.pages.len(),
        checkpoint.frontier.len()
    );
    Ok(())
}

/// Reads a checkpoint written by [`write_checkpoint`]
pub fn read_checkpoint(path: &Path) -> Result<CrawlCheckpoint> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| {
        LensError::Checkpoint(format!("Invalid checkpoint {}: {}", path.display(), e))
    })
}
