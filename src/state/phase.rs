/// Crawl lifecycle phases
///
/// `Idle → Running ⇄ Paused → Completed | Cancelled | Failed`
use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents the lifecycle phase of a crawl session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlPhase {
    // ===== Initial State =====
    /// No crawl has been started
    Idle,

    // ===== Active States =====
    /// Workers are dequeuing and fetching
    Running,

    /// Workers finish in-flight fetches but dequeue nothing new
    Paused,

    // ===== Terminal States =====
    /// Frontier drained with nothing in flight
    Completed,

    /// Stopped by the caller
    Cancelled,

    /// Fatal configuration or seed error
    Failed,
}

impl CrawlPhase {
    /// Returns true if this is a terminal phase (workers have been released)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }

    /// Returns true while workers are alive (running or paused)
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Running | Self::Paused)
    }

    /// Whether a new crawl may be started from this phase
    pub fn can_start(&self) -> bool {
        !self.is_active()
    }

    /// Converts the phase to its string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        }
    }

    /// Parses a phase from its string representation
    ///
    /// Returns None if the string doesn't match any known phase.
    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "idle" => Some(Self::Idle),
            "running" => Some(Self::Running),
            "paused" => Some(Self::Paused),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Default for CrawlPhase {
    fn default() -> Self {
        Self::Idle
    }
}
