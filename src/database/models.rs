/*!
 * Database entity models.
 *
 * These structures map directly to the status store tables and provide
 * type-safe access to persisted chapter progress.
 */

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of one chapter
///
/// Persisted as a small integer; the discriminants are part of the on-disk format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChapterState {
    /// Discovered, not yet attempted
    Pending = 0,
    /// A worker started on it (stale after a crash)
    InProgress = 1,
    /// Translated and written back
    Completed = 2,
    /// The last attempt failed
    Error = 3,
}

impl ChapterState {
    /// Integer code stored in the `state` column
    pub fn code(self) -> i64 {
        self as i64
    }

    /// Decode a `state` column value
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(ChapterState::Pending),
            1 => Some(ChapterState::InProgress),
            2 => Some(ChapterState::Completed),
            3 => Some(ChapterState::Error),
            _ => None,
        }
    }

    /// Whether the chapter must be picked up by the next run
    pub fn is_incomplete(self) -> bool {
        self != ChapterState::Completed
    }
}

impl fmt::Display for ChapterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChapterState::Pending => write!(f, "pending"),
            ChapterState::InProgress => write!(f, "in_progress"),
            ChapterState::Completed => write!(f, "completed"),
            ChapterState::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for ChapterState {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(ChapterState::Pending),
            "in_progress" => Ok(ChapterState::InProgress),
            "completed" => Ok(ChapterState::Completed),
            "error" => Ok(ChapterState::Error),
            _ => Err(anyhow::anyhow!("Invalid chapter state: {}", s)),
        }
    }
}

/// One row of the `chapters` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterRecord {
    /// Path relative to the working directory, `/`-separated
    pub path: String,
    /// Current lifecycle state
    pub state: ChapterState,
    /// Diagnostic text, only set when `state` is `Error`
    pub error_detail: Option<String>,
    /// Last transition timestamp (RFC 3339)
    pub updated_at: String,
}

/// Per-state chapter counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreSummary {
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub error: usize,
}

impl StoreSummary {
    /// Total number of chapters tracked
    pub fn total(&self) -> usize {
        self.pending + self.in_progress + self.completed + self.error
    }

    /// Number of chapters not yet completed
    pub fn incomplete(&self) -> usize {
        self.total() - self.completed
    }
}

impl fmt::Display for StoreSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} chapters: {} completed, {} pending, {} in progress, {} failed",
            self.total(),
            self.completed,
            self.pending,
            self.in_progress,
            self.error
        )
    }
}
