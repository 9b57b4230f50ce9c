//! Per-level and per-run statistics.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Outcome of one zoom level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LevelReport {
    pub zoom: u8,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed: Duration,
    /// Coordinates in the level's space
    pub expected: u64,
    /// Coordinates handed to the extractor
    pub visited: u64,
    /// Tiles newly stored
    pub written: u64,
    /// Tiles already present in the store
    pub skipped: u64,
    /// Coordinates with no content
    pub empty: u64,
    /// Coordinates whose extraction or write failed
    pub failed: u64,
    pub peak_in_flight: usize,
    pub cancelled: bool,
}

impl LevelReport {
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

impl fmt::Display for LevelReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "z{}: {} visited, {} written, {} skipped, {} empty, {} failed in {:.2}s",
            self.zoom,
            self.visited,
            self.written,
            self.skipped,
            self.empty,
            self.failed,
            self.elapsed.as_secs_f64()
        )
    }
}

/// Outcome of a full pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub elapsed: Duration,
    /// Completed levels in execution order
    pub levels: Vec<LevelReport>,
    /// The run stopped early on a cancellation request
    pub cancelled: bool,
}

impl PipelineReport {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            finished_at: None,
            elapsed: Duration::ZERO,
            levels: Vec::new(),
            cancelled: false,
        }
    }

    pub fn level(&self, zoom: u8) -> Option<&LevelReport> {
        self.levels.iter().find(|l| l.zoom == zoom)
    }

    pub fn total_visited(&self) -> u64 {
        self.levels.iter().map(|l| l.visited).sum()
    }

    pub fn total_written(&self) -> u64 {
        self.levels.iter().map(|l| l.written).sum()
    }

    pub fn total_skipped(&self) -> u64 {
        self.levels.iter().map(|l| l.skipped).sum()
    }

    pub fn total_empty(&self) -> u64 {
        self.levels.iter().map(|l| l.empty).sum()
    }

    pub fn total_failed(&self) -> u64 {
        self.levels.iter().map(|l| l.failed).sum()
    }

    pub(crate) fn finish(&mut self, elapsed: Duration) {
        self.finished_at = Some(Utc::now());
        self.elapsed = elapsed;
    }
}
