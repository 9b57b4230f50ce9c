//! Error types for the tile pipeline.
//!
//! Per-tile errors ([`TileError`]) are isolated to the coordinate that
//! produced them and aggregated by the executor. Run-level errors
//! ([`PipelineError`]) either reject the configuration before any work or
//! report that one or more levels finished with failed tiles.

use thiserror::Error;

use super::report::PipelineReport;
use crate::coord::CoordError;
use crate::extract::ExtractError;
use crate::store::StoreError;

/// Failure of a single tile.
#[derive(Debug, Error)]
pub enum TileError {
    /// The extractor could not produce the tile
    #[error("extraction failed: {0}")]
    Extract(#[from] ExtractError),

    /// The tile was extracted but could not be persisted
    #[error("write failed: {0}")]
    Store(#[from] StoreError),

    /// The extractor panicked on the blocking pool
    #[error("extractor panicked: {0}")]
    ExtractorPanicked(String),
}

/// Errors returned by the pipeline orchestrator.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Invalid settings, detected before any level runs
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("zoom_min ({zoom_min}) is greater than zoom_max ({zoom_max})")]
    InvalidZoomRange { zoom_min: u8, zoom_max: u8 },

    #[error("zoom_max ({zoom_max}) exceeds the supported maximum ({limit})")]
    ZoomTooHigh { zoom_max: u8, limit: u8 },

    #[error("max_concurrency must be at least 1")]
    ZeroConcurrency,

    #[error("coordinate error: {0}")]
    Coord(#[from] CoordError),

    /// The store could not be prepared
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// A level finished with failures and the run was aborted
    #[error("level {zoom} finished with {failed} failed tiles, remaining levels skipped")]
    LevelFailed {
        zoom: u8,
        failed: u64,
        report: Box<PipelineReport>,
    },

    /// Every level ran, but some tiles failed
    #[error("pipeline completed with {failed} failed tiles across {levels} levels")]
    CompletedWithFailures {
        failed: u64,
        levels: usize,
        report: Box<PipelineReport>,
    },
}

impl PipelineError {
    /// The partial report, if the error happened after levels started.
    pub fn report(&self) -> Option<&PipelineReport> {
        match self {
            Self::LevelFailed { report, .. } | Self::CompletedWithFailures { report, .. } => {
                Some(report)
            }
            _ => None,
        }
    }

    /// True if the error was raised before any tile was processed.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::Config(_)
                | Self::InvalidZoomRange { .. }
                | Self::ZoomTooHigh { .. }
                | Self::ZeroConcurrency
                | Self::Coord(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_tile_error_display() {
        let err = TileError::from(ExtractError::ZoomAboveMax {
            zoom: 15,
            max_zoom: 14,
        });
        assert_eq!(
            err.to_string(),
            "extraction failed: zoom 15 exceeds extractor max zoom 14"
        );
    }

    #[test]
    fn test_config_errors_are_flagged() {
        assert!(PipelineError::ZeroConcurrency.is_config_error());
        assert!(PipelineError::InvalidZoomRange {
            zoom_min: 5,
            zoom_max: 2
        }
        .is_config_error());

        let report = Box::new(PipelineReport::new(Utc::now()));
        let err = PipelineError::CompletedWithFailures {
            failed: 3,
            levels: 2,
            report,
        };
        assert!(!err.is_config_error());
        assert!(err.report().is_some());
        assert_eq!(
            err.to_string(),
            "pipeline completed with 3 failed tiles across 2 levels"
        );
    }
}
