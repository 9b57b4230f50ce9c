//! Tile generation pipeline.
//!
//! Drives the coordinate sweep of every zoom level through a bounded set of
//! concurrent workers.
//!
//! # Architecture
//!
//! ```text
//! PipelineOrchestrator ─► level z ─► CoordinateSpace ─► BoundedExecutor ─► extract ─► TileWriter
//!                          (sequential)                   (≤ N in flight)   (blocking pool)
//! ```
//!
//! # Key Components
//!
//! - [`ConcurrencyLimiter`] - semaphore with in-flight and peak counters
//! - [`BoundedExecutor`] - drains a lazy sequence with a fixed fan-out
//! - [`PipelineOrchestrator`] - runs levels in ascending order
//! - [`PipelineReport`] / [`LevelReport`] - per-run statistics
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tilepyramid::extract::FeatureIndex;
//! use tilepyramid::pipeline::{PipelineConfig, PipelineOrchestrator};
//! use tilepyramid::store::{MemoryTileStore, TileWriter};
//!
//! let config = PipelineConfig::default().with_zoom_range(0, 13);
//! let extractor = Arc::new(FeatureIndex::from_path("france.geojson", 13)?);
//! let writer = Arc::new(TileWriter::new(Arc::new(MemoryTileStore::new())));
//!
//! let report = PipelineOrchestrator::new(config, extractor, writer)?.run().await?;
//! ```

mod concurrency_limiter;
mod error;
mod executor;
mod orchestrator;
mod report;

pub use concurrency_limiter::{ConcurrencyLimiter, ConcurrencyPermit, LimiterClosed};
pub use error::{PipelineError, TileError};
pub use executor::{
    BoundedExecutor, ExecutionError, ExecutionSummary, ExecutorError, ExecutorState,
    FailureCause, ItemFailure, DEFAULT_FAILURE_LIMIT,
};
pub use orchestrator::{
    PipelineConfig, PipelineOrchestrator, DEFAULT_MAX_CONCURRENCY, DEFAULT_ZOOM_MAX,
    DEFAULT_ZOOM_MIN,
};
pub use report::{LevelReport, PipelineReport};
