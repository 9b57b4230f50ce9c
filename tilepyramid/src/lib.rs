//! TilePyramid - Multi-resolution map tile generation
//!
//! This library turns a geographic feature collection into a pyramid of
//! pre-rendered tiles, one level per zoom, persisted by `(z, x, y)` into a
//! queryable tile store.
//!
//! # High-Level API
//!
//! The [`pipeline`] module ties the pieces together:
//!
//! ```ignore
//! use std::sync::Arc;
//! use tilepyramid::extract::FeatureIndex;
//! use tilepyramid::pipeline::{PipelineConfig, PipelineOrchestrator};
//! use tilepyramid::store::{SqliteTileStore, TileWriter};
//!
//! let config = PipelineConfig::default();
//! let extractor = Arc::new(FeatureIndex::from_path("france.geojson", config.zoom_max)?);
//! let store = Arc::new(SqliteTileStore::open("tiles.sqlite", "tiles")?);
//! let writer = Arc::new(TileWriter::new(store));
//!
//! let report = PipelineOrchestrator::new(config, extractor, writer)?.run().await?;
//! ```

pub mod config;
pub mod coord;
pub mod extract;
pub mod logging;
pub mod pipeline;
pub mod store;

/// Version of the TilePyramid library and CLI.
///
/// This is synchronized across all components in the workspace.
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
