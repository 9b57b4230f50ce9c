//! Tile extraction.
//!
//! An extractor turns a tile coordinate into an encoded tile payload. It is
//! pure and synchronous; the pipeline runs it on the blocking pool.
//! `Ok(None)` means the tile has no content and nothing is written.

mod features;
mod geojson;
mod vector_tile;

pub use features::FeatureIndex;
pub use vector_tile::{BUFFER, EXTENT, LAYER_NAME};

use std::path::PathBuf;

use thiserror::Error;

use crate::coord::{TileCoord, MAX_ZOOM};

/// Errors raised while building an extractor or extracting a tile.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid GeoJSON: {0}")]
    InvalidGeoJson(String),

    #[error("vector tile encoding failed: {0}")]
    Encode(#[from] mvt::Error),

    #[error("zoom {zoom} exceeds extractor max zoom {max_zoom}")]
    ZoomAboveMax { zoom: u8, max_zoom: u8 },
}

/// Produces the payload of a single tile.
pub trait TileExtractor: Send + Sync {
    /// Returns the encoded tile, or `None` when the tile is empty.
    fn extract(&self, coord: &TileCoord) -> Result<Option<Vec<u8>>, ExtractError>;

    /// Highest zoom level this extractor was prepared for.
    fn max_zoom(&self) -> u8 {
        MAX_ZOOM
    }
}
