//! GeoJSON-backed extractor.
//!
//! Features are loaded once and their bounding boxes bulk-loaded into an
//! R-tree. A tile holds every feature whose box touches the tile's bounds,
//! encoded as a vector tile (see [`super::vector_tile`]).

use std::path::Path;

use geo::{BoundingRect, Rect};
use rstar::{RTree, RTreeObject, AABB};
use serde_json::Value;
use tracing::{debug, info};

use super::geojson::{read_features, SourceFeature};
use super::{vector_tile, ExtractError, TileExtractor};
use crate::coord::{tile_bounds, TileCoord, MAX_ZOOM};

#[derive(Debug, Clone)]
struct FeatureBox {
    idx: usize, // Index into FeatureIndex::features
    bbox: Rect<f64>,
}

impl RTreeObject for FeatureBox {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.bbox.min().into(), self.bbox.max().into())
    }
}

/// In-memory feature set with a spatial index over feature bounds.
#[derive(Debug, Clone)]
pub struct FeatureIndex {
    features: Vec<SourceFeature>,
    rtree: RTree<FeatureBox>,
    max_zoom: u8,
    skipped: usize,
}

impl FeatureIndex {
    /// Loads a GeoJSON file.
    pub fn from_path(path: impl AsRef<Path>, max_zoom: u8) -> Result<Self, ExtractError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ExtractError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let index = Self::from_json(&text, max_zoom)?;
        match index.extent() {
            Some(extent) => info!(
                path = %path.display(),
                features = index.len(),
                skipped = index.skipped,
                max_zoom,
                west = extent.min().x,
                south = extent.min().y,
                east = extent.max().x,
                north = extent.max().y,
                "Loaded feature index"
            ),
            None => info!(
                path = %path.display(),
                skipped = index.skipped,
                "Loaded feature index with no features"
            ),
        }
        Ok(index)
    }

    pub fn from_json(text: &str, max_zoom: u8) -> Result<Self, ExtractError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value, max_zoom)
    }

    /// Builds an index from a parsed GeoJSON object.
    ///
    /// Accepts a `FeatureCollection`, a single `Feature` or a bare geometry.
    /// Features without a geometry or without any position are skipped.
    pub fn from_value(value: Value, max_zoom: u8) -> Result<Self, ExtractError> {
        if max_zoom > MAX_ZOOM {
            return Err(ExtractError::InvalidGeoJson(format!(
                "max zoom {} exceeds {}",
                max_zoom, MAX_ZOOM
            )));
        }

        let (parsed, mut skipped) = read_features(value)?;
        let mut features = Vec::with_capacity(parsed.len());
        let mut boxes = Vec::with_capacity(parsed.len());

        for feature in parsed {
            let Some(bbox) = feature.geometry.bounding_rect() else {
                skipped += 1;
                continue;
            };
            boxes.push(FeatureBox {
                idx: features.len(),
                bbox,
            });
            features.push(feature);
        }

        Ok(Self {
            features,
            rtree: RTree::bulk_load(boxes),
            max_zoom,
            skipped,
        })
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Features dropped during loading because they had no geometry.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Bounding box of all indexed features (`x` is longitude).
    pub fn extent(&self) -> Option<Rect<f64>> {
        if self.rtree.size() == 0 {
            return None;
        }
        let envelope = self.rtree.root().envelope();
        Some(Rect::new(envelope.lower(), envelope.upper()))
    }

    /// Indices of the features whose bounds touch the tile, in input order.
    fn hits(&self, coord: &TileCoord) -> Vec<usize> {
        let bounds = tile_bounds(coord);
        let query = AABB::from_corners(bounds.min().into(), bounds.max().into());
        let mut hits: Vec<usize> = self
            .rtree
            .locate_in_envelope_intersecting(&query)
            .map(|b| b.idx)
            .collect();
        hits.sort_unstable();
        hits
    }
}

impl TileExtractor for FeatureIndex {
    fn extract(&self, coord: &TileCoord) -> Result<Option<Vec<u8>>, ExtractError> {
        if coord.zoom > self.max_zoom {
            return Err(ExtractError::ZoomAboveMax {
                zoom: coord.zoom,
                max_zoom: self.max_zoom,
            });
        }

        let hits = self.hits(coord);
        if hits.is_empty() {
            return Ok(None);
        }

        let features: Vec<&SourceFeature> = hits.iter().map(|&i| &self.features[i]).collect();
        let payload = vector_tile::encode(coord, &features)?;
        debug!(
            tile = %coord,
            features = features.len(),
            bytes = payload.as_ref().map_or(0, Vec::len),
            "Extracted tile"
        );
        Ok(payload)
    }

    fn max_zoom(&self) -> u8 {
        self.max_zoom
    }
}
