//! Bounding windows and the per-zoom coordinate space they cover.
//!
//! A [`BoundingWindow`] is expressed at a reference zoom level. When the
//! pipeline sweeps a zoom level, the window is rescaled to that level:
//!
//! ```text
//! zoom >= reference   bounds * 2^(zoom - reference)
//! zoom <  reference   [0, 2^zoom) on both axes
//! ```
//!
//! Below the reference zoom a single tile is coarser than the window, so the
//! whole level is enumerated and the extractor decides which tiles are empty.

use thiserror::Error;

use super::types::{tiles_per_axis, CoordError, TileCoord, MAX_ZOOM};

/// Reference zoom of the default window.
pub const DEFAULT_REFERENCE_ZOOM: u8 = 13;

/// Default window bounds at zoom 13 (metropolitan France).
pub const DEFAULT_X_MIN: u32 = 3900;
pub const DEFAULT_X_MAX: u32 = 4400;
pub const DEFAULT_Y_MIN: u32 = 2700;
pub const DEFAULT_Y_MAX: u32 = 3100;

/// Errors raised when a window is constructed with impossible bounds.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WindowError {
    #[error("reference zoom {0} exceeds maximum zoom {max}", max = MAX_ZOOM)]
    InvalidReferenceZoom(u8),

    #[error("empty {axis} range: min {min} must be below max {max}")]
    EmptyRange { axis: char, min: u32, max: u32 },

    #[error("{axis} max {max} exceeds the {limit} tiles available at zoom {zoom}")]
    OutOfGrid {
        axis: char,
        max: u32,
        limit: u64,
        zoom: u8,
    },
}

/// Rectangle of tiles, half-open on both axes, anchored at a reference zoom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingWindow {
    reference_zoom: u8,
    x_min: u32,
    x_max: u32,
    y_min: u32,
    y_max: u32,
}

impl BoundingWindow {
    /// Creates a window; `min` bounds are inclusive, `max` bounds exclusive.
    pub fn new(
        reference_zoom: u8,
        x_min: u32,
        x_max: u32,
        y_min: u32,
        y_max: u32,
    ) -> Result<Self, WindowError> {
        if reference_zoom > MAX_ZOOM {
            return Err(WindowError::InvalidReferenceZoom(reference_zoom));
        }
        let limit = tiles_per_axis(reference_zoom);
        for (axis, min, max) in [('x', x_min, x_max), ('y', y_min, y_max)] {
            if min >= max {
                return Err(WindowError::EmptyRange { axis, min, max });
            }
            if u64::from(max) > limit {
                return Err(WindowError::OutOfGrid {
                    axis,
                    max,
                    limit,
                    zoom: reference_zoom,
                });
            }
        }

        Ok(Self {
            reference_zoom,
            x_min,
            x_max,
            y_min,
            y_max,
        })
    }

    /// Window covering the entire grid at zoom 0, i.e. no restriction.
    pub fn world() -> Self {
        Self {
            reference_zoom: 0,
            x_min: 0,
            x_max: 1,
            y_min: 0,
            y_max: 1,
        }
    }

    pub fn reference_zoom(&self) -> u8 {
        self.reference_zoom
    }

    pub fn x_bounds(&self) -> (u32, u32) {
        (self.x_min, self.x_max)
    }

    pub fn y_bounds(&self) -> (u32, u32) {
        (self.y_min, self.y_max)
    }

    /// Rescales the window to `zoom`.
    pub fn rescale(&self, zoom: u8) -> Result<TileRange, CoordError> {
        if zoom > MAX_ZOOM {
            return Err(CoordError::InvalidZoom(zoom));
        }

        if zoom < self.reference_zoom {
            // Bounded by 2^24, always fits in u32.
            let n = tiles_per_axis(zoom) as u32;
            return Ok(TileRange {
                zoom,
                x_min: 0,
                x_max: n,
                y_min: 0,
                y_max: n,
            });
        }

        let shift = zoom - self.reference_zoom;
        Ok(TileRange {
            zoom,
            x_min: self.x_min << shift,
            x_max: self.x_max << shift,
            y_min: self.y_min << shift,
            y_max: self.y_max << shift,
        })
    }
}

impl Default for BoundingWindow {
    fn default() -> Self {
        Self {
            reference_zoom: DEFAULT_REFERENCE_ZOOM,
            x_min: DEFAULT_X_MIN,
            x_max: DEFAULT_X_MAX,
            y_min: DEFAULT_Y_MIN,
            y_max: DEFAULT_Y_MAX,
        }
    }
}

/// A window rescaled to one concrete zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRange {
    pub zoom: u8,
    pub x_min: u32,
    pub x_max: u32,
    pub y_min: u32,
    pub y_max: u32,
}

impl TileRange {
    /// Number of tiles in the range.
    #[inline]
    pub fn tile_count(&self) -> u64 {
        u64::from(self.x_max.saturating_sub(self.x_min))
            * u64::from(self.y_max.saturating_sub(self.y_min))
    }
}

/// Lazy cursor over every tile of a [`TileRange`].
///
/// Yields all rows of a column before advancing to the next column. The
/// cursor is single-pass; build a new one (or clone a fresh one) to
/// enumerate the level again.
#[derive(Debug, Clone)]
pub struct CoordinateSpace {
    range: TileRange,
    next_x: u32,
    next_y: u32,
}

impl CoordinateSpace {
    /// Builds the coordinate space of `window` at `zoom`.
    pub fn new(zoom: u8, window: &BoundingWindow) -> Result<Self, CoordError> {
        Ok(Self::from_range(window.rescale(zoom)?))
    }

    pub fn from_range(range: TileRange) -> Self {
        Self {
            range,
            next_x: range.x_min,
            next_y: range.y_min,
        }
    }

    pub fn range(&self) -> &TileRange {
        &self.range
    }

    /// Returns a fresh cursor positioned at the first tile.
    pub fn restart(&self) -> Self {
        Self::from_range(self.range)
    }

    /// Number of tiles not yet yielded.
    pub fn remaining(&self) -> u64 {
        if self.next_x >= self.range.x_max || self.range.y_min >= self.range.y_max {
            return 0;
        }
        let column_height = u64::from(self.range.y_max - self.range.y_min);
        let full_columns = u64::from(self.range.x_max - self.next_x);
        full_columns * column_height - u64::from(self.next_y - self.range.y_min)
    }
}

impl Iterator for CoordinateSpace {
    type Item = TileCoord;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_x >= self.range.x_max || self.range.y_min >= self.range.y_max {
            return None;
        }

        let tile = TileCoord {
            zoom: self.range.zoom,
            x: self.next_x,
            y: self.next_y,
        };

        self.next_y += 1;
        if self.next_y >= self.range.y_max {
            self.next_y = self.range.y_min;
            self.next_x += 1;
        }

        Some(tile)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match usize::try_from(self.remaining()) {
            Ok(n) => (n, Some(n)),
            Err(_) => (usize::MAX, None),
        }
    }
}

impl ExactSizeIterator for CoordinateSpace {}

impl std::iter::FusedIterator for CoordinateSpace {}
