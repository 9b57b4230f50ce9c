//! Coordinate type definitions

use std::fmt;

/// Web Mercator valid latitude range
pub const MIN_LAT: f64 = -85.05112878;
pub const MAX_LAT: f64 = 85.05112878;

/// Valid longitude range
pub const MIN_LON: f64 = -180.0;
pub const MAX_LON: f64 = 180.0;

/// Zoom levels supported by the pyramid generator.
///
/// Columns and rows are stored as `u32`, so 2^24 tiles per axis leaves
/// plenty of headroom.
pub const MIN_ZOOM: u8 = 0;
pub const MAX_ZOOM: u8 = 24;

/// Tile coordinates in the Web Mercator / Slippy Map system.
///
/// `x` grows eastwards from the antimeridian, `y` grows southwards from the
/// northern edge of the projection. Both are bounded by `2^zoom`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
    /// Zoom level (0-24)
    pub zoom: u8,
    /// X coordinate (east-west), 0 at west
    pub x: u32,
    /// Y coordinate (north-south), 0 at north
    pub y: u32,
}

impl TileCoord {
    /// Creates a tile coordinate, validating it against the zoom level.
    pub fn new(zoom: u8, x: u32, y: u32) -> Result<Self, CoordError> {
        if zoom > MAX_ZOOM {
            return Err(CoordError::InvalidZoom(zoom));
        }
        let n = tiles_per_axis(zoom);
        if u64::from(x) >= n || u64::from(y) >= n {
            return Err(CoordError::OutOfRange { zoom, x, y });
        }
        Ok(Self { zoom, x, y })
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}

/// Number of tiles along one axis at the given zoom level.
#[inline]
pub fn tiles_per_axis(zoom: u8) -> u64 {
    1u64 << zoom
}

/// Errors raised when building tile coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordError {
    /// Zoom level is outside valid range (0 to 24)
    InvalidZoom(u8),
    /// Column or row does not exist at this zoom level
    OutOfRange { zoom: u8, x: u32, y: u32 },
}

impl fmt::Display for CoordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordError::InvalidZoom(zoom) => {
                write!(
                    f,
                    "Invalid zoom level: {} (must be between {} and {})",
                    zoom, MIN_ZOOM, MAX_ZOOM
                )
            }
            CoordError::OutOfRange { zoom, x, y } => {
                write!(
                    f,
                    "Tile {}/{}/{} is outside the {}x{} grid",
                    zoom,
                    x,
                    y,
                    tiles_per_axis(*zoom),
                    tiles_per_axis(*zoom)
                )
            }
        }
    }
}

impl std::error::Error for CoordError {}
