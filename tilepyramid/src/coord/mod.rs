//! Coordinate module
//!
//! Provides the Web Mercator projection from longitude/latitude onto the
//! tile grid, plus the bounding windows and lazy coordinate spaces the
//! pipeline sweeps level by level.

mod types;
mod window;

pub use types::{
    tiles_per_axis, CoordError, TileCoord, MAX_LAT, MAX_LON, MAX_ZOOM, MIN_LAT, MIN_LON, MIN_ZOOM,
};
pub use window::{
    BoundingWindow, CoordinateSpace, TileRange, WindowError, DEFAULT_REFERENCE_ZOOM,
    DEFAULT_X_MAX, DEFAULT_X_MIN, DEFAULT_Y_MAX, DEFAULT_Y_MIN,
};

use std::f64::consts::PI;

use geo::{coord, Rect};

/// Projects a longitude/latitude position onto the tile grid at `zoom`.
///
/// The integer part of each axis is the tile column (row) and the fraction
/// is the position inside that tile, with `y` growing southwards. Positions
/// beyond the Web Mercator limits are clamped to the edge of the grid.
#[inline]
pub fn project(lon: f64, lat: f64, zoom: u8) -> (f64, f64) {
    let n = tiles_per_axis(zoom) as f64;
    let lon = lon.clamp(MIN_LON, MAX_LON);
    let lat_rad = lat.clamp(MIN_LAT, MAX_LAT).to_radians();

    let x = (lon + 180.0) / 360.0 * n;
    let y = (1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n;
    (x, y)
}

/// Converts tile coordinates back to geographic coordinates.
///
/// Returns the latitude/longitude of the tile's northwest corner.
#[inline]
pub fn tile_to_lat_lon(tile: &TileCoord) -> (f64, f64) {
    corner_to_lat_lon(tile.zoom, f64::from(tile.x), f64::from(tile.y))
}

/// Geographic bounds covered by a tile, with `x` as longitude and `y` as
/// latitude.
pub fn tile_bounds(tile: &TileCoord) -> Rect<f64> {
    let (north, west) = tile_to_lat_lon(tile);
    let (south, east) =
        corner_to_lat_lon(tile.zoom, f64::from(tile.x) + 1.0, f64::from(tile.y) + 1.0);
    Rect::new(coord! { x: west, y: south }, coord! { x: east, y: north })
}

fn corner_to_lat_lon(zoom: u8, x: f64, y: f64) -> (f64, f64) {
    let n = tiles_per_axis(zoom) as f64;
    let lon = x / n * 360.0 - 180.0;
    let lat_rad = (PI * (1.0 - 2.0 * y / n)).sinh().atan();
    (lat_rad.to_degrees(), lon)
}

#[cfg(test)]
mod tests;
