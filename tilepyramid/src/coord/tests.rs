//! Tests for coordinate conversion

use super::*;

/// Tile holding a lat/lon position, with the eastern and southern edges
/// folded into the last column/row.
fn tile_at(lat: f64, lon: f64, zoom: u8) -> TileCoord {
    let (x, y) = project(lon, lat, zoom);
    let last = tiles_per_axis(zoom) - 1;
    TileCoord::new(
        zoom,
        (x as u64).min(last) as u32,
        (y as u64).min(last) as u32,
    )
    .unwrap()
}

#[test]
fn test_new_york_city_at_zoom_16() {
    let tile = tile_at(40.7128, -74.0060, 16);
    assert_eq!(tile.x, 19295);
    assert_eq!(tile.y, 24640);
    assert_eq!(tile.zoom, 16);
}

#[test]
fn test_london_at_zoom_10() {
    let tile = tile_at(51.5074, -0.1278, 10);
    assert_eq!(tile.x, 511);
    assert_eq!(tile.y, 340);
}

#[test]
fn test_paris_falls_inside_default_window() {
    let tile = tile_at(48.8566, 2.3522, 13);
    assert_eq!((tile.x, tile.y), (4149, 2818));

    let range = BoundingWindow::default().rescale(13).unwrap();
    assert!((range.x_min..range.x_max).contains(&tile.x));
    assert!((range.y_min..range.y_max).contains(&tile.y));
}

#[test]
fn test_equator_prime_meridian() {
    let (x, y) = project(0.0, 0.0, 1);
    assert!((x - 1.0).abs() < 1e-12);
    assert!((y - 1.0).abs() < 1e-12);
    assert_eq!(tile_at(0.0, 0.0, 1), TileCoord::new(1, 1, 1).unwrap());
}

#[test]
fn test_eastern_edge_is_clamped_into_grid() {
    let tile = tile_at(0.0, 180.0, 3);
    assert_eq!(tile.x, 7);
}

#[test]
fn test_fraction_is_position_inside_tile() {
    let (x, y) = project(2.3522, 48.8566, 13);
    assert_eq!((x.floor(), y.floor()), (4149.0, 2818.0));
    assert!(x.fract() > 0.0 && y.fract() > 0.0);
}

#[test]
fn test_poles_are_clamped_to_grid_edges() {
    let (_, north) = project(0.0, 90.0, 10);
    let (_, south) = project(0.0, -90.0, 10);
    assert!(north.abs() < 1e-3);
    assert!((south - 1024.0).abs() < 1e-3);

    let (west, _) = project(-200.0, 0.0, 10);
    assert_eq!(west, 0.0);
}

#[test]
fn test_tile_bounds_of_world_tile() {
    let bounds = tile_bounds(&TileCoord {
        zoom: 0,
        x: 0,
        y: 0,
    });
    assert!((bounds.min().x + 180.0).abs() < 1e-9);
    assert!((bounds.max().x - 180.0).abs() < 1e-9);
    assert!((bounds.max().y - MAX_LAT).abs() < 1e-6);
    assert!((bounds.min().y - MIN_LAT).abs() < 1e-6);
}

#[test]
fn test_tile_bounds_contain_source_point() {
    let (lat, lon) = (48.8566, 2.3522);
    let bounds = tile_bounds(&tile_at(lat, lon, 13));
    assert!(bounds.min().x <= lon && lon <= bounds.max().x);
    assert!(bounds.min().y <= lat && lat <= bounds.max().y);
}

#[test]
fn test_neighbouring_tiles_share_an_edge() {
    let left = tile_bounds(&TileCoord::new(4, 8, 5).unwrap());
    let right = tile_bounds(&TileCoord::new(4, 9, 5).unwrap());
    assert!((left.max().x - right.min().x).abs() < 1e-9);
    assert_eq!(left.min().y, right.min().y);
}

#[test]
fn test_roundtrip_at_different_zooms() {
    let (lat, lon) = (51.5074, -0.1278);

    for zoom in [0, 5, 10, 15, 18, 24] {
        let tile = tile_at(lat, lon, zoom);
        let (converted_lat, converted_lon) = tile_to_lat_lon(&tile);
        let tile_size_degrees = 360.0 / (2.0_f64.powi(zoom as i32));

        assert!(
            (converted_lat - lat).abs() < tile_size_degrees,
            "Zoom {}: lat diff exceeds tile size",
            zoom
        );
        assert!(
            (converted_lon - lon).abs() < tile_size_degrees,
            "Zoom {}: lon diff exceeds tile size",
            zoom
        );
    }
}

#[test]
fn test_tile_coord_new_validates_grid() {
    assert!(TileCoord::new(2, 3, 3).is_ok());
    assert_eq!(
        TileCoord::new(2, 4, 0),
        Err(CoordError::OutOfRange { zoom: 2, x: 4, y: 0 })
    );
    assert_eq!(TileCoord::new(30, 0, 0), Err(CoordError::InvalidZoom(30)));
}

#[test]
fn test_display_is_slippy_path() {
    let tile = TileCoord::new(13, 3900, 2700).unwrap();
    assert_eq!(tile.to_string(), "13/3900/2700");
}
