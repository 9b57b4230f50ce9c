//! Mapbox Vector Tile encoding.
//!
//! Each tile carries a single layer named [`LAYER_NAME`] with an extent of
//! [`EXTENT`]. Geometries are projected into tile-local integer space and
//! kept whole: points outside the tile buffer are dropped, line and ring
//! vertices are clamped to it. There is no clipping or simplification.

use geo::orient::{Direction, Orient};
use geo::{Geometry, LineString, Polygon};
use mvt::{GeomEncoder, GeomType, Tile};
use serde_json::{Map, Value};

use super::geojson::SourceFeature;
use super::ExtractError;
use crate::coord::{project, TileCoord};

pub const LAYER_NAME: &str = "layer";
pub const EXTENT: u32 = 4096;
/// Margin around the tile, in tile units, kept for rendering across edges.
pub const BUFFER: f64 = 64.0;

type TilePoint = (f64, f64);

/// One feature flattened into the parts the encoder writes.
#[derive(Default)]
struct Parts {
    points: Vec<TilePoint>,
    lines: Vec<Vec<TilePoint>>,
    polygons: Vec<Vec<Vec<TilePoint>>>,
}

/// Encodes `features` into a vector tile for `coord`.
///
/// Returns `None` when no feature has anything left to draw in the tile.
pub(crate) fn encode(
    coord: &TileCoord,
    features: &[&SourceFeature],
) -> Result<Option<Vec<u8>>, ExtractError> {
    let mut tile = Tile::new(EXTENT);
    let mut layer = tile.create_layer(LAYER_NAME);
    let mut encoded = 0usize;

    for feature in features {
        let mut parts = Parts::default();
        flatten(coord, &feature.geometry, &mut parts);

        // Mixed collections become one feature per geometry type.
        for geom in encode_parts(&parts)? {
            let mut out = layer.into_feature(geom);
            out.set_id(feature.id);
            add_tags(&mut out, &feature.properties);
            layer = out.into_layer();
            encoded += 1;
        }
    }

    if encoded == 0 {
        return Ok(None);
    }

    tile.add_layer(layer)?;
    Ok(Some(tile.to_bytes()?))
}

fn encode_parts(parts: &Parts) -> Result<Vec<mvt::GeomData>, ExtractError> {
    let mut out = Vec::new();

    if !parts.points.is_empty() {
        let mut encoder = GeomEncoder::new(GeomType::Point);
        for &(x, y) in &parts.points {
            encoder = encoder.point(x, y)?;
        }
        out.push(encoder.encode()?);
    }

    if !parts.lines.is_empty() {
        let mut encoder = GeomEncoder::new(GeomType::Linestring);
        for line in &parts.lines {
            for &(x, y) in line {
                encoder = encoder.point(x, y)?;
            }
            encoder = encoder.complete()?;
        }
        out.push(encoder.encode()?);
    }

    if !parts.polygons.is_empty() {
        let mut encoder = GeomEncoder::new(GeomType::Polygon);
        for rings in &parts.polygons {
            for ring in rings {
                for &(x, y) in ring {
                    encoder = encoder.point(x, y)?;
                }
                encoder = encoder.complete()?;
            }
        }
        out.push(encoder.encode()?);
    }

    Ok(out)
}

fn flatten(coord: &TileCoord, geometry: &Geometry<f64>, parts: &mut Parts) {
    match geometry {
        Geometry::Point(p) => push_point(coord, p.x(), p.y(), parts),
        Geometry::MultiPoint(mp) => {
            for p in mp {
                push_point(coord, p.x(), p.y(), parts);
            }
        }
        Geometry::LineString(ls) => push_line(coord, ls, parts),
        Geometry::Line(l) => push_line(coord, &LineString::from(vec![l.start, l.end]), parts),
        Geometry::MultiLineString(mls) => {
            for ls in mls {
                push_line(coord, ls, parts);
            }
        }
        Geometry::Polygon(p) => push_polygon(coord, p, parts),
        Geometry::MultiPolygon(mp) => {
            for p in mp {
                push_polygon(coord, p, parts);
            }
        }
        Geometry::Rect(r) => push_polygon(coord, &r.to_polygon(), parts),
        Geometry::Triangle(t) => push_polygon(coord, &t.to_polygon(), parts),
        Geometry::GeometryCollection(gc) => {
            for g in gc {
                flatten(coord, g, parts);
            }
        }
    }
}

fn push_point(coord: &TileCoord, lon: f64, lat: f64, parts: &mut Parts) {
    let (x, y) = to_tile_space(coord, lon, lat);
    let limit = f64::from(EXTENT) + BUFFER;
    if (-BUFFER..=limit).contains(&x) && (-BUFFER..=limit).contains(&y) {
        parts.points.push((x.round(), y.round()));
    }
}

fn push_line(coord: &TileCoord, line: &LineString<f64>, parts: &mut Parts) {
    let points = clamped(coord, line);
    if points.len() >= 2 {
        parts.lines.push(points);
    }
}

/// Exteriors are wound so that their area is positive once `y` points down,
/// holes the other way.
fn push_polygon(coord: &TileCoord, polygon: &Polygon<f64>, parts: &mut Parts) {
    let polygon = polygon.orient(Direction::Reversed);
    let Some(exterior) = ring(coord, polygon.exterior()) else {
        return;
    };
    let mut rings = vec![exterior];
    rings.extend(polygon.interiors().iter().filter_map(|r| ring(coord, r)));
    parts.polygons.push(rings);
}

/// A ring without its closing vertex, or `None` once it has collapsed.
fn ring(coord: &TileCoord, line: &LineString<f64>) -> Option<Vec<TilePoint>> {
    let mut points = clamped(coord, line);
    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    (points.len() >= 3).then_some(points)
}

/// Projects, clamps to the buffer, rounds and drops repeated vertices.
fn clamped(coord: &TileCoord, line: &LineString<f64>) -> Vec<TilePoint> {
    let max = f64::from(EXTENT) + BUFFER;
    let mut points: Vec<TilePoint> = line
        .coords()
        .map(|c| {
            let (x, y) = to_tile_space(coord, c.x, c.y);
            (x.clamp(-BUFFER, max).round(), y.clamp(-BUFFER, max).round())
        })
        .collect();
    points.dedup();
    points
}

fn to_tile_space(coord: &TileCoord, lon: f64, lat: f64) -> TilePoint {
    let (fx, fy) = project(lon, lat, coord.zoom);
    let extent = f64::from(EXTENT);
    (
        (fx - f64::from(coord.x)) * extent,
        (fy - f64::from(coord.y)) * extent,
    )
}

/// Writes properties as feature tags. Nulls are dropped and nested values
/// are written as their JSON text.
fn add_tags(feature: &mut mvt::Feature, properties: &Map<String, Value>) {
    for (key, value) in properties {
        match value {
            Value::Null => {}
            Value::Bool(b) => feature.add_tag_bool(key, *b),
            Value::String(s) => feature.add_tag_string(key, s),
            Value::Number(n) => {
                if let Some(u) = n.as_u64() {
                    feature.add_tag_uint(key, u);
                } else if let Some(i) = n.as_i64() {
                    feature.add_tag_sint(key, i);
                } else if let Some(f) = n.as_f64() {
                    feature.add_tag_double(key, f);
                }
            }
            Value::Array(_) | Value::Object(_) => feature.add_tag_string(key, &value.to_string()),
        }
    }
}
