//! GeoJSON reading into `geo` geometries.

use geo::{
    Coord, Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint, MultiPolygon,
    Point, Polygon,
};
use serde_json::{Map, Value};

use super::ExtractError;

/// A feature read from the source document.
#[derive(Debug, Clone)]
pub(crate) struct SourceFeature {
    /// The numeric GeoJSON `id`, or the feature's position in the input.
    pub id: u64,
    pub properties: Map<String, Value>,
    pub geometry: Geometry<f64>,
}

/// Reads a `FeatureCollection`, a single `Feature` or a bare geometry.
///
/// Returns the features that carry a geometry and how many were dropped
/// for having none.
pub(crate) fn read_features(mut value: Value) -> Result<(Vec<SourceFeature>, usize), ExtractError> {
    let raw = match type_of(&value)? {
        "FeatureCollection" => match value.get_mut("features").map(Value::take) {
            Some(Value::Array(features)) => features,
            _ => {
                return Err(invalid("FeatureCollection without a features array"));
            }
        },
        "Feature" => vec![value],
        _ => {
            let geometry = read_geometry(&value)?;
            let feature = SourceFeature {
                id: 0,
                properties: Map::new(),
                geometry,
            };
            return Ok((vec![feature], 0));
        }
    };

    let mut features = Vec::with_capacity(raw.len());
    let mut skipped = 0;

    for (position, mut feature) in raw.into_iter().enumerate() {
        if type_of(&feature)? != "Feature" {
            return Err(invalid("FeatureCollection member is not a Feature"));
        }
        let geometry = match feature.get("geometry") {
            Some(geometry) if !geometry.is_null() => read_geometry(geometry)?,
            _ => {
                skipped += 1;
                continue;
            }
        };
        let id = feature
            .get("id")
            .and_then(Value::as_u64)
            .unwrap_or(position as u64);
        let properties = match feature.get_mut("properties").map(Value::take) {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };
        features.push(SourceFeature {
            id,
            properties,
            geometry,
        });
    }

    Ok((features, skipped))
}

fn read_geometry(value: &Value) -> Result<Geometry<f64>, ExtractError> {
    let kind = type_of(value)?;
    if kind == "GeometryCollection" {
        let members = value
            .get("geometries")
            .and_then(Value::as_array)
            .ok_or_else(|| invalid("GeometryCollection without a geometries array"))?;
        let geometries = members
            .iter()
            .map(read_geometry)
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(Geometry::GeometryCollection(GeometryCollection(geometries)));
    }

    let coordinates = value
        .get("coordinates")
        .ok_or_else(|| invalid("geometry without coordinates"))?;

    let geometry = match kind {
        "Point" => Geometry::Point(Point(position(coordinates)?)),
        "MultiPoint" => Geometry::MultiPoint(MultiPoint(
            elements(coordinates)?
                .iter()
                .map(|p| position(p).map(Point))
                .collect::<Result<_, _>>()?,
        )),
        "LineString" => Geometry::LineString(line(coordinates)?),
        "MultiLineString" => Geometry::MultiLineString(MultiLineString(
            elements(coordinates)?
                .iter()
                .map(line)
                .collect::<Result<_, _>>()?,
        )),
        "Polygon" => Geometry::Polygon(polygon(coordinates)?),
        "MultiPolygon" => Geometry::MultiPolygon(MultiPolygon(
            elements(coordinates)?
                .iter()
                .map(polygon)
                .collect::<Result<_, _>>()?,
        )),
        other => {
            return Err(ExtractError::InvalidGeoJson(format!(
                "unsupported geometry type '{}'",
                other
            )))
        }
    };
    Ok(geometry)
}

/// `[lon, lat, ...]`; any altitude is ignored.
fn position(value: &Value) -> Result<Coord<f64>, ExtractError> {
    let items = elements(value)?;
    match (
        items.first().and_then(Value::as_f64),
        items.get(1).and_then(Value::as_f64),
    ) {
        (Some(x), Some(y)) => Ok(Coord { x, y }),
        _ => Err(invalid("position needs at least two numbers")),
    }
}

fn line(value: &Value) -> Result<LineString<f64>, ExtractError> {
    let coords = elements(value)?
        .iter()
        .map(position)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(LineString(coords))
}

/// The first ring is the exterior; the rest are holes.
fn polygon(value: &Value) -> Result<Polygon<f64>, ExtractError> {
    let mut rings = elements(value)?
        .iter()
        .map(line)
        .collect::<Result<Vec<_>, _>>()?
        .into_iter();
    let exterior = rings.next().unwrap_or_else(|| LineString(Vec::new()));
    Ok(Polygon::new(exterior, rings.collect()))
}

fn elements(value: &Value) -> Result<&Vec<Value>, ExtractError> {
    value
        .as_array()
        .ok_or_else(|| invalid("coordinates must be arrays"))
}

fn type_of(value: &Value) -> Result<&str, ExtractError> {
    value
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| invalid("object without a type member"))
}

fn invalid(reason: &str) -> ExtractError {
    ExtractError::InvalidGeoJson(reason.to_string())
}
