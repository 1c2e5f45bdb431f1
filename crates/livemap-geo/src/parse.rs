//! Provider response parsing.
//!
//! Kept free of I/O so the shapes can be tested against captured payloads.

use livemap_types::{Coordinate, RoutePath};
use serde::Deserialize;
use serde_json::Value;

use crate::error::GeoError;

/// Extract the first candidate from a Nominatim `jsonv2` search response.
///
/// An empty array is "no match" and yields `Ok(None)`. The candidate's `lat`
/// and `lon` are string-encoded decimal degrees.
pub fn parse_geocode_response(json: &Value) -> Result<Option<Coordinate>, GeoError> {
    let candidates = json
        .as_array()
        .ok_or_else(|| GeoError::ParseFailure("geocoder response is not an array".to_owned()))?;

    let Some(first) = candidates.first() else {
        return Ok(None);
    };

    let lat = degrees_field(first, "lat")?;
    let lon = degrees_field(first, "lon")?;
    Ok(Some(Coordinate::parse_degrees(&lat, &lon)?))
}

fn degrees_field(candidate: &Value, field: &str) -> Result<String, GeoError> {
    match candidate.get(field) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(GeoError::ParseFailure(format!(
            "geocoder candidate missing string field `{field}`"
        ))),
    }
}

#[derive(Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Deserialize)]
struct Feature {
    geometry: Geometry,
    #[serde(default)]
    properties: serde_json::Map<String, Value>,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum Geometry {
    LineString { coordinates: Vec<Coordinate> },
    #[serde(other)]
    Unsupported,
}

/// Extract the first path from a `BRouter` `GeoJSON` `FeatureCollection`.
///
/// Positions may carry a trailing elevation. `track-length` and
/// `total-time` are picked up when present; `BRouter` encodes them as strings.
pub fn parse_route_response(json: &Value) -> Result<RoutePath, GeoError> {
    let collection = FeatureCollection::deserialize(json)
        .map_err(|e| GeoError::ParseFailure(format!("route response is not a feature collection: {e}")))?;

    let feature = collection
        .features
        .into_iter()
        .next()
        .ok_or_else(|| GeoError::ParseFailure("route response has no features".to_owned()))?;

    let Geometry::LineString { coordinates } = feature.geometry else {
        return Err(GeoError::ParseFailure(
            "route geometry is not a LineString".to_owned(),
        ));
    };

    Ok(RoutePath {
        coordinates,
        length_m: numeric_property(&feature.properties, "track-length"),
        duration_s: numeric_property(&feature.properties, "total-time"),
    })
}

fn numeric_property(properties: &serde_json::Map<String, Value>, key: &str) -> Option<f64> {
    match properties.get(key)? {
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}
