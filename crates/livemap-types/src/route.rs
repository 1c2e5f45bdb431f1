//! Route request and result types.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::geo::Coordinate;

/// Two endpoints of a path computation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct RouteRequest {
    /// Where the path starts.
    pub start: Coordinate,
    /// Where the path ends.
    pub end: Coordinate,
}

/// A computed path, ready to be drawn on the route layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct RoutePath {
    /// Vertices of the path line, in travel order.
    pub coordinates: Vec<Coordinate>,
    /// Track length in metres, when the router reports it.
    pub length_m: Option<f64>,
    /// Estimated travel time in seconds, when the router reports it.
    pub duration_s: Option<f64>,
}

impl RoutePath {
    /// A path with geometry only.
    pub const fn new(coordinates: Vec<Coordinate>) -> Self {
        Self {
            coordinates,
            length_m: None,
            duration_s: None,
        }
    }

    /// Render as a single-feature `GeoJSON` `FeatureCollection` holding a
    /// `LineString`, which replaces the route layer's data wholesale.
    pub fn to_feature_collection(&self) -> serde_json::Value {
        let positions: Vec<[f64; 2]> = self.coordinates.iter().map(|c| c.to_position()).collect();
        serde_json::json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": {
                    "length_m": self.length_m,
                    "duration_s": self.duration_s,
                },
                "geometry": {
                    "type": "LineString",
                    "coordinates": positions,
                }
            }]
        })
    }
}
