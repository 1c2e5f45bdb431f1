//! The canonical coordinate type and its ingress normalisation.
//!
//! Providers and clients disagree on coordinate shape: the realtime channel
//! sends `{lat, lon}`, map libraries use `{lat, lng}`, and `GeoJSON` uses
//! `[lon, lat]` positions (optionally with a trailing elevation). Every one
//! of those is folded into [`Coordinate`] on deserialisation so nothing
//! downstream has to guess which axis comes first.
//!
//! Range is reported by [`Coordinate::is_in_range`] but never enforced:
//! providers occasionally return garbage and the map must keep running.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Errors produced while normalising coordinates from external data.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoordinateError {
    /// A component was NaN or infinite.
    #[error("coordinate component is not finite: {0}")]
    NonFinite(String),

    /// A `GeoJSON` position had the wrong number of components.
    #[error("position must have 2 or 3 components, got {0}")]
    PositionArity(usize),

    /// A string-encoded decimal degree value could not be parsed.
    #[error("malformed decimal degrees {value:?}: {reason}")]
    MalformedDegrees {
        /// The raw value received.
        value: String,
        /// Parser message.
        reason: String,
    },
}

/// A point on the globe in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[serde(try_from = "WireCoordinate")]
#[ts(export, export_to = "bindings/")]
pub struct Coordinate {
    /// Latitude, nominally `[-90, 90]`.
    pub lat: f64,
    /// Longitude, nominally `[-180, 180]`.
    pub lon: f64,
}

impl Coordinate {
    /// Build a coordinate without validation.
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Build a coordinate, rejecting NaN and infinite components.
    pub fn try_new(lat: f64, lon: f64) -> Result<Self, CoordinateError> {
        if !lat.is_finite() {
            return Err(CoordinateError::NonFinite(format!("lat={lat}")));
        }
        if !lon.is_finite() {
            return Err(CoordinateError::NonFinite(format!("lon={lon}")));
        }
        Ok(Self { lat, lon })
    }

    /// Build a coordinate from a `GeoJSON` position (`[lon, lat]` or
    /// `[lon, lat, elevation]`).
    pub fn from_position(position: &[f64]) -> Result<Self, CoordinateError> {
        match *position {
            [lon, lat] | [lon, lat, _] => Self::try_new(lat, lon),
            _ => Err(CoordinateError::PositionArity(position.len())),
        }
    }

    /// Parse string-encoded decimal degrees, as returned by Nominatim.
    pub fn parse_degrees(lat: &str, lon: &str) -> Result<Self, CoordinateError> {
        Self::try_new(parse_component(lat)?, parse_component(lon)?)
    }

    /// Return the `GeoJSON` position `[lon, lat]`.
    pub const fn to_position(self) -> [f64; 2] {
        [self.lon, self.lat]
    }

    /// Whether both components fall inside the valid WGS84 ranges.
    pub fn is_in_range(self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lon)
    }
}

impl core::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "({}, {})", self.lat, self.lon)
    }
}

fn parse_component(raw: &str) -> Result<f64, CoordinateError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|e| CoordinateError::MalformedDegrees {
            value: raw.to_owned(),
            reason: e.to_string(),
        })
}

/// Every coordinate shape accepted on ingress.
#[derive(Deserialize)]
#[serde(untagged)]
enum WireCoordinate {
    LonLat { lat: f64, lon: f64 },
    LngLat { lat: f64, lng: f64 },
    Position(Vec<f64>),
}

impl TryFrom<WireCoordinate> for Coordinate {
    type Error = CoordinateError;

    fn try_from(wire: WireCoordinate) -> Result<Self, Self::Error> {
        match wire {
            WireCoordinate::LonLat { lat, lon } => Self::try_new(lat, lon),
            WireCoordinate::LngLat { lat, lng } => Self::try_new(lat, lng),
            WireCoordinate::Position(position) => Self::from_position(&position),
        }
    }
}
