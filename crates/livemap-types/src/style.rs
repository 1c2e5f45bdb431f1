//! Map style variants.
//!
//! The map toggles between two Mapbox styles. The current one is recognised
//! by a substring check on whatever descriptor the renderer reports (the
//! style's sprite URL in practice); anything not recognisably satellite is
//! treated as standard.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Prefix of every Mapbox style resource path.
pub const STYLE_URL_PREFIX: &str = "mapbox://styles/mapbox/";

/// The two style variants the map switches between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "kebab-case")]
#[ts(export, export_to = "bindings/")]
pub enum MapStyle {
    /// Mapbox Standard.
    #[default]
    Standard,
    /// Mapbox Satellite.
    #[serde(rename = "satellite-v9")]
    Satellite,
}

impl MapStyle {
    /// Short style identifier (`standard`, `satellite-v9`).
    pub const fn id(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Satellite => "satellite-v9",
        }
    }

    /// Style resource path, e.g. `mapbox://styles/mapbox/standard`.
    pub fn resource_url(self) -> String {
        format!("{STYLE_URL_PREFIX}{}", self.id())
    }

    /// Classify a style descriptor. Defaults to [`MapStyle::Standard`].
    pub fn from_descriptor(descriptor: &str) -> Self {
        if descriptor.contains("satellite") {
            Self::Satellite
        } else {
            Self::Standard
        }
    }

    /// The other variant.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Standard => Self::Satellite,
            Self::Satellite => Self::Standard,
        }
    }

    /// Resolve a short identifier back to a variant.
    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "standard" => Some(Self::Standard),
            "satellite-v9" => Some(Self::Satellite),
            _ => None,
        }
    }
}

impl core::fmt::Display for MapStyle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_descriptors_are_standard() {
        assert_eq!(MapStyle::from_descriptor("mapbox://styles/mapbox/streets-v12"), MapStyle::Standard);
        assert_eq!(MapStyle::from_descriptor(""), MapStyle::Standard);
        assert_eq!(
            MapStyle::from_descriptor("mapbox://sprites/mapbox/satellite-v9"),
            MapStyle::Satellite
        );
    }

    #[test]
    fn toggle_twice_is_identity() {
        for style in [MapStyle::Standard, MapStyle::Satellite] {
            assert_eq!(style.toggled().toggled(), style);
        }
    }

    #[test]
    fn ids_round_trip_through_resource_urls() {
        assert_eq!(MapStyle::Satellite.resource_url(), "mapbox://styles/mapbox/satellite-v9");
        assert_eq!(MapStyle::from_id("standard"), Some(MapStyle::Standard));
        assert_eq!(MapStyle::from_id("dark-v11"), None);
    }
}
