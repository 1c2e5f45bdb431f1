//! The map rendering surface abstraction.
//!
//! The controller never talks to a renderer directly. It drives a
//! [`MapSurface`] created by a [`MapFactory`], and the surface reports
//! back through a [`MapEventSink`] bound to the controller queue. A
//! browser-backed surface and the [`HeadlessMap`](crate::headless::HeadlessMap)
//! used by the console client and the tests both sit behind these traits.

use std::time::Duration;

use livemap_types::{Coordinate, MapStyle, MarkerId};
use serde_json::Value;

use crate::event::{ControllerEvent, ControllerSender, MapEvent};

/// Identifier of the element the map is mounted into.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MapContainer(String);

impl MapContainer {
    /// Name a container.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The container identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MapContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Construction options for a new map.
#[derive(Debug, Clone, PartialEq)]
pub struct MapOptions {
    /// Initial camera center.
    pub center: Coordinate,
    /// Initial zoom.
    pub zoom: f64,
    /// Initial style resource, e.g. `mapbox://styles/mapbox/standard`.
    pub style_url: String,
    /// Access token for the style and tile resources.
    pub access_token: String,
}

/// A camera animation.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraOptions {
    /// Target center.
    pub center: Coordinate,
    /// Target zoom.
    pub zoom: f64,
    /// Animation duration.
    pub duration: Duration,
}

/// What the renderer reports about its current style.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StyleDescriptor {
    /// The style resource URL last applied.
    pub url: String,
    /// The style's sprite URL, once the style has loaded.
    pub sprite: Option<String>,
}

impl StyleDescriptor {
    /// Classify the style. The sprite is authoritative; the URL is used
    /// until a sprite is known.
    pub fn classify(&self) -> MapStyle {
        MapStyle::from_descriptor(self.sprite.as_deref().unwrap_or(&self.url))
    }
}

/// Options for the geolocation control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeolocateOptions {
    /// Ask the sensor for its most accurate fix.
    pub enable_high_accuracy: bool,
    /// Keep following the user after the first fix.
    pub track_user_location: bool,
    /// Draw the heading cone.
    pub show_user_heading: bool,
}

impl Default for GeolocateOptions {
    fn default() -> Self {
        Self {
            enable_high_accuracy: true,
            track_user_location: true,
            show_user_heading: false,
        }
    }
}

/// How a participant marker is presented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerSpec {
    /// Visible label, the participant id.
    pub label: String,
    /// Avatar image URL.
    pub image_url: String,
    /// Accessible label.
    pub aria_label: String,
}

/// A line layer backed by a `GeoJSON` source of the same id.
#[derive(Debug, Clone, PartialEq)]
pub struct LineLayer {
    /// Layer and source id.
    pub id: String,
    /// Line color.
    pub color: String,
    /// Line width in pixels.
    pub width: f64,
    /// Line opacity in `[0, 1]`.
    pub opacity: f64,
}

impl LineLayer {
    /// The route layer with its default paint.
    pub fn route(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            color: String::from("#3887be"),
            width: 5.0,
            opacity: 0.75,
        }
    }
}

/// Errors reported by a surface.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SurfaceError {
    /// No layer with this id exists on the map.
    #[error("unknown layer `{0}`")]
    UnknownLayer(String),
}

/// Channel through which a surface reports [`MapEvent`]s.
#[derive(Debug, Clone)]
pub struct MapEventSink {
    tx: ControllerSender,
    generation: u64,
}

impl MapEventSink {
    pub(crate) const fn new(tx: ControllerSender, generation: u64) -> Self {
        Self { tx, generation }
    }

    /// Queue an event for the controller.
    ///
    /// Returns `false` once the controller is gone.
    pub fn emit(&self, event: MapEvent) -> bool {
        self.tx
            .send(ControllerEvent::Map {
                generation: self.generation,
                event,
            })
            .is_ok()
    }

    /// Generation of the map this sink belongs to.
    pub const fn generation(&self) -> u64 {
        self.generation
    }
}

/// A live map instance.
///
/// Markers created with [`add_marker`](Self::add_marker) are activatable:
/// the surface reports clicks and key presses on them as
/// [`MapEvent::MarkerActivated`].
pub trait MapSurface: Send {
    /// The current style as the renderer reports it.
    fn style(&self) -> StyleDescriptor;

    /// Apply a style resource.
    fn set_style(&mut self, url: &str);

    /// Animate the camera.
    fn fly_to(&mut self, camera: &CameraOptions);

    /// Attach the geolocation control.
    fn add_geolocate_control(&mut self, options: &GeolocateOptions);

    /// Fire the geolocation control. Returns `false` if none is attached.
    fn trigger_geolocate(&mut self) -> bool;

    /// Place a new marker.
    fn add_marker(&mut self, spec: &MarkerSpec, at: Coordinate) -> MarkerId;

    /// Move an existing marker. Unknown markers are ignored.
    fn move_marker(&mut self, marker: MarkerId, to: Coordinate);

    /// Take a marker off the map. Unknown markers are ignored.
    fn remove_marker(&mut self, marker: MarkerId);

    /// Whether a layer with this id exists.
    fn has_layer(&self, id: &str) -> bool;

    /// Add a line layer and its empty source.
    fn add_line_layer(&mut self, layer: &LineLayer);

    /// Replace the data of a layer's source.
    ///
    /// # Errors
    ///
    /// Returns [`SurfaceError::UnknownLayer`] if the layer does not exist.
    fn set_layer_data(&mut self, id: &str, data: Value) -> Result<(), SurfaceError>;

    /// Tear the map down and release its resources.
    fn remove(&mut self);
}

/// Creates map surfaces bound to a container.
pub trait MapFactory: Send + Sync {
    /// Construct a map. The surface reports its events through `events`.
    fn create(
        &self,
        container: &MapContainer,
        options: &MapOptions,
        events: MapEventSink,
    ) -> Box<dyn MapSurface>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sprite_wins_over_url() {
        let descriptor = StyleDescriptor {
            url: "mapbox://styles/mapbox/standard".to_owned(),
            sprite: Some("mapbox://sprites/mapbox/satellite-v9".to_owned()),
        };
        assert_eq!(descriptor.classify(), MapStyle::Satellite);
    }

    #[test]
    fn url_is_used_before_sprite_is_known() {
        let descriptor = StyleDescriptor {
            url: "mapbox://styles/mapbox/satellite-v9".to_owned(),
            sprite: None,
        };
        assert_eq!(descriptor.classify(), MapStyle::Satellite);
        assert_eq!(StyleDescriptor::default().classify(), MapStyle::Standard);
    }

    #[test]
    fn geolocate_defaults_track_without_heading() {
        let options = GeolocateOptions::default();
        assert!(options.enable_high_accuracy);
        assert!(options.track_user_location);
        assert!(!options.show_user_heading);
    }
}
