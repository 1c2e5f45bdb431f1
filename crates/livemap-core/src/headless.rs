//! An in-process map surface with no renderer.
//!
//! [`HeadlessMap`] keeps the full observable state of a map (style, camera
//! history, markers, layers) in memory and logs every operation. The
//! console client runs on it, and tests inspect it through a
//! [`HeadlessProbe`] obtained from the [`HeadlessMapFactory`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use livemap_types::{Coordinate, MarkerId, STYLE_URL_PREFIX};
use serde_json::Value;
use tracing::{debug, info};

use crate::event::{Activation, MapEvent};
use crate::surface::{
    CameraOptions, GeolocateOptions, LineLayer, MapContainer, MapEventSink, MapFactory,
    MapOptions, MapSurface, MarkerSpec, StyleDescriptor, SurfaceError,
};

const SPRITE_URL_PREFIX: &str = "mapbox://sprites/mapbox/";

#[derive(Debug, Clone)]
struct HeadlessMarker {
    spec: MarkerSpec,
    location: Coordinate,
}

#[derive(Debug)]
struct HeadlessState {
    container: MapContainer,
    style: StyleDescriptor,
    cameras: Vec<CameraOptions>,
    geolocate: Option<GeolocateOptions>,
    geolocate_triggers: usize,
    markers: HashMap<MarkerId, HeadlessMarker>,
    markers_created: usize,
    layers: HashMap<String, (LineLayer, Value)>,
    removed: bool,
}

fn sprite_for(url: &str) -> Option<String> {
    url.strip_prefix(STYLE_URL_PREFIX)
        .map(|id| format!("{SPRITE_URL_PREFIX}{id}"))
}

fn lock(state: &Mutex<HeadlessState>) -> MutexGuard<'_, HeadlessState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A map surface that records instead of rendering.
#[derive(Debug)]
pub struct HeadlessMap {
    state: Arc<Mutex<HeadlessState>>,
}

impl MapSurface for HeadlessMap {
    fn style(&self) -> StyleDescriptor {
        lock(&self.state).style.clone()
    }

    fn set_style(&mut self, url: &str) {
        let mut state = lock(&self.state);
        state.style = StyleDescriptor {
            url: url.to_owned(),
            sprite: sprite_for(url),
        };
        info!(style = url, "style applied");
    }

    fn fly_to(&mut self, camera: &CameraOptions) {
        info!(
            center = %camera.center,
            zoom = camera.zoom,
            duration_ms = u64::try_from(camera.duration.as_millis()).unwrap_or(u64::MAX),
            "camera flying"
        );
        lock(&self.state).cameras.push(camera.clone());
    }

    fn add_geolocate_control(&mut self, options: &GeolocateOptions) {
        debug!(?options, "geolocate control attached");
        lock(&self.state).geolocate = Some(*options);
    }

    fn trigger_geolocate(&mut self) -> bool {
        let mut state = lock(&self.state);
        if state.geolocate.is_none() {
            return false;
        }
        state.geolocate_triggers = state.geolocate_triggers.saturating_add(1);
        info!("geolocate control triggered");
        true
    }

    fn add_marker(&mut self, spec: &MarkerSpec, at: Coordinate) -> MarkerId {
        let id = MarkerId::new();
        let mut state = lock(&self.state);
        state.markers.insert(
            id,
            HeadlessMarker {
                spec: spec.clone(),
                location: at,
            },
        );
        state.markers_created = state.markers_created.saturating_add(1);
        debug!(marker = %id, label = %spec.label, location = %at, "marker added");
        id
    }

    fn move_marker(&mut self, marker: MarkerId, to: Coordinate) {
        if let Some(entry) = lock(&self.state).markers.get_mut(&marker) {
            entry.location = to;
            debug!(marker = %marker, location = %to, "marker moved");
        }
    }

    fn remove_marker(&mut self, marker: MarkerId) {
        if lock(&self.state).markers.remove(&marker).is_some() {
            debug!(marker = %marker, "marker removed");
        }
    }

    fn has_layer(&self, id: &str) -> bool {
        lock(&self.state).layers.contains_key(id)
    }

    fn add_line_layer(&mut self, layer: &LineLayer) {
        let empty = serde_json::json!({"type": "FeatureCollection", "features": []});
        lock(&self.state)
            .layers
            .insert(layer.id.clone(), (layer.clone(), empty));
        debug!(layer = %layer.id, "line layer added");
    }

    fn set_layer_data(&mut self, id: &str, data: Value) -> Result<(), SurfaceError> {
        let mut state = lock(&self.state);
        let (_, current) = state
            .layers
            .get_mut(id)
            .ok_or_else(|| SurfaceError::UnknownLayer(id.to_owned()))?;
        *current = data;
        debug!(layer = id, "layer data replaced");
        Ok(())
    }

    fn remove(&mut self) {
        let mut state = lock(&self.state);
        state.markers.clear();
        state.layers.clear();
        state.removed = true;
        info!(container = %state.container, "map removed");
    }
}

/// Read access to a [`HeadlessMap`], plus the ability to raise user input.
#[derive(Debug, Clone)]
pub struct HeadlessProbe {
    state: Arc<Mutex<HeadlessState>>,
    events: MapEventSink,
}

impl HeadlessProbe {
    /// Container the map was mounted into.
    pub fn container(&self) -> MapContainer {
        lock(&self.state).container.clone()
    }

    /// Markers currently on the map.
    pub fn marker_count(&self) -> usize {
        lock(&self.state).markers.len()
    }

    /// Markers ever created on this map, including removed ones.
    pub fn markers_created(&self) -> usize {
        lock(&self.state).markers_created
    }

    /// Current position of a marker.
    pub fn marker_location(&self, marker: MarkerId) -> Option<Coordinate> {
        lock(&self.state).markers.get(&marker).map(|m| m.location)
    }

    /// Presentation of a marker.
    pub fn marker_spec(&self, marker: MarkerId) -> Option<MarkerSpec> {
        lock(&self.state).markers.get(&marker).map(|m| m.spec.clone())
    }

    /// Current style.
    pub fn style(&self) -> StyleDescriptor {
        lock(&self.state).style.clone()
    }

    /// Every camera animation issued, oldest first.
    pub fn cameras(&self) -> Vec<CameraOptions> {
        lock(&self.state).cameras.clone()
    }

    /// Options of the attached geolocation control.
    pub fn geolocate_options(&self) -> Option<GeolocateOptions> {
        lock(&self.state).geolocate
    }

    /// How many times the geolocation control fired.
    pub fn geolocate_triggers(&self) -> usize {
        lock(&self.state).geolocate_triggers
    }

    /// Whether a layer exists.
    pub fn has_layer(&self, id: &str) -> bool {
        lock(&self.state).layers.contains_key(id)
    }

    /// Current data of a layer's source.
    pub fn layer_data(&self, id: &str) -> Option<Value> {
        lock(&self.state).layers.get(id).map(|(_, data)| data.clone())
    }

    /// Whether the map has been torn down.
    pub fn is_removed(&self) -> bool {
        lock(&self.state).removed
    }

    /// Report the style load, as a renderer does once the style is ready.
    pub fn load(&self) -> bool {
        !self.is_removed() && self.events.emit(MapEvent::Loaded)
    }

    /// Simulate user input on a marker. Returns `false` if the marker is
    /// not on the map.
    pub fn activate(&self, marker: MarkerId, input: Activation) -> bool {
        if !lock(&self.state).markers.contains_key(&marker) {
            return false;
        }
        self.events.emit(MapEvent::MarkerActivated { marker, input })
    }
}

/// Creates [`HeadlessMap`]s and keeps a probe for each.
#[derive(Debug)]
pub struct HeadlessMapFactory {
    emit_load: bool,
    maps: Mutex<Vec<HeadlessProbe>>,
}

impl HeadlessMapFactory {
    /// A factory whose maps report [`MapEvent::Loaded`] right after creation.
    pub fn new() -> Self {
        Self {
            emit_load: true,
            maps: Mutex::new(Vec::new()),
        }
    }

    /// A factory whose maps never load on their own; call
    /// [`HeadlessProbe::load`] to finish loading.
    pub fn without_load_event() -> Self {
        Self {
            emit_load: false,
            maps: Mutex::new(Vec::new()),
        }
    }

    /// Probe for the most recently created map.
    pub fn last_map(&self) -> Option<HeadlessProbe> {
        self.maps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    /// Number of maps created so far.
    pub fn created_count(&self) -> usize {
        self.maps.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl Default for HeadlessMapFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl MapFactory for HeadlessMapFactory {
    fn create(
        &self,
        container: &MapContainer,
        options: &MapOptions,
        events: MapEventSink,
    ) -> Box<dyn MapSurface> {
        let state = Arc::new(Mutex::new(HeadlessState {
            container: container.clone(),
            style: StyleDescriptor {
                url: options.style_url.clone(),
                sprite: sprite_for(&options.style_url),
            },
            cameras: Vec::new(),
            geolocate: None,
            geolocate_triggers: 0,
            markers: HashMap::new(),
            markers_created: 0,
            layers: HashMap::new(),
            removed: false,
        }));
        info!(
            container = %container,
            center = %options.center,
            zoom = options.zoom,
            style = %options.style_url,
            generation = events.generation(),
            "headless map created"
        );

        let probe = HeadlessProbe {
            state: Arc::clone(&state),
            events,
        };
        if self.emit_load {
            probe.load();
        }
        self.maps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(probe);

        Box::new(HeadlessMap { state })
    }
}
