//! The map lifecycle controller.
//!
//! [`MapController`] owns the single map instance, the presence registry,
//! the device location source and the controller event queue. All state
//! changes go through `&mut self`, one event at a time:
//!
//! ```text
//! channel handlers --+
//! sensor watch ------+--> ControllerEvent queue --> handle_event --> registry / surface
//! map surface -------+
//! geolocate timer ---+
//! ```
//!
//! # Lifecycle
//!
//! `Uninitialized -> Ready -> Destroyed -> Ready -> ...`
//!
//! Camera, style and route operations require `Ready` and fail with
//! [`ControllerError::MapNotInitialized`] otherwise. `init` while `Ready`
//! destroys the current map first. `destroy` is idempotent.
//!
//! The device location watch and the known participants belong to the
//! channel session, not to one map. They survive `destroy`; the next `init`
//! places the participants' markers on the new map. Dropping the
//! controller stops the watch.

use std::sync::Arc;

use livemap_channel::{RealtimeChannel, Subscription};
use livemap_geo::GeoService;
use livemap_types::{
    Coordinate, InboundEvent, MapStyle, MarkerId, ParticipantId, ParticipantLocation, RoutePath,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::MapConfig;
use crate::device::DeviceLocationSource;
use crate::error::ControllerError;
use crate::event::{Activation, ControllerEvent, ControllerReceiver, ControllerSender, MapEvent};
use crate::interaction::route_for_activation;
use crate::registry::PresenceRegistry;
use crate::sensor::{LocationSensor, PositionOptions};
use crate::surface::{
    CameraOptions, GeolocateOptions, LineLayer, MapContainer, MapEventSink, MapFactory,
    MapOptions, MapSurface, SurfaceError,
};

/// Where the controller is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// No map has been created yet.
    Uninitialized,
    /// A map exists and accepts operations.
    Ready,
    /// The map was torn down; `init` may create a new one.
    Destroyed,
}

/// The live map and everything tied to its lifetime.
struct ActiveMap {
    surface: Box<dyn MapSurface>,
    generation: u64,
    subscriptions: Vec<Subscription>,
    geolocate_timer: JoinHandle<()>,
}

/// Drives one live presence map.
pub struct MapController {
    config: MapConfig,
    channel: RealtimeChannel,
    geo: GeoService,
    factory: Arc<dyn MapFactory>,
    device: DeviceLocationSource,
    registry: PresenceRegistry,
    map: Option<ActiveMap>,
    lifecycle: Lifecycle,
    generation: u64,
    tx: ControllerSender,
    rx: ControllerReceiver,
}

impl MapController {
    /// A controller with no map yet.
    pub fn new(
        config: MapConfig,
        channel: RealtimeChannel,
        geo: GeoService,
        factory: Arc<dyn MapFactory>,
        sensor: Arc<dyn LocationSensor>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let device = DeviceLocationSource::new(
            sensor,
            PositionOptions {
                enable_high_accuracy: GeolocateOptions::default().enable_high_accuracy,
            },
        );
        Self {
            config,
            channel,
            geo,
            factory,
            device,
            registry: PresenceRegistry::new(),
            map: None,
            lifecycle: Lifecycle::Uninitialized,
            generation: 0,
            tx,
            rx,
        }
    }

    /// Current lifecycle state.
    pub const fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// Create the map in `container` and start listening.
    ///
    /// Attaches the geolocation control, places markers for participants
    /// already known, wires the four channel subscriptions into the event
    /// queue and schedules the automatic geolocation trigger. If a map is
    /// already live it is destroyed first.
    pub fn init(&mut self, container: &MapContainer) {
        if self.lifecycle == Lifecycle::Ready {
            warn!(container = %container, "init while ready, recreating map");
            self.destroy();
        }

        self.generation = self.generation.saturating_add(1);
        let generation = self.generation;

        let options = MapOptions {
            center: self.config.default_center,
            zoom: self.config.default_zoom,
            style_url: self.config.default_style.resource_url(),
            access_token: self.config.access_token.clone(),
        };
        let mut surface = self.factory.create(
            container,
            &options,
            MapEventSink::new(self.tx.clone(), generation),
        );
        surface.add_geolocate_control(&GeolocateOptions::default());
        let restored = self.registry.attach(surface.as_mut());

        let subscriptions = self.subscribe(generation);

        let delay = self.config.geolocate_trigger_delay();
        let tx = self.tx.clone();
        let geolocate_timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(ControllerEvent::GeolocateTimer { generation });
        });

        self.map = Some(ActiveMap {
            surface,
            generation,
            subscriptions,
            geolocate_timer,
        });
        self.lifecycle = Lifecycle::Ready;
        info!(
            container = %container,
            generation = generation,
            participants = restored,
            "map initialized"
        );
    }

    fn subscribe(&self, generation: u64) -> Vec<Subscription> {
        let forward = move |tx: ControllerSender| {
            move |event: InboundEvent| {
                let _ = tx.send(ControllerEvent::Channel { generation, event });
            }
        };

        let connected = forward(self.tx.clone());
        let init_state = forward(self.tx.clone());
        let location_update = forward(self.tx.clone());
        let disconnected = forward(self.tx.clone());

        vec![
            self.channel
                .on_connected(move || connected(InboundEvent::Connected)),
            self.channel.on_initial_state(move |snapshot| {
                init_state(InboundEvent::InitState(snapshot.to_vec()));
            }),
            self.channel.on_location_update(move |location| {
                location_update(InboundEvent::LocationUpdate(location.clone()));
            }),
            self.channel.on_participant_disconnected(move |participant_id| {
                disconnected(InboundEvent::ParticipantDisconnected(participant_id.clone()));
            }),
        ]
    }

    /// Tear down the map. Idempotent; a no-op when no map is live.
    ///
    /// Unsubscribes the channel handlers, cancels a pending geolocation
    /// trigger, detaches the participants' markers and removes the map.
    /// The location watch keeps running.
    pub fn destroy(&mut self) {
        let Some(mut active) = self.map.take() else {
            return;
        };
        for subscription in active.subscriptions.drain(..) {
            self.channel.unsubscribe(subscription);
        }
        active.geolocate_timer.abort();
        self.registry.detach();
        active.surface.remove();
        self.lifecycle = Lifecycle::Destroyed;
        info!(generation = active.generation, "map destroyed");
    }

    /// Flip between the standard and satellite styles.
    ///
    /// Anything not recognisably satellite counts as standard. Returns the
    /// style now applied.
    pub fn toggle_style(&mut self) -> Result<MapStyle, ControllerError> {
        let surface = self.surface_mut()?;
        let current = surface.style().classify();
        let next = current.toggled();
        surface.set_style(&next.resource_url());
        info!(from = %current, to = %next, "style toggled");
        Ok(next)
    }

    /// Animate the camera to `target` at the configured zoom and duration.
    pub fn fly_to(&mut self, target: Coordinate) -> Result<(), ControllerError> {
        let camera = CameraOptions {
            center: target,
            zoom: self.config.fly_to_zoom,
            duration: self.config.fly_to_duration(),
        };
        self.surface_mut()?.fly_to(&camera);
        Ok(())
    }

    /// Tile resource for a style id. Independent of map state.
    pub fn tile_url(&self, style_id: &str) -> String {
        format!(
            "https://api.mapbox.com/styles/v1/mapbox/{style_id}/tiles/10/567/347?access_token={}",
            self.config.access_token
        )
    }

    /// Resolve a free-text query. `Ok(None)` means no match.
    pub async fn geocode(&self, query: &str) -> Result<Option<Coordinate>, ControllerError> {
        Ok(self.geo.geocode(query).await?)
    }

    /// Geocode `query` and fly to the match, if any.
    pub async fn fly_to_address(&mut self, query: &str) -> Result<Option<Coordinate>, ControllerError> {
        self.surface_mut()?;
        let found = self.geo.geocode(query).await?;
        if let Some(target) = found {
            self.fly_to(target)?;
        }
        Ok(found)
    }

    /// Compute a route and replace the route layer's contents with it.
    ///
    /// Fails fast, before any request, when the map is not ready or the
    /// route layer has not been created yet.
    pub async fn compute_route(
        &mut self,
        start: Coordinate,
        end: Coordinate,
    ) -> Result<RoutePath, ControllerError> {
        self.route_surface()?;
        let path = self.geo.route(start, end).await?;

        let layer_id = self.config.route_layer_id.clone();
        self.route_surface()?
            .set_layer_data(&layer_id, path.to_feature_collection())
            .map_err(|SurfaceError::UnknownLayer(id)| ControllerError::RouteLayerMissing(id))?;
        info!(
            layer = %layer_id,
            vertices = path.coordinates.len(),
            length_m = path.length_m,
            "route drawn"
        );
        Ok(path)
    }

    /// React to user input on a marker.
    ///
    /// Draws the route from the marker's participant to the local
    /// participant. A silent `Ok(None)` when the input does not activate or
    /// no local location is known yet.
    pub async fn activate_marker(
        &mut self,
        marker: MarkerId,
        input: &Activation,
    ) -> Result<Option<RoutePath>, ControllerError> {
        let Some(request) = route_for_activation(
            &self.registry,
            self.device.local_location(),
            marker,
            input,
        ) else {
            debug!(marker = %marker, ?input, "marker activation ignored");
            return Ok(None);
        };
        self.compute_route(request.start, request.end).await.map(Some)
    }

    /// The local participant's id on the channel.
    pub fn identity(&self) -> Result<ParticipantId, ControllerError> {
        Ok(self.channel.identity()?)
    }

    /// Wait for the next queued event.
    pub async fn next_event(&mut self) -> Option<ControllerEvent> {
        self.rx.recv().await
    }

    /// Apply one event.
    ///
    /// Sensor readings are applied in any state. Other events from an
    /// earlier map generation are dropped. Failures of event-driven work
    /// are logged, not returned.
    pub async fn handle_event(&mut self, event: ControllerEvent) {
        if let ControllerEvent::Sensor { reading, .. } = event {
            self.device.on_reading(&self.channel, reading);
            return;
        }

        let live = self
            .map
            .as_ref()
            .is_some_and(|active| active.generation == event.generation());
        if !live {
            debug!(
                kind = event.kind(),
                generation = event.generation(),
                current = self.generation,
                "stale event dropped"
            );
            return;
        }

        match event {
            ControllerEvent::Channel { generation, event } => self.on_channel(generation, event),
            ControllerEvent::Sensor { .. } => {}
            ControllerEvent::Map { event, .. } => self.on_map(event).await,
            ControllerEvent::GeolocateTimer { .. } => {
                if let Some(active) = self.map.as_mut() {
                    if !active.surface.trigger_geolocate() {
                        warn!("no geolocate control to trigger");
                    }
                }
            }
        }
    }

    /// Wait for one event and apply it. Returns `false` if the queue closed.
    pub async fn step(&mut self) -> bool {
        match self.next_event().await {
            Some(event) => {
                self.handle_event(event).await;
                true
            }
            None => false,
        }
    }

    /// Apply every event already queued, without waiting. Returns how many
    /// were handled.
    pub async fn process_pending(&mut self) -> usize {
        let mut handled: usize = 0;
        while let Ok(event) = self.rx.try_recv() {
            self.handle_event(event).await;
            handled = handled.saturating_add(1);
        }
        handled
    }

    fn on_channel(&mut self, generation: u64, event: InboundEvent) {
        let Some(active) = self.map.as_mut() else {
            return;
        };
        let surface = active.surface.as_mut();
        match event {
            InboundEvent::Connected => self.device.start(self.tx.clone(), generation),
            InboundEvent::InitState(snapshot) => self.registry.bulk_load(surface, &snapshot),
            InboundEvent::LocationUpdate(update) => {
                self.registry.upsert(surface, &update);
            }
            InboundEvent::ParticipantDisconnected(participant_id) => {
                self.registry.remove(surface, &participant_id);
            }
        }
    }

    async fn on_map(&mut self, event: MapEvent) {
        match event {
            MapEvent::Loaded => {
                let layer_id = self.config.route_layer_id.clone();
                if let Some(active) = self.map.as_mut() {
                    if !active.surface.has_layer(&layer_id) {
                        active.surface.add_line_layer(&LineLayer::route(layer_id.as_str()));
                        info!(layer = %layer_id, "route layer created");
                    }
                }
            }
            MapEvent::MarkerActivated { marker, input } => {
                if let Err(e) = self.activate_marker(marker, &input).await {
                    warn!(marker = %marker, error = %e, "marker activation failed");
                }
            }
        }
    }

    /// Participants currently on the map.
    pub const fn registry(&self) -> &PresenceRegistry {
        &self.registry
    }

    /// The local participant's last location.
    pub const fn local_location(&self) -> Option<&ParticipantLocation> {
        self.device.local_location()
    }

    /// Whether the device location watch is running.
    pub fn is_tracking_location(&self) -> bool {
        self.device.is_watching()
    }

    /// The realtime channel this controller listens on.
    pub const fn channel(&self) -> &RealtimeChannel {
        &self.channel
    }

    /// Map settings.
    pub const fn config(&self) -> &MapConfig {
        &self.config
    }

    fn surface_mut(&mut self) -> Result<&mut dyn MapSurface, ControllerError> {
        match self.map.as_mut() {
            Some(active) => Ok(active.surface.as_mut()),
            None => Err(ControllerError::MapNotInitialized),
        }
    }

    fn route_surface(&mut self) -> Result<&mut dyn MapSurface, ControllerError> {
        let layer_id = &self.config.route_layer_id;
        let Some(active) = self.map.as_mut() else {
            return Err(ControllerError::MapNotInitialized);
        };
        let surface = active.surface.as_mut();
        if !surface.has_layer(layer_id) {
            return Err(ControllerError::RouteLayerMissing(layer_id.clone()));
        }
        Ok(surface)
    }
}

impl Drop for MapController {
    fn drop(&mut self) {
        self.destroy();
        self.device.stop();
    }
}

impl std::fmt::Debug for MapController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapController")
            .field("lifecycle", &self.lifecycle)
            .field("generation", &self.generation)
            .field("participants", &self.registry.len())
            .field("channel", &self.channel)
            .finish_non_exhaustive()
    }
}
