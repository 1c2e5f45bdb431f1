//! Integration tests for the map controller.
//!
//! The controller runs against the headless map, the in-memory realtime
//! transport and a broadcast sensor. Channel events are dispatched
//! directly on the channel, then drained from the controller queue with
//! `process_pending`/`step`. Route and geocode tests use an Axum stand-in
//! for the providers on an ephemeral port.

#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::Query;
use axum::routing::get;
use axum::{Json, Router};
use livemap_channel::{ChannelError, EventKind, MemoryTransport, RealtimeChannel};
use livemap_core::{
    Activation, BroadcastSensor, ControllerError, HeadlessMapFactory, HeadlessProbe, Lifecycle,
    MapConfig, MapContainer, MapController, SensorError, SensorReading,
};
use livemap_geo::{GeoConfig, GeoService};
use livemap_types::{
    Coordinate, InboundEvent, MapStyle, OutboundEvent, ParticipantId, ParticipantLocation,
};
use serde_json::{Value, json};

struct Harness {
    controller: MapController,
    factory: Arc<HeadlessMapFactory>,
    transport: Arc<MemoryTransport>,
    channel: RealtimeChannel,
    sensor: Arc<BroadcastSensor>,
}

impl Harness {
    fn probe(&self) -> HeadlessProbe {
        self.factory.last_map().unwrap()
    }
}

fn harness_with(factory: HeadlessMapFactory, geo: GeoConfig) -> Harness {
    let (transport, _inbound) = MemoryTransport::new();
    let channel = RealtimeChannel::new(transport.clone());
    let factory = Arc::new(factory);
    let sensor = Arc::new(BroadcastSensor::default());
    let config = MapConfig {
        access_token: "tok".to_owned(),
        ..MapConfig::default()
    };
    let controller = MapController::new(
        config,
        channel.clone(),
        GeoService::new(geo).unwrap(),
        factory.clone(),
        sensor.clone(),
    );
    Harness {
        controller,
        factory,
        transport,
        channel,
        sensor,
    }
}

fn harness() -> Harness {
    harness_with(HeadlessMapFactory::new(), GeoConfig::default())
}

fn at(id: &str, lat: f64, lon: f64) -> ParticipantLocation {
    ParticipantLocation::new(id, Coordinate::new(lat, lon))
}

fn container() -> MapContainer {
    MapContainer::new("map")
}

async fn search(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    match params.get("q").map(String::as_str) {
        Some("Krakow") => Json(json!([{"lat": "50.06", "lon": "19.94"}])),
        _ => Json(json!([])),
    }
}

async fn brouter(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    let lonlats = params.get("lonlats").cloned().unwrap_or_default();
    let coordinates: Vec<Vec<f64>> = lonlats
        .split('|')
        .map(|pair| pair.split(',').map(|n| n.parse().unwrap_or(0.0)).collect())
        .collect();
    Json(json!({
        "type": "FeatureCollection",
        "features": [{
            "type": "Feature",
            "properties": {"track-length": "5400", "total-time": "1200"},
            "geometry": {"type": "LineString", "coordinates": coordinates}
        }]
    }))
}

async fn spawn_providers() -> GeoConfig {
    let router = Router::new()
        .route("/search", get(search))
        .route("/brouter", get(brouter));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    GeoConfig {
        geocoder_url: format!("http://{addr}/search"),
        router_url: format!("http://{addr}/brouter"),
        ..GeoConfig::default()
    }
}

/// Step the controller until `done` holds, giving up after a few events.
async fn step_until(controller: &mut MapController, done: impl Fn(&MapController) -> bool) {
    for _ in 0..8 {
        if done(controller) {
            return;
        }
        let stepped = tokio::time::timeout(Duration::from_secs(5), controller.step()).await;
        assert!(stepped.is_ok(), "controller queue stalled");
    }
    assert!(done(controller), "condition not reached");
}

fn route_coordinates(probe: &HeadlessProbe) -> Option<Value> {
    probe
        .layer_data("route")
        .and_then(|data| data.pointer("/features/0/geometry/coordinates").cloned())
}

// =========================================================================
// Lifecycle
// =========================================================================

#[tokio::test(start_paused = true)]
async fn init_creates_map_with_defaults() {
    let mut h = harness();
    assert_eq!(h.controller.lifecycle(), Lifecycle::Uninitialized);

    h.controller.init(&container());
    h.controller.process_pending().await;

    let probe = h.probe();
    assert_eq!(h.controller.lifecycle(), Lifecycle::Ready);
    assert_eq!(probe.container(), container());
    assert_eq!(probe.style().url, "mapbox://styles/mapbox/standard");
    assert!(probe.geolocate_options().is_some_and(|o| o.track_user_location));
    assert!(probe.has_layer("route"));
    for kind in [
        EventKind::Connected,
        EventKind::InitState,
        EventKind::LocationUpdate,
        EventKind::ParticipantDisconnected,
    ] {
        assert_eq!(h.channel.subscriber_count(kind), 1);
    }
}

#[tokio::test(start_paused = true)]
async fn operations_fail_before_init_and_after_destroy() {
    let mut h = harness();
    let here = Coordinate::new(50.0, 20.0);

    assert!(matches!(h.controller.toggle_style(), Err(ControllerError::MapNotInitialized)));
    assert!(matches!(h.controller.fly_to(here), Err(ControllerError::MapNotInitialized)));
    assert!(matches!(
        h.controller.compute_route(here, here).await,
        Err(ControllerError::MapNotInitialized)
    ));

    h.controller.init(&container());
    h.controller.destroy();
    assert_eq!(h.controller.lifecycle(), Lifecycle::Destroyed);

    assert!(matches!(h.controller.toggle_style(), Err(ControllerError::MapNotInitialized)));
    assert!(matches!(h.controller.fly_to(here), Err(ControllerError::MapNotInitialized)));
    assert!(matches!(
        h.controller.compute_route(here, here).await,
        Err(ControllerError::MapNotInitialized)
    ));
    assert!(matches!(
        h.controller.fly_to_address("Krakow").await,
        Err(ControllerError::MapNotInitialized)
    ));
}

#[tokio::test(start_paused = true)]
async fn destroy_is_idempotent() {
    let mut h = harness();
    h.controller.destroy();
    assert_eq!(h.controller.lifecycle(), Lifecycle::Uninitialized);

    h.controller.init(&container());
    h.controller.destroy();
    h.controller.destroy();

    assert_eq!(h.controller.lifecycle(), Lifecycle::Destroyed);
    assert!(h.probe().is_removed());
    assert_eq!(h.channel.subscriber_count(EventKind::LocationUpdate), 0);
}

#[tokio::test(start_paused = true)]
async fn init_after_destroy_yields_fresh_map() {
    let mut h = harness();
    h.controller.init(&container());
    h.channel
        .dispatch(&InboundEvent::LocationUpdate(at("alice", 1.0, 1.0)));
    h.controller.process_pending().await;
    h.controller.destroy();

    h.controller.init(&container());
    h.controller.process_pending().await;

    assert_eq!(h.controller.lifecycle(), Lifecycle::Ready);
    assert_eq!(h.factory.created_count(), 2);
    assert_eq!(h.channel.subscriber_count(EventKind::LocationUpdate), 1);
    assert_eq!(h.controller.registry().len(), 1);
    assert_eq!(h.probe().marker_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn remount_keeps_tracking_and_replaces_participants() {
    let mut h = harness();
    h.transport.assign_id("me");
    h.controller.init(&container());
    h.channel.dispatch(&InboundEvent::Connected);
    h.channel
        .dispatch(&InboundEvent::InitState(vec![at("alice", 1.0, 1.0)]));
    h.controller.process_pending().await;
    h.sensor
        .push(Ok(SensorReading::now(Coordinate::new(50.0, 20.0))));
    step_until(&mut h.controller, |c| c.local_location().is_some()).await;

    h.controller.destroy();
    assert!(h.controller.is_tracking_location());
    assert_eq!(h.controller.local_location(), Some(&at("me", 50.0, 20.0)));

    h.controller.init(&container());
    let probe = h.probe();
    let alice = h
        .controller
        .registry()
        .get(&ParticipantId::new("alice"))
        .cloned()
        .unwrap();
    assert_eq!(probe.marker_count(), 1);
    assert_eq!(probe.marker_location(alice.marker), Some(Coordinate::new(1.0, 1.0)));
    assert_eq!(h.controller.registry().by_marker(alice.marker), Some(&alice));

    assert_eq!(h.sensor.push(Ok(SensorReading::now(Coordinate::new(50.1, 20.1)))), 1);
    step_until(&mut h.controller, |c| {
        c.local_location() == Some(&at("me", 50.1, 20.1))
    })
    .await;
    assert_eq!(
        h.transport.sent().last(),
        Some(&OutboundEvent::LocationUpdate(at("me", 50.1, 20.1)))
    );
}

#[tokio::test(start_paused = true)]
async fn reinit_while_ready_destroys_then_recreates() {
    let mut h = harness();
    h.controller.init(&container());
    let first = h.probe();

    h.controller.init(&MapContainer::new("other"));

    assert!(first.is_removed());
    assert_eq!(h.factory.created_count(), 2);
    assert_eq!(h.probe().container(), MapContainer::new("other"));
    assert_eq!(h.channel.subscriber_count(EventKind::Connected), 1);
    assert_eq!(h.channel.subscriber_count(EventKind::ParticipantDisconnected), 1);
}

#[tokio::test(start_paused = true)]
async fn events_queued_for_destroyed_map_are_dropped() {
    let mut h = harness();
    h.controller.init(&container());
    h.channel.dispatch(&InboundEvent::InitState(vec![
        at("alice", 1.0, 1.0),
        at("bob", 2.0, 2.0),
    ]));
    h.controller.destroy();
    h.controller.init(&container());

    h.controller.process_pending().await;

    assert!(h.controller.registry().is_empty());
    assert_eq!(h.probe().marker_count(), 0);
}

// =========================================================================
// Camera, style, tiles
// =========================================================================

#[tokio::test(start_paused = true)]
async fn toggle_style_twice_returns_to_original() {
    let mut h = harness();
    h.controller.init(&container());

    let first = h.controller.toggle_style().unwrap();
    assert_eq!(first.id(), "satellite-v9");
    assert_eq!(h.probe().style().url, "mapbox://styles/mapbox/satellite-v9");

    let second = h.controller.toggle_style().unwrap();
    assert_eq!(second, MapStyle::Standard);
    assert_eq!(h.probe().style().url, "mapbox://styles/mapbox/standard");
}

#[tokio::test(start_paused = true)]
async fn fly_to_uses_fixed_zoom_and_duration() {
    let mut h = harness();
    h.controller.init(&container());

    let target = Coordinate::new(50.06, 19.94);
    h.controller.fly_to(target).unwrap();

    let cameras = h.probe().cameras();
    assert_eq!(cameras.len(), 1);
    let camera = cameras.first().unwrap();
    assert_eq!(camera.center, target);
    assert!((camera.zoom - 14.0).abs() < f64::EPSILON);
    assert_eq!(camera.duration, Duration::from_millis(1000));
}

#[tokio::test(start_paused = true)]
async fn tile_url_works_without_map() {
    let h = harness();
    assert_eq!(
        h.controller.tile_url("satellite-v9"),
        "https://api.mapbox.com/styles/v1/mapbox/satellite-v9/tiles/10/567/347?access_token=tok"
    );
}

#[tokio::test(start_paused = true)]
async fn geolocate_triggers_after_delay() {
    let mut h = harness();
    h.controller.init(&container());
    h.controller.process_pending().await;
    let probe = h.probe();

    tokio::time::advance(Duration::from_millis(999)).await;
    h.controller.process_pending().await;
    assert_eq!(probe.geolocate_triggers(), 0);

    h.controller.step().await;
    assert_eq!(probe.geolocate_triggers(), 1);
}

#[tokio::test(start_paused = true)]
async fn destroy_cancels_pending_geolocate_trigger() {
    let mut h = harness();
    h.controller.init(&container());
    let first = h.probe();
    h.controller.destroy();

    tokio::time::advance(Duration::from_millis(1500)).await;
    tokio::task::yield_now().await;
    h.controller.process_pending().await;

    assert_eq!(first.geolocate_triggers(), 0);
}

// =========================================================================
// Presence
// =========================================================================

#[tokio::test(start_paused = true)]
async fn presence_scenario_tracks_markers() {
    let mut h = harness();
    h.controller.init(&container());

    h.channel.dispatch(&InboundEvent::InitState(vec![
        at("alice", 50.0, 19.0),
        at("bob", 51.0, 20.0),
    ]));
    h.controller.process_pending().await;
    let probe = h.probe();
    assert_eq!(probe.marker_count(), 2);

    let alice = ParticipantId::new("alice");
    let marker = h.controller.registry().get(&alice).unwrap().marker;

    h.channel
        .dispatch(&InboundEvent::LocationUpdate(at("alice", 50.5, 19.5)));
    h.controller.process_pending().await;
    assert_eq!(probe.marker_count(), 2);
    assert_eq!(probe.markers_created(), 2);
    assert_eq!(probe.marker_location(marker), Some(Coordinate::new(50.5, 19.5)));
    assert_eq!(
        h.controller.registry().get(&alice).map(|e| e.location),
        Some(Coordinate::new(50.5, 19.5))
    );

    h.channel
        .dispatch(&InboundEvent::ParticipantDisconnected(ParticipantId::new("bob")));
    h.controller.process_pending().await;
    assert_eq!(probe.marker_count(), 1);
    assert_eq!(h.controller.registry().len(), 1);
    assert!(h.controller.registry().get(&alice).is_some());
}

#[tokio::test(start_paused = true)]
async fn disconnect_for_unknown_participant_is_noop() {
    let mut h = harness();
    h.controller.init(&container());
    h.channel
        .dispatch(&InboundEvent::LocationUpdate(at("alice", 1.0, 1.0)));
    h.channel
        .dispatch(&InboundEvent::ParticipantDisconnected(ParticipantId::new("nobody")));
    h.controller.process_pending().await;

    assert_eq!(h.controller.registry().len(), 1);
    assert_eq!(h.probe().marker_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn markers_carry_avatar_and_label() {
    let mut h = harness();
    h.controller.init(&container());
    h.channel
        .dispatch(&InboundEvent::LocationUpdate(at("alice", 1.0, 1.0)));
    h.controller.process_pending().await;

    let marker = h
        .controller
        .registry()
        .get(&ParticipantId::new("alice"))
        .unwrap()
        .marker;
    let spec = h.probe().marker_spec(marker).unwrap();
    assert_eq!(spec.image_url, "https://picsum.photos/seed/alice/50/50");
    assert_eq!(spec.aria_label, "Marker with image of the alice");
}

// =========================================================================
// Device location
// =========================================================================

#[tokio::test(start_paused = true)]
async fn identity_unavailable_then_stable() {
    let h = harness();
    assert!(matches!(
        h.controller.identity(),
        Err(ControllerError::Channel {
            source: ChannelError::IdentityUnavailable
        })
    ));

    h.transport.assign_id("me");
    let first = h.controller.identity().unwrap();
    let second = h.controller.identity().unwrap();
    assert_eq!(first, ParticipantId::new("me"));
    assert_eq!(first, second);
}

#[tokio::test(start_paused = true)]
async fn connected_starts_watch_and_readings_are_emitted() {
    let mut h = harness();
    h.transport.assign_id("me");
    h.controller.init(&container());
    h.channel.dispatch(&InboundEvent::Connected);
    h.controller.process_pending().await;
    assert!(h.controller.is_tracking_location());

    h.sensor
        .push(Ok(SensorReading::now(Coordinate::new(50.02, 19.9))));
    step_until(&mut h.controller, |c| c.local_location().is_some()).await;

    let expected = at("me", 50.02, 19.9);
    assert_eq!(h.controller.local_location(), Some(&expected));
    assert_eq!(h.transport.sent(), vec![OutboundEvent::LocationUpdate(expected)]);
}

#[tokio::test(start_paused = true)]
async fn sensor_error_keeps_watch_alive() {
    let mut h = harness();
    h.transport.assign_id("me");
    h.controller.init(&container());
    h.channel.dispatch(&InboundEvent::Connected);
    h.controller.process_pending().await;

    h.sensor.push(Err(SensorError::PermissionDenied));
    h.sensor
        .push(Ok(SensorReading::now(Coordinate::new(1.0, 2.0))));
    step_until(&mut h.controller, |c| c.local_location().is_some()).await;

    assert!(h.controller.is_tracking_location());
    assert_eq!(h.transport.sent().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn repeated_connected_keeps_one_watch() {
    let mut h = harness();
    h.transport.assign_id("me");
    h.controller.init(&container());
    h.channel.dispatch(&InboundEvent::Connected);
    h.controller.process_pending().await;
    h.channel.dispatch(&InboundEvent::Connected);
    h.controller.process_pending().await;
    tokio::task::yield_now().await;
    tokio::task::yield_now().await;

    assert_eq!(h.sensor.watchers(), 1);
}

#[tokio::test(start_paused = true)]
async fn readings_while_destroyed_are_still_emitted() {
    let mut h = harness();
    h.transport.assign_id("me");
    h.controller.init(&container());
    h.channel.dispatch(&InboundEvent::Connected);
    h.controller.process_pending().await;
    h.controller.destroy();

    h.sensor.push(Ok(SensorReading::now(Coordinate::new(1.0, 2.0))));
    step_until(&mut h.controller, |c| c.local_location().is_some()).await;

    assert_eq!(h.controller.lifecycle(), Lifecycle::Destroyed);
    assert_eq!(
        h.transport.sent(),
        vec![OutboundEvent::LocationUpdate(at("me", 1.0, 2.0))]
    );
}

#[tokio::test(start_paused = true)]
async fn dropping_controller_stops_watch() {
    let h = harness();
    let sensor = h.sensor.clone();
    let mut controller = h.controller;
    controller.init(&container());
    h.channel.dispatch(&InboundEvent::Connected);
    controller.process_pending().await;
    tokio::task::yield_now().await;
    assert_eq!(sensor.watchers(), 1);

    drop(controller);
    tokio::task::yield_now().await;
    tokio::task::yield_now().await;
    assert_eq!(sensor.watchers(), 0);
}

// =========================================================================
// Routes and marker activation
// =========================================================================

#[tokio::test(start_paused = true)]
async fn route_before_load_is_route_layer_missing() {
    let mut h = harness_with(HeadlessMapFactory::without_load_event(), GeoConfig::default());
    h.controller.init(&container());
    h.controller.process_pending().await;

    let here = Coordinate::new(50.0, 20.0);
    let result = h.controller.compute_route(here, here).await;
    assert!(matches!(result, Err(ControllerError::RouteLayerMissing(id)) if id == "route"));

    assert!(h.probe().load());
    h.controller.process_pending().await;
    assert!(h.probe().has_layer("route"));
}

#[tokio::test(start_paused = true)]
async fn activation_without_local_location_is_silent() {
    let mut h = harness();
    h.controller.init(&container());
    h.channel
        .dispatch(&InboundEvent::LocationUpdate(at("bob", 50.06, 19.94)));
    h.controller.process_pending().await;
    let marker = h
        .controller
        .registry()
        .get(&ParticipantId::new("bob"))
        .unwrap()
        .marker;

    let result = h.controller.activate_marker(marker, &Activation::Click).await;
    assert!(matches!(result, Ok(None)));

    assert!(h.probe().activate(marker, Activation::Key("Enter".to_owned())));
    h.controller.process_pending().await;
    assert!(h.probe().has_layer("route"));
    assert_eq!(route_coordinates(&h.probe()), None);
}

#[tokio::test]
async fn compute_route_replaces_layer_contents() {
    let geo = spawn_providers().await;
    let mut h = harness_with(HeadlessMapFactory::new(), geo);
    h.controller.init(&container());
    h.controller.process_pending().await;

    let a = Coordinate::new(50.06, 19.94);
    let b = Coordinate::new(50.02, 19.9);
    let c = Coordinate::new(50.0, 19.0);

    h.controller.compute_route(a, b).await.unwrap();
    let path = h.controller.compute_route(b, c).await.unwrap();

    assert_eq!(path.coordinates, vec![b, c]);
    assert!(path.duration_s.is_some_and(|s| (s - 1200.0).abs() < 1e-9));
    let probe = h.probe();
    let features = probe.layer_data("route").unwrap();
    assert_eq!(features["features"].as_array().map(Vec::len), Some(1));
    assert_eq!(route_coordinates(&probe), Some(json!([[19.9, 50.02], [19.0, 50.0]])));
}

#[tokio::test]
async fn activated_marker_draws_route_to_local_participant() {
    let geo = spawn_providers().await;
    let mut h = harness_with(HeadlessMapFactory::new(), geo);
    h.transport.assign_id("me");
    h.controller.init(&container());
    h.channel.dispatch(&InboundEvent::Connected);
    h.channel
        .dispatch(&InboundEvent::LocationUpdate(at("bob", 50.06, 19.94)));
    h.controller.process_pending().await;

    h.sensor
        .push(Ok(SensorReading::now(Coordinate::new(50.02, 19.9))));
    step_until(&mut h.controller, |c| c.local_location().is_some()).await;

    let marker = h
        .controller
        .registry()
        .get(&ParticipantId::new("bob"))
        .unwrap()
        .marker;
    let probe = h.probe();
    assert!(probe.activate(marker, Activation::Key(" ".to_owned())));
    step_until(&mut h.controller, |_| route_coordinates(&probe).is_some()).await;

    assert_eq!(
        route_coordinates(&probe),
        Some(json!([[19.94, 50.06], [19.9, 50.02]]))
    );
}

#[tokio::test]
async fn fly_to_address_moves_camera_to_match() {
    let geo = spawn_providers().await;
    let mut h = harness_with(HeadlessMapFactory::new(), geo);
    h.controller.init(&container());

    let found = h.controller.fly_to_address("Krakow").await.unwrap();
    assert_eq!(found, Some(Coordinate::new(50.06, 19.94)));
    assert_eq!(
        h.probe().cameras().last().map(|c| c.center),
        Some(Coordinate::new(50.06, 19.94))
    );

    let missing = h.controller.fly_to_address("Atlantis").await.unwrap();
    assert_eq!(missing, None);
    assert_eq!(h.probe().cameras().len(), 1);
}

#[tokio::test]
async fn geocode_does_not_require_map() {
    let geo = spawn_providers().await;
    let h = harness_with(HeadlessMapFactory::new(), geo);
    let found = h.controller.geocode("Krakow").await.unwrap();
    assert_eq!(found, Some(Coordinate::new(50.06, 19.94)));
}
