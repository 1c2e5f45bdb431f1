//! Live presence map controller.
//!
//! Shows every connected participant as a marker on a map, keeps markers
//! in sync with the realtime channel, broadcasts the local device location,
//! and draws a route when a marker is activated.
//!
//! # Modules
//!
//! - [`controller`] -- [`MapController`]: lifecycle, camera, style, routes
//! - [`registry`] -- [`PresenceRegistry`]: participant id to marker
//! - [`device`] -- [`DeviceLocationSource`]: sensor watch and local location
//! - [`interaction`] -- marker presentation and activation
//! - [`surface`] -- [`MapSurface`] / [`MapFactory`] renderer abstraction
//! - [`headless`] -- [`HeadlessMap`], a renderer-less surface
//! - [`sensor`] -- [`LocationSensor`] and [`BroadcastSensor`]
//! - [`event`] -- the controller event queue
//! - [`config`] -- YAML configuration
//! - [`error`] -- [`ControllerError`]

pub mod config;
pub mod controller;
pub mod device;
pub mod error;
pub mod event;
pub mod headless;
pub mod interaction;
pub mod registry;
pub mod sensor;
pub mod surface;

pub use config::{ConfigError, LiveMapConfig, LoggingConfig, MapConfig, RealtimeConfig};
pub use controller::{Lifecycle, MapController};
pub use device::DeviceLocationSource;
pub use error::ControllerError;
pub use event::{Activation, ControllerEvent, MapEvent};
pub use headless::{HeadlessMap, HeadlessMapFactory, HeadlessProbe};
pub use registry::{MarkerEntry, PresenceRegistry, Upsert};
pub use sensor::{BroadcastSensor, LocationSensor, PositionOptions, SensorError, SensorReading};
pub use surface::{MapContainer, MapFactory, MapSurface};
