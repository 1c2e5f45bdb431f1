//! The controller's inbound event queue.
//!
//! Everything that can change controller state arrives through one
//! unbounded queue and is handled one event at a time: realtime channel
//! events (forwarded by the controller's own subscriptions), sensor
//! readings, map events and the delayed geolocation trigger.
//!
//! Every event carries the generation of the map instance it was produced
//! for. The controller drops events whose generation is not the current one,
//! so nothing from a destroyed map leaks into its successor.

use livemap_types::{InboundEvent, MarkerId};
use tokio::sync::mpsc;

use crate::sensor::{SensorError, SensorReading};

/// Sending half of the controller queue.
pub type ControllerSender = mpsc::UnboundedSender<ControllerEvent>;

/// Receiving half of the controller queue.
pub type ControllerReceiver = mpsc::UnboundedReceiver<ControllerEvent>;

/// How a marker was activated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    /// Pointer click or tap.
    Click,
    /// Key press, by key name (`"Enter"`, `" "`, `"Escape"`, ...).
    Key(String),
}

impl Activation {
    /// Whether this input activates a marker. Clicks, `Enter` and space do.
    pub fn is_activating(&self) -> bool {
        match self {
            Self::Click => true,
            Self::Key(key) => key == "Enter" || key == " ",
        }
    }
}

/// Events raised by a map surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapEvent {
    /// The map finished loading its style; layers can be added.
    Loaded,
    /// The user interacted with a marker.
    MarkerActivated {
        /// The marker that received the input.
        marker: MarkerId,
        /// The input it received.
        input: Activation,
    },
}

/// One unit of work for the controller.
#[derive(Debug)]
pub enum ControllerEvent {
    /// A realtime channel event, forwarded by a controller subscription.
    Channel {
        /// Map generation the subscription was registered for.
        generation: u64,
        /// The forwarded event.
        event: InboundEvent,
    },
    /// A device location reading or failure.
    Sensor {
        /// Map generation the watch was started for.
        generation: u64,
        /// The reading.
        reading: Result<SensorReading, SensorError>,
    },
    /// Something happened on the map surface.
    Map {
        /// Generation of the surface that raised it.
        generation: u64,
        /// The map event.
        event: MapEvent,
    },
    /// The delayed geolocation trigger is due.
    GeolocateTimer {
        /// Generation of the map that scheduled it.
        generation: u64,
    },
}

impl ControllerEvent {
    /// Generation tag of this event.
    pub const fn generation(&self) -> u64 {
        match self {
            Self::Channel { generation, .. }
            | Self::Sensor { generation, .. }
            | Self::Map { generation, .. }
            | Self::GeolocateTimer { generation } => *generation,
        }
    }

    /// Short name for logs.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Channel { .. } => "channel",
            Self::Sensor { .. } => "sensor",
            Self::Map { .. } => "map",
            Self::GeolocateTimer { .. } => "geolocate_timer",
        }
    }
}
