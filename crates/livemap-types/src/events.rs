//! Realtime channel event contract.
//!
//! Event names and payload shapes shared with the browser client and the
//! presence relay:
//!
//! | Direction | Event | Payload |
//! |---|---|---|
//! | in | `connected` | none |
//! | in | `init_state` | `[{userId, location}]` |
//! | in | `location_update` | `{userId, location}` |
//! | in | `user_disconnected` | `"<participant id>"` |
//! | out | `location_update` | `{userId, location}` |

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::ids::ParticipantId;
use crate::participant::ParticipantLocation;

/// Inbound: transport connected.
pub const EVENT_CONNECTED: &str = "connected";
/// Inbound: snapshot of everyone currently connected.
pub const EVENT_INIT_STATE: &str = "init_state";
/// Both directions: one participant moved.
pub const EVENT_LOCATION_UPDATE: &str = "location_update";
/// Inbound: a participant left.
pub const EVENT_USER_DISCONNECTED: &str = "user_disconnected";

/// Errors decoding an inbound event.
#[derive(Debug, thiserror::Error)]
pub enum EventDecodeError {
    /// The event name is not part of the contract.
    #[error("unknown event: {0}")]
    UnknownEvent(String),

    /// The payload did not match the event's shape.
    #[error("malformed {event} payload: {source}")]
    Payload {
        /// Event name.
        event: &'static str,
        /// Underlying JSON error.
        source: serde_json::Error,
    },
}

/// An event received from the realtime channel.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    /// The transport is connected and has an identity.
    Connected,
    /// Everyone currently connected, in delivery order.
    InitState(Vec<ParticipantLocation>),
    /// A single participant's new position.
    LocationUpdate(ParticipantLocation),
    /// A participant left.
    ParticipantDisconnected(ParticipantId),
}

impl InboundEvent {
    /// Wire name of this event.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Connected => EVENT_CONNECTED,
            Self::InitState(_) => EVENT_INIT_STATE,
            Self::LocationUpdate(_) => EVENT_LOCATION_UPDATE,
            Self::ParticipantDisconnected(_) => EVENT_USER_DISCONNECTED,
        }
    }

    /// Decode an event from its wire name and JSON payload.
    pub fn decode(name: &str, payload: &[u8]) -> Result<Self, EventDecodeError> {
        match name {
            EVENT_CONNECTED => Ok(Self::Connected),
            EVENT_INIT_STATE => {
                let snapshot: InitStatePayload = parse(EVENT_INIT_STATE, payload)?;
                Ok(Self::InitState(snapshot.into_locations()))
            }
            EVENT_LOCATION_UPDATE => Ok(Self::LocationUpdate(parse(EVENT_LOCATION_UPDATE, payload)?)),
            EVENT_USER_DISCONNECTED => Ok(Self::ParticipantDisconnected(parse(
                EVENT_USER_DISCONNECTED,
                payload,
            )?)),
            other => Err(EventDecodeError::UnknownEvent(other.to_owned())),
        }
    }
}

/// An event sent on the realtime channel.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundEvent {
    /// This client's own position.
    LocationUpdate(ParticipantLocation),
}

impl OutboundEvent {
    /// Wire name of this event.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::LocationUpdate(_) => EVENT_LOCATION_UPDATE,
        }
    }

    /// Encode the payload as JSON.
    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        match self {
            Self::LocationUpdate(location) => serde_json::to_vec(location),
        }
    }
}

/// `init_state` arrives either as a list or as an object keyed by id.
#[derive(Deserialize)]
#[serde(untagged)]
enum InitStatePayload {
    List(Vec<ParticipantLocation>),
    Keyed(BTreeMap<String, ParticipantLocation>),
}

impl InitStatePayload {
    fn into_locations(self) -> Vec<ParticipantLocation> {
        match self {
            Self::List(list) => list,
            Self::Keyed(map) => map.into_values().collect(),
        }
    }
}

fn parse<T: for<'de> Deserialize<'de>>(
    event: &'static str,
    payload: &[u8],
) -> Result<T, EventDecodeError> {
    serde_json::from_slice(payload).map_err(|source| EventDecodeError::Payload { event, source })
}
