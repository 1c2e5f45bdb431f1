//! Shared type definitions for the livemap presence map.
//!
//! Types here are the contract between the map controller, the realtime
//! channel and the HTTP geo services. The wire-facing ones flow to
//! `TypeScript` via `ts-rs` for the browser client.
//!
//! # Modules
//!
//! - [`ids`] -- Participant, marker and subscription identifiers
//! - [`geo`] -- [`Coordinate`] and ingress normalisation of coordinate shapes
//! - [`participant`] -- [`ParticipantLocation`] payloads
//! - [`events`] -- Realtime channel event names and codecs
//! - [`style`] -- [`MapStyle`] variants
//! - [`route`] -- [`RouteRequest`] / [`RoutePath`]

pub mod events;
pub mod geo;
pub mod ids;
pub mod participant;
pub mod route;
pub mod style;

pub use events::{EventDecodeError, InboundEvent, OutboundEvent};
pub use geo::{Coordinate, CoordinateError};
pub use ids::{MarkerId, ParticipantId, SubscriptionId};
pub use participant::ParticipantLocation;
pub use route::{RoutePath, RouteRequest};
pub use style::{MapStyle, STYLE_URL_PREFIX};
