//! Geocoding and routing facade for the livemap presence map.
//!
//! Wraps two external HTTP services and normalises their responses into
//! the shared [`Coordinate`](livemap_types::Coordinate) model:
//!
//! - forward geocoding (Nominatim): free text -> first matching coordinate
//! - routing (`BRouter`): two coordinates -> path geometry
//!
//! Drawing the path onto the map is the controller's job; this crate only
//! fetches and parses.

pub mod config;
pub mod error;
pub mod parse;
pub mod service;

pub use config::GeoConfig;
pub use error::GeoError;
pub use service::GeoService;
