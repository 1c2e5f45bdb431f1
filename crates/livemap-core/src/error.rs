//! Error types for the map controller.
//!
//! Precondition violations (`MapNotInitialized`, `RouteLayerMissing`, and
//! `IdentityUnavailable` via [`ChannelError`]) are call-ordering bugs and are
//! always returned to the caller. Provider and transport failures pass
//! through unchanged for the UI layer to surface.

use livemap_channel::ChannelError;
use livemap_geo::GeoError;

/// Errors returned by [`MapController`](crate::controller::MapController).
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    /// The operation requires a `Ready` map.
    #[error("map is not initialized")]
    MapNotInitialized,

    /// A route was drawn before the map finished loading its route layer.
    #[error("route layer `{0}` does not exist yet")]
    RouteLayerMissing(String),

    /// Realtime channel failure (including `IdentityUnavailable`).
    #[error("channel error: {source}")]
    Channel {
        /// The underlying channel error.
        #[from]
        source: ChannelError,
    },

    /// Geocoding or routing failure (including `ParseFailure`).
    #[error("geo error: {source}")]
    Geo {
        /// The underlying geo error.
        #[from]
        source: GeoError,
    },
}
