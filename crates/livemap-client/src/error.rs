//! Error types for the console client.

use livemap_channel::ChannelError;
use livemap_core::ConfigError;
use livemap_geo::GeoError;

/// Errors that stop the client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The configuration file could not be loaded.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// The realtime channel could not be established.
    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),

    /// The geo service could not be built.
    #[error("geo error: {0}")]
    Geo(#[from] GeoError),

    /// Reading the console failed.
    #[error("console I/O error: {0}")]
    Io(#[from] std::io::Error),
}
