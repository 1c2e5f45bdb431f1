//! Configuration loading and typed config structures.
//!
//! The client reads an optional `livemap.yaml`. Every field has a default,
//! so an empty file (or no file) is a valid configuration. Environment
//! variables override connection strings and secrets after parsing.

use std::path::Path;
use std::time::Duration;

use livemap_geo::GeoConfig;
use livemap_types::{Coordinate, MapStyle};
use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level client configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LiveMapConfig {
    /// Map rendering and camera settings.
    #[serde(default)]
    pub map: MapConfig,

    /// Realtime channel connection.
    #[serde(default)]
    pub realtime: RealtimeConfig,

    /// Geocoding and routing providers.
    #[serde(default)]
    pub geo: GeoConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl LiveMapConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values:
    /// - `MAPBOX_ACCESS_TOKEN` overrides `map.access_token`
    /// - `NATS_URL` overrides `realtime.nats_url`
    /// - `LIVEMAP_GEOCODER_URL` overrides `geo.geocoder_url`
    /// - `LIVEMAP_ROUTER_URL` overrides `geo.router_url`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string and apply env overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Defaults plus environment overrides, for runs without a file.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("MAPBOX_ACCESS_TOKEN") {
            self.map.access_token = val;
        }
        if let Ok(val) = std::env::var("NATS_URL") {
            self.realtime.nats_url = val;
        }
        self.geo.apply_env_overrides();
    }
}

/// Map rendering and camera configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MapConfig {
    /// Mapbox access token used in tile descriptors.
    #[serde(default)]
    pub access_token: String,

    /// Camera center when the map is created.
    #[serde(default = "default_center")]
    pub default_center: Coordinate,

    /// Zoom when the map is created.
    #[serde(default = "default_zoom")]
    pub default_zoom: f64,

    /// Style when the map is created.
    #[serde(default)]
    pub default_style: MapStyle,

    /// Zoom used by fly-to.
    #[serde(default = "default_fly_to_zoom")]
    pub fly_to_zoom: f64,

    /// Fly-to animation duration in milliseconds.
    #[serde(default = "default_fly_to_duration_ms")]
    pub fly_to_duration_ms: u64,

    /// Delay before the geolocation control is triggered automatically.
    #[serde(default = "default_geolocate_trigger_delay_ms")]
    pub geolocate_trigger_delay_ms: u64,

    /// Id of the line layer that holds the current route.
    #[serde(default = "default_route_layer_id")]
    pub route_layer_id: String,
}

impl MapConfig {
    /// Fly-to animation duration.
    pub const fn fly_to_duration(&self) -> Duration {
        Duration::from_millis(self.fly_to_duration_ms)
    }

    /// Delay before the automatic geolocation trigger.
    pub const fn geolocate_trigger_delay(&self) -> Duration {
        Duration::from_millis(self.geolocate_trigger_delay_ms)
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            default_center: default_center(),
            default_zoom: default_zoom(),
            default_style: MapStyle::Standard,
            fly_to_zoom: default_fly_to_zoom(),
            fly_to_duration_ms: default_fly_to_duration_ms(),
            geolocate_trigger_delay_ms: default_geolocate_trigger_delay_ms(),
            route_layer_id: default_route_layer_id(),
        }
    }
}

/// Realtime channel configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RealtimeConfig {
    /// NATS server URL.
    #[serde(default = "default_nats_url")]
    pub nats_url: String,

    /// Subject prefix for every livemap subject.
    #[serde(default = "default_subject_prefix")]
    pub subject_prefix: String,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            nats_url: default_nats_url(),
            subject_prefix: default_subject_prefix(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

const fn default_center() -> Coordinate {
    Coordinate::new(50.02, 19.9)
}

const fn default_zoom() -> f64 {
    2.0
}

const fn default_fly_to_zoom() -> f64 {
    14.0
}

const fn default_fly_to_duration_ms() -> u64 {
    1000
}

const fn default_geolocate_trigger_delay_ms() -> u64 {
    1000
}

fn default_route_layer_id() -> String {
    String::from("route")
}

fn default_nats_url() -> String {
    String::from("nats://localhost:4222")
}

fn default_subject_prefix() -> String {
    String::from("livemap")
}

fn default_log_level() -> String {
    String::from("info")
}
