//! Endpoint configuration for the geo providers.

use serde::Deserialize;

/// Where and how to reach the geocoding and routing providers.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GeoConfig {
    /// Forward geocoding search endpoint (Nominatim-compatible).
    #[serde(default = "default_geocoder_url")]
    pub geocoder_url: String,

    /// Routing endpoint (`BRouter`-compatible).
    #[serde(default = "default_router_url")]
    pub router_url: String,

    /// `BRouter` travel profile.
    #[serde(default = "default_route_profile")]
    pub route_profile: String,

    /// `User-Agent` sent to providers. Nominatim's usage policy requires one.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl GeoConfig {
    /// Override provider URLs with environment variables when set:
    /// `LIVEMAP_GEOCODER_URL` and `LIVEMAP_ROUTER_URL`.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("LIVEMAP_GEOCODER_URL") {
            self.geocoder_url = val;
        }
        if let Ok(val) = std::env::var("LIVEMAP_ROUTER_URL") {
            self.router_url = val;
        }
    }
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            geocoder_url: default_geocoder_url(),
            router_url: default_router_url(),
            route_profile: default_route_profile(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

fn default_geocoder_url() -> String {
    String::from("https://nominatim.openstreetmap.org/search")
}

fn default_router_url() -> String {
    String::from("https://brouter.de/brouter")
}

fn default_route_profile() -> String {
    String::from("trekking")
}

fn default_user_agent() -> String {
    format!("livemap/{}", env!("CARGO_PKG_VERSION"))
}

const fn default_timeout_ms() -> u64 {
    10_000
}
