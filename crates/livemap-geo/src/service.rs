//! HTTP client for the geocoding and routing providers.

use std::time::Duration;

use livemap_types::{Coordinate, RoutePath, RouteRequest};
use reqwest::Url;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::GeoConfig;
use crate::error::GeoError;
use crate::parse::{parse_geocode_response, parse_route_response};

/// Client for forward geocoding (Nominatim) and routing (`BRouter`).
///
/// Requests are never cancelled: a slow response is still returned to the
/// caller even if a newer request was issued in the meantime.
#[derive(Debug, Clone)]
pub struct GeoService {
    client: reqwest::Client,
    config: GeoConfig,
}

impl GeoService {
    /// Build a service for the given endpoints.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::Http`] if the HTTP client cannot be constructed.
    pub fn new(config: GeoConfig) -> Result<Self, GeoError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| GeoError::Http(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// The endpoints this service talks to.
    pub const fn config(&self) -> &GeoConfig {
        &self.config
    }

    /// Search URL for a free-text query:
    /// `<geocoder>?q=<query>&limit=1&format=jsonv2`.
    pub fn geocode_url(&self, query: &str) -> Result<Url, GeoError> {
        Url::parse_with_params(
            &self.config.geocoder_url,
            &[("q", query), ("limit", "1"), ("format", "jsonv2")],
        )
        .map_err(|e| GeoError::InvalidUrl(format!("{}: {e}", self.config.geocoder_url)))
    }

    /// Routing URL:
    /// `<router>?lonlats=<lon1>,<lat1>|<lon2>,<lat2>&profile=<profile>&alternativeidx=0&format=geojson`.
    pub fn route_url(&self, request: &RouteRequest) -> Result<Url, GeoError> {
        let lonlats = format!(
            "{},{}|{},{}",
            request.start.lon, request.start.lat, request.end.lon, request.end.lat
        );
        Url::parse_with_params(
            &self.config.router_url,
            &[
                ("lonlats", lonlats.as_str()),
                ("profile", self.config.route_profile.as_str()),
                ("alternativeidx", "0"),
                ("format", "geojson"),
            ],
        )
        .map_err(|e| GeoError::InvalidUrl(format!("{}: {e}", self.config.router_url)))
    }

    /// Resolve a free-text place query to a coordinate.
    ///
    /// Returns `Ok(None)` when the provider has no match.
    ///
    /// # Errors
    ///
    /// [`GeoError::ParseFailure`] for malformed provider data;
    /// [`GeoError::Http`] / [`GeoError::Status`] for transport failures.
    pub async fn geocode(&self, query: &str) -> Result<Option<Coordinate>, GeoError> {
        let url = self.geocode_url(query)?;
        let json = self.get_json("geocoder", url).await?;
        let result = parse_geocode_response(&json)?;
        match result {
            Some(coordinate) => info!(query = query, %coordinate, "geocoded query"),
            None => info!(query = query, "geocoder found no match"),
        }
        Ok(result)
    }

    /// Compute a path between two coordinates with the configured profile.
    ///
    /// # Errors
    ///
    /// [`GeoError::ParseFailure`] if the response has no usable path;
    /// [`GeoError::Http`] / [`GeoError::Status`] for transport failures.
    pub async fn route(&self, start: Coordinate, end: Coordinate) -> Result<RoutePath, GeoError> {
        let url = self.route_url(&RouteRequest { start, end })?;
        let json = self.get_json("router", url).await?;
        let path = parse_route_response(&json)?;
        info!(
            %start,
            %end,
            vertices = path.coordinates.len(),
            length_m = path.length_m,
            "route computed"
        );
        Ok(path)
    }

    async fn get_json(&self, provider: &'static str, url: Url) -> Result<Value, GeoError> {
        debug!(provider = provider, url = %url, "provider request");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| GeoError::Http(format!("{provider} request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error body".to_owned());
            return Err(GeoError::Status {
                provider,
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| GeoError::ParseFailure(format!("{provider} response is not JSON: {e}")))
    }
}
