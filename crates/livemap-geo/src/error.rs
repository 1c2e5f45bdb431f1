//! Error types for the geo service facade.

use livemap_types::CoordinateError;

/// Errors returned by geocoding and routing calls.
#[derive(Debug, thiserror::Error)]
pub enum GeoError {
    /// The provider answered, but with data the facade cannot use
    /// (malformed numbers, unexpected shapes, missing geometry).
    #[error("parse failure: {0}")]
    ParseFailure(String),

    /// The request never produced a response (DNS, TLS, timeout, ...).
    #[error("HTTP error: {0}")]
    Http(String),

    /// The provider returned a non-success status.
    #[error("{provider} returned {status}: {body}")]
    Status {
        /// Which provider.
        provider: &'static str,
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// A configured endpoint is not a valid URL.
    #[error("invalid endpoint URL: {0}")]
    InvalidUrl(String),
}

impl From<CoordinateError> for GeoError {
    fn from(e: CoordinateError) -> Self {
        Self::ParseFailure(e.to_string())
    }
}
