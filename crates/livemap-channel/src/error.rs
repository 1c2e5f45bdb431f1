//! Error types for the realtime channel.

/// Errors raised by the channel adapter and its transports.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// The transport has not been assigned an identity yet.
    #[error("channel identity is not available")]
    IdentityUnavailable,

    /// Connecting to or publishing on the transport failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// An inbound message could not be turned into an event.
    #[error("decode error: {0}")]
    Decode(String),

    /// Serialization of an outbound payload failed.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}
