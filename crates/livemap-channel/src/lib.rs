//! Realtime channel adapter for the livemap presence map.
//!
//! Participants broadcast their positions over a bidirectional event
//! channel. This crate provides the typed façade the map controller talks
//! to ([`RealtimeChannel`]) and the transports underneath it.
//!
//! # Architecture
//!
//! ```text
//! NATS / memory --> InboundReceiver --> RealtimeChannel::dispatch --> handlers
//! emit_location --> Transport::send --> NATS / memory
//! ```

pub mod channel;
pub mod error;
pub mod memory;
pub mod nats;
pub mod transport;

pub use channel::{EventKind, RealtimeChannel, Subscription};
pub use error::ChannelError;
pub use memory::MemoryTransport;
pub use nats::NatsTransport;
pub use transport::{InboundReceiver, InboundSender, Transport};
