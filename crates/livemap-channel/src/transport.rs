//! The transport seam under [`RealtimeChannel`](crate::RealtimeChannel).
//!
//! A transport owns the wire connection. It hands inbound events to the
//! adapter through an unbounded queue (delivery order is preserved) and
//! accepts outbound events on a fire-and-forget basis.

use livemap_types::{InboundEvent, OutboundEvent};
use tokio::sync::mpsc;

use crate::error::ChannelError;

/// Producer half of a transport's inbound event queue.
pub type InboundSender = mpsc::UnboundedSender<InboundEvent>;

/// Consumer half of a transport's inbound event queue.
pub type InboundReceiver = mpsc::UnboundedReceiver<InboundEvent>;

/// A bidirectional, event-based connection.
pub trait Transport: Send + Sync {
    /// Human-readable transport name for logging.
    fn name(&self) -> &'static str;

    /// The identity assigned by the remote side, once known.
    fn id(&self) -> Option<String>;

    /// Queue an outbound event. No delivery acknowledgment is given.
    fn send(&self, event: &OutboundEvent) -> Result<(), ChannelError>;

    /// Tear the connection down.
    fn close(&self);
}
