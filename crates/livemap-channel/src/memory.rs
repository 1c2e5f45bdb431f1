//! In-process transport.
//!
//! Used by the controller and client tests. Inbound events are
//! pushed with [`MemoryTransport::inject`]; outbound events are recorded
//! and can be inspected with [`MemoryTransport::sent`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use livemap_types::{InboundEvent, OutboundEvent};
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::ChannelError;
use crate::transport::{InboundReceiver, InboundSender, Transport};

#[derive(Default)]
struct MemoryState {
    id: Option<String>,
    inbound: Option<InboundSender>,
    sent: Vec<OutboundEvent>,
    close_calls: usize,
}

/// A transport that lives entirely in memory.
pub struct MemoryTransport {
    state: Mutex<MemoryState>,
}

impl MemoryTransport {
    /// Create a transport with no identity and its inbound queue.
    pub fn new() -> (Arc<Self>, InboundReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        let transport = Self {
            state: Mutex::new(MemoryState {
                inbound: Some(tx),
                ..MemoryState::default()
            }),
        };
        (Arc::new(transport), rx)
    }

    /// Simulate the remote side assigning an identity.
    pub fn assign_id(&self, id: impl Into<String>) {
        self.state().id = Some(id.into());
    }

    /// Deliver an inbound event. Returns `false` once the transport is
    /// closed or the receiver is gone.
    pub fn inject(&self, event: InboundEvent) -> bool {
        self.state()
            .inbound
            .as_ref()
            .is_some_and(|tx| tx.send(event).is_ok())
    }

    /// Every outbound event sent so far.
    pub fn sent(&self) -> Vec<OutboundEvent> {
        self.state().sent.clone()
    }

    /// How many times [`Transport::close`] was called.
    pub fn close_calls(&self) -> usize {
        self.state().close_calls
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Transport for MemoryTransport {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn id(&self) -> Option<String> {
        self.state().id.clone()
    }

    fn send(&self, event: &OutboundEvent) -> Result<(), ChannelError> {
        debug!(event = event.name(), "memory transport recorded outbound event");
        self.state().sent.push(event.clone());
        Ok(())
    }

    fn close(&self) {
        let mut state = self.state();
        state.close_calls = state.close_calls.saturating_add(1);
        state.inbound = None;
    }
}

impl std::fmt::Debug for MemoryTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("MemoryTransport")
            .field("id", &state.id)
            .field("sent", &state.sent.len())
            .finish_non_exhaustive()
    }
}
