//! The realtime channel adapter.
//!
//! [`RealtimeChannel`] is a thin typed façade over a [`Transport`]. It keeps
//! four handler lists, one per inbound event kind. Registration appends (it
//! never replaces), and every registration returns a [`Subscription`] that
//! can be passed back to [`RealtimeChannel::unsubscribe`].
//!
//! Handlers run on whichever task calls [`RealtimeChannel::dispatch`], in
//! registration order, while the handler registry is locked. A handler must
//! not register or unsubscribe from inside its own invocation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use livemap_types::{
    InboundEvent, OutboundEvent, ParticipantId, ParticipantLocation, SubscriptionId,
};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::error::ChannelError;
use crate::transport::{InboundReceiver, Transport};

type ConnectedHandler = Box<dyn FnMut() + Send>;
type InitStateHandler = Box<dyn FnMut(&[ParticipantLocation]) + Send>;
type LocationHandler = Box<dyn FnMut(&ParticipantLocation) + Send>;
type DisconnectHandler = Box<dyn FnMut(&ParticipantId) + Send>;

/// Which inbound event a subscription listens to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// `connected`
    Connected,
    /// `init_state`
    InitState,
    /// `location_update`
    LocationUpdate,
    /// `user_disconnected`
    ParticipantDisconnected,
}

/// Handle returned by every registration.
///
/// Dropping it does not unsubscribe; pass it to
/// [`RealtimeChannel::unsubscribe`] to remove the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription {
    id: SubscriptionId,
    kind: EventKind,
}

impl Subscription {
    /// The event kind this subscription listens to.
    pub const fn kind(&self) -> EventKind {
        self.kind
    }
}

#[derive(Default)]
struct Handlers {
    connected: Vec<(SubscriptionId, ConnectedHandler)>,
    init_state: Vec<(SubscriptionId, InitStateHandler)>,
    location_update: Vec<(SubscriptionId, LocationHandler)>,
    disconnected: Vec<(SubscriptionId, DisconnectHandler)>,
}

struct Inner {
    transport: Arc<dyn Transport>,
    handlers: Mutex<Handlers>,
    closed: AtomicBool,
}

/// Typed publish/subscribe façade over a realtime transport.
///
/// Cheap to clone; clones share the same transport and handler lists.
#[derive(Clone)]
pub struct RealtimeChannel {
    inner: Arc<Inner>,
}

impl RealtimeChannel {
    /// Wrap a transport.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                handlers: Mutex::new(Handlers::default()),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// The identity the transport assigned to this connection.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::IdentityUnavailable`] before the transport
    /// has been assigned one.
    pub fn identity(&self) -> Result<ParticipantId, ChannelError> {
        self.inner
            .transport
            .id()
            .map(ParticipantId::new)
            .ok_or(ChannelError::IdentityUnavailable)
    }

    /// Register a handler for `connected`.
    pub fn on_connected(&self, handler: impl FnMut() + Send + 'static) -> Subscription {
        let id = SubscriptionId::new();
        self.handlers().connected.push((id, Box::new(handler)));
        Subscription {
            id,
            kind: EventKind::Connected,
        }
    }

    /// Register a handler for `init_state`.
    pub fn on_initial_state(
        &self,
        handler: impl FnMut(&[ParticipantLocation]) + Send + 'static,
    ) -> Subscription {
        let id = SubscriptionId::new();
        self.handlers().init_state.push((id, Box::new(handler)));
        Subscription {
            id,
            kind: EventKind::InitState,
        }
    }

    /// Register a handler for `location_update`.
    pub fn on_location_update(
        &self,
        handler: impl FnMut(&ParticipantLocation) + Send + 'static,
    ) -> Subscription {
        let id = SubscriptionId::new();
        self.handlers().location_update.push((id, Box::new(handler)));
        Subscription {
            id,
            kind: EventKind::LocationUpdate,
        }
    }

    /// Register a handler for `user_disconnected`.
    pub fn on_participant_disconnected(
        &self,
        handler: impl FnMut(&ParticipantId) + Send + 'static,
    ) -> Subscription {
        let id = SubscriptionId::new();
        self.handlers().disconnected.push((id, Box::new(handler)));
        Subscription {
            id,
            kind: EventKind::ParticipantDisconnected,
        }
    }

    /// Remove a previously registered handler.
    ///
    /// Returns `false` if it was already removed.
    pub fn unsubscribe(&self, subscription: Subscription) -> bool {
        let mut handlers = self.handlers();
        let id = subscription.id;
        match subscription.kind {
            EventKind::Connected => remove_handler(&mut handlers.connected, id),
            EventKind::InitState => remove_handler(&mut handlers.init_state, id),
            EventKind::LocationUpdate => remove_handler(&mut handlers.location_update, id),
            EventKind::ParticipantDisconnected => remove_handler(&mut handlers.disconnected, id),
        }
    }

    /// Number of handlers registered for an event kind.
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        let handlers = self.handlers();
        match kind {
            EventKind::Connected => handlers.connected.len(),
            EventKind::InitState => handlers.init_state.len(),
            EventKind::LocationUpdate => handlers.location_update.len(),
            EventKind::ParticipantDisconnected => handlers.disconnected.len(),
        }
    }

    /// Send this client's location. Fire-and-forget.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Transport`] after [`disconnect`](Self::disconnect),
    /// or whatever the transport reports when queueing fails.
    pub fn emit_location(&self, location: &ParticipantLocation) -> Result<(), ChannelError> {
        if self.is_disconnected() {
            return Err(ChannelError::Transport("channel is disconnected".to_owned()));
        }
        debug!(
            participant_id = %location.participant_id,
            lat = location.location.lat,
            lon = location.location.lon,
            "emitting location update"
        );
        self.inner
            .transport
            .send(&OutboundEvent::LocationUpdate(location.clone()))
    }

    /// Tear down the underlying connection. Idempotent.
    pub fn disconnect(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        info!(transport = self.inner.transport.name(), "disconnecting realtime channel");
        self.inner.transport.close();
    }

    /// Whether [`disconnect`](Self::disconnect) has been called.
    pub fn is_disconnected(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Invoke every handler registered for `event`, in registration order.
    pub fn dispatch(&self, event: &InboundEvent) {
        let mut handlers = self.handlers();
        match event {
            InboundEvent::Connected => {
                for (_, handler) in &mut handlers.connected {
                    handler();
                }
            }
            InboundEvent::InitState(snapshot) => {
                for (_, handler) in &mut handlers.init_state {
                    handler(snapshot);
                }
            }
            InboundEvent::LocationUpdate(location) => {
                for (_, handler) in &mut handlers.location_update {
                    handler(location);
                }
            }
            InboundEvent::ParticipantDisconnected(participant_id) => {
                for (_, handler) in &mut handlers.disconnected {
                    handler(participant_id);
                }
            }
        }
    }

    /// Spawn a task that dispatches everything the transport delivers,
    /// one event at a time and in delivery order.
    pub fn pump(&self, mut inbound: InboundReceiver) -> JoinHandle<()> {
        let channel = self.clone();
        tokio::spawn(async move {
            while let Some(event) = inbound.recv().await {
                debug!(event = event.name(), "dispatching inbound event");
                channel.dispatch(&event);
            }
            debug!("inbound event stream ended");
        })
    }

    fn handlers(&self) -> MutexGuard<'_, Handlers> {
        self.inner
            .handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for RealtimeChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeChannel")
            .field("transport", &self.inner.transport.name())
            .field("closed", &self.is_disconnected())
            .finish_non_exhaustive()
    }
}

fn remove_handler<H>(list: &mut Vec<(SubscriptionId, H)>, id: SubscriptionId) -> bool {
    let before = list.len();
    list.retain(|(existing, _)| *existing != id);
    list.len() != before
}
