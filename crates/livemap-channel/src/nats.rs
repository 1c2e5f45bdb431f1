//! NATS transport.
//!
//! All traffic lives under a configurable subject prefix (`livemap` by
//! default):
//!
//! - `{prefix}.join` -- published once on connect with `{"userId": id}` so the
//!   presence relay can answer with a snapshot
//! - `{prefix}.init_state.{id}` -- snapshot addressed to this client
//! - `{prefix}.location_update` -- every participant's updates, both ways
//! - `{prefix}.user_disconnected` -- a participant left
//! - `{prefix}.leave` -- published on [`Transport::close`]
//!
//! The identity is the client id the NATS server assigns to the connection.
//! `connected` is raised locally once the subscription is live. The client
//! never receives its own location updates.

use std::sync::{Arc, Mutex, PoisonError};

use futures::StreamExt as _;
use livemap_types::events::{EVENT_INIT_STATE, EVENT_LOCATION_UPDATE, EVENT_USER_DISCONNECTED};
use livemap_types::{InboundEvent, OutboundEvent};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::ChannelError;
use crate::transport::{InboundReceiver, InboundSender, Transport};

/// Realtime transport backed by a NATS connection.
pub struct NatsTransport {
    client: async_nats::Client,
    prefix: String,
    id: String,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl NatsTransport {
    /// Connect, subscribe to the prefix, announce this client, and start
    /// forwarding inbound messages.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Transport`] if the connection or the
    /// subscription cannot be established.
    pub async fn connect(
        url: &str,
        prefix: &str,
    ) -> Result<(Arc<Self>, InboundReceiver), ChannelError> {
        info!(url = url, "connecting to NATS server");
        let client = async_nats::ConnectOptions::new()
            .no_echo()
            .event_callback(|event| async move {
                match event {
                    async_nats::Event::Disconnected => warn!("NATS connection lost"),
                    async_nats::Event::Connected => info!("NATS connection established"),
                    other => debug!(event = ?other, "NATS client event"),
                }
            })
            .connect(url)
            .await
            .map_err(|e| ChannelError::Transport(format!("failed to connect to {url}: {e}")))?;

        let id = client.server_info().client_id.to_string();
        let subject = format!("{prefix}.>");
        let subscriber = client.subscribe(subject.clone()).await.map_err(|e| {
            ChannelError::Transport(format!("failed to subscribe to {subject}: {e}"))
        })?;
        info!(client_id = id, subject = subject, "NATS subscription established");

        let (tx, rx) = mpsc::unbounded_channel();
        let pump = spawn_pump(subscriber, prefix.to_owned(), id.clone(), tx.clone());

        let transport = Arc::new(Self {
            client,
            prefix: prefix.to_owned(),
            id,
            pump: Mutex::new(Some(pump)),
        });

        transport.publish(format!("{prefix}.join"), transport.presence_payload());
        let _ = tx.send(InboundEvent::Connected);

        Ok((transport, rx))
    }

    fn presence_payload(&self) -> Vec<u8> {
        serde_json::json!({ "userId": self.id }).to_string().into_bytes()
    }

    /// Publish without waiting. Failures are logged, never returned.
    fn publish(&self, subject: String, payload: Vec<u8>) {
        let client = self.client.clone();
        tokio::spawn(async move {
            if let Err(e) = client.publish(subject.clone(), payload.into()).await {
                warn!(subject = subject, error = %e, "failed to publish");
            }
        });
    }
}

impl Transport for NatsTransport {
    fn name(&self) -> &'static str {
        "nats"
    }

    fn id(&self) -> Option<String> {
        Some(self.id.clone())
    }

    fn send(&self, event: &OutboundEvent) -> Result<(), ChannelError> {
        let subject = format!("{}.{}", self.prefix, event.name());
        let payload = event.encode()?;
        debug!(subject = subject, bytes = payload.len(), "publishing outbound event");
        self.publish(subject, payload);
        Ok(())
    }

    fn close(&self) {
        if let Some(pump) = self
            .pump
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            pump.abort();
        }
        let subject = format!("{}.leave", self.prefix);
        let payload = self.presence_payload();
        let client = self.client.clone();
        tokio::spawn(async move {
            if let Err(e) = client.publish(subject.clone(), payload.into()).await {
                warn!(subject = subject, error = %e, "failed to publish leave");
            }
            if let Err(e) = client.flush().await {
                warn!(error = %e, "failed to flush NATS on close");
            }
        });
        info!(client_id = self.id, "NATS transport closed");
    }
}

impl std::fmt::Debug for NatsTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NatsTransport")
            .field("prefix", &self.prefix)
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

fn spawn_pump(
    mut subscriber: async_nats::Subscriber,
    prefix: String,
    own_id: String,
    tx: InboundSender,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(message) = subscriber.next().await {
            let subject = message.subject.to_string();
            let Some(name) = event_for_subject(&prefix, &own_id, &subject) else {
                continue;
            };
            match InboundEvent::decode(name, &message.payload) {
                Ok(event) if is_own_echo(&own_id, &event) => {
                    debug!(subject = subject, "own location update skipped");
                }
                Ok(event) => {
                    if tx.send(event).is_err() {
                        debug!("inbound receiver dropped, stopping NATS pump");
                        break;
                    }
                }
                Err(e) => {
                    warn!(subject = subject, error = %e, "failed to decode inbound message, skipping");
                }
            }
        }
        debug!("NATS subscription ended");
    })
}

/// Map a subject to the inbound event it carries for this client.
///
/// Returns `None` for subjects this client does not consume (`join`,
/// `leave`, snapshots addressed to other clients, anything unknown).
pub fn event_for_subject(prefix: &str, own_id: &str, subject: &str) -> Option<&'static str> {
    let rest = subject.strip_prefix(prefix)?.strip_prefix('.')?;
    match rest.split_once('.') {
        None if rest == EVENT_LOCATION_UPDATE => Some(EVENT_LOCATION_UPDATE),
        None if rest == EVENT_USER_DISCONNECTED => Some(EVENT_USER_DISCONNECTED),
        Some((EVENT_INIT_STATE, target)) if target == own_id => Some(EVENT_INIT_STATE),
        _ => None,
    }
}

/// Whether `event` is this client's own location update coming back.
pub fn is_own_echo(own_id: &str, event: &InboundEvent) -> bool {
    matches!(event, InboundEvent::LocationUpdate(update) if update.participant_id.as_str() == own_id)
}

#[cfg(test)]
mod tests {
    use livemap_types::{Coordinate, ParticipantId, ParticipantLocation};

    use super::*;

    #[test]
    fn broadcast_subjects_map_to_events() {
        assert_eq!(
            event_for_subject("livemap", "7", "livemap.location_update"),
            Some("location_update")
        );
        assert_eq!(
            event_for_subject("livemap", "7", "livemap.user_disconnected"),
            Some("user_disconnected")
        );
    }

    #[test]
    fn init_state_only_for_own_id() {
        assert_eq!(
            event_for_subject("livemap", "7", "livemap.init_state.7"),
            Some("init_state")
        );
        assert_eq!(event_for_subject("livemap", "7", "livemap.init_state.8"), None);
    }

    #[test]
    fn control_and_foreign_subjects_are_ignored() {
        assert_eq!(event_for_subject("livemap", "7", "livemap.join"), None);
        assert_eq!(event_for_subject("livemap", "7", "livemap.leave"), None);
        assert_eq!(event_for_subject("livemap", "7", "other.location_update"), None);
        assert_eq!(event_for_subject("livemap", "7", "livemapx.location_update"), None);
    }

    #[test]
    fn own_location_updates_are_echoes() {
        let own = InboundEvent::LocationUpdate(ParticipantLocation::new("7", Coordinate::new(1.0, 2.0)));
        let peer = InboundEvent::LocationUpdate(ParticipantLocation::new("8", Coordinate::new(1.0, 2.0)));
        assert!(is_own_echo("7", &own));
        assert!(!is_own_echo("7", &peer));
        assert!(!is_own_echo("7", &InboundEvent::ParticipantDisconnected(ParticipantId::new("7"))));
    }

    #[test]
    fn dotted_prefixes_are_supported() {
        assert_eq!(
            event_for_subject("org.livemap", "1", "org.livemap.location_update"),
            Some("location_update")
        );
    }

    // Requires a live NATS server.
    #[tokio::test]
    #[ignore]
    async fn connect_assigns_identity() {
        let result = NatsTransport::connect("nats://localhost:4222", "livemap").await;
        assert!(result.is_ok_and(|(transport, _)| transport.id().is_some()));
    }
}
