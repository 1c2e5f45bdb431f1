//! Marker presentation and activation.
//!
//! Every participant marker carries an avatar and an accessible label, and
//! is activatable by click, `Enter` or space. Activating a marker asks for
//! a route between that participant and the local participant.

use livemap_types::{MarkerId, ParticipantId, ParticipantLocation, RouteRequest};

use crate::event::Activation;
use crate::registry::PresenceRegistry;
use crate::surface::MarkerSpec;

/// Presentation of a participant's marker.
pub fn marker_spec(participant_id: &ParticipantId) -> MarkerSpec {
    MarkerSpec {
        label: participant_id.to_string(),
        image_url: format!("https://picsum.photos/seed/{participant_id}/50/50"),
        aria_label: format!("Marker with image of the {participant_id}"),
    }
}

/// Route to draw for a marker activation, if any.
///
/// `None` when the input does not activate, the marker belongs to nobody,
/// or the local location is not known yet.
pub fn route_for_activation(
    registry: &PresenceRegistry,
    local: Option<&ParticipantLocation>,
    marker: MarkerId,
    input: &Activation,
) -> Option<RouteRequest> {
    if !input.is_activating() {
        return None;
    }
    let entry = registry.by_marker(marker)?;
    let local = local?;
    Some(RouteRequest {
        start: entry.location,
        end: local.location,
    })
}
