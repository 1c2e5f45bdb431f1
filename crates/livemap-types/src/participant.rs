//! Participant location payloads.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::geo::Coordinate;
use crate::ids::ParticipantId;

/// The last reported position of one participant.
///
/// Values are replaced wholesale on every update, never mutated in place.
/// On the wire the id travels as `userId` to match the browser client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ParticipantLocation {
    /// Who is reporting.
    #[serde(rename = "userId")]
    pub participant_id: ParticipantId,
    /// Where they are.
    pub location: Coordinate,
}

impl ParticipantLocation {
    /// Pair a participant with a position.
    pub fn new(participant_id: impl Into<ParticipantId>, location: Coordinate) -> Self {
        Self {
            participant_id: participant_id.into(),
            location,
        }
    }
}
