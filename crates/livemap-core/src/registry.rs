//! The presence registry.
//!
//! Maps each participant believed connected to its last-known location and
//! its marker on the map, with at most one marker each. Participants
//! outlive the map: a remount places their markers again.

use std::collections::{BTreeMap, HashMap};

use livemap_types::{Coordinate, MarkerId, ParticipantId, ParticipantLocation};
use tracing::{debug, warn};

use crate::interaction::marker_spec;
use crate::surface::MapSurface;

/// One participant on the map.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerEntry {
    /// Who this marker represents.
    pub participant_id: ParticipantId,
    /// Last-known location.
    pub location: Coordinate,
    /// The marker on the map.
    pub marker: MarkerId,
}

/// Whether an upsert placed a new marker or moved an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    /// First sighting; a marker was created.
    Created(MarkerId),
    /// Known participant; its marker was moved.
    Moved(MarkerId),
}

impl Upsert {
    /// The affected marker.
    pub const fn marker(self) -> MarkerId {
        match self {
            Self::Created(id) | Self::Moved(id) => id,
        }
    }
}

/// Participant id to marker bookkeeping.
#[derive(Debug, Default)]
pub struct PresenceRegistry {
    entries: BTreeMap<ParticipantId, MarkerEntry>,
    by_marker: HashMap<MarkerId, ParticipantId>,
}

impl PresenceRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Place or move a participant's marker.
    ///
    /// An unknown participant gets a new marker; a known one has its
    /// existing marker moved, never recreated.
    pub fn upsert(&mut self, surface: &mut dyn MapSurface, update: &ParticipantLocation) -> Upsert {
        if !update.location.is_in_range() {
            warn!(
                participant_id = %update.participant_id,
                location = %update.location,
                "location out of range, placing anyway"
            );
        }

        if let Some(entry) = self.entries.get_mut(&update.participant_id) {
            surface.move_marker(entry.marker, update.location);
            entry.location = update.location;
            debug!(participant_id = %update.participant_id, location = %update.location, "participant moved");
            return Upsert::Moved(entry.marker);
        }

        let marker = surface.add_marker(&marker_spec(&update.participant_id), update.location);
        self.by_marker.insert(marker, update.participant_id.clone());
        self.entries.insert(
            update.participant_id.clone(),
            MarkerEntry {
                participant_id: update.participant_id.clone(),
                location: update.location,
                marker,
            },
        );
        debug!(participant_id = %update.participant_id, location = %update.location, "participant appeared");
        Upsert::Created(marker)
    }

    /// Apply [`upsert`](Self::upsert) to each element, in order.
    pub fn bulk_load(&mut self, surface: &mut dyn MapSurface, snapshot: &[ParticipantLocation]) {
        for update in snapshot {
            self.upsert(surface, update);
        }
        debug!(participants = snapshot.len(), total = self.entries.len(), "snapshot loaded");
    }

    /// Take a participant off the map. Unknown ids are ignored.
    pub fn remove(&mut self, surface: &mut dyn MapSurface, participant_id: &ParticipantId) -> Option<MarkerEntry> {
        let Some(entry) = self.entries.remove(participant_id) else {
            debug!(participant_id = %participant_id, "disconnect for unknown participant ignored");
            return None;
        };
        self.by_marker.remove(&entry.marker);
        surface.remove_marker(entry.marker);
        debug!(participant_id = %participant_id, "participant removed");
        Some(entry)
    }

    /// Entry for a participant.
    pub fn get(&self, participant_id: &ParticipantId) -> Option<&MarkerEntry> {
        self.entries.get(participant_id)
    }

    /// Entry owning a marker.
    pub fn by_marker(&self, marker: MarkerId) -> Option<&MarkerEntry> {
        self.by_marker
            .get(&marker)
            .and_then(|participant_id| self.entries.get(participant_id))
    }

    /// All entries, ordered by participant id.
    pub fn entries(&self) -> impl Iterator<Item = &MarkerEntry> {
        self.entries.values()
    }

    /// Number of participants on the map.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nobody is on the map.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every marker handle and keep the participants.
    ///
    /// Called when the map goes away; the markers go with it. Until the
    /// next [`attach`](Self::attach) each entry's `marker` names a marker
    /// on the removed map and [`by_marker`](Self::by_marker) finds nothing.
    pub fn detach(&mut self) {
        self.by_marker.clear();
        debug!(participants = self.entries.len(), "markers detached");
    }

    /// Place a fresh marker on `surface` for every known participant.
    /// Returns how many were placed.
    pub fn attach(&mut self, surface: &mut dyn MapSurface) -> usize {
        self.by_marker.clear();
        for entry in self.entries.values_mut() {
            entry.marker = surface.add_marker(&marker_spec(&entry.participant_id), entry.location);
            self.by_marker.insert(entry.marker, entry.participant_id.clone());
        }
        debug!(participants = self.entries.len(), "markers attached");
        self.entries.len()
    }
}
