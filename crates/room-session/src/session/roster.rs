//! Participant roster: membership, publication lists and connection
//! state.
//!
//! The roster owns participant records exclusively. It is a plain
//! synchronous component; all mutation happens on the controller task,
//! and unknown-participant operations come back as recoverable errors
//! for the caller to log and ignore.

use crate::errors::RoomError;
use crate::media::{
    ConnectionState, ParticipantDescriptor, ParticipantSid, Publication, Track, TrackKind,
    TrackSid,
};
use crate::view::ParticipantView;

use std::collections::HashMap;
use std::sync::Arc;

/// One participant's state within the room.
pub struct ParticipantRecord {
    /// Session-scoped unique identifier.
    pub sid: ParticipantSid,
    /// Stable display name.
    pub identity: String,
    /// Publications in enumeration order.
    pub publications: Vec<Publication>,
    /// Connection status (observational).
    pub connection_state: ConnectionState,
    /// Whether this is the local participant.
    pub is_local: bool,
    /// The participant's thumbnail container.
    pub view: Arc<dyn ParticipantView>,
}

impl ParticipantRecord {
    /// The first enumerated video publication with a resolved track.
    ///
    /// "First wins": when a participant has several simultaneous video
    /// tracks (e.g. screen-share plus camera), the first one is the
    /// one surfaced on the main view.
    #[must_use]
    pub fn first_video_track(&self) -> Option<&Track> {
        self.publications
            .iter()
            .filter(|p| p.kind == TrackKind::Video)
            .find_map(|p| p.track.as_ref())
    }

    /// Sids of all resolved video tracks, for priority-hint fan-out.
    #[must_use]
    pub fn video_track_sids(&self) -> Vec<TrackSid> {
        self.publications
            .iter()
            .filter(|p| p.kind == TrackKind::Video && p.track.is_some())
            .map(|p| p.sid.clone())
            .collect()
    }

    /// Publication sids of the given kind (resolved or not).
    #[must_use]
    pub fn publication_sids_of_kind(&self, kind: TrackKind) -> Vec<TrackSid> {
        self.publications
            .iter()
            .filter(|p| p.kind == kind)
            .map(|p| p.sid.clone())
            .collect()
    }

    /// Sids of every announced publication.
    #[must_use]
    pub fn all_track_sids(&self) -> Vec<TrackSid> {
        self.publications.iter().map(|p| p.sid.clone()).collect()
    }
}

/// The set of known participants.
#[derive(Default)]
pub struct Roster {
    participants: HashMap<ParticipantSid, ParticipantRecord>,
    local: Option<ParticipantSid>,
}

impl Roster {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a newly joined participant with its thumbnail view.
    ///
    /// Rejects an already-present sid with
    /// [`RoomError::DuplicateParticipant`]; the caller logs and ignores
    /// the re-add, keeping exactly one container per sid.
    pub fn add(
        &mut self,
        descriptor: ParticipantDescriptor,
        is_local: bool,
        view: Arc<dyn ParticipantView>,
    ) -> Result<(), RoomError> {
        if self.participants.contains_key(&descriptor.sid) {
            return Err(RoomError::DuplicateParticipant(descriptor.sid));
        }

        let record = ParticipantRecord {
            sid: descriptor.sid.clone(),
            identity: descriptor.identity,
            publications: descriptor.publications,
            connection_state: ConnectionState::Connected,
            is_local,
            view,
        };

        if is_local {
            self.local = Some(descriptor.sid.clone());
        }
        self.participants.insert(descriptor.sid, record);
        Ok(())
    }

    /// Unregister a participant, handing the record back so the caller
    /// can release binding and active-selection state. The returned
    /// record carries the terminal `Disconnected` state.
    pub fn remove(&mut self, sid: &ParticipantSid) -> Option<ParticipantRecord> {
        if self.local.as_ref() == Some(sid) {
            self.local = None;
        }
        self.participants.remove(sid).map(|mut record| {
            record.connection_state = ConnectionState::Disconnected;
            record
        })
    }

    /// Transition a participant's connection state. Observational;
    /// removal on terminal disconnects is driven by the caller through
    /// [`Roster::remove`].
    pub fn set_connection_state(
        &mut self,
        sid: &ParticipantSid,
        state: ConnectionState,
    ) -> Result<(), RoomError> {
        let record = self
            .participants
            .get_mut(sid)
            .ok_or_else(|| RoomError::UnknownParticipant(sid.clone()))?;
        record.connection_state = state;
        Ok(())
    }

    /// Record a newly announced publication. Idempotent by track sid,
    /// so a duplicate publish event does not grow the list.
    pub fn record_publication(
        &mut self,
        sid: &ParticipantSid,
        publication: Publication,
    ) -> Result<(), RoomError> {
        let record = self
            .participants
            .get_mut(sid)
            .ok_or_else(|| RoomError::UnknownParticipant(sid.clone()))?;

        if let Some(existing) = record
            .publications
            .iter_mut()
            .find(|p| p.sid == publication.sid)
        {
            // Keep the resolved track if the duplicate carries none.
            if existing.track.is_none() {
                existing.track = publication.track;
            }
        } else {
            record.publications.push(publication);
        }
        Ok(())
    }

    /// Bind a subscribed track to its publication. A subscribe that
    /// arrives before the publish event inserts the publication.
    pub fn resolve_track(&mut self, sid: &ParticipantSid, track: Track) -> Result<(), RoomError> {
        let record = self
            .participants
            .get_mut(sid)
            .ok_or_else(|| RoomError::UnknownParticipant(sid.clone()))?;

        if let Some(publication) = record.publications.iter_mut().find(|p| p.sid == track.sid) {
            publication.track = Some(track);
        } else {
            record.publications.push(Publication::subscribed(track));
        }
        Ok(())
    }

    /// Clear a publication's resolved track on unsubscribe. Unknown
    /// tracks are a no-op (out-of-order delivery).
    pub fn clear_track(
        &mut self,
        sid: &ParticipantSid,
        track_sid: &TrackSid,
    ) -> Result<(), RoomError> {
        let record = self
            .participants
            .get_mut(sid)
            .ok_or_else(|| RoomError::UnknownParticipant(sid.clone()))?;

        if let Some(publication) = record.publications.iter_mut().find(|p| p.sid == *track_sid) {
            publication.track = None;
        }
        Ok(())
    }

    #[must_use]
    pub fn get(&self, sid: &ParticipantSid) -> Option<&ParticipantRecord> {
        self.participants.get(sid)
    }

    #[must_use]
    pub fn contains(&self, sid: &ParticipantSid) -> bool {
        self.participants.contains_key(sid)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.participants.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// The local participant's sid, once joined.
    #[must_use]
    pub fn local_sid(&self) -> Option<&ParticipantSid> {
        self.local.as_ref()
    }

    /// Iterate over all records.
    pub fn iter(&self) -> impl Iterator<Item = &ParticipantRecord> {
        self.participants.values()
    }

    /// Remove and return every record (session teardown).
    pub fn drain(&mut self) -> Vec<ParticipantRecord> {
        self.local = None;
        self.participants.drain().map(|(_, record)| record).collect()
    }
}
