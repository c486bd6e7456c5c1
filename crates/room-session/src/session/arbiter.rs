//! Active-speaker arbitration.
//!
//! Decides which single participant is "active" given roster state,
//! the dominant-speaker signal and manual pin overrides, and owns the
//! shared main surface slot: no other component writes to it.
//!
//! Priority-hint side effects are returned as data
//! ([`PriorityChange`]) rather than performed here, so transitions
//! stay testable without a live transport; the controller forwards
//! them to `RoomOps::set_track_priority`.

use crate::media::{ParticipantSid, TrackPriority, TrackSid};
use crate::session::roster::Roster;
use crate::view::{RoomView, VisualSurface};

use std::sync::Arc;
use tracing::debug;

/// The active-selection state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActiveSelection {
    /// No participant is active (roster empty / before first join).
    NoActive,
    /// Selected automatically (dominant speaker or local fallback).
    Auto(ParticipantSid),
    /// Pinned manually by a click; dominant-speaker changes are
    /// ignored until unpinned.
    Pinned(ParticipantSid),
}

/// A priority-hint change for the controller to forward to the
/// transport. The `None` hint is still issued on unpin for protocol
/// symmetry, even where the topology ignores it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorityChange {
    pub track: TrackSid,
    pub priority: Option<TrackPriority>,
}

/// The active-speaker arbiter.
pub struct ActiveSpeakerArbiter {
    selection: ActiveSelection,
    dominant: Option<ParticipantSid>,
    main: Arc<dyn VisualSurface>,
    /// The video track currently bound to the main surface.
    main_track: Option<TrackSid>,
}

impl ActiveSpeakerArbiter {
    /// Create an arbiter owning the given main surface. Starts in
    /// `NoActive` until the first join completes.
    #[must_use]
    pub fn new(main: Arc<dyn VisualSurface>) -> Self {
        Self {
            selection: ActiveSelection::NoActive,
            dominant: None,
            main,
            main_track: None,
        }
    }

    /// The currently active participant, if any.
    #[must_use]
    pub fn active_sid(&self) -> Option<&ParticipantSid> {
        match &self.selection {
            ActiveSelection::NoActive => None,
            ActiveSelection::Auto(sid) | ActiveSelection::Pinned(sid) => Some(sid),
        }
    }

    /// Whether the active selection was set manually.
    #[must_use]
    pub fn is_pinned(&self) -> bool {
        matches!(self.selection, ActiveSelection::Pinned(_))
    }

    /// The current selection state.
    #[must_use]
    pub fn selection(&self) -> &ActiveSelection {
        &self.selection
    }

    /// The video track currently on the main surface, if any.
    #[must_use]
    pub fn main_track(&self) -> Option<&TrackSid> {
        self.main_track.as_ref()
    }

    /// Apply a dominant-speaker change. Ignored while pinned; the
    /// stored signal is still updated so unpinning recomputes against
    /// the latest value.
    pub fn dominant_speaker_changed(
        &mut self,
        dominant: Option<ParticipantSid>,
        roster: &Roster,
        view: &dyn RoomView,
    ) {
        debug!(
            target: "room.arbiter",
            dominant = ?dominant,
            pinned = self.is_pinned(),
            "Dominant speaker changed"
        );
        self.dominant = dominant;
        if !self.is_pinned() {
            self.recompute(roster, view);
        }
    }

    /// Recompute the automatic selection: dominant speaker if present
    /// in the roster, else the local participant, else nobody.
    pub fn recompute(&mut self, roster: &Roster, view: &dyn RoomView) {
        let candidate = self
            .dominant
            .as_ref()
            .filter(|sid| roster.contains(sid))
            .or_else(|| roster.local_sid())
            .cloned();
        self.set_active(candidate.map(|sid| (sid, false)), roster, view);
    }

    /// Handle a click on a participant's container: toggle the pin.
    ///
    /// Returns the video-track priority hints to forward to the
    /// transport: cleared for an unpinned (or displaced) participant,
    /// `High` for a newly pinned one.
    pub fn click(
        &mut self,
        sid: ParticipantSid,
        roster: &Roster,
        view: &dyn RoomView,
    ) -> Vec<PriorityChange> {
        let mut changes = Vec::new();

        if self.selection == ActiveSelection::Pinned(sid.clone()) {
            // Unpin and fall back to automatic selection.
            push_priority_changes(&mut changes, roster, &sid, None);
            self.recompute(roster, view);
        } else {
            if let ActiveSelection::Pinned(previous) = self.selection.clone() {
                push_priority_changes(&mut changes, roster, &previous, None);
            }
            push_priority_changes(&mut changes, roster, &sid, Some(TrackPriority::High));
            self.set_active(Some((sid, true)), roster, view);
        }

        changes
    }

    /// Handle the departure of a participant (already removed from the
    /// roster). If it was the active one, pinned or not, the pin
    /// clears and the selection recomputes.
    pub fn participant_departed(
        &mut self,
        sid: &ParticipantSid,
        roster: &Roster,
        view: &dyn RoomView,
    ) {
        if self.dominant.as_ref() == Some(sid) {
            self.dominant = None;
        }
        if self.active_sid() == Some(sid) {
            self.recompute(roster, view);
        }
    }

    /// Keep the main surface consistent after a track subscribe for
    /// the active participant. Idempotent: an occupied slot stays
    /// (first wins).
    pub fn on_track_subscribed(&mut self, roster: &Roster) {
        self.refresh_main_surface(roster);
    }

    /// Keep the main surface consistent after a track unsubscribe. If
    /// the departed track held the slot, the active participant's next
    /// available video takes over, else the surface goes empty.
    pub fn on_track_unsubscribed(&mut self, track_sid: &TrackSid, roster: &Roster) {
        if self.main_track.as_ref() == Some(track_sid) {
            self.main_track = None;
            self.main.unbind();
            self.refresh_main_surface(roster);
        }
    }

    /// Release everything at session teardown: empty selection, main
    /// surface unbound with its media source cleared.
    pub fn clear(&mut self, view: &dyn RoomView) {
        self.selection = ActiveSelection::NoActive;
        self.dominant = None;
        self.main_track = None;
        self.main.unbind();
        view.set_active_identity(None);
    }

    /// Transition the active selection, performing the main-surface
    /// and marker side effects.
    fn set_active(
        &mut self,
        target: Option<(ParticipantSid, bool)>,
        roster: &Roster,
        view: &dyn RoomView,
    ) {
        let previous = self.active_sid().cloned();
        let next_sid = target.as_ref().map(|(sid, _)| sid.clone());

        if previous == next_sid {
            // Same participant: refresh the pin marker only, leaving
            // the main surface untouched.
            if let Some((sid, pinned)) = target {
                if let Some(record) = roster.get(&sid) {
                    record.view.set_pinned(pinned);
                }
                self.selection = if pinned {
                    ActiveSelection::Pinned(sid)
                } else {
                    ActiveSelection::Auto(sid)
                };
            }
            return;
        }

        // Unmark the previous active participant and detach its video
        // from the main surface, restoring the hidden state.
        if let Some(previous_sid) = &previous {
            if let Some(record) = roster.get(previous_sid) {
                record.view.set_active(false);
                record.view.set_pinned(false);
            }
        }
        if self.main_track.take().is_some() {
            self.main.unbind();
        }

        let Some((sid, pinned)) = target else {
            self.selection = ActiveSelection::NoActive;
            view.set_active_identity(None);
            return;
        };

        let Some(record) = roster.get(&sid) else {
            // Selection target raced with a departure; go empty.
            self.selection = ActiveSelection::NoActive;
            view.set_active_identity(None);
            return;
        };

        record.view.set_active(true);
        record.view.set_pinned(pinned);

        // A participant with no video track may still be active; the
        // main surface then stays in the hidden/empty state.
        if let Some(track) = record.first_video_track() {
            self.main.bind(track);
            self.main_track = Some(track.sid.clone());
        }
        view.set_active_identity(Some(&record.identity));

        debug!(
            target: "room.arbiter",
            active = %sid,
            pinned,
            has_video = self.main_track.is_some(),
            "Active participant changed"
        );

        self.selection = if pinned {
            ActiveSelection::Pinned(sid)
        } else {
            ActiveSelection::Auto(sid)
        };
    }

    fn refresh_main_surface(&mut self, roster: &Roster) {
        if self.main_track.is_some() {
            return;
        }
        let Some(active) = self.active_sid().cloned() else {
            return;
        };
        if let Some(track) = roster.get(&active).and_then(|r| r.first_video_track()) {
            self.main.bind(track);
            self.main_track = Some(track.sid.clone());
        }
    }
}

fn push_priority_changes(
    changes: &mut Vec<PriorityChange>,
    roster: &Roster,
    sid: &ParticipantSid,
    priority: Option<TrackPriority>,
) {
    if let Some(record) = roster.get(sid) {
        for track in record.video_track_sids() {
            changes.push(PriorityChange { track, priority });
        }
    }
}
