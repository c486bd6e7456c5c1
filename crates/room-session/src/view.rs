//! The exposed UI boundary.
//!
//! DOM rendering and styling belong to the surrounding application.
//! The coordinator drives it through these traits, so tests substitute
//! recording fakes and a headless embedder can plug in a no-op.

use crate::media::{ParticipantSid, Track, TrackKind};
use std::sync::Arc;

/// A visual surface a media track can be bound to (the equivalent of
/// one `<audio>`/`<video>` element).
///
/// A surface holds at most one track. `bind` makes the surface visible;
/// `unbind` must release the underlying media source and restore the
/// hidden/empty visual state. Both are idempotent from the caller's
/// point of view: the binding registry and arbiter never double-bind
/// and treat unbinding an empty surface as a no-op.
pub trait VisualSurface: Send + Sync {
    fn bind(&self, track: &Track);
    fn unbind(&self);
}

/// A participant's thumbnail container.
pub trait ParticipantView: Send + Sync {
    /// Surface for the given media kind. Never called with
    /// [`TrackKind::Data`]; callers filter data tracks upstream.
    fn surface(&self, kind: TrackKind) -> Arc<dyn VisualSurface>;

    /// Toggle the "active" marker on the container.
    fn set_active(&self, active: bool);

    /// Toggle the "pinned" marker on the container.
    fn set_pinned(&self, pinned: bool);
}

/// The room-level view: participant container lifecycle plus the
/// shared main surface.
pub trait RoomView: Send + Sync {
    /// Create a thumbnail container for a newly joined participant.
    fn create_participant(
        &self,
        sid: &ParticipantSid,
        identity: &str,
        is_local: bool,
    ) -> Arc<dyn ParticipantView>;

    /// Remove a participant's container.
    fn remove_participant(&self, sid: &ParticipantSid);

    /// The shared main/active video surface. Written exclusively by
    /// the active-speaker arbiter.
    fn main_surface(&self) -> Arc<dyn VisualSurface>;

    /// Update the identity label shown next to the main surface.
    /// `None` when no participant is active.
    fn set_active_identity(&self, identity: Option<&str>);
}

/// Identifier for a transient notice banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NoticeId(pub u64);

/// Notification surface for transient connection-state banners.
///
/// The controller dismisses each notice after the configured TTL; sinks
/// only need to show and hide.
pub trait NoticeSink: Send + Sync {
    fn show(&self, message: &str) -> NoticeId;
    fn dismiss(&self, id: NoticeId);
}
