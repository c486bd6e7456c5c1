//! Track binding registry: thumbnail attach/detach.
//!
//! Maps track sids to their thumbnail binding state and performs the
//! bind/unbind side effects against the owner's [`ParticipantView`].
//! The shared main surface is not handled here; that slot belongs to
//! the active-speaker arbiter.
//!
//! Attach and detach are idempotent: attaching an already-attached
//! track does not duplicate bindings, and detaching a track that was
//! never attached (out-of-order unsubscribe) is a safe no-op.

use crate::media::{Track, TrackKind, TrackSid};
use crate::view::ParticipantView;

use std::collections::HashSet;
use tracing::debug;

/// Registry of currently attached thumbnail tracks.
#[derive(Default)]
pub struct BindingRegistry {
    attached: HashSet<TrackSid>,
}

impl BindingRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind an audio/video track to the owner's thumbnail surface.
    ///
    /// Data tracks carry no visual representation and are ignored;
    /// callers filter them upstream, and the registry defends anyway.
    /// Returns whether a new binding was made.
    pub fn attach(&mut self, track: &Track, view: &dyn ParticipantView) -> bool {
        if track.kind == TrackKind::Data {
            return false;
        }
        if self.attached.contains(&track.sid) {
            debug!(
                target: "room.binding",
                track_sid = %track.sid,
                "Track already attached, skipping"
            );
            return false;
        }

        view.surface(track.kind).bind(track);
        self.attached.insert(track.sid.clone());
        true
    }

    /// Unbind a track from the owner's thumbnail surface, restoring
    /// the hidden/empty state. Returns whether a binding was released.
    pub fn detach(&mut self, track: &Track, view: &dyn ParticipantView) -> bool {
        if track.kind == TrackKind::Data {
            return false;
        }
        if !self.attached.remove(&track.sid) {
            debug!(
                target: "room.binding",
                track_sid = %track.sid,
                "Track not attached, detach is a no-op"
            );
            return false;
        }

        view.surface(track.kind).unbind();
        true
    }

    /// Whether a track is currently attached.
    #[must_use]
    pub fn is_attached(&self, sid: &TrackSid) -> bool {
        self.attached.contains(sid)
    }

    /// Drop binding state for a departed participant's tracks. The
    /// surfaces go away with the participant's container, so only the
    /// association state is released here.
    pub fn release(&mut self, sids: &[TrackSid]) {
        for sid in sids {
            self.attached.remove(sid);
        }
    }

    /// Drop all binding state (session teardown).
    pub fn clear(&mut self) {
        self.attached.clear();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::view::VisualSurface;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct RecordingSurface {
        bound: Mutex<Option<TrackSid>>,
        bind_calls: Mutex<u32>,
        unbind_calls: Mutex<u32>,
    }

    impl VisualSurface for RecordingSurface {
        fn bind(&self, track: &Track) {
            *self.bound.lock().unwrap() = Some(track.sid.clone());
            *self.bind_calls.lock().unwrap() += 1;
        }
        fn unbind(&self) {
            *self.bound.lock().unwrap() = None;
            *self.unbind_calls.lock().unwrap() += 1;
        }
    }

    struct RecordingView {
        audio: Arc<RecordingSurface>,
        video: Arc<RecordingSurface>,
    }

    impl RecordingView {
        fn new() -> Self {
            Self {
                audio: Arc::new(RecordingSurface::default()),
                video: Arc::new(RecordingSurface::default()),
            }
        }
    }

    impl ParticipantView for RecordingView {
        fn surface(&self, kind: TrackKind) -> Arc<dyn VisualSurface> {
            match kind {
                TrackKind::Video => Arc::clone(&self.video) as Arc<dyn VisualSurface>,
                _ => Arc::clone(&self.audio) as Arc<dyn VisualSurface>,
            }
        }
        fn set_active(&self, _active: bool) {}
        fn set_pinned(&self, _pinned: bool) {}
    }

    #[test]
    fn test_attach_binds_thumbnail_surface() {
        let mut registry = BindingRegistry::new();
        let view = RecordingView::new();
        let track = Track::new("MT001", TrackKind::Video);

        assert!(registry.attach(&track, &view));
        assert!(registry.is_attached(&track.sid));
        assert_eq!(*view.video.bound.lock().unwrap(), Some(track.sid.clone()));
    }

    #[test]
    fn test_attach_is_idempotent() {
        let mut registry = BindingRegistry::new();
        let view = RecordingView::new();
        let track = Track::new("MT001", TrackKind::Audio);

        assert!(registry.attach(&track, &view));
        assert!(!registry.attach(&track, &view));
        assert_eq!(*view.audio.bind_calls.lock().unwrap(), 1);
    }

    #[test]
    fn test_detach_restores_hidden_state() {
        let mut registry = BindingRegistry::new();
        let view = RecordingView::new();
        let track = Track::new("MT001", TrackKind::Video);

        registry.attach(&track, &view);
        assert!(registry.detach(&track, &view));
        assert!(!registry.is_attached(&track.sid));
        assert!(view.video.bound.lock().unwrap().is_none());
    }

    #[test]
    fn test_double_detach_leaves_surface_as_single_detach() {
        let mut registry = BindingRegistry::new();
        let view = RecordingView::new();
        let track = Track::new("MT001", TrackKind::Video);

        registry.attach(&track, &view);
        registry.detach(&track, &view);
        assert!(!registry.detach(&track, &view));

        // Exactly one unbind reached the surface.
        assert_eq!(*view.video.unbind_calls.lock().unwrap(), 1);
        assert!(view.video.bound.lock().unwrap().is_none());
    }

    #[test]
    fn test_detach_never_attached_is_noop() {
        let mut registry = BindingRegistry::new();
        let view = RecordingView::new();
        let track = Track::new("MT-ghost", TrackKind::Video);

        assert!(!registry.detach(&track, &view));
        assert_eq!(*view.video.unbind_calls.lock().unwrap(), 0);
    }

    #[test]
    fn test_data_tracks_are_ignored() {
        let mut registry = BindingRegistry::new();
        let view = RecordingView::new();
        let track = Track::data("MT-chat", "chat");

        assert!(!registry.attach(&track, &view));
        assert!(!registry.is_attached(&track.sid));
        assert!(!registry.detach(&track, &view));
        assert_eq!(*view.audio.bind_calls.lock().unwrap(), 0);
        assert_eq!(*view.video.bind_calls.lock().unwrap(), 0);
    }

    #[test]
    fn test_release_drops_association_state() {
        let mut registry = BindingRegistry::new();
        let view = RecordingView::new();
        let audio = Track::new("MT-a", TrackKind::Audio);
        let video = Track::new("MT-v", TrackKind::Video);

        registry.attach(&audio, &view);
        registry.attach(&video, &view);
        registry.release(&[audio.sid.clone(), video.sid.clone()]);

        assert!(!registry.is_attached(&audio.sid));
        assert!(!registry.is_attached(&video.sid));
    }
}
