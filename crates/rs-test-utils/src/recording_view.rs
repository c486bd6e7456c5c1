//! Recording implementations of the UI boundary.
//!
//! Every bind, unbind, marker toggle and notice is recorded so tests
//! can assert on the exact visual state a session produced.

use room_session::media::{ParticipantSid, Track, TrackKind, TrackSid};
use room_session::view::{NoticeId, NoticeSink, ParticipantView, RoomView, VisualSurface};

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Recording [`VisualSurface`]: remembers the bound track and counts
/// bind/unbind calls.
#[derive(Default)]
pub struct RecordingSurface {
    bound: Mutex<Option<Track>>,
    bind_calls: AtomicU64,
    unbind_calls: AtomicU64,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sid of the currently bound track, if any.
    pub fn bound_sid(&self) -> Option<TrackSid> {
        self.bound.lock().unwrap().as_ref().map(|t| t.sid.clone())
    }

    pub fn bind_calls(&self) -> u64 {
        self.bind_calls.load(Ordering::Relaxed)
    }

    pub fn unbind_calls(&self) -> u64 {
        self.unbind_calls.load(Ordering::Relaxed)
    }
}

impl VisualSurface for RecordingSurface {
    fn bind(&self, track: &Track) {
        *self.bound.lock().unwrap() = Some(track.clone());
        self.bind_calls.fetch_add(1, Ordering::Relaxed);
    }

    fn unbind(&self) {
        *self.bound.lock().unwrap() = None;
        self.unbind_calls.fetch_add(1, Ordering::Relaxed);
    }
}

/// Recording [`ParticipantView`]: one surface per media kind plus the
/// active/pinned markers.
pub struct RecordingParticipantView {
    pub identity: String,
    pub is_local: bool,
    audio: Arc<RecordingSurface>,
    video: Arc<RecordingSurface>,
    active: Mutex<bool>,
    pinned: Mutex<bool>,
}

impl RecordingParticipantView {
    fn new(identity: &str, is_local: bool) -> Self {
        Self {
            identity: identity.to_string(),
            is_local,
            audio: Arc::new(RecordingSurface::new()),
            video: Arc::new(RecordingSurface::new()),
            active: Mutex::new(false),
            pinned: Mutex::new(false),
        }
    }

    pub fn audio_surface(&self) -> Arc<RecordingSurface> {
        Arc::clone(&self.audio)
    }

    pub fn video_surface(&self) -> Arc<RecordingSurface> {
        Arc::clone(&self.video)
    }

    pub fn is_active(&self) -> bool {
        *self.active.lock().unwrap()
    }

    pub fn is_pinned(&self) -> bool {
        *self.pinned.lock().unwrap()
    }
}

impl ParticipantView for RecordingParticipantView {
    fn surface(&self, kind: TrackKind) -> Arc<dyn VisualSurface> {
        match kind {
            TrackKind::Video => Arc::clone(&self.video) as Arc<dyn VisualSurface>,
            _ => Arc::clone(&self.audio) as Arc<dyn VisualSurface>,
        }
    }

    fn set_active(&self, active: bool) {
        *self.active.lock().unwrap() = active;
    }

    fn set_pinned(&self, pinned: bool) {
        *self.pinned.lock().unwrap() = pinned;
    }
}

/// Recording [`RoomView`]: tracks containers, the main surface and the
/// active-identity label.
pub struct RecordingRoomView {
    main: Arc<RecordingSurface>,
    participants: Mutex<HashMap<ParticipantSid, Arc<RecordingParticipantView>>>,
    removed: Mutex<Vec<ParticipantSid>>,
    active_identity: Mutex<Option<String>>,
}

impl Default for RecordingRoomView {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingRoomView {
    pub fn new() -> Self {
        Self {
            main: Arc::new(RecordingSurface::new()),
            participants: Mutex::new(HashMap::new()),
            removed: Mutex::new(Vec::new()),
            active_identity: Mutex::new(None),
        }
    }

    /// The container for a participant, if it exists.
    pub fn participant(&self, sid: &ParticipantSid) -> Option<Arc<RecordingParticipantView>> {
        self.participants.lock().unwrap().get(sid).cloned()
    }

    /// The container for a participant; panics if it does not exist.
    pub fn expect_participant(&self, sid: &ParticipantSid) -> Arc<RecordingParticipantView> {
        self.participant(sid)
            .unwrap_or_else(|| panic!("no container for participant {sid}"))
    }

    pub fn participant_count(&self) -> usize {
        self.participants.lock().unwrap().len()
    }

    /// Sids whose containers were removed, in order.
    pub fn removed(&self) -> Vec<ParticipantSid> {
        self.removed.lock().unwrap().clone()
    }

    /// Sid of the track currently on the main surface, if any.
    pub fn main_bound_sid(&self) -> Option<TrackSid> {
        self.main.bound_sid()
    }

    /// The identity label next to the main surface.
    pub fn active_identity(&self) -> Option<String> {
        self.active_identity.lock().unwrap().clone()
    }
}

impl RoomView for RecordingRoomView {
    fn create_participant(
        &self,
        sid: &ParticipantSid,
        identity: &str,
        is_local: bool,
    ) -> Arc<dyn ParticipantView> {
        let view = Arc::new(RecordingParticipantView::new(identity, is_local));
        self.participants
            .lock()
            .unwrap()
            .insert(sid.clone(), Arc::clone(&view));
        view as Arc<dyn ParticipantView>
    }

    fn remove_participant(&self, sid: &ParticipantSid) {
        self.participants.lock().unwrap().remove(sid);
        self.removed.lock().unwrap().push(sid.clone());
    }

    fn main_surface(&self) -> Arc<dyn VisualSurface> {
        Arc::clone(&self.main) as Arc<dyn VisualSurface>
    }

    fn set_active_identity(&self, identity: Option<&str>) {
        *self.active_identity.lock().unwrap() = identity.map(ToString::to_string);
    }
}

/// Collecting [`NoticeSink`]: remembers shown and dismissed notices.
#[derive(Default)]
pub struct CollectingNotices {
    next_id: AtomicU64,
    shown: Mutex<Vec<(NoticeId, String)>>,
    dismissed: Mutex<Vec<NoticeId>>,
}

impl CollectingNotices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every message shown so far, in order.
    pub fn messages(&self) -> Vec<String> {
        self.shown
            .lock()
            .unwrap()
            .iter()
            .map(|(_, message)| message.clone())
            .collect()
    }

    /// Messages shown but not yet dismissed.
    pub fn visible(&self) -> Vec<String> {
        let dismissed = self.dismissed.lock().unwrap();
        self.shown
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| !dismissed.contains(id))
            .map(|(_, message)| message.clone())
            .collect()
    }

    pub fn dismissed_count(&self) -> usize {
        self.dismissed.lock().unwrap().len()
    }
}

impl NoticeSink for CollectingNotices {
    fn show(&self, message: &str) -> NoticeId {
        let id = NoticeId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.shown.lock().unwrap().push((id, message.to_string()));
        id
    }

    fn dismiss(&self, id: NoticeId) {
        self.dismissed.lock().unwrap().push(id);
    }
}
