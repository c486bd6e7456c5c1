//! Scripted media transport for session tests.
//!
//! `FakeTransport` hands the controller a `ConnectedRoom` built from
//! scripted participants and keeps the event sender so tests can
//! inject `RoomEvent`s afterwards. Its `FakeRoomOps` records every
//! imperative call for assertions; `disconnect` answers with a clean
//! `Ended` event the way a real transport would.

use room_session::errors::TransportError;
use room_session::media::{ParticipantDescriptor, Track, TrackKind, TrackPriority, TrackSid};
use room_session::transport::{
    ConnectOptions, ConnectedRoom, Credentials, MediaTransport, RoomEvent, RoomOps,
};

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

const EVENT_BUFFER: usize = 64;

/// One recorded call against [`FakeRoomOps`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpCall {
    PublishTrack(Track),
    UnpublishTrack(TrackSid),
    SetTrackPriority {
        sid: TrackSid,
        priority: Option<TrackPriority>,
    },
    SetTrackEnabled {
        sid: TrackSid,
        enabled: bool,
    },
    Disconnect,
}

/// Recording implementation of [`RoomOps`].
pub struct FakeRoomOps {
    calls: Mutex<Vec<OpCall>>,
    /// Errors to return from upcoming `publish_track` calls, in order.
    publish_failures: Mutex<VecDeque<TransportError>>,
    /// When set, publishing a data track fails with this error.
    data_publish_failure: Mutex<Option<TransportError>>,
    /// Sender for the session event stream, used to answer
    /// `disconnect` with a clean `Ended` event.
    events: Mutex<Option<mpsc::Sender<RoomEvent>>>,
}

impl FakeRoomOps {
    fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            publish_failures: Mutex::new(VecDeque::new()),
            data_publish_failure: Mutex::new(None),
            events: Mutex::new(None),
        }
    }

    fn set_event_sender(&self, sender: mpsc::Sender<RoomEvent>) {
        *self.events.lock().unwrap() = Some(sender);
    }

    /// Everything called so far, in order.
    pub fn calls(&self) -> Vec<OpCall> {
        self.calls.lock().unwrap().clone()
    }

    /// The recorded priority-hint calls, in order.
    pub fn priority_calls(&self) -> Vec<(TrackSid, Option<TrackPriority>)> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter_map(|call| match call {
                OpCall::SetTrackPriority { sid, priority } => Some((sid.clone(), *priority)),
                _ => None,
            })
            .collect()
    }

    /// The recorded published tracks, in order.
    pub fn published_tracks(&self) -> Vec<Track> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter_map(|call| match call {
                OpCall::PublishTrack(track) => Some(track.clone()),
                _ => None,
            })
            .collect()
    }

    /// How many times `disconnect` was called.
    pub fn disconnect_count(&self) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| matches!(call, OpCall::Disconnect))
            .count()
    }

    /// Queue an error for the next `publish_track` call.
    pub fn fail_next_publish(&self, error: TransportError) {
        self.publish_failures.lock().unwrap().push_back(error);
    }

    fn record(&self, call: OpCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl RoomOps for FakeRoomOps {
    async fn publish_track(&self, track: Track) -> Result<(), TransportError> {
        self.record(OpCall::PublishTrack(track.clone()));
        if track.kind == TrackKind::Data {
            if let Some(error) = self.data_publish_failure.lock().unwrap().clone() {
                return Err(error);
            }
        }
        if let Some(error) = self.publish_failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        Ok(())
    }

    async fn unpublish_track(&self, sid: &TrackSid) -> Result<(), TransportError> {
        self.record(OpCall::UnpublishTrack(sid.clone()));
        Ok(())
    }

    fn set_track_priority(&self, sid: &TrackSid, priority: Option<TrackPriority>) {
        self.record(OpCall::SetTrackPriority {
            sid: sid.clone(),
            priority,
        });
    }

    fn set_track_enabled(&self, sid: &TrackSid, enabled: bool) {
        self.record(OpCall::SetTrackEnabled {
            sid: sid.clone(),
            enabled,
        });
    }

    fn disconnect(&self) {
        self.record(OpCall::Disconnect);
        if let Some(sender) = self.events.lock().unwrap().as_ref() {
            let _ = sender.try_send(RoomEvent::Ended { error: None });
        }
    }
}

/// Scripted [`MediaTransport`] implementation.
pub struct FakeTransport {
    local: ParticipantDescriptor,
    remotes: Vec<ParticipantDescriptor>,
    connect_failure: Mutex<Option<TransportError>>,
    create_video_failures: Mutex<VecDeque<TransportError>>,
    video_track_counter: AtomicU64,
    ops: Arc<FakeRoomOps>,
    event_tx: Mutex<Option<mpsc::Sender<RoomEvent>>>,
}

impl FakeTransport {
    pub fn builder() -> FakeTransportBuilder {
        FakeTransportBuilder::default()
    }

    /// The recording room ops handed out at connect.
    pub fn ops(&self) -> Arc<FakeRoomOps> {
        Arc::clone(&self.ops)
    }

    /// Inject a session event. Panics if `connect` has not been called.
    pub async fn inject(&self, event: RoomEvent) {
        let sender = self
            .event_tx
            .lock()
            .unwrap()
            .clone()
            .expect("inject called before connect");
        sender.send(event).await.expect("event stream closed");
    }

    /// Drop the event sender, closing the stream without a terminal
    /// event.
    pub fn drop_event_stream(&self) {
        *self.event_tx.lock().unwrap() = None;
        *self.ops.events.lock().unwrap() = None;
    }

    /// Queue an error for the next `create_video_track` call.
    pub fn fail_next_create_video(&self, error: TransportError) {
        self.create_video_failures.lock().unwrap().push_back(error);
    }
}

#[async_trait]
impl MediaTransport for FakeTransport {
    async fn connect(
        &self,
        _credentials: &Credentials,
        _options: &ConnectOptions,
    ) -> Result<ConnectedRoom, TransportError> {
        if let Some(error) = self.connect_failure.lock().unwrap().take() {
            return Err(error);
        }

        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);
        *self.event_tx.lock().unwrap() = Some(event_tx.clone());
        self.ops.set_event_sender(event_tx);

        Ok(ConnectedRoom {
            local_participant: self.local.clone(),
            remote_participants: self.remotes.clone(),
            events: event_rx,
            ops: Arc::clone(&self.ops) as Arc<dyn RoomOps>,
        })
    }

    async fn create_video_track(&self) -> Result<Track, TransportError> {
        if let Some(error) = self.create_video_failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        let n = self.video_track_counter.fetch_add(1, Ordering::Relaxed);
        Ok(Track::new(format!("MT-fresh-{n}"), TrackKind::Video))
    }
}

/// Builder for [`FakeTransport`].
#[derive(Default)]
pub struct FakeTransportBuilder {
    local: Option<ParticipantDescriptor>,
    remotes: Vec<ParticipantDescriptor>,
    connect_failure: Option<TransportError>,
    data_publish_failure: Option<TransportError>,
}

impl FakeTransportBuilder {
    /// The local participant handed back at connect.
    pub fn local(mut self, descriptor: ParticipantDescriptor) -> Self {
        self.local = Some(descriptor);
        self
    }

    /// A remote participant already present at connect.
    pub fn remote(mut self, descriptor: ParticipantDescriptor) -> Self {
        self.remotes.push(descriptor);
        self
    }

    /// Make the connect handshake fail.
    pub fn fail_connect(mut self, error: TransportError) -> Self {
        self.connect_failure = Some(error);
        self
    }

    /// Make publishing the data channel fail.
    pub fn fail_data_publish(mut self, error: TransportError) -> Self {
        self.data_publish_failure = Some(error);
        self
    }

    pub fn build(self) -> Arc<FakeTransport> {
        let ops = Arc::new(FakeRoomOps::new());
        *ops.data_publish_failure.lock().unwrap() = self.data_publish_failure;
        Arc::new(FakeTransport {
            local: self
                .local
                .unwrap_or_else(|| ParticipantDescriptor::new("PA-local", "local")),
            remotes: self.remotes,
            connect_failure: Mutex::new(self.connect_failure),
            create_video_failures: Mutex::new(VecDeque::new()),
            video_track_counter: AtomicU64::new(0),
            ops,
            event_tx: Mutex::new(None),
        })
    }
}
