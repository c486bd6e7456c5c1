//! Session lifecycle controller.
//!
//! One controller task per joined room. The task owns the roster, the
//! active-speaker arbiter and the binding registry outright; transport
//! events, UI commands and environment events funnel into a single
//! `tokio::select!` loop and are handled to completion in delivery
//! order, so none of that state needs locking.
//!
//! The join result is delivered through the task itself: the
//! `JoinHandle` returned by [`SessionController::join`] resolves
//! `Ok(())` on a clean disconnect and `Err` when the transport ends the
//! session with an error. That is the only channel through which a
//! fatal error leaves the core.

use crate::config::Config;
use crate::environment::{EnvironmentEvent, EnvironmentHooks, Visibility};
use crate::errors::{RoomError, TransportError};
use crate::media::{
    ConnectionState, ParticipantDescriptor, ParticipantSid, Track, TrackKind, TrackSid,
};
use crate::session::arbiter::ActiveSpeakerArbiter;
use crate::session::binding::BindingRegistry;
use crate::session::messages::{ParticipantSummary, RoomState, SessionCommand, SessionPhase};
use crate::session::roster::Roster;
use crate::transport::{ConnectOptions, Credentials, MediaTransport, RoomEvent, RoomOps};
use crate::view::{NoticeSink, RoomView};

use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Name of the auxiliary data channel published at join.
const DATA_TRACK_NAME: &str = "chat";

/// Entry point for joining rooms. Holds the long-lived collaborators;
/// each [`SessionController::join`] call spawns one session task.
pub struct SessionController {
    config: Config,
    transport: Arc<dyn MediaTransport>,
    view: Arc<dyn RoomView>,
    notices: Arc<dyn NoticeSink>,
}

/// Handle to a running session. Cloneable; commands go over the
/// controller's mailbox.
#[derive(Clone)]
pub struct SessionHandle {
    command_tx: mpsc::Sender<SessionCommand>,
    cancel_token: CancellationToken,
    room_name: String,
}

impl SessionController {
    #[must_use]
    pub fn new(
        config: Config,
        transport: Arc<dyn MediaTransport>,
        view: Arc<dyn RoomView>,
        notices: Arc<dyn NoticeSink>,
    ) -> Self {
        Self {
            config,
            transport,
            view,
            notices,
        }
    }

    /// Join a room and spawn the session task.
    ///
    /// Suspends until the transport confirms membership; a failed
    /// handshake comes back as `Err` directly. On success the returned
    /// task's result is the session outcome: `Ok(())` for a clean
    /// disconnect (including leave and page unload), `Err` when the
    /// transport ends the session with an error.
    #[tracing::instrument(skip_all, fields(room = %options.room_name))]
    pub async fn join(
        &self,
        credentials: Credentials,
        options: ConnectOptions,
        hooks: EnvironmentHooks,
    ) -> Result<(SessionHandle, JoinHandle<Result<(), RoomError>>), RoomError> {
        let room_name = options.room_name.clone();
        info!(
            target: "room.session",
            room = %room_name,
            client_id = %self.config.client_id,
            "Joining room"
        );

        let connected = self.transport.connect(&credentials, &options).await?;

        let (command_tx, command_rx) = mpsc::channel(self.config.command_buffer);
        let cancel_token = CancellationToken::new();

        let mut task = SessionTask {
            config: self.config.clone(),
            transport: Arc::clone(&self.transport),
            view: Arc::clone(&self.view),
            notices: Arc::clone(&self.notices),
            ops: connected.ops,
            events: connected.events,
            command_rx,
            env_handheld: hooks.handheld,
            env_events: hooks.events,
            cancel_token: cancel_token.clone(),
            room_name: room_name.clone(),
            phase: SessionPhase::Connecting,
            roster: Roster::new(),
            arbiter: ActiveSpeakerArbiter::new(self.view.main_surface()),
            bindings: BindingRegistry::new(),
            local_video: None,
        };

        let local_video = connected
            .local_participant
            .publications
            .iter()
            .filter(|p| p.kind == TrackKind::Video)
            .find_map(|p| p.track.as_ref().map(|t| t.sid.clone()));

        task.register_participant(connected.local_participant, true);
        task.local_video = local_video;
        task.publish_data_track().await;

        for remote in connected.remote_participants {
            task.register_participant(remote, false);
        }

        task.arbiter.recompute(&task.roster, task.view.as_ref());

        let handle = SessionHandle {
            command_tx,
            cancel_token,
            room_name,
        };
        let join_handle = tokio::spawn(task.run());
        Ok((handle, join_handle))
    }
}

impl SessionHandle {
    /// Room this session belongs to.
    #[must_use]
    pub fn room_name(&self) -> &str {
        &self.room_name
    }

    /// Report a click on a participant's thumbnail container
    /// (pin/unpin toggle).
    pub async fn click(&self, sid: ParticipantSid) -> Result<(), RoomError> {
        self.command_tx
            .send(SessionCommand::Click { sid })
            .await
            .map_err(|_| RoomError::SessionClosed)
    }

    /// Leave the room. Resolves once disconnection has been initiated;
    /// completion is observed through the join task's result.
    pub async fn leave(&self) -> Result<(), RoomError> {
        let (respond_to, response) = oneshot::channel();
        self.command_tx
            .send(SessionCommand::Leave { respond_to })
            .await
            .map_err(|_| RoomError::SessionClosed)?;
        response.await.map_err(|_| RoomError::SessionClosed)
    }

    /// Mute or unmute the local media of one kind.
    pub async fn set_media_enabled(&self, kind: TrackKind, enabled: bool) -> Result<(), RoomError> {
        self.command_tx
            .send(SessionCommand::SetMediaEnabled { kind, enabled })
            .await
            .map_err(|_| RoomError::SessionClosed)
    }

    /// Snapshot of the current room state.
    pub async fn state(&self) -> Result<RoomState, RoomError> {
        let (respond_to, response) = oneshot::channel();
        self.command_tx
            .send(SessionCommand::GetState { respond_to })
            .await
            .map_err(|_| RoomError::SessionClosed)?;
        response.await.map_err(|_| RoomError::SessionClosed)
    }

    /// Request disconnection without waiting for acknowledgement.
    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }
}

/// The per-session task state. Owned by exactly one tokio task.
struct SessionTask {
    config: Config,
    transport: Arc<dyn MediaTransport>,
    view: Arc<dyn RoomView>,
    notices: Arc<dyn NoticeSink>,
    ops: Arc<dyn RoomOps>,
    events: mpsc::Receiver<RoomEvent>,
    command_rx: mpsc::Receiver<SessionCommand>,
    env_handheld: bool,
    env_events: mpsc::Receiver<EnvironmentEvent>,
    cancel_token: CancellationToken,
    room_name: String,
    phase: SessionPhase,
    roster: Roster,
    arbiter: ActiveSpeakerArbiter,
    bindings: BindingRegistry,
    /// The currently published local video track, if any. Cleared
    /// while backgrounded on handheld form factors.
    local_video: Option<TrackSid>,
}

impl SessionTask {
    async fn run(mut self) -> Result<(), RoomError> {
        self.phase = SessionPhase::Joined;
        info!(target: "room.session", room = %self.room_name, "Session joined");

        loop {
            tokio::select! {
                () = self.cancel_token.cancelled(), if self.phase == SessionPhase::Joined => {
                    self.initiate_disconnect();
                }
                Some(command) = self.command_rx.recv() => {
                    self.handle_command(command);
                }
                Some(event) = self.env_events.recv() => {
                    self.handle_environment_event(event).await;
                }
                event = self.events.recv() => {
                    match event {
                        Some(RoomEvent::Ended { error }) => return self.teardown(error),
                        Some(event) => self.handle_room_event(event),
                        // Event stream gone without a terminal event;
                        // treat it as a clean disconnect.
                        None => return self.teardown(None),
                    }
                }
            }
        }
    }

    fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Click { sid } => {
                if !self.roster.contains(&sid) {
                    warn!(
                        target: "room.session",
                        participant = %sid,
                        "Click on unknown participant ignored"
                    );
                    return;
                }
                let changes = self.arbiter.click(sid, &self.roster, self.view.as_ref());
                for change in changes {
                    self.ops.set_track_priority(&change.track, change.priority);
                }
            }
            SessionCommand::Leave { respond_to } => {
                self.initiate_disconnect();
                let _ = respond_to.send(());
            }
            SessionCommand::SetMediaEnabled { kind, enabled } => {
                let Some(local) = self.roster.local_sid().and_then(|sid| self.roster.get(sid))
                else {
                    warn!(target: "room.session", "No local participant to mute");
                    return;
                };
                for sid in local.publication_sids_of_kind(kind) {
                    self.ops.set_track_enabled(&sid, enabled);
                }
                debug!(
                    target: "room.session",
                    kind = %kind,
                    enabled,
                    "Local media toggled"
                );
            }
            SessionCommand::GetState { respond_to } => {
                let _ = respond_to.send(self.snapshot());
            }
        }
    }

    fn handle_room_event(&mut self, event: RoomEvent) {
        match event {
            RoomEvent::ParticipantJoined(descriptor) => {
                let identity = descriptor.identity.clone();
                if self.register_participant(descriptor, false) {
                    self.show_notice(&format!("{identity} joined the room"));
                }
            }
            RoomEvent::ParticipantLeft(sid) => {
                let Some(record) = self.roster.remove(&sid) else {
                    warn!(
                        target: "room.session",
                        participant = %sid,
                        "Departure of unknown participant ignored"
                    );
                    return;
                };
                self.bindings.release(&record.all_track_sids());
                self.view.remove_participant(&sid);
                self.arbiter
                    .participant_departed(&sid, &self.roster, self.view.as_ref());
                self.show_notice(&format!("{} left the room", record.identity));
                info!(target: "room.session", participant = %sid, "Participant left");
            }
            RoomEvent::DominantSpeakerChanged(dominant) => {
                self.arbiter
                    .dominant_speaker_changed(dominant, &self.roster, self.view.as_ref());
            }
            RoomEvent::ParticipantReconnecting(sid) => {
                self.set_connection_state(&sid, ConnectionState::Reconnecting);
                if let Some(identity) = self.roster.get(&sid).map(|r| r.identity.clone()) {
                    self.show_notice(&format!("{identity} reconnecting"));
                }
            }
            RoomEvent::ParticipantReconnected(sid) => {
                self.set_connection_state(&sid, ConnectionState::Connected);
                if let Some(identity) = self.roster.get(&sid).map(|r| r.identity.clone()) {
                    self.show_notice(&format!("{identity} reconnected"));
                }
            }
            RoomEvent::TrackPublished {
                participant,
                publication,
            } => {
                if let Err(error) = self.roster.record_publication(&participant, publication) {
                    warn!(
                        target: "room.session",
                        participant = %participant,
                        %error,
                        "Dropping publication event"
                    );
                }
            }
            RoomEvent::TrackSubscribed { participant, track } => {
                self.handle_track_subscribed(&participant, track);
            }
            RoomEvent::TrackUnsubscribed { participant, track } => {
                self.handle_track_unsubscribed(&participant, &track);
            }
            RoomEvent::Ended { .. } => {
                // Handled in the run loop; unreachable here.
            }
        }
    }

    fn handle_track_subscribed(&mut self, participant: &ParticipantSid, track: Track) {
        if let Err(error) = self.roster.resolve_track(participant, track.clone()) {
            warn!(
                target: "room.session",
                participant = %participant,
                track_sid = %track.sid,
                %error,
                "Dropping subscribe event"
            );
            return;
        }
        if track.kind != TrackKind::Data {
            if let Some(record) = self.roster.get(participant) {
                let view = Arc::clone(&record.view);
                self.bindings.attach(&track, view.as_ref());
            }
            self.arbiter.on_track_subscribed(&self.roster);
        }
    }

    fn handle_track_unsubscribed(&mut self, participant: &ParticipantSid, track: &Track) {
        if let Err(error) = self.roster.clear_track(participant, &track.sid) {
            warn!(
                target: "room.session",
                participant = %participant,
                track_sid = %track.sid,
                %error,
                "Dropping unsubscribe event"
            );
            return;
        }
        if track.kind != TrackKind::Data {
            if let Some(record) = self.roster.get(participant) {
                let view = Arc::clone(&record.view);
                self.bindings.detach(track, view.as_ref());
            }
            self.arbiter.on_track_unsubscribed(&track.sid, &self.roster);
        }
        if self.local_video.as_ref() == Some(&track.sid) {
            self.local_video = None;
        }
    }

    async fn handle_environment_event(&mut self, event: EnvironmentEvent) {
        match event {
            EnvironmentEvent::BeforeUnload => self.initiate_disconnect(),
            EnvironmentEvent::PageHide => {
                if self.env_handheld {
                    self.initiate_disconnect();
                }
            }
            EnvironmentEvent::Visibility(visibility) => {
                if !self.env_handheld {
                    return;
                }
                match visibility {
                    Visibility::Hidden => self.suspend_local_video().await,
                    Visibility::Visible => self.resume_local_video().await,
                }
            }
        }
    }

    /// Stop and unpublish the local video while backgrounded. The
    /// local state change goes through the same path a transport
    /// unsubscribe would take.
    async fn suspend_local_video(&mut self) {
        let Some(track_sid) = self.local_video.take() else {
            return;
        };
        debug!(
            target: "room.session",
            track_sid = %track_sid,
            "Backgrounded, unpublishing local video"
        );
        if let Err(error) = self.ops.unpublish_track(&track_sid).await {
            warn!(target: "room.session", %error, "Unpublishing local video failed");
        }
        if let Some(local) = self.roster.local_sid().cloned() {
            let track = Track::new(track_sid, TrackKind::Video);
            self.handle_track_unsubscribed(&local, &track);
        }
    }

    /// Re-acquire and publish a fresh local video track on
    /// foregrounding.
    async fn resume_local_video(&mut self) {
        if self.local_video.is_some() {
            return;
        }
        let track = match self.transport.create_video_track().await {
            Ok(track) => track,
            Err(error) => {
                warn!(target: "room.session", %error, "Re-acquiring local video failed");
                self.show_notice("Unable to restart the camera");
                return;
            }
        };
        if let Err(error) = self.ops.publish_track(track.clone()).await {
            warn!(target: "room.session", %error, "Re-publishing local video failed");
            self.show_notice("Unable to restart the camera");
            return;
        }
        debug!(
            target: "room.session",
            track_sid = %track.sid,
            "Foregrounded, local video re-published"
        );
        self.local_video = Some(track.sid.clone());
        if let Some(local) = self.roster.local_sid().cloned() {
            self.handle_track_subscribed(&local, track);
        }
    }

    /// Publish the auxiliary data channel. Failure is logged and
    /// surfaced as a notice, never fatal.
    async fn publish_data_track(&mut self) {
        let sid = format!("MT-{}", uuid::Uuid::new_v4());
        let track = Track::data(sid, DATA_TRACK_NAME);
        if let Err(error) = self.ops.publish_track(track.clone()).await {
            warn!(
                target: "room.session",
                %error,
                "Publishing the data channel failed"
            );
            self.show_notice("Chat is unavailable in this session");
            return;
        }
        if let Some(local) = self.roster.local_sid().cloned() {
            if let Err(error) = self.roster.resolve_track(&local, track) {
                warn!(target: "room.session", %error, "Recording the data channel failed");
            }
        }
    }

    /// Create the container, register the participant and attach any
    /// already-resolved tracks. A duplicate sid is logged and ignored,
    /// keeping exactly one container per participant. Returns whether
    /// the participant was newly registered.
    fn register_participant(&mut self, descriptor: ParticipantDescriptor, is_local: bool) -> bool {
        let sid = descriptor.sid.clone();
        if self.roster.contains(&sid) {
            warn!(
                target: "room.session",
                participant = %sid,
                "Participant already present, ignoring re-add"
            );
            return false;
        }

        let view = self
            .view
            .create_participant(&sid, &descriptor.identity, is_local);
        let resolved: Vec<Track> = descriptor
            .publications
            .iter()
            .filter_map(|p| p.track.clone())
            .collect();

        if let Err(error) = self.roster.add(descriptor, is_local, Arc::clone(&view)) {
            warn!(target: "room.session", participant = %sid, %error, "Roster add failed");
            self.view.remove_participant(&sid);
            return false;
        }
        for track in &resolved {
            self.bindings.attach(track, view.as_ref());
        }
        info!(
            target: "room.session",
            participant = %sid,
            is_local,
            "Participant joined"
        );
        true
    }

    fn set_connection_state(&mut self, sid: &ParticipantSid, state: ConnectionState) {
        if let Err(error) = self.roster.set_connection_state(sid, state) {
            warn!(
                target: "room.session",
                participant = %sid,
                %error,
                "Dropping connection-state event"
            );
        } else {
            debug!(
                target: "room.session",
                participant = %sid,
                state = %state,
                "Connection state changed"
            );
        }
    }

    /// Ask the transport to disconnect. Idempotent; actual teardown
    /// waits for the authoritative `Ended` event.
    fn initiate_disconnect(&mut self) {
        if self.phase != SessionPhase::Joined {
            return;
        }
        self.phase = SessionPhase::Disconnecting;
        info!(target: "room.session", room = %self.room_name, "Leaving room");
        self.ops.disconnect();
    }

    /// Authoritative cleanup, driven by the terminal event regardless
    /// of what triggered the disconnect.
    fn teardown(mut self, error: Option<TransportError>) -> Result<(), RoomError> {
        self.phase = SessionPhase::Disconnected;
        match &error {
            None => info!(target: "room.session", room = %self.room_name, "Session ended"),
            Some(reason) => warn!(
                target: "room.session",
                room = %self.room_name,
                %reason,
                "Session ended with error"
            ),
        }

        // Stop honoring environment events first.
        self.env_events.close();

        for record in self.roster.drain() {
            self.bindings.release(&record.all_track_sids());
            self.view.remove_participant(&record.sid);
        }
        self.arbiter.clear(self.view.as_ref());
        self.bindings.clear();
        self.local_video = None;

        match error {
            None => Ok(()),
            Some(transport_error) => Err(RoomError::Transport(transport_error)),
        }
    }

    /// Show a transient notice and schedule its dismissal.
    fn show_notice(&self, message: &str) {
        let id = self.notices.show(message);
        let notices = Arc::clone(&self.notices);
        let ttl = self.config.notice_ttl;
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            notices.dismiss(id);
        });
    }

    fn snapshot(&self) -> RoomState {
        let mut participants: Vec<ParticipantSummary> = self
            .roster
            .iter()
            .map(|record| ParticipantSummary {
                sid: record.sid.clone(),
                identity: record.identity.clone(),
                connection_state: record.connection_state,
                is_local: record.is_local,
                publications: record.publications.len(),
            })
            .collect();
        participants.sort_by(|a, b| a.sid.cmp(&b.sid));

        RoomState {
            room_name: self.room_name.clone(),
            phase: self.phase,
            participants,
            active_participant: self.arbiter.active_sid().cloned(),
            pinned: self.arbiter.is_pinned(),
        }
    }
}
