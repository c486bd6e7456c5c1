//! End-to-end session flows against a scripted transport and a
//! recording UI layer.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use room_session::config::Config;
use room_session::environment::{EnvironmentEvent, EnvironmentHooks, Visibility};
use room_session::errors::{RoomError, TransportError};
use room_session::media::{
    ConnectionState, ParticipantSid, Publication, Track, TrackKind, TrackPriority, TrackSid,
};
use room_session::session::controller::{SessionController, SessionHandle};
use room_session::session::messages::{RoomState, SessionPhase};
use room_session::transport::{ConnectOptions, RoomEvent};

use rs_test_utils::{
    env_hooks_desktop, env_hooks_handheld, participant, participant_with_audio_video,
    participant_with_video, test_credentials, CollectingNotices, FakeTransport, OpCall,
    RecordingRoomView,
};

use std::sync::Arc;
use tokio::task::JoinHandle;

struct TestSession {
    transport: Arc<FakeTransport>,
    view: Arc<RecordingRoomView>,
    notices: Arc<CollectingNotices>,
    handle: SessionHandle,
    join: JoinHandle<Result<(), RoomError>>,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

async fn join_session(transport: Arc<FakeTransport>, hooks: EnvironmentHooks) -> TestSession {
    init_tracing();
    let view = Arc::new(RecordingRoomView::new());
    let notices = Arc::new(CollectingNotices::new());
    let controller = SessionController::new(
        Config::default(),
        Arc::clone(&transport) as _,
        Arc::clone(&view) as _,
        Arc::clone(&notices) as _,
    );

    let (handle, join) = controller
        .join(test_credentials(), ConnectOptions::new("standup"), hooks)
        .await
        .expect("join should succeed");

    TestSession {
        transport,
        view,
        notices,
        handle,
        join,
    }
}

/// Default transport: local participant with audio+video, one remote
/// with video.
fn default_transport() -> Arc<FakeTransport> {
    FakeTransport::builder()
        .local(participant_with_audio_video(
            "PA-local", "me", "MT-mic", "MT-cam",
        ))
        .remote(participant_with_video("PA-r", "remote", "MT-r"))
        .build()
}

/// Poll the controller for a state snapshot until the condition holds.
/// Each roundtrip lets the controller drain whatever was injected
/// before it.
async fn wait_until(handle: &SessionHandle, condition: impl Fn(&RoomState) -> bool) -> RoomState {
    for _ in 0..100 {
        let state = handle.state().await.expect("controller should be running");
        if condition(&state) {
            return state;
        }
        tokio::task::yield_now().await;
    }
    panic!("room state never reached the expected condition");
}

/// Poll an arbitrary condition while yielding to the controller task.
async fn wait_for(condition: impl Fn() -> bool) {
    for _ in 0..100 {
        if condition() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition never reached");
}

/// Drive enough command roundtrips that previously injected events
/// have been drained, for tests asserting that nothing happened.
async fn settle(handle: &SessionHandle) {
    for _ in 0..10 {
        handle.state().await.expect("controller should be running");
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn test_join_registers_everyone_and_activates_local() {
    let session = join_session(default_transport(), EnvironmentHooks::detached()).await;

    let state = session.handle.state().await.unwrap();
    assert_eq!(state.phase, SessionPhase::Joined);
    assert_eq!(state.room_name, "standup");
    assert_eq!(state.participants.len(), 2);
    assert_eq!(
        state.active_participant,
        Some(ParticipantSid::from("PA-local"))
    );
    assert!(!state.pinned);

    // One container each, local video on the main surface.
    assert_eq!(session.view.participant_count(), 2);
    assert_eq!(
        session.view.main_bound_sid(),
        Some(TrackSid::from("MT-cam"))
    );
    assert_eq!(session.view.active_identity(), Some("me".to_string()));

    // Thumbnails got the already-subscribed tracks.
    let local = session
        .view
        .expect_participant(&ParticipantSid::from("PA-local"));
    assert_eq!(
        local.video_surface().bound_sid(),
        Some(TrackSid::from("MT-cam"))
    );
    assert_eq!(
        local.audio_surface().bound_sid(),
        Some(TrackSid::from("MT-mic"))
    );
    assert!(local.is_active());

    // The auxiliary data channel was published at join.
    let ops = session.transport.ops();
    let published = ops.published_tracks();
    assert!(published
        .iter()
        .any(|t| t.kind == TrackKind::Data && t.name.as_deref() == Some("chat")));
}

#[tokio::test]
async fn test_connect_failure_surfaces_as_error() {
    let transport = FakeTransport::builder()
        .fail_connect(TransportError::ConnectFailed("401".to_string()))
        .build();
    let view = Arc::new(RecordingRoomView::new());
    let notices = Arc::new(CollectingNotices::new());
    let controller = SessionController::new(
        Config::default(),
        Arc::clone(&transport) as _,
        view as _,
        notices as _,
    );

    let result = controller
        .join(
            test_credentials(),
            ConnectOptions::new("standup"),
            EnvironmentHooks::detached(),
        )
        .await;

    assert!(matches!(
        result.err(),
        Some(RoomError::Transport(TransportError::ConnectFailed(_)))
    ));
}

#[tokio::test]
async fn test_remote_join_publish_subscribe_flow() {
    let session = join_session(default_transport(), EnvironmentHooks::detached()).await;

    session
        .transport
        .inject(RoomEvent::ParticipantJoined(participant("PA-s", "sam")))
        .await;
    session
        .transport
        .inject(RoomEvent::TrackPublished {
            participant: ParticipantSid::from("PA-s"),
            publication: Publication::new("MT-s", TrackKind::Video),
        })
        .await;
    session
        .transport
        .inject(RoomEvent::TrackSubscribed {
            participant: ParticipantSid::from("PA-s"),
            track: Track::new("MT-s", TrackKind::Video),
        })
        .await;

    let state = wait_until(&session.handle, |s| s.participants.len() == 3).await;
    // A joining participant does not steal the active slot.
    assert_eq!(
        state.active_participant,
        Some(ParticipantSid::from("PA-local"))
    );

    let sam = session.view.expect_participant(&ParticipantSid::from("PA-s"));
    wait_for(|| sam.video_surface().bound_sid() == Some(TrackSid::from("MT-s"))).await;
}

#[tokio::test]
async fn test_dominant_speaker_switches_main_surface() {
    let session = join_session(default_transport(), EnvironmentHooks::detached()).await;

    session
        .transport
        .inject(RoomEvent::DominantSpeakerChanged(Some(ParticipantSid::from(
            "PA-r",
        ))))
        .await;

    wait_until(&session.handle, |s| {
        s.active_participant == Some(ParticipantSid::from("PA-r"))
    })
    .await;
    assert_eq!(session.view.main_bound_sid(), Some(TrackSid::from("MT-r")));
    assert_eq!(session.view.active_identity(), Some("remote".to_string()));

    let local = session
        .view
        .expect_participant(&ParticipantSid::from("PA-local"));
    assert!(!local.is_active());
}

#[tokio::test]
async fn test_click_pins_with_priority_and_unpin_round_trips() {
    let session = join_session(default_transport(), EnvironmentHooks::detached()).await;
    let remote = ParticipantSid::from("PA-r");
    let ops = session.transport.ops();

    session.handle.click(remote.clone()).await.unwrap();
    wait_until(&session.handle, |s| s.pinned).await;
    assert_eq!(
        ops.priority_calls(),
        vec![(TrackSid::from("MT-r"), Some(TrackPriority::High))]
    );

    // Dominant-speaker changes are ignored while pinned.
    session
        .transport
        .inject(RoomEvent::DominantSpeakerChanged(None))
        .await;
    let state = wait_until(&session.handle, |s| s.pinned).await;
    assert_eq!(state.active_participant, Some(remote.clone()));

    // Second click unpins, clears the hint and restores the
    // automatic selection.
    session.handle.click(remote).await.unwrap();
    let state = wait_until(&session.handle, |s| !s.pinned).await;
    assert_eq!(
        state.active_participant,
        Some(ParticipantSid::from("PA-local"))
    );
    assert_eq!(
        ops.priority_calls().last(),
        Some(&(TrackSid::from("MT-r"), None))
    );
}

#[tokio::test]
async fn test_departure_of_pinned_participant_falls_back() {
    let session = join_session(default_transport(), EnvironmentHooks::detached()).await;
    let remote = ParticipantSid::from("PA-r");

    session.handle.click(remote.clone()).await.unwrap();
    wait_until(&session.handle, |s| s.pinned).await;

    session
        .transport
        .inject(RoomEvent::ParticipantLeft(remote.clone()))
        .await;

    let state = wait_until(&session.handle, |s| s.participants.len() == 1).await;
    assert!(!state.pinned);
    assert_eq!(
        state.active_participant,
        Some(ParticipantSid::from("PA-local"))
    );
    assert!(session.view.removed().contains(&remote));
    assert_eq!(
        session.view.main_bound_sid(),
        Some(TrackSid::from("MT-cam"))
    );
}

#[tokio::test]
async fn test_duplicate_join_keeps_single_container() {
    let session = join_session(default_transport(), EnvironmentHooks::detached()).await;

    session
        .transport
        .inject(RoomEvent::ParticipantJoined(participant("PA-r", "remote")))
        .await;
    session
        .transport
        .inject(RoomEvent::ParticipantJoined(participant("PA-s", "sam")))
        .await;

    let state = wait_until(&session.handle, |s| s.participants.len() == 3).await;
    assert_eq!(state.participants.len(), 3);
    assert_eq!(session.view.participant_count(), 3);
}

#[tokio::test]
async fn test_leave_resolves_join_result_and_cleans_up() {
    let session = join_session(default_transport(), EnvironmentHooks::detached()).await;

    session.handle.leave().await.unwrap();
    let outcome = session.join.await.expect("task should not panic");
    assert!(outcome.is_ok());

    assert_eq!(session.transport.ops().disconnect_count(), 1);
    assert_eq!(session.view.participant_count(), 0);
    assert!(session.view.main_bound_sid().is_none());
    assert!(session.view.active_identity().is_none());

    // The mailbox is gone; late commands fail cleanly.
    let result = session.handle.state().await;
    assert!(matches!(result, Err(RoomError::SessionClosed)));
}

#[tokio::test]
async fn test_shutdown_handle_disconnects() {
    let session = join_session(default_transport(), EnvironmentHooks::detached()).await;

    session.handle.shutdown();
    let outcome = session.join.await.expect("task should not panic");
    assert!(outcome.is_ok());
    assert_eq!(session.transport.ops().disconnect_count(), 1);
}

#[tokio::test]
async fn test_error_ended_session_rejects_join_result() {
    let session = join_session(default_transport(), EnvironmentHooks::detached()).await;

    session
        .transport
        .inject(RoomEvent::Ended {
            error: Some(TransportError::Ended("ice failure".to_string())),
        })
        .await;

    let outcome = session.join.await.expect("task should not panic");
    assert!(matches!(
        outcome,
        Err(RoomError::Transport(TransportError::Ended(_)))
    ));
    // Cleanup still ran.
    assert_eq!(session.view.participant_count(), 0);
    assert!(session.view.main_bound_sid().is_none());
}

#[tokio::test]
async fn test_closed_event_stream_is_clean_disconnect() {
    let session = join_session(default_transport(), EnvironmentHooks::detached()).await;

    session.transport.drop_event_stream();

    let outcome = session.join.await.expect("task should not panic");
    assert!(outcome.is_ok());
}

#[tokio::test]
async fn test_data_publish_failure_is_nonfatal() {
    let transport = FakeTransport::builder()
        .local(participant_with_video("PA-local", "me", "MT-cam"))
        .fail_data_publish(TransportError::PublishFailed("no data channel".to_string()))
        .build();
    let session = join_session(transport, EnvironmentHooks::detached()).await;

    // Session is up regardless.
    let state = session.handle.state().await.unwrap();
    assert_eq!(state.phase, SessionPhase::Joined);
    assert!(session
        .notices
        .messages()
        .iter()
        .any(|m| m.contains("Chat is unavailable")));
}

#[tokio::test]
async fn test_mute_toggles_local_audio_publications() -> anyhow::Result<()> {
    let session = join_session(default_transport(), EnvironmentHooks::detached()).await;
    let ops = session.transport.ops();

    session
        .handle
        .set_media_enabled(TrackKind::Audio, false)
        .await?;
    wait_for(|| {
        ops.calls().contains(&OpCall::SetTrackEnabled {
            sid: TrackSid::from("MT-mic"),
            enabled: false,
        })
    })
    .await;

    session.handle.set_media_enabled(TrackKind::Audio, true).await?;
    wait_for(|| {
        ops.calls().contains(&OpCall::SetTrackEnabled {
            sid: TrackSid::from("MT-mic"),
            enabled: true,
        })
    })
    .await;
    Ok(())
}

#[tokio::test]
async fn test_before_unload_disconnects_on_any_form_factor() {
    let (env_tx, hooks) = env_hooks_desktop();
    let session = join_session(default_transport(), hooks).await;

    env_tx.send(EnvironmentEvent::BeforeUnload).await.unwrap();

    let outcome = session.join.await.expect("task should not panic");
    assert!(outcome.is_ok());
    assert_eq!(session.transport.ops().disconnect_count(), 1);
}

#[tokio::test]
async fn test_desktop_ignores_visibility_changes() {
    let (env_tx, hooks) = env_hooks_desktop();
    let session = join_session(default_transport(), hooks).await;

    env_tx
        .send(EnvironmentEvent::Visibility(Visibility::Hidden))
        .await
        .unwrap();

    settle(&session.handle).await;

    let ops = session.transport.ops();
    assert!(!ops
        .calls()
        .iter()
        .any(|call| matches!(call, OpCall::UnpublishTrack(_))));
}

#[tokio::test]
async fn test_handheld_background_unpublishes_and_foreground_republishes() {
    let (env_tx, hooks) = env_hooks_handheld();
    let session = join_session(default_transport(), hooks).await;
    let ops = session.transport.ops();

    env_tx
        .send(EnvironmentEvent::Visibility(Visibility::Hidden))
        .await
        .unwrap();

    wait_for(|| {
        ops.calls()
            .contains(&OpCall::UnpublishTrack(TrackSid::from("MT-cam")))
    })
    .await;
    wait_for(|| session.view.main_bound_sid().is_none()).await;

    env_tx
        .send(EnvironmentEvent::Visibility(Visibility::Visible))
        .await
        .unwrap();

    // A fresh track is acquired, published, and lands back on both the
    // thumbnail and the main surface (local is still active).
    wait_for(|| {
        ops.published_tracks()
            .iter()
            .any(|t| t.sid == TrackSid::from("MT-fresh-0"))
    })
    .await;
    wait_for(|| session.view.main_bound_sid() == Some(TrackSid::from("MT-fresh-0"))).await;
    let local = session
        .view
        .expect_participant(&ParticipantSid::from("PA-local"));
    assert_eq!(
        local.video_surface().bound_sid(),
        Some(TrackSid::from("MT-fresh-0"))
    );
}

#[tokio::test]
async fn test_handheld_page_hide_disconnects() {
    let (env_tx, hooks) = env_hooks_handheld();
    let session = join_session(default_transport(), hooks).await;

    env_tx.send(EnvironmentEvent::PageHide).await.unwrap();

    let outcome = session.join.await.expect("task should not panic");
    assert!(outcome.is_ok());
}

#[tokio::test]
async fn test_camera_restart_failure_shows_notice() {
    let (env_tx, hooks) = env_hooks_handheld();
    let session = join_session(default_transport(), hooks).await;
    session
        .transport
        .fail_next_create_video(TransportError::ConnectFailed("no camera".to_string()));

    env_tx
        .send(EnvironmentEvent::Visibility(Visibility::Hidden))
        .await
        .unwrap();
    env_tx
        .send(EnvironmentEvent::Visibility(Visibility::Visible))
        .await
        .unwrap();

    wait_for(|| {
        session
            .notices
            .messages()
            .iter()
            .any(|m| m.contains("Unable to restart the camera"))
    })
    .await;
}

#[tokio::test(start_paused = true)]
async fn test_reconnecting_notice_shows_and_expires() {
    let session = join_session(default_transport(), EnvironmentHooks::detached()).await;

    session
        .transport
        .inject(RoomEvent::ParticipantReconnecting(ParticipantSid::from(
            "PA-local",
        )))
        .await;

    wait_for(|| !session.notices.messages().is_empty()).await;
    assert!(session
        .notices
        .visible()
        .iter()
        .any(|m| m.contains("me reconnecting")));

    // Jump past the notice TTL; the dismissal timer fires.
    tokio::time::advance(std::time::Duration::from_secs(4)).await;
    wait_for(|| session.notices.visible().is_empty()).await;
    assert_eq!(session.notices.dismissed_count(), 1);

    // The roster reflects the reconnecting state until recovery.
    session
        .transport
        .inject(RoomEvent::ParticipantReconnected(ParticipantSid::from(
            "PA-local",
        )))
        .await;
    wait_for(|| session.notices.messages().len() == 2).await;
}

#[tokio::test]
async fn test_remote_reconnecting_shows_identity_notice() {
    let session = join_session(default_transport(), EnvironmentHooks::detached()).await;
    let remote = ParticipantSid::from("PA-r");

    session
        .transport
        .inject(RoomEvent::ParticipantReconnecting(remote.clone()))
        .await;

    // Remote connection-state transitions get a banner too, naming
    // the participant.
    wait_for(|| {
        session
            .notices
            .messages()
            .iter()
            .any(|m| m.contains("remote reconnecting"))
    })
    .await;
    let state = session.handle.state().await.unwrap();
    let summary = state.participants.iter().find(|p| p.sid == remote).unwrap();
    assert_eq!(summary.connection_state, ConnectionState::Reconnecting);

    session
        .transport
        .inject(RoomEvent::ParticipantReconnected(remote))
        .await;
    wait_for(|| {
        session
            .notices
            .messages()
            .iter()
            .any(|m| m.contains("remote reconnected"))
    })
    .await;
}

#[tokio::test]
async fn test_republish_failure_shows_notice() {
    let (env_tx, hooks) = env_hooks_handheld();
    let session = join_session(default_transport(), hooks).await;
    let ops = session.transport.ops();

    env_tx
        .send(EnvironmentEvent::Visibility(Visibility::Hidden))
        .await
        .unwrap();
    wait_for(|| session.view.main_bound_sid().is_none()).await;

    // Camera re-acquisition works but the publish is rejected.
    ops.fail_next_publish(TransportError::PublishFailed("denied".to_string()));
    env_tx
        .send(EnvironmentEvent::Visibility(Visibility::Visible))
        .await
        .unwrap();

    wait_for(|| {
        session
            .notices
            .messages()
            .iter()
            .any(|m| m.contains("Unable to restart the camera"))
    })
    .await;
    // The publish was attempted, but nothing landed on the surfaces.
    assert!(ops
        .published_tracks()
        .iter()
        .any(|t| t.sid == TrackSid::from("MT-fresh-0")));
    assert!(session.view.main_bound_sid().is_none());
}

#[tokio::test]
async fn test_out_of_order_unsubscribe_is_safe() {
    let session = join_session(default_transport(), EnvironmentHooks::detached()).await;

    // Unsubscribe for a track that was never subscribed.
    session
        .transport
        .inject(RoomEvent::TrackUnsubscribed {
            participant: ParticipantSid::from("PA-r"),
            track: Track::new("MT-ghost", TrackKind::Video),
        })
        .await;
    // Event for a participant nobody knows.
    session
        .transport
        .inject(RoomEvent::TrackSubscribed {
            participant: ParticipantSid::from("PA-404"),
            track: Track::new("MT-x", TrackKind::Video),
        })
        .await;

    // The session shrugs both off.
    settle(&session.handle).await;
    let state = session.handle.state().await.unwrap();
    assert_eq!(state.phase, SessionPhase::Joined);
    assert_eq!(state.participants.len(), 2);
    assert_eq!(session.view.main_bound_sid(), Some(TrackSid::from("MT-cam")));
}
