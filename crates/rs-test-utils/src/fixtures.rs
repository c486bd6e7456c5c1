//! Pre-configured test data.

use room_session::config::Config;
use room_session::environment::{EnvironmentEvent, EnvironmentHooks};
use room_session::media::{ParticipantDescriptor, Publication, Track, TrackKind};
use room_session::transport::Credentials;

use tokio::sync::mpsc;

/// A participant with no publications.
pub fn participant(sid: &str, identity: &str) -> ParticipantDescriptor {
    ParticipantDescriptor::new(sid, identity)
}

/// A participant with one already-subscribed video track.
pub fn participant_with_video(sid: &str, identity: &str, track_sid: &str) -> ParticipantDescriptor {
    ParticipantDescriptor::new(sid, identity).with_publications(vec![Publication::subscribed(
        Track::new(track_sid, TrackKind::Video),
    )])
}

/// A participant with subscribed audio and video tracks.
pub fn participant_with_audio_video(
    sid: &str,
    identity: &str,
    audio_sid: &str,
    video_sid: &str,
) -> ParticipantDescriptor {
    ParticipantDescriptor::new(sid, identity).with_publications(vec![
        Publication::subscribed(Track::new(audio_sid, TrackKind::Audio)),
        Publication::subscribed(Track::new(video_sid, TrackKind::Video)),
    ])
}

/// Default configuration with a fixed client id for log correlation.
pub fn test_config() -> Config {
    Config {
        client_id: "rs-test".to_string(),
        ..Config::default()
    }
}

/// Throwaway credentials.
pub fn test_credentials() -> Credentials {
    Credentials::new("test-access-token")
}

/// Desktop environment hooks plus the sender that drives them.
pub fn env_hooks_desktop() -> (mpsc::Sender<EnvironmentEvent>, EnvironmentHooks) {
    let (tx, rx) = mpsc::channel(8);
    (tx, EnvironmentHooks::desktop(rx))
}

/// Handheld environment hooks plus the sender that drives them.
pub fn env_hooks_handheld() -> (mpsc::Sender<EnvironmentEvent>, EnvironmentHooks) {
    let (tx, rx) = mpsc::channel(8);
    (tx, EnvironmentHooks::handheld(rx))
}
