//! The consumed media transport interface.
//!
//! The transport/signaling engine (connection establishment, codec
//! negotiation, network transport) is an external collaborator. This
//! module specifies the boundary the coordinator consumes: an event
//! stream plus a handful of imperative operations. Nothing wire-level
//! is owned here.
//!
//! Events are delivered over a `tokio::sync::mpsc` channel and must be
//! handled in delivery order; the coordinator performs no reordering or
//! coalescing, so transports may deliver duplicate or out-of-order
//! subscribe/unsubscribe pairs and rely on the handlers being
//! idempotent.

use crate::errors::TransportError;
use crate::media::{
    ParticipantDescriptor, ParticipantSid, Publication, Track, TrackPriority, TrackSid,
};

use async_trait::async_trait;
use secrecy::SecretString;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Session-, participant- and publication-level events emitted by the
/// transport.
#[derive(Debug, Clone)]
pub enum RoomEvent {
    /// A remote participant joined the room.
    ParticipantJoined(ParticipantDescriptor),

    /// A participant left the room.
    ParticipantLeft(ParticipantSid),

    /// The transport-computed dominant speaker changed. `None` means
    /// no remote participant is currently dominant.
    DominantSpeakerChanged(Option<ParticipantSid>),

    /// A participant's signaling connection is being re-established.
    ParticipantReconnecting(ParticipantSid),

    /// A participant's signaling connection was re-established.
    ParticipantReconnected(ParticipantSid),

    /// A participant announced a new publication.
    TrackPublished {
        participant: ParticipantSid,
        publication: Publication,
    },

    /// A publication was subscribed to; the track is now flowing.
    TrackSubscribed {
        participant: ParticipantSid,
        track: Track,
    },

    /// A publication was unsubscribed from.
    TrackUnsubscribed {
        participant: ParticipantSid,
        track: Track,
    },

    /// The session ended. An error reason makes the disconnect
    /// terminal-with-failure; `None` is a clean disconnect.
    Ended { error: Option<TransportError> },
}

/// Access credentials for joining a room.
///
/// The token is secrecy-wrapped so it cannot leak through `Debug` or
/// tracing output.
#[derive(Clone)]
pub struct Credentials {
    token: SecretString,
}

impl Credentials {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: SecretString::from(token.into()),
        }
    }

    /// The underlying access token, for handing to the transport.
    #[must_use]
    pub fn token(&self) -> &SecretString {
        &self.token
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// Options for joining a room.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Room to join.
    pub room_name: String,
    /// Ask the transport for dominant-speaker events.
    pub dominant_speaker: bool,
    /// Capture and publish local audio on join.
    pub audio: bool,
    /// Capture and publish local video on join.
    pub video: bool,
}

impl ConnectOptions {
    #[must_use]
    pub fn new(room_name: impl Into<String>) -> Self {
        Self {
            room_name: room_name.into(),
            dominant_speaker: true,
            audio: true,
            video: true,
        }
    }
}

/// Everything the transport hands back once membership is confirmed.
pub struct ConnectedRoom {
    /// The local participant, with its initial publications.
    pub local_participant: ParticipantDescriptor,
    /// Remote participants already in the room.
    pub remote_participants: Vec<ParticipantDescriptor>,
    /// Session event stream, in delivery order.
    pub events: mpsc::Receiver<RoomEvent>,
    /// Imperative operations on the live session.
    pub ops: Arc<dyn RoomOps>,
}

/// The media transport collaborator.
#[async_trait]
pub trait MediaTransport: Send + Sync {
    /// Join a room. Suspends until the transport confirms membership.
    async fn connect(
        &self,
        credentials: &Credentials,
        options: &ConnectOptions,
    ) -> Result<ConnectedRoom, TransportError>;

    /// Acquire a fresh local video track (foregrounding on handheld
    /// form factors re-publishes through this).
    async fn create_video_track(&self) -> Result<Track, TransportError>;
}

/// Imperative operations on a joined room.
#[async_trait]
pub trait RoomOps: Send + Sync {
    /// Publish a local track.
    async fn publish_track(&self, track: Track) -> Result<(), TransportError>;

    /// Stop publishing a local track.
    async fn unpublish_track(&self, sid: &TrackSid) -> Result<(), TransportError>;

    /// Set (or clear, with `None`) the network-priority hint for a
    /// subscribed track. A hint only; no-op in topologies that do not
    /// prioritize.
    fn set_track_priority(&self, sid: &TrackSid, priority: Option<TrackPriority>);

    /// Enable or disable a local track (mute/unmute).
    fn set_track_enabled(&self, sid: &TrackSid, enabled: bool);

    /// Initiate disconnection. The transport answers with an `Ended`
    /// event, which is the authoritative teardown signal.
    fn disconnect(&self);
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_debug_redacts_token() {
        let credentials = Credentials::new("secret-access-token");
        let debug_output = format!("{credentials:?}");

        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("secret-access-token"));
    }

    #[test]
    fn test_connect_options_defaults() {
        let options = ConnectOptions::new("daily-standup");
        assert_eq!(options.room_name, "daily-standup");
        assert!(options.dominant_speaker);
        assert!(options.audio);
        assert!(options.video);
    }

    #[test]
    fn test_room_event_variants_clone() {
        let event = RoomEvent::DominantSpeakerChanged(Some(ParticipantSid::from("PA001")));
        let cloned = event.clone();
        assert!(matches!(cloned, RoomEvent::DominantSpeakerChanged(Some(_))));
    }
}
