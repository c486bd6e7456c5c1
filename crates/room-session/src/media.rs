//! Media data model: participants, publications and tracks.
//!
//! These are value types describing what the transport has announced.
//! Live attachment state lives in the session components, not here.

use std::fmt;

/// Unique session-scoped participant identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticipantSid(String);

impl ParticipantSid {
    #[must_use]
    pub fn new(sid: impl Into<String>) -> Self {
        Self(sid.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantSid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ParticipantSid {
    fn from(sid: &str) -> Self {
        Self(sid.to_string())
    }
}

/// Unique identifier for a track (and its publication).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackSid(String);

impl TrackSid {
    #[must_use]
    pub fn new(sid: impl Into<String>) -> Self {
        Self(sid.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackSid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TrackSid {
    fn from(sid: &str) -> Self {
        Self(sid.to_string())
    }
}

/// Kind of media a track carries.
///
/// Data tracks carry side-channel payloads (e.g. chat) and have no
/// visual representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Audio,
    Video,
    Data,
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackKind::Audio => f.write_str("audio"),
            TrackKind::Video => f.write_str("video"),
            TrackKind::Data => f.write_str("data"),
        }
    }
}

/// Network-priority hint for a subscribed track.
///
/// A hint only; the transport is free to ignore it outside multi-party
/// topologies. `None` (no hint) is expressed as `Option<TrackPriority>`
/// at the call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackPriority {
    Low,
    Standard,
    High,
}

/// A media or data payload flowing once subscribed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    /// Track identifier, shared with its publication.
    pub sid: TrackSid,
    /// What the track carries.
    pub kind: TrackKind,
    /// Optional track name (e.g. "chat" for the data channel).
    pub name: Option<String>,
}

impl Track {
    #[must_use]
    pub fn new(sid: impl Into<TrackSid>, kind: TrackKind) -> Self {
        Self {
            sid: sid.into(),
            kind,
            name: None,
        }
    }

    /// Construct a named data track (the auxiliary chat channel).
    #[must_use]
    pub fn data(sid: impl Into<TrackSid>, name: impl Into<String>) -> Self {
        Self {
            sid: sid.into(),
            kind: TrackKind::Data,
            name: Some(name.into()),
        }
    }
}

impl From<String> for TrackSid {
    fn from(sid: String) -> Self {
        Self(sid)
    }
}

impl From<String> for ParticipantSid {
    fn from(sid: String) -> Self {
        Self(sid)
    }
}

/// An announcement that a participant is offering a track.
///
/// The track is present only once the publication has been subscribed
/// to; a publication without a resolved track has no attachment target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publication {
    /// Identifier shared with the track once resolved.
    pub sid: TrackSid,
    /// Kind of the announced track.
    pub kind: TrackKind,
    /// The resolved track, present once subscribed.
    pub track: Option<Track>,
}

impl Publication {
    #[must_use]
    pub fn new(sid: impl Into<TrackSid>, kind: TrackKind) -> Self {
        Self {
            sid: sid.into(),
            kind,
            track: None,
        }
    }

    /// A publication that is already subscribed to.
    #[must_use]
    pub fn subscribed(track: Track) -> Self {
        Self {
            sid: track.sid.clone(),
            kind: track.kind,
            track: Some(track),
        }
    }
}

/// Transport-side description of a participant at join time.
#[derive(Debug, Clone)]
pub struct ParticipantDescriptor {
    /// Session-scoped unique identifier.
    pub sid: ParticipantSid,
    /// Stable display name.
    pub identity: String,
    /// Publications announced so far, in enumeration order.
    pub publications: Vec<Publication>,
}

impl ParticipantDescriptor {
    #[must_use]
    pub fn new(sid: impl Into<ParticipantSid>, identity: impl Into<String>) -> Self {
        Self {
            sid: sid.into(),
            identity: identity.into(),
            publications: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_publications(mut self, publications: Vec<Publication>) -> Self {
        self.publications = publications;
        self
    }
}

/// Participant connection status as observed from the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Connected and active.
    Connected,
    /// Signaling connection is being re-established.
    Reconnecting,
    /// Gone; the roster removes the participant.
    Disconnected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Connected => f.write_str("connected"),
            ConnectionState::Reconnecting => f.write_str("reconnecting"),
            ConnectionState::Disconnected => f.write_str("disconnected"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sid_display_and_equality() {
        let a = ParticipantSid::from("PA001");
        let b = ParticipantSid::new("PA001".to_string());
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "PA001");

        let t = TrackSid::from("MT001");
        assert_eq!(t.as_str(), "MT001");
    }

    #[test]
    fn test_track_kind_display() {
        assert_eq!(TrackKind::Audio.to_string(), "audio");
        assert_eq!(TrackKind::Video.to_string(), "video");
        assert_eq!(TrackKind::Data.to_string(), "data");
    }

    #[test]
    fn test_data_track_carries_name() {
        let track = Track::data("MT-chat", "chat");
        assert_eq!(track.kind, TrackKind::Data);
        assert_eq!(track.name.as_deref(), Some("chat"));
    }

    #[test]
    fn test_subscribed_publication_shares_sid() {
        let track = Track::new("MT002", TrackKind::Video);
        let publication = Publication::subscribed(track.clone());
        assert_eq!(publication.sid, track.sid);
        assert_eq!(publication.track, Some(track));
    }

    #[test]
    fn test_unsubscribed_publication_has_no_track() {
        let publication = Publication::new("MT003", TrackKind::Audio);
        assert!(publication.track.is_none());
    }

    #[test]
    fn test_descriptor_builder() {
        let descriptor = ParticipantDescriptor::new("PA002", "alice")
            .with_publications(vec![Publication::new("MT004", TrackKind::Video)]);
        assert_eq!(descriptor.identity, "alice");
        assert_eq!(descriptor.publications.len(), 1);
    }
}
