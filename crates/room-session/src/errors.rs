//! Room session error types.
//!
//! The failure taxonomy has four classes. Only transport-fatal errors
//! cross the core's boundary, as the `Err` of the join task's result;
//! everything else is logged and absorbed, reflected at most as
//! best-effort UI feedback.

use crate::media::ParticipantSid;
use thiserror::Error;

/// Room session error type.
#[derive(Debug, Error)]
pub enum RoomError {
    /// The transport ended the session with an error, or the initial
    /// connect failed. Terminal; propagated exactly once.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// A participant with this sid is already in the roster. The
    /// caller logs and ignores the re-add.
    #[error("participant already present: {0}")]
    DuplicateParticipant(ParticipantSid),

    /// Operation on a sid that is not in the roster. Reported as a
    /// warning, never fatal.
    #[error("unknown participant: {0}")]
    UnknownParticipant(ParticipantSid),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Controller mailbox closed before the request was answered.
    #[error("session is not running")]
    SessionClosed,
}

impl RoomError {
    /// Whether this error terminates the session.
    ///
    /// Non-fatal errors are contained locally: logged, swallowed, and
    /// never allowed to affect session state.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, RoomError::Transport(_) | RoomError::Config(_))
    }
}

/// Errors surfaced by the external media transport.
///
/// `Clone` because the terminal error travels both through the `Ended`
/// event and into the join result.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The join handshake failed.
    #[error("connect failed: {0}")]
    ConnectFailed(String),

    /// Publishing a local track failed.
    #[error("publish failed: {0}")]
    PublishFailed(String),

    /// The session ended abnormally (signaling lost, server error).
    #[error("session ended: {0}")]
    Ended(String),
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(RoomError::Transport(TransportError::Ended("ice failure".to_string())).is_fatal());

        assert!(!RoomError::DuplicateParticipant(ParticipantSid::from("PA001")).is_fatal());
        assert!(!RoomError::UnknownParticipant(ParticipantSid::from("PA002")).is_fatal());
        assert!(!RoomError::SessionClosed.is_fatal());
    }

    #[test]
    fn test_display_formatting() {
        assert_eq!(
            format!(
                "{}",
                RoomError::Transport(TransportError::ConnectFailed("401".to_string()))
            ),
            "transport error: connect failed: 401"
        );
        assert_eq!(
            format!("{}", RoomError::UnknownParticipant(ParticipantSid::from("PA009"))),
            "unknown participant: PA009"
        );
    }

    #[test]
    fn test_transport_error_conversion() {
        let err: RoomError = TransportError::PublishFailed("data track".to_string()).into();
        assert!(matches!(err, RoomError::Transport(_)));
    }
}
