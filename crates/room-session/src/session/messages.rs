//! Command and state-snapshot types for the session controller.
//!
//! UI-originated requests are strongly-typed messages on the
//! controller's mailbox; request-reply uses `tokio::sync::oneshot`.

use crate::media::{ConnectionState, ParticipantSid, TrackKind};
use tokio::sync::oneshot;

/// Commands sent to the `SessionController`.
#[derive(Debug)]
pub enum SessionCommand {
    /// A participant's thumbnail container was clicked (pin/unpin).
    Click { sid: ParticipantSid },

    /// Leave the room. The reply confirms that disconnection was
    /// initiated; completion is observed through the join result.
    Leave { respond_to: oneshot::Sender<()> },

    /// Enable or disable the local media of one kind (mute/unmute).
    SetMediaEnabled { kind: TrackKind, enabled: bool },

    /// Get a snapshot of the current room state.
    GetState {
        respond_to: oneshot::Sender<RoomState>,
    },
}

/// Session lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Join handshake in flight.
    Connecting,
    /// Membership confirmed; the event loop is running.
    Joined,
    /// Disconnect initiated; awaiting the terminal event.
    Disconnecting,
    /// Session over.
    Disconnected,
}

/// Summary of one participant for state snapshots.
#[derive(Debug, Clone)]
pub struct ParticipantSummary {
    pub sid: ParticipantSid,
    pub identity: String,
    pub connection_state: ConnectionState,
    pub is_local: bool,
    /// Number of announced publications.
    pub publications: usize,
}

/// Snapshot of the current room state.
#[derive(Debug, Clone)]
pub struct RoomState {
    pub room_name: String,
    pub phase: SessionPhase,
    pub participants: Vec<ParticipantSummary>,
    /// The currently active participant, if any.
    pub active_participant: Option<ParticipantSid>,
    /// Whether the active selection was set manually.
    pub pinned: bool,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_session_phase_equality() {
        assert_eq!(SessionPhase::Joined, SessionPhase::Joined);
        assert_ne!(SessionPhase::Joined, SessionPhase::Disconnecting);
    }

    #[test]
    fn test_room_state_clone() {
        let state = RoomState {
            room_name: "standup".to_string(),
            phase: SessionPhase::Joined,
            participants: vec![ParticipantSummary {
                sid: ParticipantSid::from("PA001"),
                identity: "alice".to_string(),
                connection_state: ConnectionState::Connected,
                is_local: true,
                publications: 2,
            }],
            active_participant: Some(ParticipantSid::from("PA001")),
            pinned: false,
        };
        let cloned = state.clone();
        assert_eq!(cloned.participants.len(), 1);
        assert_eq!(cloned.active_participant, state.active_participant);
    }
}
