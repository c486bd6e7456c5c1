//! # Room Session Test Utilities
//!
//! Shared test utilities for the room session coordinator.
//!
//! This crate provides fake implementations of the external trait
//! boundaries so sessions can be exercised without a real media
//! transport or UI layer.
//!
//! ## Modules
//!
//! - `fake_transport` - Scripted transport with recording room ops
//! - `recording_view` - Recording UI surfaces and notice sink
//! - `fixtures` - Pre-configured participants, credentials and config
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rs_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let transport = FakeTransport::builder()
//!         .local(participant("PA-local", "me"))
//!         .remote(participant_with_video("PA-r", "remote", "MT-r"))
//!         .build();
//!     let view = Arc::new(RecordingRoomView::new());
//!     let notices = Arc::new(CollectingNotices::new());
//!
//!     // Join through the controller, then drive the session by
//!     // injecting RoomEvents:
//!     transport.inject(RoomEvent::DominantSpeakerChanged(None)).await;
//! }
//! ```

pub mod fake_transport;
pub mod fixtures;
pub mod recording_view;

pub use fake_transport::{FakeRoomOps, FakeTransport, FakeTransportBuilder, OpCall};
pub use fixtures::{
    env_hooks_desktop, env_hooks_handheld, participant, participant_with_audio_video,
    participant_with_video, test_config, test_credentials,
};
pub use recording_view::{
    CollectingNotices, RecordingParticipantView, RecordingRoomView, RecordingSurface,
};
