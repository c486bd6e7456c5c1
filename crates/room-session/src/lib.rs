//! Room Session Coordinator
//!
//! Client-side coordination core for a video-conferencing session built
//! on an external real-time media transport. The library tracks which
//! participants are present, which participant is currently "active"
//! (speaking or pinned), how each participant's media tracks map to
//! on-screen surfaces, and how connection-quality transitions are
//! surfaced to the user.
//!
//! # Architecture
//!
//! One controller task owns all session state; collaborators are
//! reached through trait seams:
//!
//! ```text
//! SessionController (one task per joined room)
//! ├── Roster            participant membership + publication lists
//! ├── ActiveSpeakerArbiter   active/pinned selection, main surface slot
//! ├── BindingRegistry   thumbnail track attachment
//! ├── MediaTransport / RoomOps   the external transport (consumed)
//! └── RoomView / NoticeSink      the UI layer (exposed)
//! ```
//!
//! Events from the transport, commands from the UI, and environment
//! events (page unload, visibility) all funnel into the controller's
//! `tokio::select!` loop and are handled to completion in delivery
//! order, so the roster/arbiter/registry state needs no locking.
//!
//! # Key Design Decisions
//!
//! - **Single propagation channel for fatal errors**: only an
//!   error-terminated session crosses the boundary, as the `Err` of the
//!   join task's result. Everything else is absorbed and surfaced as
//!   best-effort UI feedback.
//! - **Arbiter owns the main surface**: no other component writes to
//!   the shared main video slot.
//! - **First video track wins**: when a participant publishes several
//!   video tracks, the first enumerated one is shown on the main view.
//!
//! # Modules
//!
//! - [`session`] - roster, arbiter, binding registry and the controller
//! - [`transport`] - the consumed media transport interface
//! - [`view`] - the exposed visual-surface and notice interfaces
//! - [`environment`] - page lifecycle events for teardown hooks
//! - [`config`] - configuration from environment variables
//! - [`errors`] - error types and the failure taxonomy

pub mod config;
pub mod environment;
pub mod errors;
pub mod media;
pub mod session;
pub mod transport;
pub mod view;

pub use errors::RoomError;
pub use session::controller::{SessionController, SessionHandle};
