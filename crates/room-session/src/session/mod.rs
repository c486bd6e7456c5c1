//! The session coordination core.
//!
//! Four components, wired together by the controller:
//!
//! - [`roster`] - participant membership, publication lists and
//!   per-participant connection state
//! - [`binding`] - thumbnail track attachment with idempotent
//!   attach/detach
//! - [`arbiter`] - active-speaker selection, pin overrides and the
//!   main-surface slot
//! - [`controller`] - the join/leave lifecycle and the event loop that
//!   drives the other three
//! - [`messages`] - command and state-snapshot types

pub mod arbiter;
pub mod binding;
pub mod controller;
pub mod messages;
pub mod roster;
