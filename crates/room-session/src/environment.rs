//! Page-lifecycle events from the hosting environment.
//!
//! The embedder forwards page unload, page-hide and visibility changes
//! into the controller, which uses them as teardown and suspend/resume
//! hooks. On handheld form factors, backgrounding stops and unpublishes
//! the local video track and foregrounding re-acquires a fresh one;
//! page-hide substitutes for unload where unload never fires.

use tokio::sync::mpsc;

/// Page visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}

/// Events delivered by the hosting environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvironmentEvent {
    /// The page is unloading; disconnect immediately.
    BeforeUnload,
    /// Handheld substitute for unload.
    PageHide,
    /// The page was backgrounded or foregrounded.
    Visibility(Visibility),
}

/// Environment hooks handed to the controller at join.
///
/// Dropping the receiver at teardown is what "removing the hooks"
/// amounts to; the embedder's sender simply starts failing silently.
pub struct EnvironmentHooks {
    /// Whether the host is a handheld form factor. Page-hide and
    /// visibility events are only honored when set.
    pub handheld: bool,
    /// Event stream from the embedder.
    pub events: mpsc::Receiver<EnvironmentEvent>,
}

impl EnvironmentHooks {
    /// Hooks for a desktop embedder: unload only.
    #[must_use]
    pub fn desktop(events: mpsc::Receiver<EnvironmentEvent>) -> Self {
        Self {
            handheld: false,
            events,
        }
    }

    /// Hooks for a handheld embedder: unload, page-hide and
    /// visibility-driven suspend/resume.
    #[must_use]
    pub fn handheld(events: mpsc::Receiver<EnvironmentEvent>) -> Self {
        Self {
            handheld: true,
            events,
        }
    }

    /// Hooks for an embedder with no page lifecycle (tests, headless).
    #[must_use]
    pub fn detached() -> Self {
        let (_tx, rx) = mpsc::channel(1);
        Self {
            handheld: false,
            events: rx,
        }
    }
}
