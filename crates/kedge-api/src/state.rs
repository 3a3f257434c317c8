//! Shared application state: the handles every HTTP/WS handler closes over.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use kedge_core::{AlertDispatcher, SubscriberHub, TorrentEngine};

/// Process identity fields surfaced by `/api/session`; fixed at bootstrap.
#[derive(Debug, Clone)]
pub struct SessionIdentity {
    /// Peer-id prefix advertised to peers.
    pub peer_id: String,
    /// Port the HTTP/WS surface (and, notionally, the engine) listens on.
    pub peer_port: u16,
    /// Listen interfaces configured at startup, as a display string.
    pub listen_interfaces: String,
    /// Build/version identifier.
    pub version: String,
    /// Conf-dir path session state is stored under.
    pub stored: String,
}

/// Shared state threaded through every handler via axum's `State` extractor.
///
/// Holds no business logic of its own — every field is a handle onto a core
/// component (`kedge-core`) or the engine collaborator (`kedge-engine`,
/// behind the `TorrentEngine` trait object so the HTTP layer never depends
/// on a concrete engine crate).
pub struct AppState {
    /// Engine collaborator new torrents and control actions are issued to.
    pub engine: Arc<dyn TorrentEngine>,
    /// Alert dispatcher owning the counter window, registry, and resume
    /// pipeline.
    pub dispatcher: Arc<AlertDispatcher>,
    /// Subscriber hub broadcasting snapshot-then-delta frames over WS.
    pub hub: Arc<SubscriberHub>,
    /// Stable session identity fields.
    pub identity: SessionIdentity,
    /// Process start instant, for uptime fields.
    pub started_at: Instant,
    /// Whole-session pause flag toggled by `PUT /api/session/toggle`.
    paused: AtomicBool,
}

impl AppState {
    /// Construct state around the given collaborators.
    #[must_use]
    pub fn new(
        engine: Arc<dyn TorrentEngine>,
        dispatcher: Arc<AlertDispatcher>,
        hub: Arc<SubscriberHub>,
        identity: SessionIdentity,
    ) -> Self {
        Self {
            engine,
            dispatcher,
            hub,
            identity,
            started_at: Instant::now(),
            paused: AtomicBool::new(false),
        }
    }

    /// Whether the whole session is currently paused.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Flip the whole-session pause flag and return the new value.
    pub fn toggle_paused(&self) -> bool {
        let previous = self.paused.fetch_xor(true, Ordering::SeqCst);
        !previous
    }

    /// Seconds elapsed since this state was constructed.
    #[must_use]
    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    /// Milliseconds elapsed since this state was constructed.
    #[must_use]
    pub fn uptime_ms(&self) -> u64 {
        u64::try_from(self.started_at.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::test_state;

    #[test]
    fn toggle_paused_flips_and_reports_new_value() {
        let state = test_state();
        assert!(!state.is_paused());
        assert!(state.toggle_paused());
        assert!(state.is_paused());
        assert!(!state.toggle_paused());
        assert!(!state.is_paused());
    }
}
