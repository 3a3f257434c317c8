//! Small helpers that pull a consistent `(SessionStats, Vec<TorrentStatus>)`
//! pair out of the dispatcher, shared by the stats/sync handlers and the
//! WebSocket broadcast tick so every caller sees the same merge logic.

use kedge_core::counter::tally_states;
use kedge_core::model::{SessionStats, TorrentStatus};
use kedge_core::projector;
use serde_json::Value;

use crate::state::AppState;

/// Current torrent snapshot, sorted by the registry's own ordering.
#[must_use]
pub fn torrents(state: &AppState) -> Vec<TorrentStatus> {
    state.dispatcher.with_registry(kedge_core::registry::TorrentRegistry::snapshot)
}

/// Byte counters merged with per-state torrent tallies and the whole-session
/// pause flag.
#[must_use]
pub fn session_stats(state: &AppState) -> SessionStats {
    let base = state.dispatcher.with_counters(kedge_core::counter::CounterWindow::session_stats);
    let snapshot = torrents(state);
    let counts = tally_states(snapshot.iter().map(|status| status.state));
    SessionStats { is_paused: state.is_paused(), ..counts.apply(base) }
}

/// Render the full `{stats, torrents}` object served by `/api/sync/stats`
/// and pushed as the WebSocket join frame.
#[must_use]
pub fn sync_stats_value(state: &AppState) -> Value {
    projector::sync_stats(&session_stats(state), torrents(state))
}
