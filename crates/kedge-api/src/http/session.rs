//! Session-level endpoints: identity, aggregate stats, and the whole-session
//! pause toggle.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde_json::{Value, json};

use kedge_core::projector::{self, SessionInfo};

use crate::snapshot;
use crate::state::AppState;

pub(crate) async fn session_info(State(state): State<Arc<AppState>>) -> Json<Value> {
    let info = SessionInfo {
        peer_id: state.identity.peer_id.clone(),
        peer_port: state.identity.peer_port,
        listen_interfaces: state.identity.listen_interfaces.clone(),
        uptime_secs: state.uptime_secs(),
        uptime_ms: state.uptime_ms(),
        stored: state.identity.stored.clone(),
        version: state.identity.version.clone(),
    };
    Json(projector::session_info(&info))
}

pub(crate) async fn session_stats(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(projector::session_stats_obj(&snapshot::session_stats(&state)))
}

pub(crate) async fn toggle_session_pause(State(state): State<Arc<AppState>>) -> Json<Value> {
    let is_paused = state.toggle_paused();
    let torrents = snapshot::torrents(&state);
    for status in torrents {
        let handle = kedge_core::model::TorrentHandle::from_info_hash(status.info_hash);
        state.engine.set_torrent_pause(handle, is_paused).await;
    }
    Json(json!({ "isPaused": is_paused }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_state;

    #[tokio::test]
    async fn toggle_reports_new_pause_state() {
        let state = Arc::new(test_state());
        let Json(first) = toggle_session_pause(State(state.clone())).await;
        assert_eq!(first["isPaused"], json!(true));
        let Json(second) = toggle_session_pause(State(state)).await;
        assert_eq!(second["isPaused"], json!(false));
    }
}
