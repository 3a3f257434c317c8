//! Torrent collection and per-torrent endpoints: list, add, inspect, pause
//! controls, and removal.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use serde_json::{Value, json};

use kedge_core::model::{TorrentHandle, TorrentState};
use kedge_core::projector;

use crate::error::ApiError;
use crate::snapshot;
use crate::state::AppState;

const SAVE_PATH_HEADER: &str = "x-save-path";

fn parse_handle(hex: &str) -> Result<TorrentHandle, ApiError> {
    kedge_ids::InfoHash::from_hex(hex)
        .map(TorrentHandle::from_info_hash)
        .map_err(|err| ApiError::bad_request(format!("invalid info-hash {hex:?}: {err}")))
}

fn lookup(state: &AppState, handle: TorrentHandle) -> Result<kedge_core::model::TorrentStatus, ApiError> {
    state
        .dispatcher
        .with_registry(|registry| registry.get(handle).cloned())
        .ok_or_else(|| ApiError::NotFound(format!("no torrent registered for {}", handle.info_hash())))
}

pub(crate) async fn list_torrents(State(state): State<Arc<AppState>>) -> Json<Value> {
    let torrents: Vec<Value> = snapshot::torrents(&state).iter().map(projector::torrent_status_to_obj).collect();
    Json(Value::Array(torrents))
}

/// `POST /api/torrents`: metainfo bytes (with `x-save-path`) or a raw
/// magnet URI body, depending on which header is present.
pub(crate) async fn add_torrent(State(state): State<Arc<AppState>>, headers: HeaderMap, body: axum::body::Bytes) -> Result<StatusCode, ApiError> {
    if let Some(save_path) = headers.get(SAVE_PATH_HEADER).and_then(|value| value.to_str().ok()) {
        state.engine.add_torrent_file(&body, save_path).await?;
        return Ok(StatusCode::NO_CONTENT);
    }
    let uri = String::from_utf8(body.to_vec()).map_err(|_| ApiError::bad_request("magnet body was not valid UTF-8"))?;
    state.engine.add_magnet(&uri).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn torrent_exists(State(state): State<Arc<AppState>>, Path(hex): Path<String>) -> Result<StatusCode, ApiError> {
    let handle = parse_handle(&hex)?;
    lookup(&state, handle)?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn get_torrent(State(state): State<Arc<AppState>>, Path(hex): Path<String>) -> Result<Json<Value>, ApiError> {
    let handle = parse_handle(&hex)?;
    let status = lookup(&state, handle)?;
    Ok(Json(projector::torrent_status_to_obj(&status)))
}

/// This engine never models individual peer connections; the endpoint
/// exists for API-contract completeness and always reports an empty list.
pub(crate) async fn get_torrent_peers(State(state): State<Arc<AppState>>, Path(hex): Path<String>) -> Result<Json<Value>, ApiError> {
    let handle = parse_handle(&hex)?;
    lookup(&state, handle)?;
    Ok(Json(json!({ "peers": [] })))
}

/// This engine never models individual on-disk files; see
/// [`get_torrent_peers`].
pub(crate) async fn get_torrent_files(State(state): State<Arc<AppState>>, Path(hex): Path<String>) -> Result<Json<Value>, ApiError> {
    let handle = parse_handle(&hex)?;
    lookup(&state, handle)?;
    Ok(Json(json!({ "files": [] })))
}

pub(crate) async fn remove_torrent(State(state): State<Arc<AppState>>, Path(hex): Path<String>) -> Result<StatusCode, ApiError> {
    remove_with_data(&state, &hex, false).await
}

pub(crate) async fn remove_torrent_confirmed(State(state): State<Arc<AppState>>, Path(hex): Path<String>) -> Result<StatusCode, ApiError> {
    remove_with_data(&state, &hex, false).await
}

pub(crate) async fn remove_torrent_with_data(State(state): State<Arc<AppState>>, Path(hex): Path<String>) -> Result<StatusCode, ApiError> {
    remove_with_data(&state, &hex, true).await
}

async fn remove_with_data(state: &AppState, hex: &str, with_data: bool) -> Result<StatusCode, ApiError> {
    let handle = parse_handle(hex)?;
    lookup(state, handle)?;
    state.engine.remove_torrent(handle, with_data).await;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn pause_torrent(State(state): State<Arc<AppState>>, Path(hex): Path<String>) -> Result<StatusCode, ApiError> {
    set_pause(&state, &hex, true).await
}

pub(crate) async fn resume_torrent(State(state): State<Arc<AppState>>, Path(hex): Path<String>) -> Result<StatusCode, ApiError> {
    set_pause(&state, &hex, false).await
}

pub(crate) async fn toggle_torrent(State(state): State<Arc<AppState>>, Path(hex): Path<String>) -> Result<StatusCode, ApiError> {
    let handle = parse_handle(&hex)?;
    let status = lookup(&state, handle)?;
    let paused = status.state == TorrentState::Paused;
    state.engine.set_torrent_pause(handle, !paused).await;
    Ok(StatusCode::NO_CONTENT)
}

async fn set_pause(state: &AppState, hex: &str, paused: bool) -> Result<StatusCode, ApiError> {
    let handle = parse_handle(hex)?;
    lookup(state, handle)?;
    state.engine.set_torrent_pause(handle, paused).await;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_state;

    #[tokio::test]
    async fn parse_handle_rejects_short_hex() {
        assert!(parse_handle("abc").is_err());
    }

    #[tokio::test]
    async fn lookup_returns_not_found_for_unknown_handle() {
        let state = test_state();
        let handle = TorrentHandle::from_info_hash(kedge_ids::InfoHash::from_bytes([9; 20]));
        assert!(matches!(lookup(&state, handle), Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn add_torrent_requires_valid_utf8_when_no_save_path_header() {
        let state = Arc::new(test_state());
        let result = add_torrent(State(state), HeaderMap::new(), axum::body::Bytes::from_static(&[0xff, 0xfe])).await;
        assert!(result.is_err());
    }
}
