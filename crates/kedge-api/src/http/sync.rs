//! `GET /api/sync/stats`: a plain JSON snapshot for ordinary clients, or a
//! WebSocket upgrade for subscribers that want the snapshot followed by a
//! live stream of JSON-Patch deltas. One handler serves both, matching how
//! this daemon has always multiplexed the push channel onto its ordinary
//! REST surface rather than carving out a separate endpoint for it.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::snapshot;
use crate::state::AppState;

pub(crate) async fn sync_stats(State(state): State<Arc<AppState>>, upgrade: Option<WebSocketUpgrade>) -> Response {
    match upgrade {
        Some(upgrade) => upgrade.on_upgrade(move |socket| handle_socket(socket, state)),
        None => Json(snapshot::sync_stats_value(&state)).into_response(),
    }
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>) {
    let (frame, mut stream) = state.hub.join(|| snapshot::sync_stats_value(&state));
    let Ok(text) = serde_json::to_string(&frame) else {
        return;
    };
    if socket.send(Message::Text(text.into())).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            envelope = stream.next() => {
                let Some(envelope) = envelope else { break };
                let Ok(text) = serde_json::to_string(&envelope.payload) else { continue };
                if socket.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_state;

    #[tokio::test]
    async fn plain_request_returns_json_snapshot() {
        let state = Arc::new(test_state());
        let response = sync_stats(State(state), None).await;
        assert_eq!(response.status(), axum::http::StatusCode::OK);
    }
}
