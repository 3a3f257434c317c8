//! Assembles the full axum router and serves it, mirroring the teacher
//! daemon's `ApiServer` shape: a thin constructor chain, one place that
//! merges route groups, and a `serve` that binds and runs.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info_span;

use crate::http::{
    add_torrent, get_torrent, get_torrent_files, get_torrent_peers, list_torrents, pause_torrent, remove_torrent, remove_torrent_confirmed,
    remove_torrent_with_data, resume_torrent, session_info, session_stats, sync_stats, toggle_session_pause, toggle_torrent, torrent_exists,
};
use crate::state::AppState;

/// Owns the shared state and knows how to turn it into a bound listener.
pub struct ApiServer {
    state: Arc<AppState>,
}

impl ApiServer {
    /// Wrap the given state; call [`Self::serve`] to bind and run.
    #[must_use]
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Build the router without binding a socket, for use in tests via
    /// `tower::ServiceExt::oneshot`.
    #[must_use]
    pub fn build_router(&self) -> Router {
        Router::new()
            .route("/api/session", get(session_info))
            .route("/api/session/stats", get(session_stats))
            .route("/api/session/toggle", axum::routing::put(toggle_session_pause))
            .route("/api/sync/stats", get(sync_stats))
            .route("/api/torrents", get(list_torrents).post(add_torrent))
            .route("/api/torrent/{hex}", get(get_torrent).head(torrent_exists).delete(remove_torrent))
            .route("/api/torrent/{hex}/peers", get(get_torrent_peers))
            .route("/api/torrent/{hex}/files", get(get_torrent_files))
            .route("/api/torrent/{hex}/yes", axum::routing::delete(remove_torrent_confirmed))
            .route("/api/torrent/{hex}/with_data", axum::routing::delete(remove_torrent_with_data))
            .route("/api/torrent/{hex}/pause", axum::routing::put(pause_torrent))
            .route("/api/torrent/{hex}/resume", axum::routing::put(resume_torrent))
            .route("/api/torrent/{hex}/start", axum::routing::put(resume_torrent))
            .route("/api/torrent/{hex}/toggle", axum::routing::put(toggle_torrent))
            .layer(CorsLayer::permissive())
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                    info_span!(
                        "http.request",
                        method = %request.method(),
                        route = %request.uri().path(),
                        status_code = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                }),
            )
            .with_state(self.state.clone())
    }

    /// Bind `addr` and serve until the process is killed or the listener
    /// errors.
    pub async fn serve(self, addr: SocketAddr) -> anyhow::Result<()> {
        let router = self.build_router();
        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, router.into_make_service()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_state;
    use tower::ServiceExt;

    #[tokio::test]
    async fn session_route_responds_ok() {
        let server = ApiServer::new(Arc::new(test_state()));
        let router = server.build_router();
        let response = router
            .oneshot(axum::http::Request::builder().uri("/api/session").body(axum::body::Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_torrent_returns_404() {
        let server = ApiServer::new(Arc::new(test_state()));
        let router = server.build_router();
        let response = router
            .oneshot(
                axum::http::Request::builder()
                    .uri(format!("/api/torrent/{}", "a".repeat(40)))
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::NOT_FOUND);
    }
}
