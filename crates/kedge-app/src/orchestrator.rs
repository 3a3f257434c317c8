//! The two cooperative background loops that keep the orchestrator state
//! current: one polls the engine for alerts/updates and the watch
//! directory, the other drives the subscriber hub's broadcast tick.
//! Each is a plain `tokio::spawn`'d task, matching how this workspace's
//! other long-running workers are launched, and each checks a `watch`
//! channel at the top of its loop body to notice shutdown.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

use kedge_api::AppState;
use kedge_core::watch::WatchScanner;

/// How long the engine tick sleeps between `pump_alerts` polls.
const ENGINE_TICK_INTERVAL: Duration = Duration::from_millis(500);

/// Handles for the two background loops, joined together at shutdown.
pub struct Loops {
    engine_tick: JoinHandle<()>,
    broadcast_tick: JoinHandle<()>,
    shutdown: watch::Sender<bool>,
}

impl Loops {
    /// Spawn the engine-tick and broadcast-tick loops.
    pub fn spawn(state: Arc<AppState>, watch_scanner: Option<WatchScanner>, watch_save_path: String) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let engine_tick = tokio::spawn(engine_tick_loop(Arc::clone(&state), watch_scanner, watch_save_path, shutdown_rx.clone()));
        let broadcast_tick = tokio::spawn(broadcast_tick_loop(state, shutdown_rx));

        Self {
            engine_tick,
            broadcast_tick,
            shutdown: shutdown_tx,
        }
    }

    /// Signal both loops to exit and wait for them to finish their current
    /// iteration.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(err) = self.engine_tick.await {
            tracing::warn!(%err, "engine tick loop panicked");
        }
        if let Err(err) = self.broadcast_tick.await {
            tracing::warn!(%err, "broadcast tick loop panicked");
        }
    }
}

async fn engine_tick_loop(state: Arc<AppState>, mut watch_scanner: Option<WatchScanner>, save_path: String, mut shutdown: watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow() {
            break;
        }
        state.engine.post_torrent_updates().await;
        state.engine.post_session_stats().await;
        state.engine.post_dht_stats().await;

        tokio::select! {
            () = tokio::time::sleep(ENGINE_TICK_INTERVAL) => {}
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    break;
                }
            }
        }

        state.dispatcher.pump_alerts(state.engine.as_ref()).await;
        if let Some(scanner) = &mut watch_scanner {
            scanner.tick(state.engine.as_ref(), &save_path).await;
        }
    }
    info!("engine tick loop stopped");
}

async fn broadcast_tick_loop(state: Arc<AppState>, mut shutdown: watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow() {
            break;
        }
        tokio::select! {
            () = state.hub.tick(|| kedge_api::snapshot::sync_stats_value(&state)) => {}
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    break;
                }
            }
        }
    }
    info!("broadcast tick loop stopped");
}
