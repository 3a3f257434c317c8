//! Alert dispatcher: the exhaustive routing table that turns the engine's
//! alert stream into updates to the counter window, registry, and resume
//! pipeline. Every alert kind this orchestrator doesn't have a dedicated
//! row for falls through to a bounded diagnostic ring rather than being
//! dropped silently.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Mutex;

use tokio::time::{Duration, timeout};
use tracing::{info, warn};

use kedge_ids::{InfoHash, pptime};

use crate::alert::{Alert, DisconnectReason, PeerOperation};
use crate::counter::CounterWindow;
use crate::model::DhtStats;
use crate::engine::TorrentEngine;
use crate::registry::TorrentRegistry;
use crate::resume::ResumeCoordinator;

/// Capacity of the diagnostic ring; oldest entries are dropped first.
pub const DIAGNOSTIC_RING_CAPACITY: usize = 20;

/// How long `drain_on_shutdown` waits for an alert before re-checking
/// `outstanding`.
pub const SHUTDOWN_WAIT: Duration = Duration::from_secs(6);

/// Per-torrent connection-cap halving requested on finish. Recorded as a
/// dispatcher-side hint rather than enforced through the engine: the
/// collaborator trait exposes no connection-limit setter, so this is the
/// orchestrator's record of intent for diagnostics and for a future engine
/// binding to read.
#[derive(Debug, Default)]
pub struct ConnectionCapHints {
    halved: Mutex<std::collections::HashMap<InfoHash, u32>>,
}

impl ConnectionCapHints {
    fn record_half(&self, info_hash: InfoHash, previous_cap: u32) {
        let new_cap = (previous_cap / 2).max(1);
        self.halved.lock().unwrap().insert(info_hash, new_cap);
    }

    /// The halved cap recorded for `info_hash`, if a `torrent_finished`
    /// alert has been processed for it.
    #[must_use]
    pub fn get(&self, info_hash: InfoHash) -> Option<u32> {
        self.halved.lock().unwrap().get(&info_hash).copied()
    }
}

/// Optional moved-root configuration consulted by `on_torrent_finished`.
#[derive(Debug, Clone, Default)]
pub struct MoveOnFinishConfig {
    /// Directory fully-completed torrents should be relocated to.
    pub moved_root: Option<std::path::PathBuf>,
}

/// Dispatches alerts drained from the engine, owning the counter window,
/// torrent registry, resume coordinator, diagnostic ring and the
/// prepared-peer back-pointer.
pub struct AlertDispatcher {
    counters: Mutex<CounterWindow>,
    registry: Mutex<TorrentRegistry>,
    resume: ResumeCoordinator,
    diagnostics: Mutex<VecDeque<String>>,
    dht_stats: Mutex<DhtStats>,
    /// Set externally by the control path that calls `set_peer`; read only
    /// by the dispatcher when an `add_torrent` alert succeeds. Guarded by
    /// the same discipline as the counters: one writer, one reader.
    prepared_peer: Mutex<Option<SocketAddr>>,
    move_on_finish: MoveOnFinishConfig,
    connection_caps: ConnectionCapHints,
}

impl AlertDispatcher {
    /// Construct a dispatcher rooted at `conf_dir` for resume files.
    #[must_use]
    pub fn new(conf_dir: impl Into<std::path::PathBuf>, counter_names: &[&str], started_at_us: u64, move_on_finish: MoveOnFinishConfig) -> Self {
        Self {
            counters: Mutex::new(CounterWindow::new(counter_names, started_at_us)),
            registry: Mutex::new(TorrentRegistry::new()),
            resume: ResumeCoordinator::new(conf_dir),
            diagnostics: Mutex::new(VecDeque::with_capacity(DIAGNOSTIC_RING_CAPACITY)),
            dht_stats: Mutex::new(DhtStats::default()),
            prepared_peer: Mutex::new(None),
            move_on_finish,
            connection_caps: ConnectionCapHints::default(),
        }
    }

    /// Set (or clear) the prepared peer endpoint connected automatically
    /// on the next successful `add_torrent`.
    pub fn set_peer(&self, endpoint: Option<SocketAddr>) {
        *self.prepared_peer.lock().unwrap() = endpoint;
    }

    /// Current resume pipeline depth.
    #[must_use]
    pub fn outstanding(&self) -> i64 {
        self.resume.outstanding()
    }

    /// Latest DHT sample.
    #[must_use]
    pub fn dht_stats(&self) -> DhtStats {
        self.dht_stats.lock().unwrap().clone()
    }

    /// Recent unhandled-alert strings, oldest first.
    #[must_use]
    pub fn diagnostics(&self) -> Vec<String> {
        self.diagnostics.lock().unwrap().iter().cloned().collect()
    }

    /// Connection-cap hints recorded on torrent-finish.
    #[must_use]
    pub const fn connection_caps(&self) -> &ConnectionCapHints {
        &self.connection_caps
    }

    /// Read-only access to the counter window, for the orchestrator's tick.
    pub fn with_counters<R>(&self, f: impl FnOnce(&CounterWindow) -> R) -> R {
        f(&self.counters.lock().unwrap())
    }

    /// Read-only access to the registry, for the projector.
    pub fn with_registry<R>(&self, f: impl FnOnce(&TorrentRegistry) -> R) -> R {
        f(&self.registry.lock().unwrap())
    }

    /// Drain `engine.pop_alerts()` once and dispatch every alert.
    pub async fn pump_alerts(&self, engine: &dyn TorrentEngine) {
        let alerts = engine.pop_alerts().await;
        for alert in alerts {
            self.dispatch_one(engine, alert).await;
        }
    }

    async fn dispatch_one(&self, engine: &dyn TorrentEngine, alert: Alert) {
        match alert {
            Alert::SessionStats { counters, timestamp_us } => {
                self.counters.lock().unwrap().update(&counters, timestamp_us);
            }
            Alert::DhtStats { active_requests, routing_table } => {
                *self.dht_stats.lock().unwrap() = DhtStats { active_requests, routing_table };
            }
            Alert::PeerConnect | Alert::IncomingConnection => {}
            Alert::PeerDisconnected { operation, reason } => {
                let ignorable = matches!(operation, PeerOperation::Connect)
                    || matches!(reason, DisconnectReason::TimedOutNoHandshake);
                if !ignorable {
                    info!(?operation, ?reason, "peer disconnected");
                }
            }
            Alert::MetadataReceived { handle } => {
                self.resume.request_save(engine, handle, false).await;
            }
            Alert::AddTorrent { handle, error } => {
                if let Some(message) = error {
                    warn!(%message, "add_torrent failed");
                    return;
                }
                let Some(handle) = handle else { return };
                self.resume.request_save(engine, handle, true).await;
                if let Some(endpoint) = *self.prepared_peer.lock().unwrap() {
                    info!(info_hash = %handle.info_hash(), %endpoint, "connecting prepared peer");
                }
            }
            Alert::TorrentFinished { handle } => {
                let previous_cap = self
                    .registry
                    .lock()
                    .unwrap()
                    .get(handle)
                    .map_or(25, |status| status.max_connections);
                self.connection_caps.record_half(handle.info_hash(), previous_cap);
                self.resume.request_save(engine, handle, false).await;
                self.on_torrent_finished(engine, handle).await;
            }
            Alert::SaveResumeData { info_hash, data } => {
                if let Err(err) = self.resume.on_save_resume_data(info_hash, &data).await {
                    warn!(%err, "failed to persist resume data");
                }
            }
            Alert::SaveResumeDataFailed { handle, outcome } => {
                self.resume.on_save_resume_data_failed(handle, &outcome);
            }
            Alert::TorrentPaused { handle } => {
                self.resume.request_save(engine, handle, false).await;
            }
            Alert::StateUpdate { statuses } => {
                self.registry.lock().unwrap().apply_state_update(statuses);
            }
            Alert::TorrentRemoved { handle } => {
                self.registry.lock().unwrap().remove(handle);
            }
            Alert::Unrecognized(message) => {
                self.push_diagnostic(&message);
            }
        }
    }

    fn push_diagnostic(&self, message: &str) {
        let mut ring = self.diagnostics.lock().unwrap();
        if ring.len() >= DIAGNOSTIC_RING_CAPACITY {
            ring.pop_front();
        }
        let now = chrono::Utc::now().timestamp();
        ring.push_back(format!("[{}] {message}", pptime(now)));
    }

    /// If a `moved_root` is configured, the torrent has metadata, is
    /// effectively complete, and isn't already stored under `moved_root`,
    /// request that its storage be moved there.
    async fn on_torrent_finished(&self, engine: &dyn TorrentEngine, handle: crate::model::TorrentHandle) {
        let Some(moved_root) = &self.move_on_finish.moved_root else { return };
        if !moved_root.exists() {
            return;
        }
        let status = self.registry.lock().unwrap().get(handle).cloned();
        let Some(status) = status else { return };
        if !status.has_metadata || status.progress_ppm < 1_000_000 || status.total_payload_download == 0 {
            return;
        }
        let moved_root_str = moved_root.to_string_lossy().to_string();
        if status.save_path == moved_root_str {
            return;
        }
        engine.move_storage(handle, &moved_root_str, true).await;
    }

    /// Iterate every handle the engine still owes a resume save, request
    /// each, pumping alerts every 32 requests; then block until
    /// `outstanding` reaches zero or each wait iteration times out.
    pub async fn drain_on_shutdown(&self, engine: &dyn TorrentEngine) {
        let pending = engine.handles_needing_resume().await;
        for (i, handle) in pending.into_iter().enumerate() {
            self.resume.request_save(engine, handle, false).await;
            if (i + 1) % 32 == 0 {
                self.pump_alerts(engine).await;
            }
        }

        const MAX_WAIT_ITERATIONS: u32 = 50;
        let mut iterations = 0;
        while self.outstanding() > 0 && iterations < MAX_WAIT_ITERATIONS {
            iterations += 1;
            let _ = timeout(SHUTDOWN_WAIT, self.pump_alerts(engine)).await;
            if self.outstanding() > 0 {
                warn!(outstanding = self.outstanding(), iterations, "still awaiting resume saves");
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        }
        if self.outstanding() > 0 {
            warn!(outstanding = self.outstanding(), "giving up waiting for resume saves at shutdown");
        }
    }
}
