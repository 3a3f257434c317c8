#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::multiple_crate_versions)]

//! A deterministic, in-process [`kedge_core::TorrentEngine`] collaborator
//! that never touches the network. Every added torrent walks a small fixed
//! state machine (queued → checking → downloading-metadata (magnets only)
//! → downloading → seeding) as the orchestrator calls `post_torrent_updates`,
//! so the rest of the stack can be exercised end to end without a real
//! libtorrent binding.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::Serialize;
use sha1::{Digest, Sha1};
use tracing::warn;

use kedge_core::alert::{Alert, ResumeOutcome};
use kedge_core::engine::TorrentEngine;
use kedge_core::error::{CoreError, CoreResult};
use kedge_core::model::{EngineSettingsView, TorrentHandle, TorrentState, TorrentStatus};

/// Ticks spent in `checking_files` before the torrent moves on.
const CHECKING_TICKS: u32 = 2;

/// Ticks spent fetching metadata for a magnet-initiated torrent.
const METADATA_TICKS: u32 = 3;

/// Simulated payload size assigned to every torrent this engine drives,
/// since no real metainfo is ever parsed. A production binding's torrent
/// size instead comes from the decoded `.torrent` itself.
const SIMULATED_TORRENT_SIZE: u64 = 50_000_000;

/// Bytes "downloaded" per engine tick while a torrent is actively
/// downloading; five ticks carry a torrent from 0 to full progress.
const BYTES_PER_TICK: u64 = SIMULATED_TORRENT_SIZE / 5;

/// Upload rate reported for torrents that have reached `Seeding`.
const SEED_UPLOAD_RATE: u64 = 4096;

/// Bencode-shaped resume record this engine writes; mirrors the shape a
/// real libtorrent binding's resume data has, minus the piece bitmap and
/// peer list fields this simulation has no use for.
#[derive(Debug, Serialize)]
struct ResumeRecord {
    info_hash: String,
    progress_ppm: u32,
    total_done: u64,
}

struct SimTorrent {
    status: TorrentStatus,
    stage_ticks: u32,
    resume_dirty: bool,
}

impl SimTorrent {
    /// Advance this torrent by one engine tick, returning any
    /// transition-triggered alerts (`MetadataReceived`, `TorrentFinished`).
    /// Routine per-tick updates (progress, rates) never themselves produce
    /// an alert — those ride the batched `StateUpdate` the caller builds.
    fn tick(&mut self, handle: TorrentHandle, now_epoch: i64) -> Vec<Alert> {
        let mut alerts = Vec::new();
        match self.status.state {
            TorrentState::Paused | TorrentState::Error => {}
            TorrentState::Seeding => {
                self.status.upload_rate = SEED_UPLOAD_RATE;
            }
            TorrentState::QueuedForChecking => {
                self.status.state = TorrentState::CheckingFiles;
            }
            TorrentState::CheckingFiles | TorrentState::CheckingResumeData | TorrentState::Allocating => {
                self.stage_ticks += 1;
                if self.stage_ticks >= CHECKING_TICKS {
                    self.stage_ticks = 0;
                    self.status.state = if self.status.has_metadata {
                        TorrentState::Downloading
                    } else {
                        TorrentState::DownloadingMetadata
                    };
                }
            }
            TorrentState::DownloadingMetadata => {
                self.stage_ticks += 1;
                if self.stage_ticks >= METADATA_TICKS {
                    self.stage_ticks = 0;
                    self.status.has_metadata = true;
                    self.status.total_wanted = SIMULATED_TORRENT_SIZE;
                    self.status.state = TorrentState::Downloading;
                    self.resume_dirty = true;
                    alerts.push(Alert::MetadataReceived { handle });
                }
            }
            TorrentState::Downloading => {
                let total_wanted = self.status.total_wanted.max(1);
                self.status.total_done = (self.status.total_done + BYTES_PER_TICK).min(total_wanted);
                self.status.total_payload_download += BYTES_PER_TICK;
                self.status.download_rate = BYTES_PER_TICK * 2;
                let done = u128::from(self.status.total_done);
                let wanted = u128::from(total_wanted);
                self.status.progress_ppm = u32::try_from((done * 1_000_000 / wanted).min(1_000_000)).unwrap_or(1_000_000);
                self.resume_dirty = true;
                if self.status.progress_ppm >= 1_000_000 {
                    self.status.is_finished = true;
                    self.status.completed_time = now_epoch;
                    self.status.download_rate = 0;
                    self.status.state = TorrentState::Seeding;
                    alerts.push(Alert::TorrentFinished { handle });
                }
            }
            TorrentState::Finished => {
                self.status.state = TorrentState::Seeding;
            }
        }
        alerts
    }
}

/// A development/test [`TorrentEngine`] collaborator: drives a deterministic
/// per-torrent state machine entirely in memory. Never spawns a listener,
/// never resolves a tracker, never opens a socket.
pub struct SimulatedEngine {
    settings: EngineSettingsView,
    started_at_us: u64,
    torrents: Mutex<HashMap<TorrentHandle, SimTorrent>>,
    pending_alerts: Mutex<VecDeque<Alert>>,
    dht_tick: AtomicU64,
    cumulative_recv: AtomicU64,
    cumulative_sent: AtomicU64,
}

impl SimulatedEngine {
    /// Construct an empty engine with the given effective settings.
    #[must_use]
    pub fn new(settings: EngineSettingsView) -> Self {
        Self {
            settings,
            started_at_us: now_us(),
            torrents: Mutex::new(HashMap::new()),
            pending_alerts: Mutex::new(VecDeque::new()),
            dht_tick: AtomicU64::new(0),
            cumulative_recv: AtomicU64::new(0),
            cumulative_sent: AtomicU64::new(0),
        }
    }

    /// Process-start timestamp in microseconds, for [`kedge_core::CounterWindow`] uptime.
    #[must_use]
    pub const fn started_at_us(&self) -> u64 {
        self.started_at_us
    }

    /// Seed a torrent directly from a persisted resume record, bypassing
    /// the normal `add_torrent_file` metainfo path. Used only by the
    /// binary's startup sequence to restore state across restarts, since
    /// this engine's own resume blobs (see [`ResumeRecord`]) carry no real
    /// metainfo to re-add from.
    pub fn restore_from_resume(&self, info_hash: kedge_ids::InfoHash, save_path: String, progress_ppm: u32, total_done: u64) {
        let handle = TorrentHandle::from_info_hash(info_hash);
        let is_finished = progress_ppm >= 1_000_000;
        let status = TorrentStatus {
            info_hash,
            name: Some(format!("restored-{}", &info_hash.to_hex()[..8])),
            save_path,
            state: if is_finished { TorrentState::Seeding } else { TorrentState::Downloading },
            progress_ppm,
            is_finished,
            has_metadata: true,
            added_time: chrono::Utc::now().timestamp(),
            completed_time: if is_finished { chrono::Utc::now().timestamp() } else { 0 },
            total_done,
            total_wanted: SIMULATED_TORRENT_SIZE,
            download_rate: 0,
            upload_rate: 0,
            num_peers: 0,
            num_seeds: 0,
            total_payload_download: total_done,
            max_connections: self.settings.default_max_connections,
        };
        self.torrents.lock().unwrap().insert(handle, SimTorrent { status, stage_ticks: 0, resume_dirty: false });
    }
}

#[async_trait]
impl TorrentEngine for SimulatedEngine {
    async fn add_torrent_file(&self, bytes: &[u8], save_path: &str) -> CoreResult<kedge_ids::InfoHash> {
        if bytes.is_empty() {
            let message = "empty torrent metainfo".to_string();
            self.pending_alerts.lock().unwrap().push_back(Alert::AddTorrent { handle: None, error: Some(message.clone()) });
            return Err(CoreError::Engine { operation: "add_torrent_file", message });
        }
        let info_hash = kedge_ids::InfoHash::from_bytes(Sha1::digest(bytes).into());
        let handle = TorrentHandle::from_info_hash(info_hash);
        let now = chrono::Utc::now().timestamp();
        let status = TorrentStatus {
            info_hash,
            name: Some(format!("torrent-{}", &info_hash.to_hex()[..8])),
            save_path: save_path.to_string(),
            state: TorrentState::QueuedForChecking,
            progress_ppm: 0,
            is_finished: false,
            has_metadata: true,
            added_time: now,
            completed_time: 0,
            total_done: 0,
            total_wanted: SIMULATED_TORRENT_SIZE,
            download_rate: 0,
            upload_rate: 0,
            num_peers: 0,
            num_seeds: 0,
            total_payload_download: 0,
            max_connections: self.settings.default_max_connections,
        };
        self.torrents.lock().unwrap().insert(handle, SimTorrent { status, stage_ticks: 0, resume_dirty: true });
        self.pending_alerts.lock().unwrap().push_back(Alert::AddTorrent { handle: Some(handle), error: None });
        Ok(info_hash)
    }

    async fn add_magnet(&self, uri: &str) -> CoreResult<kedge_ids::InfoHash> {
        let Some(info_hash) = parse_btih(uri) else {
            let message = format!("unrecognized magnet URI: {uri}");
            self.pending_alerts.lock().unwrap().push_back(Alert::AddTorrent { handle: None, error: Some(message.clone()) });
            return Err(CoreError::Engine { operation: "add_magnet", message });
        };
        let handle = TorrentHandle::from_info_hash(info_hash);
        let now = chrono::Utc::now().timestamp();
        let status = TorrentStatus {
            info_hash,
            name: None,
            save_path: String::new(),
            state: TorrentState::DownloadingMetadata,
            progress_ppm: 0,
            is_finished: false,
            has_metadata: false,
            added_time: now,
            completed_time: 0,
            total_done: 0,
            total_wanted: 0,
            download_rate: 0,
            upload_rate: 0,
            num_peers: 0,
            num_seeds: 0,
            total_payload_download: 0,
            max_connections: self.settings.default_max_connections,
        };
        self.torrents.lock().unwrap().insert(handle, SimTorrent { status, stage_ticks: 0, resume_dirty: true });
        self.pending_alerts.lock().unwrap().push_back(Alert::AddTorrent { handle: Some(handle), error: None });
        Ok(info_hash)
    }

    async fn pop_alerts(&self) -> Vec<Alert> {
        self.pending_alerts.lock().unwrap().drain(..).collect()
    }

    async fn post_torrent_updates(&self) {
        let now = chrono::Utc::now().timestamp();
        let mut collected = Vec::new();
        let statuses = {
            let mut torrents = self.torrents.lock().unwrap();
            for (&handle, sim) in torrents.iter_mut() {
                collected.extend(sim.tick(handle, now));
            }
            torrents.values().map(|sim| sim.status.clone()).collect::<Vec<_>>()
        };
        if !statuses.is_empty() {
            collected.push(Alert::StateUpdate { statuses });
        }
        self.pending_alerts.lock().unwrap().extend(collected);
    }

    async fn post_session_stats(&self) {
        let (downloading, seeding) = {
            let torrents = self.torrents.lock().unwrap();
            let downloading = torrents.values().filter(|sim| sim.status.state == TorrentState::Downloading).count();
            let seeding = torrents.values().filter(|sim| sim.status.state == TorrentState::Seeding).count();
            (downloading, seeding)
        };
        let recv_delta = BYTES_PER_TICK * u64::try_from(downloading).unwrap_or(0);
        let sent_delta = SEED_UPLOAD_RATE * u64::try_from(seeding).unwrap_or(0);
        let recv = self.cumulative_recv.fetch_add(recv_delta, Ordering::Relaxed) + recv_delta;
        let sent = self.cumulative_sent.fetch_add(sent_delta, Ordering::Relaxed) + sent_delta;
        let Ok(recv) = i64::try_from(recv) else {
            warn!("cumulative recv counter overflowed i64, skipping session_stats alert");
            return;
        };
        let Ok(sent) = i64::try_from(sent) else {
            warn!("cumulative sent counter overflowed i64, skipping session_stats alert");
            return;
        };
        self.pending_alerts.lock().unwrap().push_back(Alert::SessionStats {
            counters: vec![recv, sent],
            timestamp_us: now_us(),
        });
    }

    async fn post_dht_stats(&self) {
        let tick = self.dht_tick.fetch_add(1, Ordering::Relaxed);
        let active_requests = u32::try_from(tick % 4).unwrap_or(0);
        let torrent_count = u32::try_from(self.torrents.lock().unwrap().len()).unwrap_or(0);
        self.pending_alerts.lock().unwrap().push_back(Alert::DhtStats {
            active_requests,
            routing_table: torrent_count * 8 + 16,
        });
    }

    async fn save_resume_data(&self, handle: TorrentHandle, only_if_modified: bool) {
        let record = {
            let mut torrents = self.torrents.lock().unwrap();
            let Some(sim) = torrents.get_mut(&handle) else {
                drop(torrents);
                self.pending_alerts
                    .lock()
                    .unwrap()
                    .push_back(Alert::SaveResumeDataFailed { handle, outcome: ResumeOutcome::Failed("unknown handle".into()) });
                return;
            };
            if only_if_modified && !sim.resume_dirty {
                drop(torrents);
                self.pending_alerts
                    .lock()
                    .unwrap()
                    .push_back(Alert::SaveResumeDataFailed { handle, outcome: ResumeOutcome::NotModified });
                return;
            }
            sim.resume_dirty = false;
            ResumeRecord {
                info_hash: handle.info_hash().to_hex(),
                progress_ppm: sim.status.progress_ppm,
                total_done: sim.status.total_done,
            }
        };
        match serde_bencode::to_bytes(&record) {
            Ok(data) => {
                self.pending_alerts.lock().unwrap().push_back(Alert::SaveResumeData { info_hash: handle.info_hash(), data });
            }
            Err(err) => {
                self.pending_alerts
                    .lock()
                    .unwrap()
                    .push_back(Alert::SaveResumeDataFailed { handle, outcome: ResumeOutcome::Failed(err.to_string()) });
            }
        }
    }

    async fn move_storage(&self, handle: TorrentHandle, dest: &str, dont_replace: bool) {
        let mut torrents = self.torrents.lock().unwrap();
        if let Some(sim) = torrents.get_mut(&handle) {
            if dont_replace && sim.status.save_path == dest {
                return;
            }
            sim.status.save_path = dest.to_string();
        }
    }

    async fn set_torrent_pause(&self, handle: TorrentHandle, paused: bool) {
        let alert = {
            let mut torrents = self.torrents.lock().unwrap();
            let Some(sim) = torrents.get_mut(&handle) else { return };
            if paused {
                if sim.status.state == TorrentState::Paused {
                    None
                } else {
                    sim.status.state = TorrentState::Paused;
                    sim.resume_dirty = true;
                    Some(Alert::TorrentPaused { handle })
                }
            } else {
                if sim.status.state == TorrentState::Paused {
                    sim.status.state = if sim.status.is_finished {
                        TorrentState::Seeding
                    } else if sim.status.has_metadata {
                        TorrentState::Downloading
                    } else {
                        TorrentState::DownloadingMetadata
                    };
                }
                None
            }
        };
        if let Some(alert) = alert {
            self.pending_alerts.lock().unwrap().push_back(alert);
        }
    }

    async fn remove_torrent(&self, handle: TorrentHandle, _with_data: bool) {
        self.torrents.lock().unwrap().remove(&handle);
        self.pending_alerts.lock().unwrap().push_back(Alert::TorrentRemoved { handle });
    }

    async fn handle_for(&self, info_hash: kedge_ids::InfoHash) -> Option<TorrentHandle> {
        let handle = TorrentHandle::from_info_hash(info_hash);
        self.torrents.lock().unwrap().contains_key(&handle).then_some(handle)
    }

    fn settings(&self) -> EngineSettingsView {
        self.settings.clone()
    }

    async fn handles_needing_resume(&self) -> Vec<TorrentHandle> {
        self.torrents
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, sim)| sim.resume_dirty && sim.status.has_metadata)
            .map(|(&handle, _)| handle)
            .collect()
    }
}

fn now_us() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| u64::try_from(d.as_micros()).unwrap_or(u64::MAX)).unwrap_or(0)
}

/// Extract the 40-hex-character info-hash from a `magnet:?xt=urn:btih:...`
/// URI. Only the `btih` exact-topic form is recognized; base32 `btih`
/// encodings and multi-topic magnets are out of scope for this collaborator.
fn parse_btih(uri: &str) -> Option<kedge_ids::InfoHash> {
    let marker = "xt=urn:btih:";
    let start = uri.find(marker)? + marker.len();
    let rest = &uri[start..];
    let end = rest.find('&').unwrap_or(rest.len());
    kedge_ids::InfoHash::from_hex(&rest[..end]).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> EngineSettingsView {
        EngineSettingsView {
            peer_id_prefix: "-KG-".into(),
            dht_bootstrap_nodes: vec!["dht.transmissionbt.com:6881".into()],
            default_max_connections: 25,
        }
    }

    #[tokio::test]
    async fn add_torrent_file_assigns_deterministic_info_hash() {
        let engine = SimulatedEngine::new(settings());
        let info_hash = engine.add_torrent_file(b"fake metainfo bytes", "/tmp/s").await.unwrap();
        let expected = kedge_ids::InfoHash::from_bytes(Sha1::digest(b"fake metainfo bytes").into());
        assert_eq!(info_hash, expected);
    }

    #[tokio::test]
    async fn add_torrent_file_rejects_empty_bytes() {
        let engine = SimulatedEngine::new(settings());
        assert!(engine.add_torrent_file(b"", "/tmp/s").await.is_err());
    }

    #[tokio::test]
    async fn add_torrent_emits_alert_for_dispatcher_followup() {
        let engine = SimulatedEngine::new(settings());
        engine.add_torrent_file(b"abc", "/tmp/s").await.unwrap();
        let alerts = engine.pop_alerts().await;
        assert!(alerts.iter().any(|a| matches!(a, Alert::AddTorrent { error: None, .. })));
    }

    #[tokio::test]
    async fn torrent_progresses_to_seeding_after_enough_ticks() {
        let engine = SimulatedEngine::new(settings());
        engine.add_torrent_file(b"abc", "/tmp/s").await.unwrap();
        let mut saw_finished = false;
        for _ in 0..20 {
            engine.post_torrent_updates().await;
            let alerts = engine.pop_alerts().await;
            if alerts.iter().any(|a| matches!(a, Alert::TorrentFinished { .. })) {
                saw_finished = true;
                break;
            }
        }
        assert!(saw_finished);
    }

    #[tokio::test]
    async fn magnet_add_starts_without_metadata_then_receives_it() {
        let engine = SimulatedEngine::new(settings());
        engine
            .add_magnet("magnet:?xt=urn:btih:0123456789abcdef0123456789abcdef01234567")
            .await
            .unwrap();
        let mut saw_metadata = false;
        for _ in 0..10 {
            engine.post_torrent_updates().await;
            let alerts = engine.pop_alerts().await;
            if alerts.iter().any(|a| matches!(a, Alert::MetadataReceived { .. })) {
                saw_metadata = true;
                break;
            }
        }
        assert!(saw_metadata);
    }

    #[tokio::test]
    async fn save_resume_data_only_if_modified_reports_not_modified_when_clean() {
        let engine = SimulatedEngine::new(settings());
        let info_hash = engine.add_torrent_file(b"abc", "/tmp/s").await.unwrap();
        let handle = TorrentHandle::from_info_hash(info_hash);
        engine.pop_alerts().await;
        engine.save_resume_data(handle, false).await;
        let alerts = engine.pop_alerts().await;
        assert!(alerts.iter().any(|a| matches!(a, Alert::SaveResumeData { .. })));

        engine.save_resume_data(handle, true).await;
        let alerts = engine.pop_alerts().await;
        assert!(alerts.iter().any(|a| matches!(a, Alert::SaveResumeDataFailed { outcome: ResumeOutcome::NotModified, .. })));
    }

    #[tokio::test]
    async fn pause_then_resume_round_trips_state() {
        let engine = SimulatedEngine::new(settings());
        let info_hash = engine.add_torrent_file(b"abc", "/tmp/s").await.unwrap();
        let handle = TorrentHandle::from_info_hash(info_hash);
        engine.pop_alerts().await;
        engine.set_torrent_pause(handle, true).await;
        let alerts = engine.pop_alerts().await;
        assert!(alerts.iter().any(|a| matches!(a, Alert::TorrentPaused { .. })));
        engine.set_torrent_pause(handle, false).await;
        engine.post_torrent_updates().await;
        let statuses = engine.pop_alerts().await;
        let found = statuses.into_iter().find_map(|a| match a {
            Alert::StateUpdate { statuses } => statuses.into_iter().find(|s| s.info_hash == info_hash),
            _ => None,
        });
        assert!(found.is_some_and(|s| s.state != TorrentState::Paused));
    }

    #[test]
    fn parse_btih_extracts_hex_from_magnet_uri() {
        let uri = "magnet:?xt=urn:btih:0123456789abcdef0123456789abcdef01234567&dn=name";
        assert!(parse_btih(uri).is_some());
        assert!(parse_btih("magnet:?dn=no-hash").is_none());
    }
}
