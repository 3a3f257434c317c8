//! Dependency construction and the boot sequence: parse CLI flags, install
//! logging, build the engine collaborator and core components, restore
//! persisted state, spawn the background loops, and serve the HTTP/WS
//! surface until a shutdown signal arrives.

use std::sync::Arc;

use clap::Parser;
use serde::Deserialize;
use tracing::{info, warn};

use kedge_api::{ApiServer, AppState, SessionIdentity};
use kedge_config::{Cli, EngineConfig};
use kedge_core::dispatcher::MoveOnFinishConfig;
use kedge_core::model::{EngineSettingsView, TorrentHandle};
use kedge_core::watch::WatchScanner;
use kedge_core::{AlertDispatcher, SubscriberHub, TorrentEngine};
use kedge_engine::SimulatedEngine;
use kedge_telemetry::{LogFormat, LoggingConfig};

use crate::error::{AppError, AppResult};
use crate::state_file;

/// Default per-torrent connection cap handed to the engine collaborator;
/// mirrors the upstream daemon's default.
const DEFAULT_MAX_CONNECTIONS: u32 = 200;

/// Bencode-shaped resume record this binary reads back on startup. Mirrors
/// the private record `kedge-engine` writes in `save_resume_data`, minus the
/// fields this binary has no use for.
#[derive(Debug, Deserialize)]
struct ResumeRecord {
    info_hash: String,
    progress_ppm: u32,
    total_done: u64,
}

/// Parse CLI flags, resolve configuration, and run the application until a
/// shutdown signal arrives.
///
/// # Errors
///
/// Returns [`AppError`] if configuration resolution, logging installation,
/// or the HTTP listener fails.
pub async fn run() -> AppResult<()> {
    let cli = Cli::parse();
    let config = EngineConfig::resolve(cli).await?;

    kedge_telemetry::init_logging(&LoggingConfig {
        level: &config.cli.log_level,
        format: LogFormat::infer(),
        build_sha: kedge_telemetry::build_sha(),
    })?;

    info!(conf_dir = %config.conf_dir.display(), "kedge bootstrap starting");

    let addr = config.cli.listen_addr()?;
    if addr.port() == 0 {
        return Err(AppError::ZeroPort { addr: config.cli.listens.clone() });
    }

    let settings = EngineSettingsView {
        peer_id_prefix: config.cli.peer_id.clone(),
        dht_bootstrap_nodes: config.cli.dht_bootstrap_node_list(),
        default_max_connections: DEFAULT_MAX_CONNECTIONS,
    };
    let sim_engine = SimulatedEngine::new(settings);
    let restored = restore_resume_files(&sim_engine, &config.conf_dir, &config.store_root.display().to_string()).await;
    info!(count = restored, "restored torrents from resume data");

    let started_at_us = sim_engine.started_at_us();
    let engine: Arc<dyn TorrentEngine> = Arc::new(sim_engine);

    let dispatcher = Arc::new(AlertDispatcher::new(
        config.conf_dir.clone(),
        &["net.recv_bytes", "net.sent_bytes"],
        started_at_us,
        MoveOnFinishConfig { moved_root: config.cli.moved_root.clone() },
    ));
    let hub = Arc::new(SubscriberHub::new());
    let identity = SessionIdentity {
        peer_id: config.cli.peer_id.clone(),
        peer_port: addr.port(),
        listen_interfaces: config.cli.listens.clone(),
        version: kedge_telemetry::build_sha().to_string(),
        stored: config.conf_dir.display().to_string(),
    };

    let state = Arc::new(AppState::new(engine, dispatcher, hub, identity));

    let ses_state = state_file::load(&config.conf_dir).await;
    if ses_state.paused {
        state.toggle_paused();
        for status in kedge_api::snapshot::torrents(&state) {
            let handle = TorrentHandle::from_info_hash(status.info_hash);
            state.engine.set_torrent_pause(handle, true).await;
        }
    }

    let watch_scanner = Some(WatchScanner::new(config.conf_dir.join("watching")));
    let loops = crate::orchestrator::Loops::spawn(Arc::clone(&state), watch_scanner, config.store_root.display().to_string());

    let server = ApiServer::new(Arc::clone(&state));
    let server_handle = tokio::spawn(server.serve(addr));

    info!(%addr, "listening");
    tokio::signal::ctrl_c().await.map_err(|err| AppError::Serve(err.into()))?;
    info!("shutdown signal received, draining");

    loops.shutdown().await;
    state.dispatcher.drain_on_shutdown(state.engine.as_ref()).await;
    state_file::save(&config.conf_dir, &state_file::SessionState { paused: state.is_paused() }).await;

    if !server_handle.is_finished() {
        server_handle.abort();
    }

    info!("shutdown complete");
    Ok(())
}

/// Read every `.resume` file under `conf_dir`, decode it, and seed a
/// torrent directly into `engine` for each. Malformed entries are logged
/// and skipped rather than aborting the whole restore.
async fn restore_resume_files(engine: &SimulatedEngine, conf_dir: &std::path::Path, save_path: &str) -> usize {
    let resume_dir = conf_dir.join(".resume");
    let mut entries = match tokio::fs::read_dir(&resume_dir).await {
        Ok(entries) => entries,
        Err(err) => {
            warn!(dir = %resume_dir.display(), %err, "failed to read resume directory");
            return 0;
        }
    };

    let mut restored = 0;
    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(err) => {
                warn!(%err, "failed to read resume directory entry");
                break;
            }
        };
        let path = entry.path();
        if path.extension().and_then(std::ffi::OsStr::to_str) != Some("resume") {
            continue;
        }
        match kedge_store::load_file_default(&path).await {
            Ok(bytes) => match serde_bencode::from_bytes::<ResumeRecord>(&bytes) {
                Ok(record) => match kedge_ids::InfoHash::from_hex(&record.info_hash) {
                    Ok(info_hash) => {
                        engine.restore_from_resume(info_hash, save_path.to_string(), record.progress_ppm, record.total_done);
                        restored += 1;
                    }
                    Err(err) => warn!(path = %path.display(), %err, "resume file has an invalid info hash"),
                },
                Err(err) => warn!(path = %path.display(), %err, "failed to decode resume file"),
            },
            Err(err) => warn!(path = %path.display(), %err, "failed to read resume file"),
        }
    }
    restored
}
