//! Shared test fixtures: a no-op `TorrentEngine` and a ready-made
//! `AppState` around it, used by every handler module's unit tests so
//! they don't each grow a divergent fake.

#![cfg(test)]

use std::sync::Arc;

use kedge_core::{AlertDispatcher, SubscriberHub};

use crate::state::{AppState, SessionIdentity};

pub(crate) struct NullEngine;

#[async_trait::async_trait]
impl kedge_core::TorrentEngine for NullEngine {
    async fn add_torrent_file(&self, _bytes: &[u8], _save_path: &str) -> kedge_core::CoreResult<kedge_ids::InfoHash> {
        unimplemented!()
    }
    async fn add_magnet(&self, _uri: &str) -> kedge_core::CoreResult<kedge_ids::InfoHash> {
        unimplemented!()
    }
    async fn pop_alerts(&self) -> Vec<kedge_core::Alert> {
        vec![]
    }
    async fn post_torrent_updates(&self) {}
    async fn post_session_stats(&self) {}
    async fn post_dht_stats(&self) {}
    async fn save_resume_data(&self, _handle: kedge_core::model::TorrentHandle, _only_if_modified: bool) {}
    async fn move_storage(&self, _handle: kedge_core::model::TorrentHandle, _dest: &str, _dont_replace: bool) {}
    async fn set_torrent_pause(&self, _handle: kedge_core::model::TorrentHandle, _paused: bool) {}
    async fn remove_torrent(&self, _handle: kedge_core::model::TorrentHandle, _with_data: bool) {}
    async fn handle_for(&self, _info_hash: kedge_ids::InfoHash) -> Option<kedge_core::model::TorrentHandle> {
        None
    }
    fn settings(&self) -> kedge_core::model::EngineSettingsView {
        kedge_core::model::EngineSettingsView {
            peer_id_prefix: "-KG-".into(),
            dht_bootstrap_nodes: vec![],
            default_max_connections: 25,
        }
    }
    async fn handles_needing_resume(&self) -> Vec<kedge_core::model::TorrentHandle> {
        vec![]
    }
}

pub(crate) fn identity() -> SessionIdentity {
    SessionIdentity {
        peer_id: "-KG-".into(),
        peer_port: 6881,
        listen_interfaces: "0.0.0.0:6881".into(),
        version: "dev".into(),
        stored: "/tmp/conf".into(),
    }
}

pub(crate) fn test_state() -> AppState {
    AppState::new(
        Arc::new(NullEngine),
        Arc::new(AlertDispatcher::new("/tmp/conf-test", &["net.recv_bytes", "net.sent_bytes"], 0, kedge_core::dispatcher::MoveOnFinishConfig::default())),
        Arc::new(SubscriberHub::new()),
        identity(),
    )
}
