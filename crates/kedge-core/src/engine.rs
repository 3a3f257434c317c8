//! The `TorrentEngine` trait every collaborator (simulated or otherwise)
//! implements. Modeled as an opaque, shared capability (`Arc<dyn
//! TorrentEngine>`) held by both the orchestrator's tick task and by
//! request handlers — the underlying library's session object is a
//! thread-safe black box, so this orchestrator never attempts to take
//! exclusive ownership of it.

use async_trait::async_trait;

use kedge_ids::InfoHash;

use crate::alert::Alert;
use crate::error::CoreResult;
use crate::model::{EngineSettingsView, TorrentHandle};

/// Primary engine trait implemented by torrent collaborators.
#[async_trait]
pub trait TorrentEngine: Send + Sync {
    /// Admit a torrent from raw `.torrent` metainfo bytes.
    async fn add_torrent_file(&self, bytes: &[u8], save_path: &str) -> CoreResult<InfoHash>;

    /// Admit a torrent from a magnet URI.
    async fn add_magnet(&self, uri: &str) -> CoreResult<InfoHash>;

    /// Drain every alert the engine has queued since the last call.
    async fn pop_alerts(&self) -> Vec<Alert>;

    /// Ask the engine to emit fresh `state_update` alerts on the next
    /// `pop_alerts`.
    async fn post_torrent_updates(&self);

    /// Ask the engine to emit a fresh `session_stats` alert.
    async fn post_session_stats(&self);

    /// Ask the engine to emit a fresh `dht_stats` alert.
    async fn post_dht_stats(&self);

    /// Request resume data for `handle`.
    ///
    /// `only_if_modified` mirrors the library's own optimization: skip the
    /// write (and report [`crate::alert::ResumeOutcome::NotModified`])
    /// when nothing has changed since the last save.
    async fn save_resume_data(&self, handle: TorrentHandle, only_if_modified: bool);

    /// Move a torrent's storage to `dest`.
    async fn move_storage(&self, handle: TorrentHandle, dest: &str, dont_replace: bool);

    /// Pause or resume a torrent.
    async fn set_torrent_pause(&self, handle: TorrentHandle, paused: bool);

    /// Remove a torrent, optionally deleting its downloaded data.
    async fn remove_torrent(&self, handle: TorrentHandle, with_data: bool);

    /// Resolve the current handle for `info_hash`, if the engine still
    /// tracks that torrent.
    async fn handle_for(&self, info_hash: InfoHash) -> Option<TorrentHandle>;

    /// A read-only view of the engine's effective settings.
    fn settings(&self) -> EngineSettingsView;

    /// Handles the engine still owes a resume save: those with metadata
    /// and an outstanding `need_save_resume` flag. Used only by
    /// [`crate::resume::ResumeCoordinator::drain_on_shutdown`].
    async fn handles_needing_resume(&self) -> Vec<TorrentHandle>;
}
