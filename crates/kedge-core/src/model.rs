//! Domain value types shared by the registry, dispatcher, projector and
//! engine collaborator: torrent status, lifecycle state, session/DHT
//! statistics, and the handle the engine hands back on add.

use kedge_ids::InfoHash;
use serde::{Deserialize, Serialize};

/// Opaque handle to a torrent inside the engine.
///
/// The simulated engine identifies handles by info-hash one-to-one; a real
/// libtorrent binding would hand back an opaque session-scoped token
/// instead. Consumers must treat this as a weak back-reference, never as an
/// owning value — the registry, not the handle, owns the `TorrentStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TorrentHandle(InfoHash);

impl TorrentHandle {
    /// Construct a handle from the torrent's info-hash.
    #[must_use]
    pub const fn from_info_hash(info_hash: InfoHash) -> Self {
        Self(info_hash)
    }

    /// Recover the info-hash this handle refers to.
    #[must_use]
    pub const fn info_hash(self) -> InfoHash {
        self.0
    }
}

/// Lifecycle state of a torrent, mirroring the library's `torrent_status::state_t`
/// plus a `Paused` state this orchestrator tracks explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TorrentState {
    /// Waiting for a slot to start checking or downloading.
    QueuedForChecking,
    /// Checking existing file data against piece hashes.
    CheckingFiles,
    /// Fetching the `.torrent` metadata from peers (magnet add).
    DownloadingMetadata,
    /// Actively downloading piece data.
    Downloading,
    /// Download complete, not yet seeding-eligible checks finished.
    Finished,
    /// Download complete and uploading to peers.
    Seeding,
    /// Allocating disk space for the download.
    Allocating,
    /// Checking resume data against on-disk files.
    CheckingResumeData,
    /// Paused by a client request.
    Paused,
    /// Engine reported an unrecoverable error for this torrent.
    Error,
}

/// A value record capturing one torrent's transfer and lifecycle fields at a
/// moment in time. The engine is the sole mutator; the registry, projector
/// and differ only read it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TorrentStatus {
    /// 20-byte SHA-1 identifier of this torrent's info dictionary.
    pub info_hash: InfoHash,
    /// Human-readable name, known once metadata arrives.
    pub name: Option<String>,
    /// Destination directory this torrent's files are saved under.
    pub save_path: String,
    /// Current lifecycle state.
    pub state: TorrentState,
    /// Progress in parts-per-million, `0..=1_000_000`.
    pub progress_ppm: u32,
    /// Whether the download has completed.
    pub is_finished: bool,
    /// Whether the `.torrent` metadata has been retrieved.
    pub has_metadata: bool,
    /// Unix-epoch seconds the torrent was added.
    pub added_time: i64,
    /// Unix-epoch seconds the torrent completed, or 0 if not yet complete.
    pub completed_time: i64,
    /// Bytes downloaded and verified so far.
    pub total_done: u64,
    /// Total bytes wanted (the torrent's payload size), once known.
    pub total_wanted: u64,
    /// Instantaneous download rate in bytes per second.
    pub download_rate: u64,
    /// Instantaneous upload rate in bytes per second.
    pub upload_rate: u64,
    /// Currently-connected peer count.
    pub num_peers: u32,
    /// Currently-connected seed count.
    pub num_seeds: u32,
    /// Cumulative bytes downloaded over the torrent's lifetime.
    pub total_payload_download: u64,
    /// Per-torrent connection cap currently in effect.
    pub max_connections: u32,
}

impl TorrentStatus {
    /// `progress_ppm == 1_000_000` iff `is_finished`, once metadata has
    /// arrived; this helper is the single place that invariant is enforced.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.has_metadata && self.progress_ppm >= 1_000_000
    }
}

/// Aggregate session-wide statistics derived from two counter samples.
///
/// Field names and the sparse/mandatory split mirror the underlying
/// library's `session_stats` wire object; this orchestrator's simulated
/// engine only models two counters (`net.recv_bytes`/`net.sent_bytes`), so
/// the protocol-overhead-only fields the real library would report
/// (`bytes_failed`, `bytes_queued`, `bytes_wasted`, peer and queue-limit
/// counts, `has_incoming`) have no source here and are left at zero, which
/// the projector's sparse encoding renders identically to "not reported".
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    /// Cumulative bytes received across all torrents, protocol and payload.
    pub bytes_recv: u64,
    /// Cumulative bytes sent across all torrents, protocol and payload.
    pub bytes_sent: u64,
    /// Instantaneous aggregate receive rate in bytes per second.
    pub rate_recv: u64,
    /// Instantaneous aggregate send rate in bytes per second.
    pub rate_sent: u64,
    /// Torrents currently being checked.
    pub num_checking: u32,
    /// Torrents currently downloading.
    pub num_downloading: u32,
    /// Torrents currently seeding.
    pub num_seeding: u32,
    /// Torrents stopped or paused.
    pub num_stopped: u32,
    /// Torrents queued and not yet started.
    pub num_queued: u32,
    /// Torrents in an error state.
    pub num_error: u32,
    /// Whether the whole session is paused.
    pub is_paused: bool,
    /// Seconds since the engine session started.
    pub uptime_secs: u64,
    /// Milliseconds since the engine session started.
    pub uptime_ms: u64,
}

/// DHT routing statistics, as forwarded by `dht_stats` alerts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DhtStats {
    /// Outstanding DHT requests at the time of the sample.
    pub active_requests: u32,
    /// Size of the local DHT routing table.
    pub routing_table: u32,
}

/// Read-only view of the engine's effective settings, surfaced for
/// diagnostics; never mutated at runtime by this orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettingsView {
    /// Peer-id prefix advertised to peers.
    pub peer_id_prefix: String,
    /// DHT bootstrap nodes currently configured.
    pub dht_bootstrap_nodes: Vec<String>,
    /// Per-torrent connection cap applied to newly added torrents.
    pub default_max_connections: u32,
}
