//! The projected alert vocabulary the dispatcher routes on. Each variant
//! carries only the fields the dispatcher actually reads — never the full
//! upstream alert payload — matching this orchestrator's "black box"
//! stance toward the underlying torrent engine.

use kedge_ids::InfoHash;

use crate::model::{TorrentHandle, TorrentStatus};

/// Why a peer connection ended, as reported by a `peer_disconnected` alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The handshake never completed within the timeout.
    TimedOutNoHandshake,
    /// Any other disconnect reason.
    Other,
}

/// Which operation a `peer_disconnected` alert was reporting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerOperation {
    /// The disconnect happened while connecting.
    Connect,
    /// The disconnect happened during any other operation.
    Other,
}

/// Outcome of a `save_resume_data` request, as reported by its terminal
/// alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResumeOutcome {
    /// The library declined because nothing had changed since the last
    /// save — its "nothing to save" sentinel, not a real failure.
    NotModified,
    /// Any other failure, worth a warning log.
    Failed(String),
}

/// The alert vocabulary this orchestrator dispatches on, one variant per
/// row of the routing table plus an [`Alert::Unrecognized`] catch-all.
#[derive(Debug, Clone)]
pub enum Alert {
    /// Session-wide counter sample paired with the timestamp it was taken.
    SessionStats {
        /// Raw counter values, indexed per the engine's metric schema.
        counters: Vec<i64>,
        /// Microsecond timestamp the sample was taken at.
        timestamp_us: u64,
    },
    /// DHT routing-table sample.
    DhtStats {
        /// Outstanding DHT requests.
        active_requests: u32,
        /// Size of the local routing table.
        routing_table: u32,
    },
    /// A peer connected to us or we connected to a peer.
    PeerConnect,
    /// A peer opened an incoming connection.
    IncomingConnection,
    /// A peer connection ended.
    PeerDisconnected {
        /// Which operation was in flight when the connection ended.
        operation: PeerOperation,
        /// Why the connection ended.
        reason: DisconnectReason,
    },
    /// A magnet-initiated torrent's metadata became available.
    MetadataReceived {
        /// Torrent the metadata arrived for.
        handle: TorrentHandle,
    },
    /// A torrent add request completed, successfully or not.
    AddTorrent {
        /// Handle assigned on success.
        handle: Option<TorrentHandle>,
        /// Failure detail, present only when the add failed.
        error: Option<String>,
    },
    /// A torrent finished downloading.
    TorrentFinished {
        /// Torrent that finished.
        handle: TorrentHandle,
    },
    /// Resume data was produced and is ready to persist.
    SaveResumeData {
        /// Torrent the resume data belongs to.
        info_hash: InfoHash,
        /// Opaque serialized resume payload.
        data: Vec<u8>,
    },
    /// A `save_resume_data` request failed.
    SaveResumeDataFailed {
        /// Torrent the failed request was for.
        handle: TorrentHandle,
        /// What went wrong.
        outcome: ResumeOutcome,
    },
    /// A torrent was paused.
    TorrentPaused {
        /// Torrent that was paused.
        handle: TorrentHandle,
    },
    /// A batch of torrent status updates.
    StateUpdate {
        /// Updated statuses, one per torrent the engine has state for.
        statuses: Vec<TorrentStatus>,
    },
    /// A torrent was removed from the engine.
    TorrentRemoved {
        /// Torrent that was removed.
        handle: TorrentHandle,
    },
    /// Any alert kind this orchestrator has no dedicated handling for.
    Unrecognized(String),
}
