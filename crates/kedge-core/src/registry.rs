//! In-memory torrent registry: the authoritative map from engine handle to
//! the latest status the engine reported.

use std::collections::BTreeMap;

use crate::model::{TorrentHandle, TorrentStatus};

/// Mapping from engine handle to the latest `TorrentStatus` the engine has
/// reported for it.
///
/// Inserted on first `state_update` mentioning the handle, replaced on each
/// subsequent update, erased on `torrent_removed`. Uses a `BTreeMap` keyed
/// by handle so [`TorrentRegistry::snapshot`] can be produced in a stable
/// order cheaply, though callers must still sort by info-hash hex before
/// projecting (see [`crate::projector`]).
#[derive(Debug, Default)]
pub struct TorrentRegistry {
    by_handle: BTreeMap<TorrentHandle, TorrentStatus>,
}

impl TorrentRegistry {
    /// Construct an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert every entry in `updates` by handle.
    pub fn apply_state_update(&mut self, updates: impl IntoIterator<Item = TorrentStatus>) {
        for status in updates {
            let handle = TorrentHandle::from_info_hash(status.info_hash);
            self.by_handle.insert(handle, status);
        }
    }

    /// Erase the entry for `handle`, if present.
    pub fn remove(&mut self, handle: TorrentHandle) {
        self.by_handle.remove(&handle);
    }

    /// Look up a single torrent's status by handle.
    #[must_use]
    pub fn get(&self, handle: TorrentHandle) -> Option<&TorrentStatus> {
        self.by_handle.get(&handle)
    }

    /// All registered statuses. Iteration order is the registry's internal
    /// handle order, not necessarily info-hash order — the projector is
    /// responsible for the hex-ascending sort the differ depends on.
    #[must_use]
    pub fn snapshot(&self) -> Vec<TorrentStatus> {
        self.by_handle.values().cloned().collect()
    }

    /// Number of torrents currently tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_handle.len()
    }

    /// Whether the registry currently tracks no torrents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_handle.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TorrentState;

    fn status(hash_byte: u8, state: TorrentState) -> TorrentStatus {
        let mut bytes = [0_u8; 20];
        bytes[0] = hash_byte;
        TorrentStatus {
            info_hash: kedge_ids::InfoHash::from_bytes(bytes),
            name: None,
            save_path: "/tmp".into(),
            state,
            progress_ppm: 0,
            is_finished: false,
            has_metadata: false,
            added_time: 0,
            completed_time: 0,
            total_done: 0,
            total_wanted: 0,
            download_rate: 0,
            upload_rate: 0,
            num_peers: 0,
            num_seeds: 0,
            total_payload_download: 0,
            max_connections: 25,
        }
    }

    #[test]
    fn apply_then_remove_round_trips() {
        let mut registry = TorrentRegistry::new();
        let s = status(1, TorrentState::Downloading);
        let handle = TorrentHandle::from_info_hash(s.info_hash);
        registry.apply_state_update([s]);
        assert_eq!(registry.len(), 1);
        registry.remove(handle);
        assert!(registry.is_empty());
    }

    #[test]
    fn apply_replaces_existing_entry() {
        let mut registry = TorrentRegistry::new();
        let mut s = status(2, TorrentState::Downloading);
        registry.apply_state_update([s.clone()]);
        s.state = TorrentState::Seeding;
        s.progress_ppm = 1_000_000;
        registry.apply_state_update([s.clone()]);
        assert_eq!(registry.len(), 1);
        let handle = TorrentHandle::from_info_hash(s.info_hash);
        assert_eq!(registry.get(handle).unwrap().state, TorrentState::Seeding);
    }

    #[test]
    fn remove_unknown_handle_is_a_no_op() {
        let mut registry = TorrentRegistry::new();
        let bytes = [9_u8; 20];
        registry.remove(TorrentHandle::from_info_hash(kedge_ids::InfoHash::from_bytes(bytes)));
        assert!(registry.is_empty());
    }
}
