//! Projects the engine's in-memory state into the sparse JSON shape
//! broadcast to subscribers. Numeric/boolean fields that are zero or false
//! are omitted rather than emitted as `0`/`false`, because [`crate::json_diff`]
//! treats an omitted key as *absent*, not as a zero value — including a
//! field unconditionally would make every "field went back to zero" update
//! look identical to "field was never present", breaking the delta stream.

use kedge_ids::pptime;
use serde_json::{Map, Value, json};

use crate::model::{EngineSettingsView, SessionStats, TorrentState, TorrentStatus};

/// Stable, rarely-changing session identity fields.
#[derive(Debug, Clone)]
pub struct SessionInfo {
    /// Peer-id prefix advertised to peers.
    pub peer_id: String,
    /// Port the engine is listening on.
    pub peer_port: u16,
    /// Listen interfaces configured at startup.
    pub listen_interfaces: String,
    /// Seconds since the engine session started.
    pub uptime_secs: u64,
    /// Milliseconds since the engine session started.
    pub uptime_ms: u64,
    /// Conf-dir path session state is stored under.
    pub stored: String,
    /// Build/version identifier.
    pub version: String,
}

/// Render [`SessionInfo`] into its stable wire object.
#[must_use]
pub fn session_info(info: &SessionInfo) -> Value {
    json!({
        "peerID": info.peer_id,
        "peerPort": info.peer_port,
        "listenInterfaces": info.listen_interfaces,
        "uptime": info.uptime_secs,
        "uptimeMs": info.uptime_ms,
        "stored": info.stored,
        "version": info.version,
    })
}

/// Render [`SessionStats`] into its sparse wire object; non-positive
/// numeric fields are omitted except `rates` and `taskCount`, which are
/// always present. Field names, including the preserved `puasedCount`
/// misspelling, follow the underlying library's `session_stats` object
/// verbatim so clients coded against it keep working unmodified.
#[must_use]
pub fn session_stats_obj(stats: &SessionStats) -> Value {
    let mut obj = Map::new();
    obj.insert("rates".to_string(), json!(stats.rate_recv + stats.rate_sent));

    insert_if_positive(&mut obj, "bytesRecv", stats.bytes_recv);
    insert_if_positive(&mut obj, "bytesSent", stats.bytes_sent);
    insert_if_positive(&mut obj, "rateRecv", stats.rate_recv);
    insert_if_positive(&mut obj, "rateSent", stats.rate_sent);
    insert_if_positive(&mut obj, "numChecking", u64::from(stats.num_checking));
    insert_if_positive(&mut obj, "numDownloading", u64::from(stats.num_downloading));
    insert_if_positive(&mut obj, "numSeeding", u64::from(stats.num_seeding));
    insert_if_positive(&mut obj, "numStopped", u64::from(stats.num_stopped));
    insert_if_positive(&mut obj, "numQueued", u64::from(stats.num_queued));
    insert_if_positive(&mut obj, "numError", u64::from(stats.num_error));
    insert_if_true(&mut obj, "isPaused", stats.is_paused);

    let active_count = stats.num_checking + stats.num_downloading + stats.num_seeding;
    let puased_count = stats.num_queued + stats.num_stopped;
    insert_if_positive(&mut obj, "activeCount", u64::from(active_count));
    insert_if_positive(&mut obj, "puasedCount", u64::from(puased_count));
    obj.insert("taskCount".to_string(), json!(active_count + puased_count));

    insert_if_positive(&mut obj, "uptime", stats.uptime_secs);
    insert_if_positive(&mut obj, "uptimeMs", stats.uptime_ms);
    Value::Object(obj)
}

/// Render a single [`TorrentStatus`] into its wire object: a mandatory core
/// subset always present, plus sparse fields omitted when zero/false.
#[must_use]
pub fn torrent_status_to_obj(status: &TorrentStatus) -> Value {
    let mut obj = Map::new();
    obj.insert("info_hash".to_string(), json!(status.info_hash.to_hex()));
    obj.insert("name".to_string(), json!(status.name));
    obj.insert("save_path".to_string(), json!(status.save_path));
    obj.insert("state".to_string(), json!(state_label(status.state)));
    obj.insert("added_time".to_string(), json!(status.added_time));
    obj.insert("is_finished".to_string(), json!(status.is_finished));
    obj.insert("progress".to_string(), json!(f64::from(status.progress_ppm) / 1_000_000.0));
    obj.insert("progress_ppm".to_string(), json!(status.progress_ppm));
    obj.insert(
        "rates".to_string(),
        json!({"download": status.download_rate, "upload": status.upload_rate}),
    );
    obj.insert("total_done".to_string(), json!(status.total_done));
    obj.insert("total_wanted".to_string(), json!(status.total_wanted));
    obj.insert("current_tracker".to_string(), json!(""));
    obj.insert("next_announce".to_string(), json!(0));
    obj.insert("active_duration".to_string(), json!(0));

    insert_if_positive(&mut obj, "completed_time", u64::try_from(status.completed_time).unwrap_or(0));
    insert_if_positive(&mut obj, "download_rate", status.download_rate);
    insert_if_positive(&mut obj, "upload_rate", status.upload_rate);
    insert_if_positive(&mut obj, "total_payload_download", status.total_payload_download);
    insert_if_positive(&mut obj, "num_seeds", u64::from(status.num_seeds));
    insert_if_positive(&mut obj, "num_peers", u64::from(status.num_peers));
    insert_if_positive(&mut obj, "num_connections", u64::from(status.max_connections));
    insert_if_true(&mut obj, "has_metadata", status.has_metadata);
    insert_if_true(&mut obj, "is_seeding", matches!(status.state, TorrentState::Seeding));
    insert_if_true(&mut obj, "moving_storage", false);

    Value::Object(obj)
}

const fn state_label(state: TorrentState) -> &'static str {
    match state {
        TorrentState::QueuedForChecking => "queued_for_checking",
        TorrentState::CheckingFiles => "checking_files",
        TorrentState::DownloadingMetadata => "downloading_metadata",
        TorrentState::Downloading => "downloading",
        TorrentState::Finished => "finished",
        TorrentState::Seeding => "seeding",
        TorrentState::Allocating => "allocating",
        TorrentState::CheckingResumeData => "checking_resume_data",
        TorrentState::Paused => "paused",
        TorrentState::Error => "error",
    }
}

fn insert_if_positive(obj: &mut Map<String, Value>, key: &str, value: u64) {
    if value > 0 {
        obj.insert(key.to_string(), json!(value));
    }
}

fn insert_if_true(obj: &mut Map<String, Value>, key: &str, value: bool) {
    if value {
        obj.insert(key.to_string(), json!(value));
    }
}

/// Combined aggregate-plus-per-torrent snapshot, sorted by info-hash hex
/// ascending so successive snapshots are diff-comparable (see
/// [`crate::registry::TorrentRegistry::snapshot`]).
#[must_use]
pub fn sync_stats(stats: &SessionStats, mut torrents: Vec<TorrentStatus>) -> Value {
    torrents.sort_by(|a, b| a.info_hash.to_hex().cmp(&b.info_hash.to_hex()));
    json!({
        "stats": session_stats_obj(stats),
        "torrents": torrents.iter().map(torrent_status_to_obj).collect::<Vec<_>>(),
    })
}

/// Render [`EngineSettingsView`] for diagnostics endpoints.
#[must_use]
pub fn settings_obj(settings: &EngineSettingsView) -> Value {
    json!({
        "peer_id_prefix": settings.peer_id_prefix,
        "dht_bootstrap_nodes": settings.dht_bootstrap_nodes,
        "default_max_connections": settings.default_max_connections,
    })
}

/// Render an epoch-seconds timestamp the way session diagnostics want it
/// displayed, reusing the shared `pptime` formatter.
#[must_use]
pub fn display_time(epoch_secs: i64) -> String {
    pptime(epoch_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kedge_ids::InfoHash;

    fn sample_status() -> TorrentStatus {
        TorrentStatus {
            info_hash: InfoHash::from_bytes([1; 20]),
            name: Some("ubuntu.iso".into()),
            save_path: "/tmp".into(),
            state: TorrentState::Downloading,
            progress_ppm: 500_000,
            is_finished: false,
            has_metadata: true,
            added_time: 100,
            completed_time: 0,
            total_done: 512,
            total_wanted: 1024,
            download_rate: 100,
            upload_rate: 0,
            num_peers: 3,
            num_seeds: 0,
            total_payload_download: 512,
            max_connections: 25,
        }
    }

    #[test]
    fn zero_fields_are_omitted_from_torrent_obj() {
        let obj = torrent_status_to_obj(&sample_status());
        let map = obj.as_object().unwrap();
        assert!(!map.contains_key("completed_time"));
        assert!(!map.contains_key("upload_rate"));
        assert!(!map.contains_key("num_seeds"));
        assert!(map.contains_key("download_rate"));
        assert!(map.contains_key("has_metadata"));
    }

    #[test]
    fn mandatory_keys_always_present() {
        let obj = torrent_status_to_obj(&sample_status());
        let map = obj.as_object().unwrap();
        for key in [
            "info_hash",
            "name",
            "save_path",
            "state",
            "added_time",
            "is_finished",
            "progress",
            "progress_ppm",
            "rates",
            "total_done",
            "total_wanted",
        ] {
            assert!(map.contains_key(key), "missing mandatory key {key}");
        }
    }

    #[test]
    fn task_count_and_rates_always_present_even_when_zero() {
        let obj = session_stats_obj(&SessionStats::default());
        assert_eq!(obj["taskCount"], json!(0));
        assert_eq!(obj["rates"], json!(0));
        assert!(obj.as_object().unwrap().get("activeCount").is_none());
    }

    #[test]
    fn puased_count_key_preserves_the_upstream_misspelling() {
        let stats = SessionStats { num_queued: 2, ..SessionStats::default() };
        let obj = session_stats_obj(&stats);
        assert_eq!(obj["puasedCount"], json!(2));
        assert!(obj.as_object().unwrap().get("pausedCount").is_none());
    }

    #[test]
    fn sync_stats_sorts_torrents_by_info_hash_hex() {
        let mut a = sample_status();
        a.info_hash = InfoHash::from_bytes([2; 20]);
        let mut b = sample_status();
        b.info_hash = InfoHash::from_bytes([1; 20]);
        let obj = sync_stats(&SessionStats::default(), vec![a, b]);
        let torrents = obj["torrents"].as_array().unwrap();
        let first_hash = torrents[0]["info_hash"].as_str().unwrap();
        let second_hash = torrents[1]["info_hash"].as_str().unwrap();
        assert!(first_hash < second_hash);
    }
}
