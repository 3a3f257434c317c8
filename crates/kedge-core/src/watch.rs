//! Watch-directory scanner: polls a drop directory for `.torrent` files on
//! a fixed interval and hands each one to the engine. Plain directory
//! reads, not an OS file-change-notification subscription — the interval
//! is the entire contract.

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::engine::TorrentEngine;

/// Interval between successive directory scans.
pub const SCAN_INTERVAL: std::time::Duration = std::time::Duration::from_secs(2);

/// Polls `watch_dir` for `.torrent` files and advances `next_scan_at` by
/// [`SCAN_INTERVAL`] after each scan.
#[derive(Debug)]
pub struct WatchScanner {
    watch_dir: PathBuf,
    next_scan_at: std::time::Instant,
}

impl WatchScanner {
    /// Construct a scanner whose first scan happens immediately.
    #[must_use]
    pub fn new(watch_dir: impl Into<PathBuf>) -> Self {
        Self {
            watch_dir: watch_dir.into(),
            next_scan_at: std::time::Instant::now(),
        }
    }

    /// If due, enumerate the watch directory and attempt to add every
    /// `.torrent` file found; successfully added files are deleted, failed
    /// ones are left in place for the next scan.
    pub async fn tick(&mut self, engine: &dyn TorrentEngine, save_path: &str) {
        let now = std::time::Instant::now();
        if now < self.next_scan_at {
            return;
        }
        self.next_scan_at = now + SCAN_INTERVAL;

        let mut entries = match tokio::fs::read_dir(&self.watch_dir).await {
            Ok(entries) => entries,
            Err(err) => {
                warn!(dir = %self.watch_dir.display(), %err, "failed to read watch directory");
                return;
            }
        };

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(err) => {
                    warn!(%err, "failed to read watch directory entry");
                    break;
                }
            };
            let path = entry.path();
            if !is_torrent_file(&path) {
                continue;
            }
            self.try_add(engine, &path, save_path).await;
        }
    }

    async fn try_add(&self, engine: &dyn TorrentEngine, path: &Path, save_path: &str) {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(path = %path.display(), %err, "failed to read dropped torrent file");
                return;
            }
        };
        match engine.add_torrent_file(&bytes, save_path).await {
            Ok(_) => {
                if let Err(err) = tokio::fs::remove_file(path).await {
                    warn!(path = %path.display(), %err, "failed to remove ingested torrent file");
                }
            }
            Err(err) => {
                warn!(path = %path.display(), %err, "failed to add dropped torrent file");
            }
        }
    }
}

fn is_torrent_file(path: &Path) -> bool {
    path.extension().and_then(std::ffi::OsStr::to_str) == Some("torrent")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_torrent_file_matches_extension_only() {
        assert!(is_torrent_file(Path::new("ubuntu.torrent")));
        assert!(!is_torrent_file(Path::new("ubuntu.torrent.part")));
        assert!(!is_torrent_file(Path::new("readme.txt")));
    }

    #[test]
    fn new_scanner_is_due_immediately() {
        let scanner = WatchScanner::new("/tmp/watch");
        assert!(std::time::Instant::now() >= scanner.next_scan_at);
    }
}
