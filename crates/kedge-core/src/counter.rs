//! Two-sample counter window used to derive session throughput rates
//! without ever dividing by a near-zero time delta.

use tracing::warn;

use crate::model::SessionStats;

/// Minimum elapsed time, in microseconds, before `previous` is advanced.
/// Keeping the denominator at least 2 seconds wide keeps rates stable.
pub const MIN_SAMPLE_GAP_US: u64 = 2_000_000;

#[derive(Debug, Clone, Default)]
struct Sample {
    t_us: u64,
    values: Vec<i64>,
}

/// Tracks a rolling pair of `(timestamp, counters)` samples and derives
/// byte-rate statistics from them.
///
/// Metric positions are resolved once at construction from the names the
/// engine reports alongside its counter vector, mirroring the underlying
/// library's `find_metric_idx` lookup, so later samples are indexed by
/// position rather than by re-resolving names on every update.
#[derive(Debug)]
pub struct CounterWindow {
    download_idx: Option<usize>,
    upload_idx: Option<usize>,
    current: Sample,
    previous: Sample,
    started_at_us: u64,
}

impl CounterWindow {
    /// Resolve metric indices from the engine's counter-name schema.
    ///
    /// `started_at_us` is the orchestrator's process-start timestamp, used
    /// to compute `uptime_secs`.
    #[must_use]
    pub fn new(counter_names: &[&str], started_at_us: u64) -> Self {
        let index_of = |name: &str| counter_names.iter().position(|n| *n == name);
        Self {
            download_idx: index_of("net.recv_bytes"),
            upload_idx: index_of("net.sent_bytes"),
            current: Sample::default(),
            previous: Sample::default(),
            started_at_us,
        }
    }

    /// Advance the window with a new sample taken at `t_us`.
    ///
    /// `previous` only moves forward once `current` is at least
    /// [`MIN_SAMPLE_GAP_US`] old, guaranteeing a stable rate denominator.
    pub fn update(&mut self, sample: &[i64], t_us: u64) {
        if t_us.saturating_sub(self.previous.t_us) > MIN_SAMPLE_GAP_US {
            self.previous = std::mem::take(&mut self.current);
        }
        self.current = Sample {
            t_us,
            values: sample.to_vec(),
        };
    }

    /// Derive aggregate byte counters, rates, and uptime from the current
    /// two-sample window.
    ///
    /// Torrent-count buckets (`num_checking`, `num_downloading`, …) are not
    /// populated here — they come from the registry snapshot and are merged
    /// in by the orchestrator — so every count field is left at zero.
    #[must_use]
    pub fn session_stats(&self) -> SessionStats {
        let max_idx = [self.download_idx, self.upload_idx]
            .into_iter()
            .flatten()
            .max();
        let Some(max_idx) = max_idx else {
            warn!("counter window has no resolved metric indices");
            return SessionStats::default();
        };
        if self.current.values.len() <= max_idx {
            warn!(
                have = self.current.values.len(),
                need = max_idx + 1,
                "counter sample shorter than resolved metric indices"
            );
            return SessionStats::default();
        }

        let bytes_recv = u64::try_from(self.download_idx.map_or(0, |i| self.current.values[i]).max(0)).unwrap_or(0);
        let bytes_sent = u64::try_from(self.upload_idx.map_or(0, |i| self.current.values[i]).max(0)).unwrap_or(0);

        let (rate_recv, rate_sent) = if self.previous.values.len() > max_idx {
            let elapsed_us = self.current.t_us.saturating_sub(self.previous.t_us).max(1);
            #[allow(clippy::cast_precision_loss)]
            let elapsed_secs = elapsed_us as f64 / 1_000_000.0;
            let rate_of = |idx: Option<usize>| -> u64 {
                idx.map_or(0, |i| {
                    let delta = (self.current.values[i] - self.previous.values[i]).max(0);
                    #[allow(clippy::cast_precision_loss)]
                    let delta = delta as f64;
                    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
                    let rate = (delta / elapsed_secs) as u64;
                    rate
                })
            };
            (rate_of(self.download_idx), rate_of(self.upload_idx))
        } else {
            (0, 0)
        };

        let elapsed_since_start_us = self.current.t_us.saturating_sub(self.started_at_us);
        let uptime_secs = elapsed_since_start_us / 1_000_000;
        let uptime_ms = elapsed_since_start_us / 1_000;

        SessionStats {
            bytes_recv,
            bytes_sent,
            rate_recv,
            rate_sent,
            uptime_secs,
            uptime_ms,
            ..SessionStats::default()
        }
    }
}

/// Per-state torrent counts, merged into a [`SessionStats`] by the
/// orchestrator after [`CounterWindow::session_stats`] supplies the byte
/// counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct TorrentStateCounts {
    /// See [`SessionStats::num_checking`].
    pub num_checking: u32,
    /// See [`SessionStats::num_downloading`].
    pub num_downloading: u32,
    /// See [`SessionStats::num_seeding`].
    pub num_seeding: u32,
    /// See [`SessionStats::num_stopped`].
    pub num_stopped: u32,
    /// See [`SessionStats::num_queued`].
    pub num_queued: u32,
    /// See [`SessionStats::num_error`].
    pub num_error: u32,
}

impl TorrentStateCounts {
    /// Apply these counts onto an existing [`SessionStats`] value.
    #[must_use]
    pub const fn apply(self, mut stats: SessionStats) -> SessionStats {
        stats.num_checking = self.num_checking;
        stats.num_downloading = self.num_downloading;
        stats.num_seeding = self.num_seeding;
        stats.num_stopped = self.num_stopped;
        stats.num_queued = self.num_queued;
        stats.num_error = self.num_error;
        stats
    }
}

/// Tally [`crate::model::TorrentState`] values into [`TorrentStateCounts`].
#[must_use]
pub fn tally_states(states: impl IntoIterator<Item = crate::model::TorrentState>) -> TorrentStateCounts {
    use crate::model::TorrentState::{
        Allocating, CheckingFiles, CheckingResumeData, Downloading, DownloadingMetadata, Error,
        Finished, Paused, QueuedForChecking, Seeding,
    };
    let mut counts = TorrentStateCounts::default();
    for state in states {
        match state {
            CheckingFiles | CheckingResumeData => counts.num_checking += 1,
            DownloadingMetadata | Downloading | Allocating => counts.num_downloading += 1,
            Finished | Seeding => counts.num_seeding += 1,
            Paused => counts.num_stopped += 1,
            QueuedForChecking => counts.num_queued += 1,
            Error => counts.num_error += 1,
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAMES: [&str; 2] = ["net.recv_bytes", "net.sent_bytes"];

    #[test]
    fn zero_values_when_no_previous_sample() {
        let mut window = CounterWindow::new(&NAMES, 0);
        window.update(&[100, 50], 1_000_000);
        let stats = window.session_stats();
        assert_eq!(stats.bytes_recv, 100);
        assert_eq!(stats.rate_recv, 0);
    }

    #[test]
    fn rate_computed_once_previous_sample_exists() {
        let mut window = CounterWindow::new(&NAMES, 0);
        window.update(&[0, 0], 0);
        window.update(&[0, 0], 3_000_000);
        window.update(&[2_000_000, 1_000_000], 3_000_001);
        let stats = window.session_stats();
        assert!(stats.rate_recv > 0);
    }

    #[test]
    fn short_sample_returns_zero_stats_without_panicking() {
        let mut window = CounterWindow::new(&NAMES, 0);
        window.update(&[1], 1_000_000);
        let stats = window.session_stats();
        assert_eq!(stats, SessionStats::default());
    }

    #[test]
    fn previous_only_advances_after_gap() {
        let mut window = CounterWindow::new(&NAMES, 0);
        window.update(&[10, 10], 0);
        window.update(&[20, 20], 1_000_000);
        assert_eq!(window.previous.values.len(), 0);
        window.update(&[30, 30], 2_500_000);
        assert_eq!(window.previous.values, vec![20, 20]);
    }

    #[test]
    fn tally_states_buckets_match_session_stats_fields() {
        use crate::model::TorrentState;
        let counts = tally_states([
            TorrentState::Downloading,
            TorrentState::Seeding,
            TorrentState::Seeding,
            TorrentState::Paused,
        ]);
        assert_eq!(counts.num_downloading, 1);
        assert_eq!(counts.num_seeding, 2);
        assert_eq!(counts.num_stopped, 1);
    }
}
