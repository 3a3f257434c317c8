//! `.ses_state`: the single bencoded file carrying whole-session state
//! across restarts (currently just the pause flag). Uses the same
//! bencode/`kedge-store` pairing `kedge-engine` uses for per-torrent
//! `.resume` files, so the two on-disk formats read the same way.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

const SES_STATE_FILE: &str = ".ses_state";

/// Whole-session state persisted across restarts.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SessionState {
    /// Whether the session was paused at last shutdown.
    pub paused: bool,
}

fn path(conf_dir: &Path) -> PathBuf {
    conf_dir.join(SES_STATE_FILE)
}

/// Load `.ses_state` from `conf_dir`. A missing or unreadable file is not
/// fatal: startup proceeds with the default (unpaused) state and a warning
/// is logged.
pub async fn load(conf_dir: &Path) -> SessionState {
    let file = path(conf_dir);
    if !file.exists() {
        return SessionState::default();
    }
    match kedge_store::load_file_default(&file).await {
        Ok(bytes) => match serde_bencode::from_bytes(&bytes) {
            Ok(state) => state,
            Err(err) => {
                warn!(path = %file.display(), %err, "failed to decode .ses_state, starting unpaused");
                SessionState::default()
            }
        },
        Err(err) => {
            warn!(path = %file.display(), %err, "failed to read .ses_state, starting unpaused");
            SessionState::default()
        }
    }
}

/// Persist `state` to `conf_dir`'s `.ses_state`, logged-but-non-fatal on
/// failure: a write failure at shutdown must not prevent the process from
/// exiting cleanly.
pub async fn save(conf_dir: &Path, state: &SessionState) {
    let file = path(conf_dir);
    let bytes = match serde_bencode::to_bytes(state) {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(path = %file.display(), %err, "failed to encode .ses_state");
            return;
        }
    };
    if let Err(err) = kedge_store::save_file(&file, &bytes).await {
        warn!(path = %file.display(), %err, "failed to persist .ses_state");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_loads_default_state() {
        let dir = tempfile::tempdir().unwrap();
        let state = load(dir.path()).await;
        assert!(!state.paused);
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        save(dir.path(), &SessionState { paused: true }).await;
        let state = load(dir.path()).await;
        assert!(state.paused);
    }
}
