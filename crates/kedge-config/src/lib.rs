#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::multiple_crate_versions)]

//! CLI and conf-dir configuration: flag parsing (with environment variable
//! aliases matching the upstream daemon's `-l`/`-d`/peer-id/bootstrap knobs),
//! the app's conf-dir discovery, and directory preparation on first run.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use thiserror::Error;

/// Application name used for the XDG/Application-Support conf dir lookup.
pub const APP_NAME: &str = "kedge";

/// Default listen address when `--listens` is not given.
pub const DEFAULT_LISTEN: &str = "0.0.0.0:6881";

/// Default peer-id prefix when `--peer-id` is not given.
pub const DEFAULT_PEER_ID_PREFIX: &str = "-LT-";

/// Default DHT bootstrap node when `--dht-bootstrap-nodes` is not given.
pub const DEFAULT_DHT_BOOTSTRAP: &str = "dht.transmissionbt.com:6881";

/// Errors raised while resolving startup configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// `--listens` did not parse as a socket address.
    #[error("invalid --listens value {value:?}: {source}")]
    InvalidListen {
        /// The raw string that failed to parse.
        value: String,
        /// Underlying parse error.
        #[source]
        source: std::net::AddrParseError,
    },
    /// The platform conf dir could not be determined (no `$HOME`/no known
    /// platform config base).
    #[error("could not determine a config directory for {APP_NAME}")]
    NoConfDir,
    /// Preparing the conf-dir layout on disk failed.
    #[error("failed to prepare conf dir {path}: {source}")]
    PrepareDirs {
        /// Conf dir path that failed to prepare.
        path: PathBuf,
        /// Underlying store error.
        #[source]
        source: kedge_store::StoreError,
    },
}

/// Result alias for configuration resolution.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Command-line flags, with environment variable aliases per the upstream
/// daemon's conventions.
#[derive(Debug, Parser, Clone)]
#[command(name = APP_NAME, about = "Headless BitTorrent session orchestrator")]
pub struct Cli {
    /// Address to listen for the HTTP/WS control surface on.
    #[arg(short = 'l', long = "listens", default_value = DEFAULT_LISTEN)]
    pub listens: String,

    /// Root directory new torrents are downloaded into.
    #[arg(short = 'd', long = "store-root", env = "KEDGE_STORE_ROOT")]
    pub store_root: Option<PathBuf>,

    /// Directory completed torrents are moved into.
    #[arg(long = "moved-root", env = "KEDGE_MOVED_ROOT")]
    pub moved_root: Option<PathBuf>,

    /// Directory to serve the web UI's static assets from.
    #[arg(long = "webui-root", env = "KEDGE_WEB_UI")]
    pub webui_root: Option<PathBuf>,

    /// 4-character peer-id prefix advertised to peers.
    #[arg(long = "peer-id", env = "LT_PEERID_PREFIX", default_value = DEFAULT_PEER_ID_PREFIX)]
    pub peer_id: String,

    /// Comma-separated `host:port` list of DHT bootstrap nodes.
    #[arg(
        long = "dht-bootstrap-nodes",
        env = "DHT_BOOTSTRAP_NODES",
        default_value = DEFAULT_DHT_BOOTSTRAP
    )]
    pub dht_bootstrap_nodes: String,

    /// Log level filter used when `RUST_LOG` is not set.
    #[arg(long = "log-level", default_value = kedge_telemetry_default_log_level())]
    pub log_level: String,
}

const fn kedge_telemetry_default_log_level() -> &'static str {
    "info"
}

impl Cli {
    /// Parse `--dht-bootstrap-nodes` into individual `host:port` entries.
    #[must_use]
    pub fn dht_bootstrap_node_list(&self) -> Vec<String> {
        self.dht_bootstrap_nodes
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string)
            .collect()
    }

    /// Parse `--listens` into a [`SocketAddr`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidListen`] if the value does not parse.
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listens
            .parse()
            .map_err(|source| ConfigError::InvalidListen {
                value: self.listens.clone(),
                source,
            })
    }
}

/// Resolve the platform-specific conf dir for this app: `~/.config/kedge` on
/// Linux, `~/Library/Application Support/kedge` on macOS.
///
/// # Errors
///
/// Returns [`ConfigError::NoConfDir`] if no home/config base can be found.
pub fn conf_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|base| base.join(APP_NAME))
        .ok_or(ConfigError::NoConfDir)
}

/// Resolve the default `--store-root` (`~/Downloads`) when none was given on
/// the CLI or via `KEDGE_STORE_ROOT`.
#[must_use]
pub fn default_store_root() -> Option<PathBuf> {
    dirs::download_dir()
}

/// Fully-resolved startup configuration: CLI flags plus derived paths.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Parsed CLI flags.
    pub cli: Cli,
    /// Resolved conf dir (`.ses_state`, `.resume/`, `watching/`,
    /// `certificates/` live beneath it).
    pub conf_dir: PathBuf,
    /// Resolved store root for new downloads.
    pub store_root: PathBuf,
}

impl EngineConfig {
    /// Resolve CLI flags, conf dir, and store root, then ensure the on-disk
    /// layout exists.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the conf dir cannot be determined or its
    /// directory layout cannot be created.
    pub async fn resolve(cli: Cli) -> Result<Self> {
        let conf_dir = conf_dir()?;
        kedge_store::prepare_dirs(&conf_dir)
            .await
            .map_err(|source| ConfigError::PrepareDirs {
                path: conf_dir.clone(),
                source,
            })?;
        let store_root = cli
            .store_root
            .clone()
            .or_else(default_store_root)
            .unwrap_or_else(|| conf_dir.clone());
        Ok(Self {
            cli,
            conf_dir,
            store_root,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_contract() {
        let cli = Cli::parse_from(["kedge"]);
        assert_eq!(cli.listens, DEFAULT_LISTEN);
        assert_eq!(cli.peer_id, DEFAULT_PEER_ID_PREFIX);
        assert_eq!(cli.dht_bootstrap_nodes, DEFAULT_DHT_BOOTSTRAP);
        assert!(cli.store_root.is_none());
    }

    #[test]
    fn listen_addr_parses_valid_socket() {
        let cli = Cli::parse_from(["kedge", "-l", "127.0.0.1:6881"]);
        assert_eq!(
            cli.listen_addr().unwrap(),
            "127.0.0.1:6881".parse::<SocketAddr>().unwrap()
        );
    }

    #[test]
    fn listen_addr_rejects_garbage() {
        let cli = Cli::parse_from(["kedge", "-l", "not-an-address"]);
        assert!(cli.listen_addr().is_err());
    }

    #[test]
    fn bootstrap_node_list_splits_and_trims() {
        let cli = Cli::parse_from([
            "kedge",
            "--dht-bootstrap-nodes",
            "a.example:6881, b.example:6882 ,,",
        ]);
        assert_eq!(
            cli.dht_bootstrap_node_list(),
            vec!["a.example:6881".to_string(), "b.example:6882".to_string()]
        );
    }

    #[tokio::test]
    async fn prepare_dirs_layout_matches_conf_dir_contract() {
        let dir = tempfile::tempdir().unwrap();
        let conf = dir.path().join("kedge");
        kedge_store::prepare_dirs(&conf).await.unwrap();
        assert!(conf.join(".resume").is_dir());
        assert!(conf.join("watching").is_dir());
        assert!(conf.join("certificates").is_dir());
    }
}
