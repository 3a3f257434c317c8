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

//! Engine-agnostic orchestration core: the counter window, torrent
//! registry, resume coordinator, alert dispatcher, watch-directory
//! scanner, snapshot projector, JSON-Patch differ and subscriber hub that
//! together turn an engine collaborator's alert stream into the broadcast
//! state this workspace's HTTP/WS layer serves.

pub mod alert;
pub mod counter;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod hub;
pub mod json_diff;
pub mod model;
pub mod projector;
pub mod registry;
pub mod resume;
pub mod watch;

pub use alert::Alert;
pub use counter::CounterWindow;
pub use dispatcher::AlertDispatcher;
pub use engine::TorrentEngine;
pub use error::{CoreError, CoreResult};
pub use hub::{BroadcastFrame, JoinFrame, SubscriberHub};
pub use json_diff::json_diff;
pub use model::{DhtStats, EngineSettingsView, SessionStats, TorrentHandle, TorrentState, TorrentStatus};
pub use registry::TorrentRegistry;
pub use resume::ResumeCoordinator;
pub use watch::WatchScanner;
