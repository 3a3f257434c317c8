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

//! HTTP/WebSocket surface: a thin axum router binding the REST and
//! push-sync endpoints onto `kedge-core`'s public functions and the
//! `TorrentEngine` collaborator. Carries no business logic of its own —
//! handlers translate requests into core calls and core errors into HTTP
//! status codes.

mod error;
mod http;
pub mod snapshot;
mod state;
mod test_support;

pub use error::ApiError;
pub use http::router::ApiServer;
pub use state::{AppState, SessionIdentity};
