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

//! Binary entrypoint that wires the orchestrator together and launches the
//! HTTP/WS control surface.

/// Startup error type.
pub mod error;
/// Background tick loops.
pub mod orchestrator;
/// `.ses_state` persistence.
pub mod state_file;

/// Dependency construction and the boot sequence.
pub mod bootstrap;

/// Bootstraps the application and blocks until shutdown.
#[tokio::main]
async fn main() -> error::AppResult<()> {
    bootstrap::run().await
}
