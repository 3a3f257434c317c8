//! Startup errors: every way bootstrap can fail before the HTTP listener is
//! up, collected into one enum so `main` can print a message and exit
//! non-zero instead of panicking.

use thiserror::Error;

/// Result alias for bootstrap operations.
pub type AppResult<T> = Result<T, AppError>;

/// Everything that can go wrong wiring the process together.
#[derive(Debug, Error)]
pub enum AppError {
    /// CLI/conf-dir resolution failed.
    #[error("configuration resolution failed")]
    Config(#[from] kedge_config::ConfigError),
    /// The tracing subscriber could not be installed.
    #[error("logging initialization failed")]
    Logging(#[from] kedge_telemetry::TelemetryError),
    /// `--listens` resolved to port 0.
    #[error("listen address {addr} has a zero port")]
    ZeroPort {
        /// The offending listen address.
        addr: String,
    },
    /// The HTTP/WS listener failed to bind or serve.
    #[error("http server failed: {0}")]
    Serve(#[source] anyhow::Error),
}
