//! Error types for the core orchestration services.

use thiserror::Error;

use kedge_ids::InfoHash;

/// Primary error type for core orchestration operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No torrent is registered under the given info-hash.
    #[error("no torrent registered for {info_hash}")]
    NotFound {
        /// Info-hash that was looked up.
        info_hash: InfoHash,
    },
    /// Persisting or loading resume data failed.
    #[error("resume data I/O failed for {info_hash}: {source}")]
    ResumeIo {
        /// Torrent the resume I/O was for.
        info_hash: InfoHash,
        /// Underlying store error.
        #[source]
        source: kedge_store::StoreError,
    },
    /// An engine-level operation (add, move, pause) failed.
    #[error("engine operation {operation} failed: {message}")]
    Engine {
        /// Name of the operation that failed.
        operation: &'static str,
        /// Human-readable failure detail.
        message: String,
    },
}

/// Convenience alias for core operation results.
pub type CoreResult<T> = Result<T, CoreError>;
