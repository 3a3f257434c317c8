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

//! On-disk persistence for session state, resume data and the conf-dir
//! layout the rest of the workspace assumes exists: `load_file`/`save_file`
//! with a size cap, the `.resume/<hex>.resume` naming convention, and
//! `prepare_dirs` to lay the directory tree down on first run.

use std::io;
use std::path::{Path, PathBuf};

use kedge_ids::{InfoHash, resume_file_name};
use thiserror::Error;
use tracing::debug;

/// Default cap on bytes read by [`load_file`] when no explicit limit is given.
pub const DEFAULT_LOAD_LIMIT: u64 = 8_000_000;

/// Fixed subdirectories created under a conf dir by [`prepare_dirs`].
const SUBDIRS: [&str; 3] = [".resume", "watching", "certificates"];

/// Errors raised by store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The file exceeded the caller-supplied size limit.
    #[error("{path}: {size} bytes exceeds limit of {limit}")]
    TooLarge {
        /// Path that was being read.
        path: PathBuf,
        /// Actual size encountered, in bytes.
        size: u64,
        /// Limit that was exceeded.
        limit: u64,
    },
    /// An I/O error occurred while reading, writing, or creating directories.
    #[error("{path}: {source}")]
    Io {
        /// Path the failing operation was acting on.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// Result alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Read the full contents of `path`, failing if it exceeds `limit` bytes.
///
/// # Errors
///
/// Returns [`StoreError::TooLarge`] if the file's metadata reports a size
/// over `limit`, or [`StoreError::Io`] for any other I/O failure.
pub async fn load_file(path: impl AsRef<Path>, limit: u64) -> Result<Vec<u8>> {
    let path = path.as_ref();
    let meta = tokio::fs::metadata(path)
        .await
        .map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    if meta.len() > limit {
        return Err(StoreError::TooLarge {
            path: path.to_path_buf(),
            size: meta.len(),
            limit,
        });
    }
    tokio::fs::read(path).await.map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Read `path` using [`DEFAULT_LOAD_LIMIT`].
///
/// # Errors
///
/// See [`load_file`].
pub async fn load_file_default(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    load_file(path, DEFAULT_LOAD_LIMIT).await
}

/// Write `bytes` to `path`, replacing any existing contents.
///
/// Writes to a sibling temp file first and renames it over `path`, so a
/// crash mid-write leaves either the old contents or the new ones, never a
/// truncated file. Callers must not write the same path concurrently from
/// more than one task.
///
/// # Errors
///
/// Returns [`StoreError::Io`] if the temp file cannot be written, flushed,
/// or renamed into place.
pub async fn save_file(path: impl AsRef<Path>, bytes: &[u8]) -> Result<()> {
    let path = path.as_ref();
    let tmp_path = sibling_tmp_path(path);
    tokio::fs::write(&tmp_path, bytes)
        .await
        .map_err(|source| StoreError::Io {
            path: tmp_path.clone(),
            source,
        })?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    debug!(path = %path.display(), bytes = bytes.len(), "saved file");
    Ok(())
}

fn sibling_tmp_path(path: &Path) -> PathBuf {
    let file_name = path.file_name().map_or_else(
        || ".kedge-tmp".to_string(),
        |name| format!(".{}.tmp", name.to_string_lossy()),
    );
    path.with_file_name(file_name)
}

/// The resume-file path for `info_hash` under `conf_dir`:
/// `<conf>/.resume/<hex>.resume`.
#[must_use]
pub fn resume_file(conf_dir: impl AsRef<Path>, info_hash: &InfoHash) -> PathBuf {
    conf_dir
        .as_ref()
        .join(".resume")
        .join(resume_file_name(info_hash))
}

/// Create `conf_dir` itself plus its fixed `.resume`, `watching`, and
/// `certificates` subdirectories.
///
/// Returns `Ok(())` if every directory already existed or was created; any
/// other I/O failure is returned as [`StoreError::Io`].
///
/// # Errors
///
/// Returns [`StoreError::Io`] on any failure other than "already exists".
pub async fn prepare_dirs(conf_dir: impl AsRef<Path>) -> Result<()> {
    let conf_dir = conf_dir.as_ref();
    create_dir_tolerant(conf_dir).await?;
    for sub in SUBDIRS {
        create_dir_tolerant(&conf_dir.join(sub)).await?;
    }
    Ok(())
}

async fn create_dir_tolerant(path: &Path) -> Result<()> {
    match tokio::fs::create_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(source) if source.kind() == io::ErrorKind::AlreadyExists => Ok(()),
        Err(source) => Err(StoreError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.bin");
        save_file(&path, b"hello").await.unwrap();
        let loaded = load_file_default(&path).await.unwrap();
        assert_eq!(loaded, b"hello");
    }

    #[tokio::test]
    async fn load_file_rejects_oversize() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.bin");
        save_file(&path, &[0_u8; 16]).await.unwrap();
        let err = load_file(&path, 4).await.unwrap_err();
        assert!(matches!(err, StoreError::TooLarge { size: 16, limit: 4, .. }));
    }

    #[tokio::test]
    async fn save_file_overwrites_existing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.bin");
        save_file(&path, b"first").await.unwrap();
        save_file(&path, b"second!").await.unwrap();
        let loaded = load_file_default(&path).await.unwrap();
        assert_eq!(loaded, b"second!");
    }

    #[tokio::test]
    async fn prepare_dirs_creates_fixed_layout() {
        let dir = tempfile::tempdir().unwrap();
        let conf = dir.path().join("conf");
        prepare_dirs(&conf).await.unwrap();
        for sub in SUBDIRS {
            assert!(conf.join(sub).is_dir());
        }
    }

    #[tokio::test]
    async fn prepare_dirs_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let conf = dir.path().join("conf");
        prepare_dirs(&conf).await.unwrap();
        prepare_dirs(&conf).await.unwrap();
    }

    #[tokio::test]
    async fn resume_file_path_matches_contract() {
        let ih = kedge_ids::from_hex("0123456789abcdef0123456789abcdef01234567").unwrap();
        let path = resume_file(Path::new("/conf"), &ih);
        assert_eq!(
            path,
            Path::new("/conf/.resume/0123456789abcdef0123456789abcdef01234567.resume")
        );
    }
}
