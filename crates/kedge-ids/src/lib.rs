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

//! Identifier and codec primitives shared across the workspace: the 20-byte
//! info-hash type, its hex encoding, resume-filename validation, and the
//! handful of path/time formatting helpers every other crate leans on.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{Local, TimeZone};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Length in bytes of a SHA-1 info-hash.
pub const INFO_HASH_LEN: usize = 20;

/// Length in characters of the hex-encoded form of an info-hash.
pub const INFO_HASH_HEX_LEN: usize = INFO_HASH_LEN * 2;

/// Suffix used for on-disk resume files.
pub const RESUME_EXT: &str = ".resume";

/// Errors raised while decoding an info-hash or validating filenames.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    /// The hex string was not exactly 40 characters long.
    #[error("info-hash hex must be {INFO_HASH_HEX_LEN} characters, got {0}")]
    WrongLength(usize),
    /// The hex string contained a non-hex-digit byte.
    #[error("info-hash hex contains a non-hex character")]
    InvalidDigit,
}

/// 20-byte SHA-1 identifier of a torrent's info dictionary.
///
/// Ordered lexicographically by byte value; that ordering is what
/// [`crate::InfoHash`] consumers rely on when they need a stable sort key for
/// a snapshot (see the registry's projector contract).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InfoHash([u8; INFO_HASH_LEN]);

impl InfoHash {
    /// Wrap a raw 20-byte digest.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; INFO_HASH_LEN]) -> Self {
        Self(bytes)
    }

    /// Borrow the raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; INFO_HASH_LEN] {
        &self.0
    }

    /// Parse a 40-character lowercase (or uppercase) hex string.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] when the string is not 40 hex characters.
    pub fn from_hex(s: &str) -> Result<Self, CodecError> {
        from_hex(s)
    }

    /// Render as a 40-character lowercase hex string.
    #[must_use]
    pub fn to_hex(self) -> String {
        to_hex(&self)
    }
}

impl fmt::Debug for InfoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InfoHash({})", self.to_hex())
    }
}

impl fmt::Display for InfoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Parse a 40-character hex string into an [`InfoHash`].
///
/// Fails unless the string is exactly 40 characters and every byte is an
/// ASCII hex digit.
///
/// # Errors
///
/// Returns [`CodecError::WrongLength`] or [`CodecError::InvalidDigit`].
pub fn from_hex(s: &str) -> Result<InfoHash, CodecError> {
    if s.len() != INFO_HASH_HEX_LEN {
        return Err(CodecError::WrongLength(s.len()));
    }
    let mut bytes = [0_u8; INFO_HASH_LEN];
    hex::decode_to_slice(s, &mut bytes).map_err(|_| CodecError::InvalidDigit)?;
    Ok(InfoHash(bytes))
}

/// Render an [`InfoHash`] as a 40-character lowercase hex string.
#[must_use]
pub fn to_hex(hash: &InfoHash) -> String {
    hex::encode(hash.as_bytes())
}

/// True iff `name` matches `^[0-9a-f]{40}\.resume$`.
#[must_use]
pub fn is_resume_file(name: &str) -> bool {
    let expected_len = INFO_HASH_HEX_LEN + RESUME_EXT.len();
    if name.len() != expected_len {
        return false;
    }
    let (hex_part, ext) = name.split_at(INFO_HASH_HEX_LEN);
    ext == RESUME_EXT && hex_part.bytes().all(|b| b.is_ascii_hexdigit())
}

/// The resume filename (no directory) for a given info-hash: `<40-hex>.resume`.
#[must_use]
pub fn resume_file_name(hash: &InfoHash) -> String {
    format!("{}{RESUME_EXT}", hash.to_hex())
}

/// Join `base` and `rel` using the platform path separator.
#[must_use]
pub fn path_cat(base: impl AsRef<Path>, rel: impl AsRef<Path>) -> PathBuf {
    base.as_ref().join(rel)
}

/// Render epoch seconds as `YYYYMMDD HH:MM` in local time; `"0"` for `t == 0`.
#[must_use]
pub fn pptime(t: i64) -> String {
    if t == 0 {
        return "0".to_string();
    }
    match Local.timestamp_opt(t, 0) {
        chrono::LocalResult::Single(dt) | chrono::LocalResult::Ambiguous(dt, _) => {
            dt.format("%Y%m%d %H:%M").to_string()
        }
        chrono::LocalResult::None => "0".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trips() {
        let hex = "0123456789abcdef0123456789abcdef01234567";
        assert_eq!(hex.len(), INFO_HASH_HEX_LEN);
        let ih = from_hex(hex).unwrap();
        assert_eq!(to_hex(&ih), hex);
    }

    #[test]
    fn hex_rejects_bad_length() {
        assert_eq!(from_hex("abcd"), Err(CodecError::WrongLength(4)));
    }

    #[test]
    fn hex_rejects_bad_digit() {
        let bad = "z123456789abcdef0123456789abcdef0123456";
        assert_eq!(from_hex(bad), Err(CodecError::InvalidDigit));
    }

    #[test]
    fn hex_uppercase_normalizes_to_lowercase() {
        let upper = "0123456789ABCDEF0123456789ABCDEF01234567";
        let ih = from_hex(upper).unwrap();
        assert_eq!(to_hex(&ih), upper.to_lowercase());
    }

    #[test]
    fn resume_file_matches_regex_contract() {
        let hex = "0123456789abcdef0123456789abcdef01234567";
        assert!(is_resume_file(&format!("{hex}.resume")));
        assert!(!is_resume_file(&format!("{hex}.resumeX")));
        assert!(!is_resume_file("tooshort.resume"));
        assert!(!is_resume_file(&format!("{}.resume", "g".repeat(40))));
    }

    #[test]
    fn resume_file_name_matches_hash() {
        let ih = from_hex("0123456789abcdef0123456789abcdef01234567").unwrap();
        assert!(is_resume_file(&resume_file_name(&ih)));
    }

    #[test]
    fn pptime_zero_is_literal_zero() {
        assert_eq!(pptime(0), "0");
    }

    #[test]
    fn pptime_nonzero_has_expected_shape() {
        let rendered = pptime(1_700_000_000);
        assert_eq!(rendered.len(), "YYYYMMDD HH:MM".len());
        assert!(rendered.contains(' '));
    }

    #[test]
    fn path_cat_joins_with_platform_separator() {
        let joined = path_cat("/tmp/conf", ".resume");
        assert!(joined.ends_with(".resume"));
        assert!(joined.starts_with("/tmp/conf"));
    }

    #[test]
    fn info_hash_orders_lexicographically() {
        let a = InfoHash::from_bytes([0; INFO_HASH_LEN]);
        let mut b_bytes = [0; INFO_HASH_LEN];
        b_bytes[0] = 1;
        let b = InfoHash::from_bytes(b_bytes);
        assert!(a < b);
    }
}
