//! Digest kinds and the per-file digest set.
//!
//! ROM databases identify files by CRC32, MD5 and SHA1. The three kinds form a
//! closed set, so they are modelled as an enum with a fixed lookup priority
//! rather than as trait objects.

mod stream;

pub use stream::{digest_file, digest_reader, READ_BUFFER_SIZE};

use crate::error::{Error, Result};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestKind {
    Crc32,
    Md5,
    Sha1,
}

impl DigestKind {
    /// Lookup order used by the matcher, strongest identifier first.
    pub const BY_PRIORITY: [DigestKind; 3] = [DigestKind::Sha1, DigestKind::Md5, DigestKind::Crc32];

    pub fn name(&self) -> &'static str {
        match self {
            DigestKind::Crc32 => "CRC32",
            DigestKind::Md5 => "MD5",
            DigestKind::Sha1 => "SHA1",
        }
    }

    /// Number of hex characters in a digest of this kind.
    pub fn hex_len(&self) -> usize {
        match self {
            DigestKind::Crc32 => 8,
            DigestKind::Md5 => 32,
            DigestKind::Sha1 => 40,
        }
    }

    /// Normalise a digest string as found in a database: trimmed, lowercase,
    /// and for CRC32 zero-padded to eight digits. Empty input means the
    /// database did not supply this digest.
    pub fn normalize(&self, raw: &str) -> Result<Option<String>> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }

        let invalid = || Error::InvalidDigest {
            kind: *self,
            value: raw.to_string(),
        };

        if !trimmed.chars().all(|c| c.is_ascii_hexdigit()) || trimmed.len() > self.hex_len() {
            return Err(invalid());
        }

        let mut value = trimmed.to_ascii_lowercase();
        if value.len() < self.hex_len() {
            if *self != DigestKind::Crc32 {
                return Err(invalid());
            }
            value = format!("{:0>8}", value);
        }
        Ok(Some(value))
    }
}

impl fmt::Display for DigestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Digests of one candidate file. All three digests and the size come from the
/// same single read of the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileDigestSet {
    pub path: PathBuf,
    pub size: u64,
    pub crc32: String,
    pub md5: String,
    pub sha1: String,
}

impl FileDigestSet {
    pub fn get(&self, kind: DigestKind) -> &str {
        match kind {
            DigestKind::Crc32 => &self.crc32,
            DigestKind::Md5 => &self.md5,
            DigestKind::Sha1 => &self.sha1,
        }
    }
}
