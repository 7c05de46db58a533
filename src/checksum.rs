//! Content fingerprints used as optimistic-concurrency tokens.
//!
//! A token is the first [`CHECKSUM_LEN`] hex characters of the SHA-256 digest of a file's bytes.
//! Reads hand the token out; conditional writes hand it back and are rejected when the file has
//! changed in between.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

pub const CHECKSUM_LEN: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Checksum(String);

impl Checksum {
    pub fn compute(content: impl AsRef<[u8]>) -> Self {
        Self::from_digest(&Sha256::digest(content.as_ref()))
    }

    /// Hashes everything `reader` yields without buffering it whole.
    pub fn from_reader(mut reader: impl std::io::Read) -> std::io::Result<Self> {
        let mut hasher = Sha256::new();
        std::io::copy(&mut reader, &mut hasher)?;
        Ok(Self::from_digest(&hasher.finalize()))
    }

    fn from_digest(digest: &[u8]) -> Self {
        let mut encoded = hex::encode(digest);
        encoded.truncate(CHECKSUM_LEN);
        Self(encoded)
    }

    pub fn verify(content: impl AsRef<[u8]>, expected: &str) -> bool {
        Self::compute(content).matches(expected)
    }

    pub fn matches(&self, expected: &str) -> bool {
        self.0.eq_ignore_ascii_case(expected.trim())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Rejects with `ChecksumMismatch` when the caller supplied a token that is not `self`.
    pub fn ensure_matches(&self, expected: Option<&str>) -> Result<()> {
        match expected {
            Some(expected) if !self.matches(expected) => Err(Error::ChecksumMismatch {
                expected: expected.trim().to_string(),
                actual: self.0.clone(),
            }),
            _ => Ok(()),
        }
    }
}

impl std::fmt::Display for Checksum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
