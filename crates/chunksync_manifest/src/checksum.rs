//! Chunk content digests.

use crate::error::{ManifestError, ManifestResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Width of a [`Checksum`] in bytes.
pub const CHECKSUM_LEN: usize = 32;

/// SHA-256 digest of one chunk's bytes.
///
/// Serialized as a lowercase hex string, which is also its wire form in
/// `getchunkmeta` responses.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Checksum([u8; CHECKSUM_LEN]);

impl Checksum {
    /// Computes the checksum of `data`.
    pub fn compute(data: &[u8]) -> Self {
        let digest = Sha256::digest(data);
        let mut bytes = [0u8; CHECKSUM_LEN];
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }

    /// Wraps raw digest bytes.
    pub const fn from_bytes(bytes: [u8; CHECKSUM_LEN]) -> Self {
        Self(bytes)
    }

    /// Returns the raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; CHECKSUM_LEN] {
        &self.0
    }

    /// Returns the lowercase hex form.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parses the hex form.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::InvalidChecksum`] if `s` is not exactly
    /// `2 * CHECKSUM_LEN` hex digits.
    pub fn from_hex(s: &str) -> ManifestResult<Self> {
        let mut bytes = [0u8; CHECKSUM_LEN];
        hex::decode_to_slice(s, &mut bytes)
            .map_err(|e| ManifestError::InvalidChecksum(format!("{s:?}: {e}")))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Checksum({})", &self.to_hex()[..12])
    }
}

impl FromStr for Checksum {
    type Err = ManifestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Checksum {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Checksum {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
