//! Content-addressed package keys.

use std::fmt;

use sha2::{Digest, Sha256};

use crate::convert::FORMAT_VERSION;

/// Cache key for a converted package.
///
/// The digest covers the raw archive bytes and the converter format
/// version, so identical input reconverts idempotently and a version bump
/// automatically invalidates every stale cached layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageKey([u8; 32]);

impl PackageKey {
    /// Key for an archive's raw bytes under the current format version.
    pub fn for_bytes(bytes: &[u8]) -> Self {
        Self::for_bytes_versioned(bytes, FORMAT_VERSION)
    }

    /// Key under an explicit format version. Split out so tests can prove
    /// the invalidation-on-upgrade property.
    pub fn for_bytes_versioned(bytes: &[u8], version: u32) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        hasher.update(version.to_le_bytes());
        Self(hasher.finalize().into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for PackageKey {
    /// Short hex prefix, enough to correlate log lines.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0[..8] {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}
