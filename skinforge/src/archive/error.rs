//! Error types for archive reading.

use thiserror::Error;

/// Errors that abort opening a skin archive.
///
/// Per-entry damage (bad local header, CRC mismatch, unsupported compression)
/// is not represented here: damaged entries are skipped so the rest of the
/// archive can still convert. Only structural failures of the container
/// itself are fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArchiveError {
    /// No end-of-central-directory signature was found.
    #[error("not a skin archive: missing container signature")]
    MissingSignature,

    /// The central directory is inconsistent with the file size.
    #[error("archive corrupt: central directory out of bounds (offset {offset}, len {len})")]
    DirectoryOutOfBounds { offset: u64, len: u64 },

    /// The archive opened but contained zero readable entries.
    #[error("archive contains no readable entries")]
    NoEntries,
}
