//! Skin archive container reading.
//!
//! Legacy skins ship as zip-compatible containers holding sprite sheets,
//! cursor images and plain-text configuration. This module opens such a
//! container from raw bytes and exposes an immutable, case-normalized
//! path -> bytes snapshot.
//!
//! # Tolerance
//!
//! Years of third-party skin editors produced archives with inconsistent
//! path case, nested directory prefixes, and individually damaged entries.
//! Opening therefore fails only when the container itself is unreadable
//! (no central directory, or zero readable entries). A damaged entry is
//! skipped with a warning and recorded in [`SkinArchive::skipped`] so the
//! conversion layer can attach a diagnostic.

mod error;

pub use error::ArchiveError;

use std::collections::BTreeMap;
use std::io::Read;

use bytes::Bytes;
use flate2::read::DeflateDecoder;
use tracing::{debug, warn};

/// End-of-central-directory signature.
const EOCD_MAGIC: u32 = 0x0605_4b50;
/// Central directory file header signature.
const CENTRAL_MAGIC: u32 = 0x0201_4b50;
/// Local file header signature.
const LOCAL_MAGIC: u32 = 0x0403_4b50;
/// Fixed size of the end-of-central-directory record (without comment).
const EOCD_LEN: usize = 22;
/// Fixed size of a central directory file header (without variable fields).
const CENTRAL_LEN: usize = 46;
/// Fixed size of a local file header (without variable fields).
const LOCAL_LEN: usize = 30;

/// Entry data is stored uncompressed.
const METHOD_STORED: u16 = 0;
/// Entry data is DEFLATE-compressed.
const METHOD_DEFLATE: u16 = 8;

/// An opened skin archive: an immutable snapshot of path -> bytes.
///
/// Paths are normalized on open (lowercased, `\` -> `/`). Lookup by
/// [`SkinArchive::entry`] additionally ignores directory prefixes, because
/// many legacy archives nest the whole skin under a folder named after the
/// skin itself.
pub struct SkinArchive {
    /// Normalized full path -> entry bytes.
    entries: BTreeMap<String, Bytes>,
    /// Normalized paths of entries that were present but unreadable.
    skipped: Vec<String>,
}

/// One parsed central directory record.
struct CentralEntry {
    name: String,
    method: u16,
    crc32: u32,
    compressed_size: u32,
    uncompressed_size: u32,
    local_offset: u32,
}

impl SkinArchive {
    /// Open an archive from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError`] only for structural failures: a missing
    /// end-of-central-directory signature, a central directory that points
    /// outside the file, or an archive with zero readable entries.
    pub fn open(bytes: &Bytes) -> Result<Self, ArchiveError> {
        let eocd_pos = find_eocd(bytes).ok_or(ArchiveError::MissingSignature)?;
        let eocd = &bytes[eocd_pos..];

        let entry_count = read_u16(eocd, 10);
        let dir_len = read_u32(eocd, 12) as u64;
        let dir_offset = read_u32(eocd, 16) as u64;

        if dir_offset + dir_len > bytes.len() as u64 {
            return Err(ArchiveError::DirectoryOutOfBounds {
                offset: dir_offset,
                len: dir_len,
            });
        }

        let mut entries = BTreeMap::new();
        let mut skipped = Vec::new();
        let mut cursor = dir_offset as usize;

        for _ in 0..entry_count {
            let Some(central) = parse_central_entry(bytes, &mut cursor) else {
                // A malformed record poisons everything after it in the
                // directory; keep what was parsed so far.
                warn!("central directory truncated, keeping {} entries", entries.len());
                break;
            };

            // Directory markers carry no data.
            if central.name.ends_with('/') {
                continue;
            }

            let path = normalize_path(&central.name);
            match extract_entry(bytes, &central) {
                Some(data) => {
                    entries.insert(path, data);
                }
                None => {
                    warn!(path = %path, "skipping unreadable archive entry");
                    skipped.push(path);
                }
            }
        }

        if entries.is_empty() {
            return Err(ArchiveError::NoEntries);
        }

        debug!(
            entries = entries.len(),
            skipped = skipped.len(),
            "skin archive opened"
        );

        Ok(Self { entries, skipped })
    }

    /// Look up an entry by name.
    ///
    /// The name is normalized before lookup. An exact path match wins;
    /// otherwise the first entry (in path order) whose file name component
    /// matches is returned, so `main.bmp` finds `someskin/main.bmp`.
    pub fn entry(&self, name: &str) -> Option<&Bytes> {
        let wanted = normalize_path(name);
        if let Some(data) = self.entries.get(&wanted) {
            return Some(data);
        }
        self.entries
            .iter()
            .find(|(path, _)| file_name(path) == wanted)
            .map(|(_, data)| data)
    }

    /// Iterate all entries as (normalized path, bytes).
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Bytes)> {
        self.entries.iter().map(|(p, b)| (p.as_str(), b))
    }

    /// Number of readable entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the archive holds no readable entries. Unreachable after a
    /// successful [`SkinArchive::open`], provided for completeness.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Normalized paths of entries that were present but unreadable.
    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }
}

/// Normalize an archive path: lowercase, backslashes to forward slashes.
fn normalize_path(path: &str) -> String {
    path.to_ascii_lowercase().replace('\\', "/")
}

/// File name component of a normalized path.
fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Scan backwards for the end-of-central-directory record.
///
/// The record sits at the end of the file, optionally followed by an
/// archive comment of up to 64 KiB.
fn find_eocd(bytes: &[u8]) -> Option<usize> {
    if bytes.len() < EOCD_LEN {
        return None;
    }
    let earliest = bytes.len().saturating_sub(EOCD_LEN + u16::MAX as usize);
    (earliest..=bytes.len() - EOCD_LEN)
        .rev()
        .find(|&pos| read_u32(bytes, pos) == EOCD_MAGIC)
}

/// Parse one central directory record, advancing `cursor` past it.
fn parse_central_entry(bytes: &[u8], cursor: &mut usize) -> Option<CentralEntry> {
    let base = *cursor;
    if base + CENTRAL_LEN > bytes.len() || read_u32(bytes, base) != CENTRAL_MAGIC {
        return None;
    }

    let method = read_u16(bytes, base + 10);
    let crc32 = read_u32(bytes, base + 16);
    let compressed_size = read_u32(bytes, base + 20);
    let uncompressed_size = read_u32(bytes, base + 24);
    let name_len = read_u16(bytes, base + 28) as usize;
    let extra_len = read_u16(bytes, base + 30) as usize;
    let comment_len = read_u16(bytes, base + 32) as usize;
    let local_offset = read_u32(bytes, base + 42);

    let name_end = base + CENTRAL_LEN + name_len;
    if name_end > bytes.len() {
        return None;
    }
    let name = String::from_utf8_lossy(&bytes[base + CENTRAL_LEN..name_end]).into_owned();

    *cursor = name_end + extra_len + comment_len;
    Some(CentralEntry {
        name,
        method,
        crc32,
        compressed_size,
        uncompressed_size,
        local_offset,
    })
}

/// Extract and verify one entry's data, following its local header.
///
/// Returns `None` for any per-entry damage: bad local header, data out of
/// bounds, unsupported compression method, inflate failure, size or CRC
/// mismatch.
fn extract_entry(bytes: &Bytes, central: &CentralEntry) -> Option<Bytes> {
    let base = central.local_offset as usize;
    if base + LOCAL_LEN > bytes.len() || read_u32(bytes, base) != LOCAL_MAGIC {
        return None;
    }

    // The local header repeats the name/extra fields with its own lengths,
    // which third-party writers did not always keep in sync with the
    // central directory. Trust the local lengths for the data offset.
    let name_len = read_u16(bytes, base + 26) as usize;
    let extra_len = read_u16(bytes, base + 28) as usize;
    let data_start = base + LOCAL_LEN + name_len + extra_len;
    let data_end = data_start.checked_add(central.compressed_size as usize)?;
    if data_end > bytes.len() {
        return None;
    }
    let raw = &bytes[data_start..data_end];

    let data = match central.method {
        METHOD_STORED => bytes.slice(data_start..data_end),
        METHOD_DEFLATE => {
            let mut inflated = Vec::with_capacity(central.uncompressed_size as usize);
            DeflateDecoder::new(raw)
                .take(central.uncompressed_size as u64 + 1)
                .read_to_end(&mut inflated)
                .ok()?;
            Bytes::from(inflated)
        }
        other => {
            warn!(method = other, "unsupported compression method");
            return None;
        }
    };

    if data.len() != central.uncompressed_size as usize {
        return None;
    }
    if crc32fast::hash(&data) != central.crc32 {
        return None;
    }
    Some(data)
}

fn read_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}
