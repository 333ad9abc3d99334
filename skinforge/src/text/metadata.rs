//! Skin metadata extraction.
//!
//! Metadata travels as freeform "about" text: sometimes `Key: value` lines,
//! sometimes `Key=value`, often mixed with ASCII art and greetings. The
//! extractor matches key substrings heuristically and defaults anything
//! absent, so it can never fail.

use serde::Serialize;

use super::logical_lines;

/// Fallback for any metadata field the archive does not declare.
pub const UNKNOWN: &str = "Unknown";

/// Descriptive metadata for a skin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkinMetadata {
    pub name: String,
    pub author: String,
    pub version: String,
}

impl Default for SkinMetadata {
    fn default() -> Self {
        Self {
            name: UNKNOWN.to_string(),
            author: UNKNOWN.to_string(),
            version: UNKNOWN.to_string(),
        }
    }
}

/// Extract name/author/version from freeform metadata text.
///
/// A line contributes a field when it splits on `:` or `=` into a key whose
/// lowercased form contains a recognized substring and a non-empty value.
/// First match per field wins; absent fields stay [`UNKNOWN`].
pub fn parse_metadata(text: &str) -> SkinMetadata {
    let mut meta = SkinMetadata::default();

    for line in logical_lines(text) {
        let Some((key, value)) = line.split_once([':', '=']) else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim();
        if value.is_empty() {
            continue;
        }

        // Version first: keys like "SkinVersion" must not be mistaken for
        // the skin name by the broader "skin" substring below.
        if meta.version == UNKNOWN && key.contains("version") {
            meta.version = value.to_string();
        } else if meta.author == UNKNOWN && (key.contains("author") || key.contains("made by")) {
            meta.author = value.to_string();
        } else if meta.name == UNKNOWN && (key.contains("name") || key.contains("skin")) {
            meta.name = value.to_string();
        }
    }
    meta
}
