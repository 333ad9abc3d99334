//! Tolerant parsers for the plain-text sub-formats embedded in skin archives.
//!
//! Three ad-hoc formats travel inside legacy skins: color palettes, named
//! hit-region declarations, and freeform metadata. None of them was ever
//! formally specified, and third-party editors disagreed on case, line
//! endings, byte-order marks and spacing. Every parser here is therefore
//! line-oriented and lossy by design: a line that cannot be understood is
//! skipped, never fatal.

mod metadata;
mod palette;
mod regions;

pub use metadata::{parse_metadata, SkinMetadata};
pub use palette::{default_color_scheme, parse_color_scheme, Rgb};
pub use regions::{parse_regions, RegionDefinition};

/// Iterate logical lines of a legacy text file.
///
/// Strips a UTF-8 byte-order mark, tolerates CRLF and lone-CR line endings,
/// and trims surrounding whitespace from every line.
pub(crate) fn logical_lines(text: &str) -> impl Iterator<Item = &str> {
    text.trim_start_matches('\u{feff}')
        .split(['\n', '\r'])
        .map(str::trim)
        .filter(|line| !line.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logical_lines_strips_bom_and_crlf() {
        let text = "\u{feff}first\r\nsecond\rthird\n";
        let lines: Vec<&str> = logical_lines(text).collect();
        assert_eq!(lines, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_logical_lines_trims_whitespace() {
        let lines: Vec<&str> = logical_lines("  a  \n\n\t b\n").collect();
        assert_eq!(lines, vec!["a", "b"]);
    }
}
