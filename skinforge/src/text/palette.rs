//! Color scheme parsing.
//!
//! Palette files are key/value lines in one of two spellings that legacy
//! editors produced interchangeably:
//!
//! ```text
//! Normal Text=#00FF00
//! Selected Background=RGB(0,0,255)
//! ```
//!
//! Unparsable lines are ignored; a name declared twice resolves
//! last-write-wins, matching how the legacy player re-read the file.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use tracing::debug;

use super::logical_lines;

/// One palette color, 8 bits per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Pattern for `name=#RRGGBB` lines.
fn hex_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // (.+?)                 - color name, lazily up to the separator
        // =                     - separator
        // #?                    - some editors dropped the hash
        // ([0-9a-fA-F]{6})      - six hex digits, RRGGBB
        Regex::new(r"^(.+?)\s*=\s*#?([0-9a-fA-F]{6})$").expect("invalid hex palette pattern")
    })
}

/// Pattern for `name=RGB(r,g,b)` lines.
fn rgb_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // (.+?)                       - color name
        // [Rr][Gg][Bb]                - function spelling varies in case
        // (\d{1,3}) x3                - decimal channels, validated <= 255 after match
        Regex::new(r"^(.+?)\s*=\s*[Rr][Gg][Bb]\s*\(\s*(\d{1,3})\s*,\s*(\d{1,3})\s*,\s*(\d{1,3})\s*\)$")
            .expect("invalid rgb palette pattern")
    })
}

/// The palette used when an archive ships no readable palette config.
///
/// Values match the stock look of the legacy player so a skin without a
/// palette still renders legibly.
pub fn default_color_scheme() -> BTreeMap<String, Rgb> {
    [
        ("normal", Rgb::new(0, 255, 0)),
        ("current", Rgb::new(255, 255, 255)),
        ("normalbg", Rgb::new(0, 0, 0)),
        ("selectedbg", Rgb::new(0, 0, 198)),
    ]
    .into_iter()
    .map(|(name, color)| (name.to_string(), color))
    .collect()
}

/// Parse a palette file into a name -> color mapping.
///
/// Accepts `name=#RRGGBB` and `name=RGB(r,g,b)` lines. Anything else -
/// comments, section headers, malformed values, out-of-range channels -
/// is skipped. Duplicate names resolve last-write-wins.
pub fn parse_color_scheme(text: &str) -> BTreeMap<String, Rgb> {
    let mut scheme = BTreeMap::new();
    let mut skipped = 0usize;

    for line in logical_lines(text) {
        if let Some(caps) = hex_pattern().captures(line) {
            let name = caps[1].trim().to_string();
            // Six validated hex digits cannot fail to parse.
            let value = u32::from_str_radix(&caps[2], 16).expect("validated hex digits");
            scheme.insert(
                name,
                Rgb::new((value >> 16) as u8, (value >> 8) as u8, value as u8),
            );
        } else if let Some(caps) = rgb_pattern().captures(line) {
            let channels: Option<Vec<u8>> =
                (2..=4).map(|i| caps[i].parse::<u8>().ok()).collect();
            match channels {
                Some(ch) => {
                    scheme.insert(caps[1].trim().to_string(), Rgb::new(ch[0], ch[1], ch[2]));
                }
                None => skipped += 1,
            }
        } else {
            skipped += 1;
        }
    }

    if skipped > 0 {
        debug!(entries = scheme.len(), skipped, "palette parsed with skipped lines");
    }
    scheme
}
