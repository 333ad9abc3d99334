//! Hit-region declaration parsing.
//!
//! Region files declare point lists under bracketed section headers:
//!
//! ```text
//! [Normal]
//! NumPoints=4,3
//! PointList=0,0, 275,0, 275,14, 0,14, 10,10, 20,10, 20,20
//! ```
//!
//! `NumPoints` may carry several counts, splitting the point list into that
//! many polygons for the same named region. Editors also emitted bare
//! coordinate lines without any key, so any line whose content is just
//! integers and separators contributes points too.
//!
//! The parser extracts what it can and drops the rest. Geometric validation
//! (minimum point count, degeneracy) is deferred to the geometry stage,
//! which owns the diagnostics for dropped declarations.

use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::geometry::Point;

use super::logical_lines;

/// A named, ordered 2D point sequence declared by a region file.
///
/// Coordinates are in the source (top-down) pixel space of the sprite sheet
/// the region refers to; the geometry stage normalizes them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionDefinition {
    /// Section name, lowercased.
    pub name: String,
    /// Declared points in declaration order.
    pub points: Vec<Point>,
}

/// Pattern for `[Section]` headers.
fn section_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\[\s*(.+?)\s*\]$").expect("invalid section pattern"))
}

/// Pattern extracting signed integers from a line.
fn int_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"-?\d+").expect("invalid integer pattern"))
}

/// Accumulates one section's declarations until the next header.
#[derive(Default)]
struct SectionState {
    name: String,
    counts: Vec<usize>,
    values: Vec<i32>,
}

impl SectionState {
    /// Convert accumulated values into region definitions.
    ///
    /// Values pair up into points in declaration order; a dangling odd value
    /// is dropped. When `NumPoints` counts are present and consistent with
    /// the point list, the list splits into one definition per count.
    fn finish(self, out: &mut Vec<RegionDefinition>) {
        if self.name.is_empty() || self.values.len() < 2 {
            return;
        }
        let points: Vec<Point> = self
            .values
            .chunks_exact(2)
            .map(|pair| Point::new(pair[0], pair[1]))
            .collect();

        let total: usize = self.counts.iter().sum();
        if !self.counts.is_empty() && total <= points.len() && self.counts.iter().all(|&c| c > 0) {
            let mut rest = &points[..];
            for &count in &self.counts {
                let (head, tail) = rest.split_at(count);
                out.push(RegionDefinition {
                    name: self.name.clone(),
                    points: head.to_vec(),
                });
                rest = tail;
            }
        } else {
            out.push(RegionDefinition {
                name: self.name,
                points,
            });
        }
    }
}

/// Parse a region declaration file.
///
/// Returns definitions in file order. Sections without usable points are
/// omitted; malformed lines are skipped. Never fails.
pub fn parse_regions(text: &str) -> Vec<RegionDefinition> {
    let mut out = Vec::new();
    let mut section = SectionState::default();

    for line in logical_lines(text) {
        if line.starts_with(';') || line.starts_with("//") {
            continue;
        }

        if let Some(caps) = section_pattern().captures(line) {
            std::mem::take(&mut section).finish(&mut out);
            section.name = caps[1].to_ascii_lowercase();
            continue;
        }

        let (key, value) = match line.split_once('=') {
            Some((k, v)) => (k.trim().to_ascii_lowercase(), v),
            // Bare coordinate line: treat the whole line as values.
            None => (String::new(), line),
        };

        if key.contains("numpoints") {
            section.counts.extend(
                int_pattern()
                    .find_iter(value)
                    .filter_map(|m| m.as_str().parse::<usize>().ok()),
            );
        } else if key.is_empty() || key.contains("pointlist") || key.contains("point") {
            section.values.extend(
                int_pattern()
                    .find_iter(value)
                    .filter_map(|m| m.as_str().parse::<i32>().ok()),
            );
        }
        // Any other key is some editor's private extension; ignore it.
    }
    section.finish(&mut out);

    debug!(regions = out.len(), "region file parsed");
    out
}
