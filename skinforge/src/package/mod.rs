//! The assembled skin package and its diagnostics log.
//!
//! A [`SkinPackage`] is the pipeline's end product: atlas pages, hit
//! geometry, palette and metadata, immutable once assembled. Consumers
//! share it read-only behind an `Arc`; its lifetime is a cache entry.
//!
//! Degraded conversions are the norm with real-world legacy skins, so the
//! package carries an ordered [`Diagnostic`] log - the only channel by
//! which consumers learn that a skin is partially substituted rather than
//! fully authentic.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::atlas::AtlasPage;
use crate::geometry::HitRegionGeometry;
use crate::text::{Rgb, SkinMetadata};

/// Category of a non-fatal conversion event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiagnosticKind {
    /// An archive entry was present but unreadable.
    EntryUnreadable,
    /// An expected text config was absent; defaults were used.
    ConfigMissing,
    /// A sprite payload failed to decode.
    SpriteCorrupt,
    /// A missing or corrupt standard sprite was replaced by a placeholder.
    SpriteSubstituted,
    /// A declared region was degenerate or unresolvable and was dropped.
    RegionDropped,
    /// A required region had no declaration; geometry was synthesized
    /// from bitmap alpha.
    RegionFallback,
    /// Two sprites collided on one placement key; the first was kept.
    PlacementConflict,
}

/// One ordered entry in the conversion log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// The asset the event concerns, e.g. `eqmain.bmp` or a region name.
    pub subject: String,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            subject: subject.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({}): {}", self.kind, self.subject, self.message)
    }
}

/// A validated, render-ready skin asset package.
///
/// Immutable by construction: every field is built during conversion and
/// never touched again. All maps are ordered so iteration, serialization
/// and cache-size accounting are deterministic.
#[derive(Debug, Clone, PartialEq)]
pub struct SkinPackage {
    /// Packed atlas pages; UV rectangles are in pixel units.
    pub atlas_pages: Vec<AtlasPage>,
    /// Hit-test geometry per region name.
    pub hit_regions: BTreeMap<String, HitRegionGeometry>,
    /// Outline of the non-rectangular main window, when one exists.
    pub window_silhouette: Option<HitRegionGeometry>,
    /// Palette entries, name -> color.
    pub color_scheme: BTreeMap<String, Rgb>,
    pub metadata: SkinMetadata,
    /// Nominal main-window size in pixels.
    pub window_size: (u32, u32),
    /// Click hotspots of decoded cursor sprites, keyed like placements.
    pub cursor_hotspots: BTreeMap<String, (u16, u16)>,
    /// Placement key of the sprite suitable for a library thumbnail.
    pub thumbnail: Option<String>,
    /// Ordered log of every fallback, substitution and skip decision.
    pub diagnostics: Vec<Diagnostic>,
}

impl SkinPackage {
    /// Approximate heap footprint. Atlas pixel memory dominates, which is
    /// exactly what the conversion cache's byte budget needs to track.
    pub fn size_bytes(&self) -> u64 {
        let atlas: usize = self.atlas_pages.iter().map(AtlasPage::size_bytes).sum();
        let geometry: usize = self
            .hit_regions
            .values()
            .chain(self.window_silhouette.as_ref())
            .map(HitRegionGeometry::size_bytes)
            .sum();
        (atlas + geometry) as u64
    }

    /// Number of placeholder substitutions recorded during assembly.
    pub fn substitution_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.kind == DiagnosticKind::SpriteSubstituted)
            .count()
    }

    /// One-line load report for user-facing surfaces.
    pub fn summary(&self) -> String {
        let substituted = self.substitution_count();
        if substituted == 0 {
            format!("skin \"{}\" loaded", self.metadata.name)
        } else {
            format!(
                "skin \"{}\" loaded ({} elements substituted)",
                self.metadata.name, substituted
            )
        }
    }
}
