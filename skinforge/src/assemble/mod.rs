//! Skin package assembly.
//!
//! The assembler does two things the rest of the pipeline deliberately
//! does not:
//!
//! 1. **Placeholder substitution.** Consumers index standard sheets by
//!    name and must never null-check them, so every standard sheet missing
//!    from the decode set is substituted with a deterministic solid-color
//!    placeholder at its nominal size before packing. The loud default
//!    color makes a substituted element unmistakable on screen.
//! 2. **Merging.** Atlas pages, hit regions, silhouette, palette and
//!    metadata combine into the final immutable [`SkinPackage`], with the
//!    ordered diagnostics log attached.

use std::collections::BTreeMap;

use tracing::{info, warn};

use crate::atlas::AtlasPage;
use crate::geometry::{self, HitRegionGeometry};
use crate::package::{Diagnostic, DiagnosticKind, SkinPackage};
use crate::sprite::DecodedSprite;
use crate::text::{Rgb, SkinMetadata};

/// The standard sprite sheets a complete skin carries, with nominal sizes.
///
/// Sizes are the de-facto dimensions the legacy player shipped with; a
/// placeholder substituted at nominal size keeps downstream layout sane.
pub const STANDARD_SHEETS: &[(&str, u32, u32)] = &[
    ("main.bmp", 275, 116),
    ("cbuttons.bmp", 136, 36),
    ("titlebar.bmp", 344, 87),
    ("shufrep.bmp", 92, 85),
    ("text.bmp", 155, 18),
    ("numbers.bmp", 99, 13),
    ("volume.bmp", 68, 433),
    ("balance.bmp", 38, 433),
    ("monoster.bmp", 56, 24),
    ("posbar.bmp", 307, 10),
    ("playpaus.bmp", 42, 9),
    ("eqmain.bmp", 275, 315),
    ("pledit.bmp", 280, 186),
];

/// The sheet that defines the main window and its silhouette.
pub const PRIMARY_SHEET: &str = "main.bmp";

/// Name under which the main-window region is declared.
const PRIMARY_REGION: &str = "normal";

/// Nominal size of a standard sheet, if `key` names one.
pub fn nominal_size(key: &str) -> Option<(u32, u32)> {
    STANDARD_SHEETS
        .iter()
        .find(|(name, _, _)| *name == key)
        .map(|&(_, w, h)| (w, h))
}

/// Build a deterministic solid-color placeholder sprite.
///
/// Identical inputs produce identical pixels, so substituted sheets never
/// destabilize packing or cache identity.
pub fn placeholder_sprite(key: &str, width: u32, height: u32, color: [u8; 4]) -> DecodedSprite {
    let mut rgba = Vec::with_capacity((width * height * 4) as usize);
    for _ in 0..width * height {
        rgba.extend_from_slice(&color);
    }
    DecodedSprite::from_top_down(key, width, height, rgba)
        .expect("placeholder dimensions are nonzero constants")
}

/// Substitute placeholders for standard sheets missing from the decode set.
///
/// Appends one [`DiagnosticKind::SpriteSubstituted`] entry per
/// substitution, in table order.
pub fn substitute_missing_sheets(
    sprites: &mut BTreeMap<String, DecodedSprite>,
    color: [u8; 4],
    diagnostics: &mut Vec<Diagnostic>,
) {
    for &(key, width, height) in STANDARD_SHEETS {
        if sprites.contains_key(key) {
            continue;
        }
        warn!(key, width, height, "standard sheet missing, substituting placeholder");
        sprites.insert(key.to_string(), placeholder_sprite(key, width, height, color));
        diagnostics.push(Diagnostic::new(
            DiagnosticKind::SpriteSubstituted,
            key,
            format!("placeholder substituted at nominal {width}x{height}"),
        ));
    }
}

/// Everything the final merge needs, produced by earlier pipeline stages.
pub struct AssemblyParts {
    pub atlas_pages: Vec<AtlasPage>,
    pub hit_regions: BTreeMap<String, HitRegionGeometry>,
    pub color_scheme: BTreeMap<String, Rgb>,
    pub metadata: SkinMetadata,
    pub diagnostics: Vec<Diagnostic>,
}

/// Merge pipeline outputs into the final package.
///
/// The window silhouette prefers an explicitly declared main-window
/// region; otherwise it falls back to the alpha contour of the primary
/// sheet (recording the fallback), and a skin whose primary sheet is
/// fully opaque simply gets its rectangular outline.
pub fn assemble(
    mut parts: AssemblyParts,
    sprites: &BTreeMap<String, DecodedSprite>,
    alpha_threshold: u8,
) -> SkinPackage {
    let primary = sprites.get(PRIMARY_SHEET);

    let window_size = primary
        .map(|s| (s.width, s.height))
        .or_else(|| nominal_size(PRIMARY_SHEET))
        .unwrap_or((0, 0));

    let window_silhouette = match parts.hit_regions.get(PRIMARY_REGION) {
        Some(region) => Some(region.clone()),
        None => match primary.and_then(|s| geometry::trace_silhouette(s, alpha_threshold)) {
            Some(traced) => {
                parts.diagnostics.push(Diagnostic::new(
                    DiagnosticKind::RegionFallback,
                    PRIMARY_REGION,
                    "silhouette traced from primary sheet alpha".to_string(),
                ));
                Some(traced)
            }
            None => None,
        },
    };

    let cursor_hotspots: BTreeMap<String, (u16, u16)> = sprites
        .iter()
        .filter_map(|(key, sprite)| sprite.hotspot.map(|h| (key.clone(), h)))
        .collect();

    let thumbnail = sprites.contains_key(PRIMARY_SHEET).then(|| PRIMARY_SHEET.to_string());

    let package = SkinPackage {
        atlas_pages: parts.atlas_pages,
        hit_regions: parts.hit_regions,
        window_silhouette,
        color_scheme: parts.color_scheme,
        metadata: parts.metadata,
        window_size,
        cursor_hotspots,
        thumbnail,
        diagnostics: parts.diagnostics,
    };

    info!(
        pages = package.atlas_pages.len(),
        regions = package.hit_regions.len(),
        diagnostics = package.diagnostics.len(),
        "{}",
        package.summary()
    );
    package
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAGENTA: [u8; 4] = [255, 0, 255, 255];

    fn opaque_sprite(key: &str, width: u32, height: u32) -> DecodedSprite {
        let rgba = vec![255u8; (width * height * 4) as usize];
        DecodedSprite::from_top_down(key, width, height, rgba).unwrap()
    }

    fn parts() -> AssemblyParts {
        AssemblyParts {
            atlas_pages: Vec::new(),
            hit_regions: BTreeMap::new(),
            color_scheme: BTreeMap::new(),
            metadata: SkinMetadata::default(),
            diagnostics: Vec::new(),
        }
    }

    #[test]
    fn test_placeholder_is_deterministic() {
        let a = placeholder_sprite("x", 8, 8, MAGENTA);
        let b = placeholder_sprite("x", 8, 8, MAGENTA);
        assert_eq!(a, b);
        assert_eq!(a.pixel(0, 0), MAGENTA);
    }

    #[test]
    fn test_substitution_fills_all_standard_sheets() {
        let mut sprites = BTreeMap::new();
        sprites.insert(PRIMARY_SHEET.to_string(), opaque_sprite(PRIMARY_SHEET, 275, 116));
        let mut diags = Vec::new();

        substitute_missing_sheets(&mut sprites, MAGENTA, &mut diags);

        assert_eq!(sprites.len(), STANDARD_SHEETS.len());
        assert_eq!(diags.len(), STANDARD_SHEETS.len() - 1);
        assert!(diags.iter().all(|d| d.kind == DiagnosticKind::SpriteSubstituted));
        // The present sheet must not be touched.
        assert_eq!(sprites[PRIMARY_SHEET].pixel(0, 0), [255, 255, 255, 255]);
        // Substitutes arrive at nominal size.
        let eq = &sprites["eqmain.bmp"];
        assert_eq!((eq.width, eq.height), (275, 315));
    }

    #[test]
    fn test_assemble_prefers_declared_silhouette() {
        use crate::geometry::Point;
        let mut p = parts();
        let declared = HitRegionGeometry::from_polygons(vec![vec![
            Point::new(0, 0),
            Point::new(10, 0),
            Point::new(10, 10),
        ]])
        .unwrap();
        p.hit_regions.insert(PRIMARY_REGION.to_string(), declared.clone());

        let mut sprites = BTreeMap::new();
        sprites.insert(PRIMARY_SHEET.to_string(), opaque_sprite(PRIMARY_SHEET, 20, 20));

        let package = assemble(p, &sprites, 128);
        assert_eq!(package.window_silhouette, Some(declared));
        // No fallback diagnostic when the declaration exists.
        assert!(package.diagnostics.is_empty());
    }

    #[test]
    fn test_assemble_falls_back_to_alpha_contour() {
        let mut sprites = BTreeMap::new();
        sprites.insert(PRIMARY_SHEET.to_string(), opaque_sprite(PRIMARY_SHEET, 275, 116));

        let package = assemble(parts(), &sprites, 128);

        let silhouette = package.window_silhouette.expect("contour fallback");
        // A fully opaque sheet contours to its rectangular outline.
        let bbox = silhouette.bounding_box();
        assert_eq!((bbox.min.x, bbox.min.y), (0, 0));
        assert_eq!((bbox.max.x, bbox.max.y), (275, 116));
        assert_eq!(package.diagnostics.len(), 1);
        assert_eq!(package.diagnostics[0].kind, DiagnosticKind::RegionFallback);
        assert_eq!(package.window_size, (275, 116));
        assert_eq!(package.thumbnail.as_deref(), Some(PRIMARY_SHEET));
    }

    #[test]
    fn test_assemble_collects_cursor_hotspots() {
        let mut sprites = BTreeMap::new();
        let mut cursor = opaque_sprite("normal.cur", 16, 16);
        cursor.hotspot = Some((3, 5));
        sprites.insert("normal.cur".to_string(), cursor);

        let package = assemble(parts(), &sprites, 128);
        assert_eq!(package.cursor_hotspots["normal.cur"], (3, 5));
    }

    #[test]
    fn test_nominal_size_lookup() {
        assert_eq!(nominal_size("main.bmp"), Some((275, 116)));
        assert_eq!(nominal_size("nonexistent.bmp"), None);
    }
}
