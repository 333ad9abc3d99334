//! Hit-test geometry derivation.
//!
//! Region declarations arrive in the legacy top-down pixel space of the
//! sprite sheet they reference. Decoded sprites are bottom-up, so every
//! declared point's Y is normalized as `y' = H - y` against the reference
//! sheet height `H`. The transform is exact in integer arithmetic and its
//! own inverse: `y = H - y'`.
//!
//! Polygons are kept verbatim - no simplification - because hit testing
//! must stay pixel-precise. The winding rule is fixed even-odd so
//! self-intersecting legacy declarations behave consistently.
//!
//! Nothing in this module raises a hard error: a missing or malformed
//! declaration degrades to "no custom region" with a diagnostic, and the
//! caller falls back to a default rectangular hit area.

mod contour;

pub use contour::trace_contours;

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, warn};

use crate::package::{Diagnostic, DiagnosticKind};
use crate::sprite::DecodedSprite;
use crate::text::RegionDefinition;

/// A 2D point in integer pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned bounding box over polygon vertices, inclusive on both
/// ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BoundingBox {
    pub min: Point,
    pub max: Point,
}

impl BoundingBox {
    /// Smallest box containing all points. `None` for an empty set.
    fn around<'a>(points: impl Iterator<Item = &'a Point>) -> Option<Self> {
        let mut bounds: Option<Self> = None;
        for p in points {
            bounds = Some(match bounds {
                None => Self { min: *p, max: *p },
                Some(b) => Self {
                    min: Point::new(b.min.x.min(p.x), b.min.y.min(p.y)),
                    max: Point::new(b.max.x.max(p.x), b.max.y.max(p.y)),
                },
            });
        }
        bounds
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min.x as f64 && x <= self.max.x as f64 && y >= self.min.y as f64 && y <= self.max.y as f64
    }
}

/// Hit-test geometry: one or more polygons plus a cached bounding box.
///
/// Coordinates are in the target (bottom-up) space. Multiple polygons
/// arise from multi-part declarations and from alpha contours with holes;
/// even-odd winding treats hole loops as subtractions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HitRegionGeometry {
    polygons: Vec<Vec<Point>>,
    bounding_box: BoundingBox,
}

impl HitRegionGeometry {
    /// Build from polygons, computing the bounding box.
    ///
    /// Returns `None` when no polygon has any points; individual polygon
    /// validity is the caller's concern.
    pub fn from_polygons(polygons: Vec<Vec<Point>>) -> Option<Self> {
        let bounding_box = BoundingBox::around(polygons.iter().flatten())?;
        Some(Self {
            polygons,
            bounding_box,
        })
    }

    pub fn polygons(&self) -> &[Vec<Point>] {
        &self.polygons
    }

    pub fn bounding_box(&self) -> BoundingBox {
        self.bounding_box
    }

    /// Even-odd point-in-region test.
    ///
    /// A point is inside when a ray cast toward +X crosses the combined
    /// edge set an odd number of times. The bounding box short-circuits
    /// the common miss case.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        if !self.bounding_box.contains(x, y) {
            return false;
        }
        let mut inside = false;
        for polygon in &self.polygons {
            let n = polygon.len();
            for i in 0..n {
                let a = polygon[i];
                let b = polygon[(i + 1) % n];
                let (ay, by) = (a.y as f64, b.y as f64);
                if (ay > y) != (by > y) {
                    let t = (y - ay) / (by - ay);
                    let cross_x = a.x as f64 + t * (b.x - a.x) as f64;
                    if x < cross_x {
                        inside = !inside;
                    }
                }
            }
        }
        inside
    }

    /// Hit test at the center of pixel (x, y).
    pub fn contains_pixel(&self, x: u32, y: u32) -> bool {
        self.contains(x as f64 + 0.5, y as f64 + 0.5)
    }

    /// Approximate heap footprint.
    pub fn size_bytes(&self) -> usize {
        self.polygons
            .iter()
            .map(|p| p.len() * std::mem::size_of::<Point>())
            .sum()
    }
}

/// Normalize one declared point against a reference sheet height.
///
/// Inverse of itself: applying it twice reproduces the input exactly.
pub fn normalize_point(p: Point, reference_height: u32) -> Point {
    Point::new(p.x, reference_height as i32 - p.y)
}

/// Sprite sheet a region section refers to.
///
/// Legacy region files name windows, not files; the mapping to sheet keys
/// was fixed by convention.
pub fn sheet_for_region(region_name: &str) -> String {
    match region_name {
        "normal" | "main" => "main.bmp".to_string(),
        "equalizer" | "equal" => "eqmain.bmp".to_string(),
        "playlist" => "pledit.bmp".to_string(),
        other => format!("{other}.bmp"),
    }
}

/// Validity check for a declared point sequence.
///
/// A polygon needs at least three distinct, non-collinear points to
/// enclose any area. Declarations failing this are dropped (legacy
/// editors happily wrote zero-area regions).
fn is_degenerate(points: &[Point]) -> bool {
    let mut distinct: Vec<Point> = Vec::new();
    for p in points {
        if !distinct.contains(p) {
            distinct.push(*p);
        }
    }
    if distinct.len() < 3 {
        return true;
    }
    // All distinct points collinear with the first two?
    let a = distinct[0];
    let b = distinct[1];
    distinct[2..].iter().all(|c| {
        let cross = (b.x - a.x) as i64 * (c.y - a.y) as i64 - (b.y - a.y) as i64 * (c.x - a.x) as i64;
        cross == 0
    })
}

/// Build hit-test geometry from explicit region declarations.
///
/// Each declaration's points are normalized against the height of the
/// sprite sheet its section references; declarations for the same name
/// merge into one multi-polygon region. Degenerate or unresolvable
/// declarations are dropped with a diagnostic.
pub fn build_hit_regions(
    definitions: &[RegionDefinition],
    sprites: &BTreeMap<String, DecodedSprite>,
    diagnostics: &mut Vec<Diagnostic>,
) -> BTreeMap<String, HitRegionGeometry> {
    let mut polygons_by_name: BTreeMap<String, Vec<Vec<Point>>> = BTreeMap::new();

    for def in definitions {
        let sheet = sheet_for_region(&def.name);
        let Some(sprite) = sprites.get(&sheet) else {
            warn!(region = %def.name, sheet = %sheet, "region references unknown sprite sheet");
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::RegionDropped,
                def.name.clone(),
                format!("no sprite sheet {sheet} to anchor the region"),
            ));
            continue;
        };

        if is_degenerate(&def.points) {
            warn!(region = %def.name, points = def.points.len(), "degenerate region dropped");
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::RegionDropped,
                def.name.clone(),
                "declaration encloses no area".to_string(),
            ));
            continue;
        }

        let polygon: Vec<Point> = def
            .points
            .iter()
            .map(|p| normalize_point(*p, sprite.height))
            .collect();
        polygons_by_name.entry(def.name.clone()).or_default().push(polygon);
    }

    let regions: BTreeMap<String, HitRegionGeometry> = polygons_by_name
        .into_iter()
        .filter_map(|(name, polygons)| {
            HitRegionGeometry::from_polygons(polygons).map(|g| (name, g))
        })
        .collect();

    debug!(regions = regions.len(), "hit regions built");
    regions
}

/// Synthesize silhouette geometry from a sprite's alpha channel.
///
/// Used when a required region has no declaration but the corresponding
/// sprite exists: pixels with alpha >= `threshold` are opaque, and their
/// boundary (holes included) becomes the polygon set. Returns `None`
/// when the sprite has no opaque pixels at all.
pub fn trace_silhouette(sprite: &DecodedSprite, threshold: u8) -> Option<HitRegionGeometry> {
    let loops = trace_contours(sprite, threshold);
    if loops.is_empty() {
        return None;
    }
    HitRegionGeometry::from_polygons(loops)
}
