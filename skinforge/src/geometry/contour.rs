//! Alpha-contour extraction.
//!
//! Traces the boundary of a sprite's opaque pixel set as closed polygon
//! loops with integer vertices on the pixel grid. The contour follows
//! pixel edges exactly - no midpoint smoothing - so the synthesized
//! geometry hit-tests pixel-precisely, matching explicit declarations.
//!
//! Holes come out as separate loops; under the even-odd winding rule used
//! by [`super::HitRegionGeometry`] they subtract automatically.
//!
//! The extraction is fully deterministic: edges are gathered in scanline
//! order and stitched smallest-vertex-first, so identical input always
//! yields an identical loop set.

use std::collections::BTreeMap;

use crate::sprite::DecodedSprite;

use super::Point;

/// Trace all boundary loops of the opaque pixel set.
///
/// A pixel is opaque when its alpha is at least `threshold` (clamped to 1
/// so a zero threshold cannot classify the infinite transparent exterior
/// as opaque). Returns an empty set when no pixel qualifies.
pub fn trace_contours(sprite: &DecodedSprite, threshold: u8) -> Vec<Vec<Point>> {
    let threshold = threshold.max(1);
    let opaque = |x: i64, y: i64| sprite.alpha_at(x, y) >= threshold;

    // Directed boundary edges: interior on the left, gathered in scanline
    // order. Each edge is one pixel-side step on the integer vertex grid.
    let mut outgoing: BTreeMap<Point, Vec<Point>> = BTreeMap::new();
    let mut edge_count = 0usize;
    for y in 0..sprite.height as i64 {
        for x in 0..sprite.width as i64 {
            if !opaque(x, y) {
                continue;
            }
            let (xi, yi) = (x as i32, y as i32);
            let sides = [
                // (neighbor, from, to)
                ((x, y - 1), Point::new(xi, yi), Point::new(xi + 1, yi)),
                ((x + 1, y), Point::new(xi + 1, yi), Point::new(xi + 1, yi + 1)),
                ((x, y + 1), Point::new(xi + 1, yi + 1), Point::new(xi, yi + 1)),
                ((x - 1, y), Point::new(xi, yi + 1), Point::new(xi, yi)),
            ];
            for ((nx, ny), from, to) in sides {
                if !opaque(nx, ny) {
                    outgoing.entry(from).or_default().push(to);
                    edge_count += 1;
                }
            }
        }
    }

    // Keep per-vertex choices ordered so stitching is deterministic even
    // at checkerboard touch points where a vertex has two exits.
    for ends in outgoing.values_mut() {
        ends.sort_unstable();
    }

    let mut loops = Vec::new();
    let mut walked = 0usize;
    while let Some((&start, _)) = outgoing.iter().next() {
        let mut path = vec![start];
        let mut current = take_exit(&mut outgoing, start);
        walked += 1;

        while let Some(vertex) = current {
            if vertex == start {
                break;
            }
            path.push(vertex);
            current = take_exit(&mut outgoing, vertex);
            walked += 1;
        }

        match current {
            Some(_) => loops.push(collapse_collinear(path)),
            // A dangling chain means the edge set was inconsistent, which
            // cannot happen for edges derived from a pixel grid; discard.
            None => debug_assert!(false, "open contour chain at {start:?}"),
        }
    }
    debug_assert_eq!(walked, edge_count);

    loops
}

/// Remove and return the first (smallest) exit edge from `vertex`.
fn take_exit(outgoing: &mut BTreeMap<Point, Vec<Point>>, vertex: Point) -> Option<Point> {
    let ends = outgoing.get_mut(&vertex)?;
    let next = ends.remove(0);
    if ends.is_empty() {
        outgoing.remove(&vertex);
    }
    Some(next)
}

/// Drop intermediate vertices along straight runs of a closed loop.
fn collapse_collinear(path: Vec<Point>) -> Vec<Point> {
    let n = path.len();
    (0..n)
        .filter(|&i| {
            let prev = path[(i + n - 1) % n];
            let here = path[i];
            let next = path[(i + 1) % n];
            (here.x - prev.x, here.y - prev.y) != (next.x - here.x, next.y - here.y)
        })
        .map(|i| path[i])
        .collect()
}
