//! Deterministic sprite atlas packing.
//!
//! Sprites are shelf-packed into fixed-size RGBA pages: sorted by
//! descending height, then descending width, then key; placed left to
//! right along the current shelf; a new shelf opens when the row is full
//! and a new page when the vertical space is gone. First-fit on the
//! current shelf, no best-fit search - the observable contracts are
//! determinism, completeness and non-overlap, not fill ratio.
//!
//! The same input set always yields bit-identical pages and placements;
//! conversion cache keys depend on it.
//!
//! Placement rectangles are stored in pixel units. Normalizing to 0-1 UVs
//! here would bake float drift into reconverted output, so that step is
//! deferred to render-consumption time.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, warn};

use crate::package::{Diagnostic, DiagnosticKind};
use crate::sprite::DecodedSprite;

/// A placement rectangle in pixel units, bottom-up like sprite rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn intersects(&self, other: &PixelRect) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }
}

/// One packed atlas page: an RGBA texture plus its placement table.
///
/// Invariants: no two placements overlap, and every placement lies fully
/// inside the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtlasPage {
    pub texture_id: u32,
    pub width: u32,
    pub height: u32,
    /// RGBA8 texels, bottom-up rows, matching the sprite convention.
    pub pixels: Vec<u8>,
    /// Sprite key -> placement rectangle.
    pub placements: BTreeMap<String, PixelRect>,
}

impl AtlasPage {
    fn new(texture_id: u32, width: u32, height: u32) -> Self {
        Self {
            texture_id,
            width,
            height,
            pixels: vec![0; (width as usize) * (height as usize) * 4],
            placements: BTreeMap::new(),
        }
    }

    /// Blit a sprite at (x, y) and record its placement.
    fn place(&mut self, sprite: &DecodedSprite, x: u32, y: u32) {
        let page_stride = self.width as usize * 4;
        let sprite_stride = sprite.width as usize * 4;
        for row in 0..sprite.height as usize {
            let dst = (y as usize + row) * page_stride + x as usize * 4;
            let src = row * sprite_stride;
            self.pixels[dst..dst + sprite_stride]
                .copy_from_slice(&sprite.pixels[src..src + sprite_stride]);
        }
        self.placements.insert(
            sprite.key.clone(),
            PixelRect {
                x,
                y,
                width: sprite.width,
                height: sprite.height,
            },
        );
    }

    /// Approximate heap footprint, dominated by the texel buffer.
    pub fn size_bytes(&self) -> usize {
        self.pixels.len()
            + self
                .placements
                .keys()
                .map(|k| k.len() + std::mem::size_of::<PixelRect>())
                .sum::<usize>()
    }
}

/// Shelf cursor for the page currently being filled.
struct ShelfCursor {
    page: AtlasPage,
    x: u32,
    y: u32,
    shelf_height: u32,
}

/// Pack sprites into atlas pages of `page_size` x `page_size` texels.
///
/// Every input sprite is placed exactly once. A sprite wider or taller
/// than the page gets a dedicated page of its own dimensions instead of
/// being dropped. A duplicate placement key is a caller contract
/// violation: it asserts in debug builds and degrades to keep-first with
/// a [`DiagnosticKind::PlacementConflict`] in release.
pub fn pack<'a>(
    sprites: impl IntoIterator<Item = &'a DecodedSprite>,
    page_size: u32,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<AtlasPage> {
    let mut ordered: Vec<&DecodedSprite> = sprites.into_iter().collect();
    // Descending height then width packs shelves tightest; the key is the
    // final tiebreaker that makes the order total and the output stable.
    ordered.sort_by(|a, b| {
        b.height
            .cmp(&a.height)
            .then(b.width.cmp(&a.width))
            .then(a.key.cmp(&b.key))
    });

    let mut pages: Vec<AtlasPage> = Vec::new();
    let mut cursor: Option<ShelfCursor> = None;
    let mut next_id = 0u32;
    let mut placed_keys: Vec<&str> = Vec::new();

    for sprite in ordered {
        if placed_keys.contains(&sprite.key.as_str()) {
            debug_assert!(false, "duplicate sprite key {:?} during packing", sprite.key);
            warn!(key = %sprite.key, "duplicate sprite key, keeping first placement");
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::PlacementConflict,
                sprite.key.clone(),
                "duplicate placement key, first kept".to_string(),
            ));
            continue;
        }
        placed_keys.push(&sprite.key);

        // Oversized sprites cannot share a page; give them their own.
        if sprite.width > page_size || sprite.height > page_size {
            let mut page = AtlasPage::new(next_id, sprite.width, sprite.height);
            next_id += 1;
            page.place(sprite, 0, 0);
            pages.push(page);
            continue;
        }

        let mut shelf = match cursor.take() {
            Some(shelf) => shelf,
            None => {
                let page = AtlasPage::new(next_id, page_size, page_size);
                next_id += 1;
                ShelfCursor {
                    page,
                    x: 0,
                    y: 0,
                    shelf_height: 0,
                }
            }
        };

        // Row exhausted: open the next shelf.
        if shelf.x + sprite.width > page_size {
            shelf.y += shelf.shelf_height;
            shelf.x = 0;
            shelf.shelf_height = 0;
        }
        // Vertical space exhausted: seal this page, start a fresh one.
        if shelf.y + sprite.height > page_size {
            pages.push(shelf.page);
            shelf = ShelfCursor {
                page: AtlasPage::new(next_id, page_size, page_size),
                x: 0,
                y: 0,
                shelf_height: 0,
            };
            next_id += 1;
        }

        shelf.page.place(sprite, shelf.x, shelf.y);
        shelf.x += sprite.width;
        shelf.shelf_height = shelf.shelf_height.max(sprite.height);
        cursor = Some(shelf);
    }

    if let Some(shelf) = cursor {
        if !shelf.page.placements.is_empty() {
            pages.push(shelf.page);
        }
    }

    debug!(
        sprites = placed_keys.len(),
        pages = pages.len(),
        page_size,
        "atlas packing complete"
    );
    pages
}
