//! Sprite sheet decoding and pure pixel transforms.
//!
//! [`decode`] turns one archive entry into a [`DecodedSprite`]: canonical
//! RGBA8, target color space, bottom-up row order. The row flip happens
//! here and only here - this module is the single source of truth for the
//! axis convention, so no downstream stage ever re-flips.
//!
//! A sprite either decodes completely or not at all: corrupt or unsupported
//! payloads yield `None` plus a logged warning, never partial pixel data.
//!
//! [`decode_all`] fans independent per-sprite decodes out over rayon; there
//! is no shared state and results merge deterministically by key.

mod color;
mod decode;

pub use color::{remap_pixels, ColorSpace};
pub use decode::decode;

use std::collections::BTreeMap;

use bytes::Bytes;
use rayon::prelude::*;
use tracing::debug;

use crate::text::Rgb;

/// A fully decoded sprite sheet.
///
/// Pixels are RGBA8 in the target color space, rows stored bottom-up
/// (row 0 is the visual bottom). `width` and `height` are always nonzero
/// and `pixels.len() == width * height * 4`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedSprite {
    /// Source entry key, e.g. `main.bmp`.
    pub key: String,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
    /// Click hotspot for cursor sprites, in top-down source coordinates.
    pub hotspot: Option<(u16, u16)>,
}

impl DecodedSprite {
    /// Construct from raw top-down RGBA8 rows, flipping to bottom-up.
    ///
    /// Returns `None` for empty dimensions or a mismatched buffer length -
    /// the constructor enforces the type's invariants so no other code has
    /// to re-check them.
    pub fn from_top_down(key: impl Into<String>, width: u32, height: u32, rgba: Vec<u8>) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }
        if rgba.len() != (width as usize) * (height as usize) * 4 {
            return None;
        }
        let stride = width as usize * 4;
        let mut pixels = Vec::with_capacity(rgba.len());
        for row in rgba.chunks_exact(stride).rev() {
            pixels.extend_from_slice(row);
        }
        Some(Self {
            key: key.into(),
            width,
            height,
            pixels,
            hotspot: None,
        })
    }

    /// RGBA of the pixel at (x, y) in bottom-up coordinates.
    ///
    /// # Panics
    ///
    /// Panics if the coordinates are out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        assert!(x < self.width && y < self.height);
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        [
            self.pixels[idx],
            self.pixels[idx + 1],
            self.pixels[idx + 2],
            self.pixels[idx + 3],
        ]
    }

    /// Alpha of the pixel at (x, y), or 0 outside the sprite bounds.
    ///
    /// The out-of-bounds behavior lets contour tracing treat the sprite as
    /// surrounded by transparency.
    pub fn alpha_at(&self, x: i64, y: i64) -> u8 {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return 0;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        self.pixels[idx + 3]
    }

    /// Approximate heap footprint, dominated by the pixel buffer.
    pub fn size_bytes(&self) -> usize {
        self.pixels.len() + self.key.len()
    }
}

/// Decode a set of archive entries in parallel.
///
/// Entries that fail to decode are absent from the result. The merge is
/// keyed and deterministic regardless of rayon's scheduling.
pub fn decode_all(
    entries: &[(String, Bytes)],
    target: ColorSpace,
) -> BTreeMap<String, DecodedSprite> {
    let decoded: Vec<(String, DecodedSprite)> = entries
        .par_iter()
        .filter_map(|(key, bytes)| decode(bytes, key, target).map(|s| (key.clone(), s)))
        .collect();

    let map: BTreeMap<String, DecodedSprite> = decoded.into_iter().collect();
    debug!(requested = entries.len(), decoded = map.len(), "sprite decode pass complete");
    map
}

/// Nearest-neighbor rescale. Pure: the input sprite is untouched.
///
/// Returns `None` when either target dimension is zero.
pub fn scaled(sprite: &DecodedSprite, width: u32, height: u32) -> Option<DecodedSprite> {
    if width == 0 || height == 0 {
        return None;
    }
    let mut pixels = Vec::with_capacity(width as usize * height as usize * 4);
    for y in 0..height {
        let src_y = (y as u64 * sprite.height as u64 / height as u64) as u32;
        for x in 0..width {
            let src_x = (x as u64 * sprite.width as u64 / width as u64) as u32;
            pixels.extend_from_slice(&sprite.pixel(src_x, src_y));
        }
    }
    Some(DecodedSprite {
        key: sprite.key.clone(),
        width,
        height,
        pixels,
        hotspot: sprite.hotspot,
    })
}

/// Multiply the color channels by a tint. Pure; alpha is preserved.
pub fn tinted(sprite: &DecodedSprite, tint: Rgb) -> DecodedSprite {
    let mut pixels = sprite.pixels.clone();
    for px in pixels.chunks_exact_mut(4) {
        px[0] = ((px[0] as u16 * tint.r as u16) / 255) as u8;
        px[1] = ((px[1] as u16 * tint.g as u16) / 255) as u8;
        px[2] = ((px[2] as u16 * tint.b as u16) / 255) as u8;
    }
    DecodedSprite {
        key: sprite.key.clone(),
        pixels,
        ..sprite.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker(key: &str, width: u32, height: u32) -> DecodedSprite {
        let mut rgba = Vec::new();
        for y in 0..height {
            for x in 0..width {
                let v = if (x + y) % 2 == 0 { 255 } else { 0 };
                rgba.extend_from_slice(&[v, v, v, 255]);
            }
        }
        DecodedSprite::from_top_down(key, width, height, rgba).unwrap()
    }

    #[test]
    fn test_from_top_down_flips_rows() {
        // 1x2: red on top, blue on bottom.
        let rgba = vec![255, 0, 0, 255, 0, 0, 255, 255];
        let sprite = DecodedSprite::from_top_down("s", 1, 2, rgba).unwrap();
        // Bottom-up row 0 is the visual bottom: blue.
        assert_eq!(sprite.pixel(0, 0), [0, 0, 255, 255]);
        assert_eq!(sprite.pixel(0, 1), [255, 0, 0, 255]);
    }

    #[test]
    fn test_from_top_down_rejects_bad_dimensions() {
        assert!(DecodedSprite::from_top_down("s", 0, 2, vec![]).is_none());
        assert!(DecodedSprite::from_top_down("s", 1, 1, vec![0; 3]).is_none());
    }

    #[test]
    fn test_alpha_at_outside_is_transparent() {
        let sprite = checker("s", 2, 2);
        assert_eq!(sprite.alpha_at(-1, 0), 0);
        assert_eq!(sprite.alpha_at(0, 2), 0);
        assert_eq!(sprite.alpha_at(0, 0), 255);
    }

    #[test]
    fn test_scaled_dimensions_and_purity() {
        let sprite = checker("s", 4, 4);
        let snapshot = sprite.clone();
        let half = scaled(&sprite, 2, 2).unwrap();
        assert_eq!((half.width, half.height), (2, 2));
        assert_eq!(half.pixels.len(), 16);
        assert_eq!(sprite, snapshot, "input must not be mutated");
        assert!(scaled(&sprite, 0, 2).is_none());
    }

    #[test]
    fn test_scaled_is_idempotent_at_same_size() {
        let sprite = checker("s", 3, 5);
        let same = scaled(&sprite, 3, 5).unwrap();
        assert_eq!(same, sprite);
    }

    #[test]
    fn test_tinted_preserves_alpha() {
        let sprite = checker("s", 2, 2);
        let tinted = tinted(&sprite, Rgb::new(255, 0, 0));
        for px in tinted.pixels.chunks_exact(4) {
            assert_eq!(px[1], 0);
            assert_eq!(px[2], 0);
            assert_eq!(px[3], 255);
        }
        // Full-white tint is the identity on every channel.
        let identity = super::tinted(&sprite, Rgb::new(255, 255, 255));
        assert_eq!(identity, sprite);
    }
}
