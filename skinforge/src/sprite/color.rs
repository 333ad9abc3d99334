//! Color-space remapping.
//!
//! Legacy skin bitmaps were authored on sRGB displays. Consumers that
//! composite in a linear working space need a remap at decode time, and the
//! remap must be bit-reproducible because atlas pixels feed the conversion
//! cache key invariants. The transform is a per-channel 256-entry lookup
//! table built once per process; identical inputs always produce identical
//! outputs, and a same-space remap is the identity.

use std::sync::OnceLock;

use serde::Serialize;

/// A color working space for decoded sprite pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ColorSpace {
    /// The legacy source space. Remapping sRGB -> sRGB is the identity.
    #[default]
    Srgb,
    /// Linear light, for consumers that composite linearly.
    Linear,
}

/// The sRGB electro-optical transfer function, quantized back to 8 bits.
fn srgb_to_linear_lut() -> &'static [u8; 256] {
    static LUT: OnceLock<[u8; 256]> = OnceLock::new();
    LUT.get_or_init(|| {
        let mut lut = [0u8; 256];
        for (i, slot) in lut.iter_mut().enumerate() {
            let c = i as f64 / 255.0;
            let linear = if c <= 0.04045 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            };
            *slot = (linear * 255.0).round() as u8;
        }
        lut
    })
}

/// Remap an RGBA8 buffer from the legacy source space to `target`, in place.
///
/// Alpha is coverage, not color; it is never remapped. Identity when the
/// target equals the source space.
pub fn remap_pixels(pixels: &mut [u8], target: ColorSpace) {
    match target {
        ColorSpace::Srgb => {}
        ColorSpace::Linear => {
            let lut = srgb_to_linear_lut();
            for px in pixels.chunks_exact_mut(4) {
                px[0] = lut[px[0] as usize];
                px[1] = lut[px[1] as usize];
                px[2] = lut[px[2] as usize];
            }
        }
    }
}
