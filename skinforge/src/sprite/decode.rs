//! Bitmap payload decoding.
//!
//! Three payload families appear in real archives: legacy uncompressed
//! bitmaps (BMP), modern compressed images (PNG), and cursor containers
//! (CUR/ICO) whose frames embed either a raw DIB or a PNG. Dispatch is by
//! content signature, never by file extension - legacy tooling lied about
//! extensions routinely.
//!
//! Legacy bitmaps have no alpha channel; the pure-magenta color key
//! (255, 0, 255) convention marks transparent pixels and is converted to
//! real alpha here so the geometry stage can trace silhouettes uniformly.

use image::ImageFormat;
use tracing::warn;

use super::{color, ColorSpace, DecodedSprite};

/// PNG file signature.
const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
/// BMP file signature.
const BMP_MAGIC: &[u8] = b"BM";

/// Decode one payload into a sprite, or `None` with a logged warning.
///
/// The returned sprite is RGBA8 in the `target` color space with bottom-up
/// rows. Decode failure never yields partial data.
pub fn decode(bytes: &[u8], key: &str, target: ColorSpace) -> Option<DecodedSprite> {
    let sprite = if bytes.starts_with(PNG_MAGIC) {
        decode_image(bytes, key, ImageFormat::Png, false)
    } else if bytes.starts_with(BMP_MAGIC) {
        decode_image(bytes, key, ImageFormat::Bmp, true)
    } else if is_cursor(bytes) {
        decode_cursor(bytes, key)
    } else {
        warn!(key, "unrecognized bitmap payload signature");
        None
    };

    sprite.map(|mut s| {
        color::remap_pixels(&mut s.pixels, target);
        s
    })
}

/// Decode a BMP or PNG payload via the image crate.
fn decode_image(bytes: &[u8], key: &str, format: ImageFormat, color_key: bool) -> Option<DecodedSprite> {
    let image = match image::load_from_memory_with_format(bytes, format) {
        Ok(image) => image.to_rgba8(),
        Err(err) => {
            warn!(key, %err, "bitmap decode failed");
            return None;
        }
    };

    let (width, height) = image.dimensions();
    let mut rgba = image.into_raw();
    if color_key {
        apply_magenta_key(&mut rgba);
    }
    DecodedSprite::from_top_down(key, width, height, rgba)
}

/// Convert the legacy pure-magenta color key to transparency.
///
/// Zeroing the color channels as well keeps atlas edge sampling from
/// bleeding magenta into neighboring texels.
fn apply_magenta_key(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        if px[0] == 255 && px[1] == 0 && px[2] == 255 {
            px.copy_from_slice(&[0, 0, 0, 0]);
        }
    }
}

/// True if the payload looks like an ICO/CUR container.
fn is_cursor(bytes: &[u8]) -> bool {
    bytes.len() >= 6
        && read_u16(bytes, 0) == Some(0)
        && matches!(read_u16(bytes, 2), Some(1) | Some(2))
        && read_u16(bytes, 4).is_some_and(|count| count > 0)
}

/// Decode the first frame of a CUR/ICO container.
///
/// The frame payload is either a PNG or a raw DIB with doubled height
/// (XOR color rows followed by a 1-bit AND transparency mask).
fn decode_cursor(bytes: &[u8], key: &str) -> Option<DecodedSprite> {
    let hotspot_x = read_u16(bytes, 10)?;
    let hotspot_y = read_u16(bytes, 12)?;
    let size = read_u32(bytes, 14)? as usize;
    let offset = read_u32(bytes, 18)? as usize;
    let payload = bytes.get(offset..offset.checked_add(size)?)?;

    let mut sprite = if payload.starts_with(PNG_MAGIC) {
        decode_image(payload, key, ImageFormat::Png, false)
    } else {
        decode_dib_frame(payload, key)
    }?;

    sprite.hotspot = Some((hotspot_x, hotspot_y));
    Some(sprite)
}

/// Decode a raw cursor DIB frame.
///
/// Supports the uncompressed sub-formats legacy cursor editors produced:
/// 1/4/8-bit paletted, 24-bit BGR and 32-bit BGRA. Anything else (RLE,
/// bitfields) is rejected as unsupported.
fn decode_dib_frame(dib: &[u8], key: &str) -> Option<DecodedSprite> {
    let header_size = read_u32(dib, 0)? as usize;
    let width = read_u32(dib, 4)? as usize;
    let doubled_height = read_u32(dib, 8)? as usize;
    let bit_count = read_u16(dib, 14)? as usize;
    let compression = read_u32(dib, 16)?;

    let height = doubled_height / 2;
    if header_size < 40
        || width == 0
        || height == 0
        || doubled_height % 2 != 0
        || width > 1024
        || height > 1024
        || compression != 0
    {
        warn!(key, width, height, bit_count, "unsupported cursor frame geometry");
        return None;
    }

    let palette_len = match bit_count {
        1 | 4 | 8 => {
            let declared = read_u32(dib, 32)? as usize;
            if declared == 0 { 1 << bit_count } else { declared }
        }
        24 | 32 => 0,
        other => {
            warn!(key, bit_count = other, "unsupported cursor bit depth");
            return None;
        }
    };
    let palette = dib.get(header_size..header_size + palette_len * 4)?;

    // DIB rows are bottom-up and padded to 4-byte boundaries.
    let xor_stride = (width * bit_count).div_ceil(32) * 4;
    let and_stride = width.div_ceil(32) * 4;
    let xor_start = header_size + palette_len * 4;
    let and_start = xor_start + xor_stride * height;
    let xor = dib.get(xor_start..and_start)?;
    let and = dib.get(and_start..and_start + and_stride * height)?;

    // 32-bit frames may carry real alpha in the XOR data; if every alpha
    // byte is zero the frame predates alpha cursors and the AND mask rules.
    let xor_has_alpha =
        bit_count == 32 && xor.chunks_exact(4).any(|px| px[3] != 0);

    let mut rgba = vec![0u8; width * height * 4];
    for row in 0..height {
        // Row 0 of the DIB is the visual bottom; emit top-down here and let
        // the sprite constructor apply the canonical flip.
        let top_down_row = height - 1 - row;
        let xor_row = &xor[row * xor_stride..];
        let and_row = &and[row * and_stride..];

        for x in 0..width {
            let [b, g, r, a] = match bit_count {
                32 => [
                    xor_row[x * 4],
                    xor_row[x * 4 + 1],
                    xor_row[x * 4 + 2],
                    xor_row[x * 4 + 3],
                ],
                24 => [xor_row[x * 3], xor_row[x * 3 + 1], xor_row[x * 3 + 2], 0],
                _ => {
                    let index = palette_index(xor_row, x, bit_count);
                    let entry = palette.get(index * 4..index * 4 + 4)?;
                    [entry[0], entry[1], entry[2], 0]
                }
            };

            let masked_out = and_row[x / 8] & (0x80 >> (x % 8)) != 0;
            let alpha = if xor_has_alpha {
                a
            } else if masked_out {
                0
            } else {
                255
            };

            let dst = (top_down_row * width + x) * 4;
            rgba[dst..dst + 4].copy_from_slice(&[r, g, b, alpha]);
        }
    }

    DecodedSprite::from_top_down(key, width as u32, height as u32, rgba)
}

/// Palette index of pixel `x` in a 1/4/8-bit row.
fn palette_index(row: &[u8], x: usize, bit_count: usize) -> usize {
    match bit_count {
        8 => row[x] as usize,
        4 => {
            let byte = row[x / 2];
            if x % 2 == 0 { (byte >> 4) as usize } else { (byte & 0x0F) as usize }
        }
        _ => {
            let byte = row[x / 8];
            ((byte >> (7 - x % 8)) & 1) as usize
        }
    }
}

fn read_u16(bytes: &[u8], offset: usize) -> Option<u16> {
    Some(u16::from_le_bytes([
        *bytes.get(offset)?,
        *bytes.get(offset + 1)?,
    ]))
}

fn read_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    Some(u32::from_le_bytes([
        *bytes.get(offset)?,
        *bytes.get(offset + 1)?,
        *bytes.get(offset + 2)?,
        *bytes.get(offset + 3)?,
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::codecs::bmp::BmpEncoder;
    use image::codecs::png::PngEncoder;
    use image::{ExtendedColorType, ImageEncoder, RgbaImage};

    fn png_bytes(width: u32, height: u32, rgba: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        PngEncoder::new(&mut out)
            .write_image(rgba, width, height, ExtendedColorType::Rgba8)
            .unwrap();
        out
    }

    fn bmp_bytes(width: u32, height: u32, rgba: &[u8]) -> Vec<u8> {
        let image = RgbaImage::from_raw(width, height, rgba.to_vec()).unwrap();
        let rgb = image::DynamicImage::ImageRgba8(image).to_rgb8();
        let mut out = Vec::new();
        BmpEncoder::new(&mut out)
            .encode(rgb.as_raw(), width, height, ExtendedColorType::Rgb8)
            .unwrap();
        out
    }

    /// Build a 32-bit cursor container with one 2x2 frame.
    fn cursor_bytes(with_alpha: bool) -> Vec<u8> {
        let mut out = Vec::new();
        // ICONDIR: reserved, type 2 (cursor), one entry.
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&2u16.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        // ICONDIRENTRY
        out.push(2); // width
        out.push(2); // height
        out.push(0); // colors
        out.push(0); // reserved
        out.extend_from_slice(&1u16.to_le_bytes()); // hotspot x
        out.extend_from_slice(&0u16.to_le_bytes()); // hotspot y

        let mut dib = Vec::new();
        dib.extend_from_slice(&40u32.to_le_bytes()); // header size
        dib.extend_from_slice(&2u32.to_le_bytes()); // width
        dib.extend_from_slice(&4u32.to_le_bytes()); // doubled height
        dib.extend_from_slice(&1u16.to_le_bytes()); // planes
        dib.extend_from_slice(&32u16.to_le_bytes()); // bit count
        dib.extend_from_slice(&[0u8; 24]); // compression + remaining fields
        let alpha = if with_alpha { 200 } else { 0 };
        // XOR rows, bottom-up, BGRA: bottom row green, top row red.
        dib.extend_from_slice(&[0, 255, 0, alpha, 0, 255, 0, alpha]);
        dib.extend_from_slice(&[0, 0, 255, alpha, 0, 0, 255, alpha]);
        // AND mask: bottom row transparent (bits set), top row opaque.
        dib.extend_from_slice(&[0b1100_0000, 0, 0, 0]);
        dib.extend_from_slice(&[0b0000_0000, 0, 0, 0]);

        out.extend_from_slice(&(dib.len() as u32).to_le_bytes());
        out.extend_from_slice(&22u32.to_le_bytes()); // frame offset
        out.extend_from_slice(&dib);
        out
    }

    #[test]
    fn test_decode_png() {
        let rgba = [255, 0, 0, 255, 0, 255, 0, 128, 0, 0, 255, 0, 9, 9, 9, 9];
        let sprite = decode(&png_bytes(2, 2, &rgba), "test.png", ColorSpace::Srgb).unwrap();
        assert_eq!((sprite.width, sprite.height), (2, 2));
        // Top-down (0,0) red lands at bottom-up (0, 1).
        assert_eq!(sprite.pixel(0, 1), [255, 0, 0, 255]);
    }

    #[test]
    fn test_decode_bmp_applies_magenta_key() {
        let rgba = [
            255, 0, 255, 255, // magenta, keyed out
            10, 20, 30, 255, //
            40, 50, 60, 255, //
            255, 0, 255, 255, // magenta, keyed out
        ];
        let sprite = decode(&bmp_bytes(2, 2, &rgba), "main.bmp", ColorSpace::Srgb).unwrap();
        assert_eq!(sprite.pixel(0, 1), [0, 0, 0, 0]);
        assert_eq!(sprite.pixel(1, 1), [10, 20, 30, 255]);
        assert_eq!(sprite.pixel(1, 0), [0, 0, 0, 0]);
    }

    #[test]
    fn test_decode_cursor_and_mask() {
        let sprite = decode(&cursor_bytes(false), "cursor.cur", ColorSpace::Srgb).unwrap();
        assert_eq!((sprite.width, sprite.height), (2, 2));
        assert_eq!(sprite.hotspot, Some((1, 0)));
        // Bottom DIB row is green and masked out by the AND mask.
        assert_eq!(sprite.pixel(0, 0), [0, 255, 0, 0]);
        // Top DIB row is red and opaque.
        assert_eq!(sprite.pixel(0, 1), [255, 0, 0, 255]);
    }

    #[test]
    fn test_decode_cursor_embedded_alpha_wins() {
        let sprite = decode(&cursor_bytes(true), "cursor.cur", ColorSpace::Srgb).unwrap();
        // With real alpha present the AND mask is ignored.
        assert_eq!(sprite.pixel(0, 0), [0, 255, 0, 200]);
        assert_eq!(sprite.pixel(0, 1), [255, 0, 0, 200]);
    }

    #[test]
    fn test_truncated_payload_yields_none() {
        let png = png_bytes(4, 4, &[128; 64]);
        assert!(decode(&png[..12], "cut.png", ColorSpace::Srgb).is_none());
        let cur = cursor_bytes(false);
        assert!(decode(&cur[..20], "cut.cur", ColorSpace::Srgb).is_none());
    }

    #[test]
    fn test_unknown_signature_yields_none() {
        assert!(decode(b"GIF89a not supported here", "x.gif", ColorSpace::Srgb).is_none());
    }

    #[test]
    fn test_decode_is_deterministic() {
        let png = png_bytes(3, 3, &[77; 36]);
        let a = decode(&png, "a", ColorSpace::Linear).unwrap();
        let b = decode(&png, "a", ColorSpace::Linear).unwrap();
        assert_eq!(a, b);
    }
}
