//! Shared test fixtures: in-memory archives and sprite payloads.
//!
//! Real skin archives are zip containers, so tests synthesize minimal but
//! structurally honest ones instead of shipping binary fixtures.

use bytes::Bytes;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use std::io::Write;

const LOCAL_MAGIC: u32 = 0x0403_4b50;
const CENTRAL_MAGIC: u32 = 0x0201_4b50;
const EOCD_MAGIC: u32 = 0x0605_4b50;

/// Build a stored-entry zip container.
pub(crate) fn build_archive(entries: &[(&str, &[u8])]) -> Bytes {
    build_archive_with(entries, false)
}

/// Build a zip container, optionally DEFLATE-compressing every entry.
pub(crate) fn build_archive_with(entries: &[(&str, &[u8])], deflate: bool) -> Bytes {
    let mut out = Vec::new();
    let mut central: Vec<(String, u16, u32, u32, u32)> = Vec::new();
    let mut offsets = Vec::new();

    for (name, data) in entries {
        offsets.push(out.len() as u32);
        let crc = crc32fast::hash(data);
        let (method, payload): (u16, Vec<u8>) = if deflate {
            let mut enc = DeflateEncoder::new(Vec::new(), Compression::default());
            enc.write_all(data).unwrap();
            (8, enc.finish().unwrap())
        } else {
            (0, data.to_vec())
        };

        out.extend_from_slice(&LOCAL_MAGIC.to_le_bytes());
        out.extend_from_slice(&20u16.to_le_bytes()); // version needed
        out.extend_from_slice(&0u16.to_le_bytes()); // flags
        out.extend_from_slice(&method.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes()); // dos time/date
        out.extend_from_slice(&crc.to_le_bytes());
        out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(&(name.len() as u16).to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes()); // extra len
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(&payload);

        central.push((name.to_string(), method, crc, payload.len() as u32, data.len() as u32));
    }

    let dir_offset = out.len() as u32;
    for (i, (name, method, crc, csize, usize_)) in central.iter().enumerate() {
        out.extend_from_slice(&CENTRAL_MAGIC.to_le_bytes());
        out.extend_from_slice(&20u16.to_le_bytes()); // version made by
        out.extend_from_slice(&20u16.to_le_bytes()); // version needed
        out.extend_from_slice(&0u16.to_le_bytes()); // flags
        out.extend_from_slice(&method.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes()); // dos time/date
        out.extend_from_slice(&crc.to_le_bytes());
        out.extend_from_slice(&csize.to_le_bytes());
        out.extend_from_slice(&usize_.to_le_bytes());
        out.extend_from_slice(&(name.len() as u16).to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes()); // extra len
        out.extend_from_slice(&0u16.to_le_bytes()); // comment len
        out.extend_from_slice(&0u16.to_le_bytes()); // disk number
        out.extend_from_slice(&0u16.to_le_bytes()); // internal attrs
        out.extend_from_slice(&0u32.to_le_bytes()); // external attrs
        out.extend_from_slice(&offsets[i].to_le_bytes());
        out.extend_from_slice(name.as_bytes());
    }
    let dir_len = out.len() as u32 - dir_offset;

    out.extend_from_slice(&EOCD_MAGIC.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes()); // disk number
    out.extend_from_slice(&0u16.to_le_bytes()); // dir start disk
    out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    out.extend_from_slice(&dir_len.to_le_bytes());
    out.extend_from_slice(&dir_offset.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes()); // comment len

    Bytes::from(out)
}

/// Encode an RGBA buffer as a PNG payload.
pub(crate) fn png_bytes(width: u32, height: u32, rgba: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    PngEncoder::new(&mut out)
        .write_image(rgba, width, height, ExtendedColorType::Rgba8)
        .unwrap();
    out
}

/// Solid-color RGBA buffer.
pub(crate) fn solid_rgba(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
    color
        .iter()
        .copied()
        .cycle()
        .take((width * height * 4) as usize)
        .collect()
}
