//! End-to-end conversion tests against synthesized skin archives.
//!
//! These exercise the whole pipeline through the public API: archive in,
//! package out, through the cache. Archives are built in memory - real
//! skins are zip containers, and a structurally honest one is only a few
//! dozen lines to synthesize.

use std::collections::BTreeSet;
use std::sync::Arc;

use skinforge::bytes::Bytes;
use skinforge::cache::{CacheConfig, ConversionCache};
use skinforge::package::DiagnosticKind;
use skinforge::text::Rgb;
use skinforge::{ConvertConfig, Converter};

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};

/// Build a stored-entry zip container.
fn build_archive(entries: &[(&str, &[u8])]) -> Bytes {
    let mut out = Vec::new();
    let mut central = Vec::new();

    for (name, data) in entries {
        let offset = out.len() as u32;
        let crc = crc32fast::hash(data);
        out.extend_from_slice(&0x0403_4b50u32.to_le_bytes());
        out.extend_from_slice(&20u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes()); // stored
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&crc.to_le_bytes());
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(&(data.len() as u32).to_le_bytes());
        out.extend_from_slice(&(name.len() as u16).to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(data);
        central.push((name.to_string(), crc, data.len() as u32, offset));
    }

    let dir_offset = out.len() as u32;
    for (name, crc, size, offset) in &central {
        out.extend_from_slice(&0x0201_4b50u32.to_le_bytes());
        out.extend_from_slice(&20u16.to_le_bytes());
        out.extend_from_slice(&20u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes()); // stored
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&crc.to_le_bytes());
        out.extend_from_slice(&size.to_le_bytes());
        out.extend_from_slice(&size.to_le_bytes());
        out.extend_from_slice(&(name.len() as u16).to_le_bytes());
        out.extend_from_slice(&[0u8; 12]); // extra/comment/disk/attrs
        out.extend_from_slice(&offset.to_le_bytes());
        out.extend_from_slice(name.as_bytes());
    }
    let dir_len = out.len() as u32 - dir_offset;

    out.extend_from_slice(&0x0605_4b50u32.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    out.extend_from_slice(&dir_len.to_le_bytes());
    out.extend_from_slice(&dir_offset.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());

    Bytes::from(out)
}

fn png_bytes(width: u32, height: u32, rgba: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    PngEncoder::new(&mut out)
        .write_image(rgba, width, height, ExtendedColorType::Rgba8)
        .unwrap();
    out
}

/// A 275x116 main sheet with transparent top corners, like a real skin
/// with a shaped title bar.
fn shaped_main_png() -> Vec<u8> {
    let (w, h) = (275u32, 116u32);
    let mut rgba = Vec::with_capacity((w * h * 4) as usize);
    for y in 0..h {
        for x in 0..w {
            let corner = y < 8 && (x < 8 || x >= w - 8);
            if corner {
                rgba.extend_from_slice(&[0, 0, 0, 0]);
            } else {
                rgba.extend_from_slice(&[60, 70, 80, 255]);
            }
        }
    }
    png_bytes(w, h, &rgba)
}

/// Full-featured archive: shaped main sheet, palette, metadata, regions.
fn full_archive() -> Bytes {
    let main = shaped_main_png();
    build_archive(&[
        ("Main.bmp", &main),
        ("PLEDIT.TXT", b"Normal=#00FF00\r\nCurrent=RGB(255,255,0)\r\n"),
        (
            "region.txt",
            b"[Normal]\r\nNumPoints=4\r\nPointList=0,0, 275,0, 275,116, 0,116\r\n",
        ),
        ("skin.txt", b"Skin Name: Integration Test\nAuthor: Tests\nVersion: 0.1\n"),
    ])
}

#[test]
fn full_archive_converts_with_declared_geometry() {
    let package = Converter::default().convert(&full_archive()).unwrap();

    assert_eq!(package.metadata.name, "Integration Test");
    assert_eq!(package.metadata.author, "Tests");
    assert_eq!(package.window_size, (275, 116));
    assert_eq!(package.color_scheme["Normal"], Rgb::new(0, 255, 0));
    assert_eq!(package.color_scheme["Current"], Rgb::new(255, 255, 0));

    // Declared region wins over alpha tracing.
    let silhouette = package.window_silhouette.as_ref().unwrap();
    assert_eq!(silhouette.polygons().len(), 1);
    assert_eq!(silhouette.polygons()[0].len(), 4);
    assert!(!package
        .diagnostics
        .iter()
        .any(|d| d.kind == DiagnosticKind::RegionFallback));
}

#[test]
fn sprite_only_archive_falls_back_to_alpha_silhouette() {
    let main = shaped_main_png();
    let bytes = build_archive(&[("main.bmp", &main)]);
    let package = Converter::default().convert(&bytes).unwrap();

    let silhouette = package.window_silhouette.as_ref().expect("traced silhouette");
    // Center is clickable, the cut corners are not.
    assert!(silhouette.contains_pixel(137, 58));
    assert!(!silhouette.contains_pixel(2, 113));
    assert!(!silhouette.contains_pixel(273, 113));

    // Degradation is recorded, not fatal.
    assert!(package
        .diagnostics
        .iter()
        .any(|d| d.kind == DiagnosticKind::RegionFallback));
    assert!(package
        .diagnostics
        .iter()
        .any(|d| d.kind == DiagnosticKind::ConfigMissing));
}

#[test]
fn packing_is_complete_across_pages() {
    let package = Converter::new(ConvertConfig::default().with_page_size(256))
        .convert(&full_archive())
        .unwrap();

    let placed: BTreeSet<&str> = package
        .atlas_pages
        .iter()
        .flat_map(|p| p.placements.keys().map(String::as_str))
        .collect();

    // Every standard sheet is placed exactly once, decoded or substituted.
    for &(name, _, _) in skinforge::assemble::STANDARD_SHEETS {
        assert!(placed.contains(name), "missing placement for {name}");
    }
    let placements: usize = package.atlas_pages.iter().map(|p| p.placements.len()).sum();
    assert_eq!(placements, placed.len(), "no key may be placed twice");

    // Non-overlap within every page.
    for page in &package.atlas_pages {
        let rects: Vec<_> = page.placements.values().collect();
        for (i, a) in rects.iter().enumerate() {
            for b in &rects[i + 1..] {
                assert!(!a.intersects(b));
            }
        }
    }
}

#[test]
fn conversion_is_bit_reproducible() {
    let bytes = full_archive();
    let converter = Converter::default();
    let first = converter.convert(&bytes).unwrap();
    let second = converter.convert(&bytes).unwrap();
    assert_eq!(first, second);
}

#[tokio::test(flavor = "multi_thread")]
async fn cache_deduplicates_concurrent_conversions() {
    let cache = Arc::new(ConversionCache::new(
        Converter::default(),
        CacheConfig::default(),
    ));
    let bytes = full_archive();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let cache = Arc::clone(&cache);
        let bytes = bytes.clone();
        handles.push(tokio::spawn(async move { cache.get(&bytes).await.unwrap() }));
    }

    let mut packages = Vec::new();
    for handle in handles {
        packages.push(handle.await.unwrap());
    }
    for package in &packages[1..] {
        assert!(Arc::ptr_eq(&packages[0], package));
    }
    assert_eq!(cache.stats().misses, 1);
}
