//! `skinforge convert` - archive to asset directory.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use serde::Serialize;
use tracing::info;

use skinforge::atlas::{AtlasPage, PixelRect};
use skinforge::geometry::HitRegionGeometry;
use skinforge::text::{Rgb, SkinMetadata};
use skinforge::{ConvertConfig, Converter, Diagnostic};

use crate::commands::read_archive;
use crate::error::CliError;

#[derive(Debug, Args)]
pub struct ConvertArgs {
    /// Path to the skin archive
    pub archive: PathBuf,

    /// Output directory (created if absent)
    #[arg(short, long, default_value = "skin-out")]
    pub out: PathBuf,

    /// Atlas page edge in texels
    #[arg(long, default_value_t = skinforge::convert::DEFAULT_PAGE_SIZE)]
    pub page_size: u32,

    /// Alpha threshold for silhouette tracing
    #[arg(long, default_value_t = skinforge::convert::DEFAULT_ALPHA_THRESHOLD)]
    pub alpha_threshold: u8,
}

/// Manifest describing one exported atlas page.
#[derive(Serialize)]
struct PageManifest<'a> {
    texture: String,
    width: u32,
    height: u32,
    placements: &'a std::collections::BTreeMap<String, PixelRect>,
}

/// The `skin.json` document written next to the page textures.
#[derive(Serialize)]
struct Manifest<'a> {
    format_version: u32,
    metadata: &'a SkinMetadata,
    window_size: (u32, u32),
    pages: Vec<PageManifest<'a>>,
    hit_regions: &'a std::collections::BTreeMap<String, HitRegionGeometry>,
    window_silhouette: &'a Option<HitRegionGeometry>,
    color_scheme: &'a std::collections::BTreeMap<String, Rgb>,
    cursor_hotspots: &'a std::collections::BTreeMap<String, (u16, u16)>,
    diagnostics: &'a [Diagnostic],
}

pub fn run(args: ConvertArgs) -> Result<(), CliError> {
    let bytes = read_archive(&args.archive)?;

    let config = ConvertConfig::default()
        .with_page_size(args.page_size)
        .with_alpha_threshold(args.alpha_threshold);
    let package = Converter::new(config).convert(&bytes)?;

    fs::create_dir_all(&args.out).map_err(|e| write_error(&args.out, e))?;

    let mut pages = Vec::new();
    for page in &package.atlas_pages {
        let texture = format!("page_{}.png", page.texture_id);
        write_page_png(&args.out.join(&texture), page)?;
        pages.push(PageManifest {
            texture,
            width: page.width,
            height: page.height,
            placements: &page.placements,
        });
    }

    let manifest = Manifest {
        format_version: skinforge::FORMAT_VERSION,
        metadata: &package.metadata,
        window_size: package.window_size,
        pages,
        hit_regions: &package.hit_regions,
        window_silhouette: &package.window_silhouette,
        color_scheme: &package.color_scheme,
        cursor_hotspots: &package.cursor_hotspots,
        diagnostics: &package.diagnostics,
    };
    let manifest_path = args.out.join("skin.json");
    let json = serde_json::to_string_pretty(&manifest)
        .map_err(|e| write_error(&manifest_path, e))?;
    fs::write(&manifest_path, json).map_err(|e| write_error(&manifest_path, e))?;

    info!(out = %args.out.display(), pages = package.atlas_pages.len(), "conversion written");
    println!("{}", package.summary());
    Ok(())
}

/// Write one atlas page as a top-down PNG.
///
/// Page texels are stored bottom-up (the pipeline's axis convention);
/// image files are top-down, so rows flip here at the export boundary.
fn write_page_png(path: &Path, page: &AtlasPage) -> Result<(), CliError> {
    let stride = page.width as usize * 4;
    let top_down: Vec<u8> = page
        .pixels
        .chunks_exact(stride)
        .rev()
        .flatten()
        .copied()
        .collect();

    let file = fs::File::create(path).map_err(|e| write_error(path, e))?;
    PngEncoder::new(file)
        .write_image(&top_down, page.width, page.height, ExtendedColorType::Rgba8)
        .map_err(|e| write_error(path, e))?;
    Ok(())
}

fn write_error(path: &Path, error: impl std::fmt::Display) -> CliError {
    CliError::WriteOutput {
        path: path.to_path_buf(),
        message: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn tiny_page() -> AtlasPage {
        // 1x2 page, bottom-up: row 0 blue, row 1 red.
        AtlasPage {
            texture_id: 0,
            width: 1,
            height: 2,
            pixels: vec![0, 0, 255, 255, 255, 0, 0, 255],
            placements: BTreeMap::new(),
        }
    }

    #[test]
    fn test_page_png_is_written_top_down() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page_0.png");
        write_page_png(&path, &tiny_page()).unwrap();

        let decoded = image::open(&path).unwrap().to_rgba8();
        // Top-down row 0 must be the visual top: red.
        assert_eq!(decoded.get_pixel(0, 0).0, [255, 0, 0, 255]);
        assert_eq!(decoded.get_pixel(0, 1).0, [0, 0, 255, 255]);
    }

    #[test]
    fn test_write_error_carries_path() {
        let path = Path::new("/nonexistent-dir/x.png");
        let err = write_page_png(path, &tiny_page()).unwrap_err();
        assert!(err.to_string().contains("nonexistent-dir"));
    }
}
