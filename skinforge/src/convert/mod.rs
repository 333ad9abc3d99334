//! The conversion pipeline.
//!
//! One conversion is a fixed, non-interleaved sequence of stages:
//!
//! ```text
//! read -> parse/decode -> geometry/pack -> assemble
//! ```
//!
//! Each stage is a pure or near-pure transform with no shared mutable
//! state, so a conversion is deterministic end to end. Cancellation is
//! cooperative and checked at stage boundaries; a cancelled conversion
//! discards everything it produced.
//!
//! The pipeline body is synchronous and CPU-bound by design - only
//! archive-byte acquisition is asynchronous, and that happens before the
//! converter is called. Callers on UI-facing threads should run
//! [`Converter::convert`] through `spawn_blocking`, which is exactly what
//! [`crate::cache::ConversionCache`] does.

mod config;
mod error;

pub use config::{
    ConvertConfig, DEFAULT_ALPHA_THRESHOLD, DEFAULT_PAGE_SIZE, DEFAULT_PLACEHOLDER_COLOR,
};
pub use error::ConvertError;

use std::collections::BTreeMap;

use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::archive::SkinArchive;
use crate::assemble::{self, AssemblyParts};
use crate::atlas::{self, AtlasPage};
use crate::geometry::{self, HitRegionGeometry};
use crate::package::{Diagnostic, DiagnosticKind, SkinPackage};
use crate::sprite::{self, DecodedSprite};
use crate::text::{self, RegionDefinition, Rgb, SkinMetadata};

/// Converter output format version.
///
/// Participates in cache keys: bump it whenever any pipeline change can
/// alter packed output, and stale cached layouts invalidate themselves.
pub const FORMAT_VERSION: u32 = 1;

/// File extensions that hold bitmap payloads.
const BITMAP_EXTENSIONS: &[&str] = &[".bmp", ".png", ".cur"];

/// Entry names tried for each text config, in preference order.
const PALETTE_FILES: &[&str] = &["pledit.txt"];
const REGION_FILES: &[&str] = &["region.txt"];
const METADATA_FILES: &[&str] = &["skin.txt", "readme.txt", "about.txt"];

/// Converts skin archives into packages.
///
/// Stateless apart from its config; cheap to share behind an `Arc`.
/// Conversions on one converter are independent and may run concurrently.
#[derive(Debug, Clone, Default)]
pub struct Converter {
    config: ConvertConfig,
}

impl Converter {
    pub fn new(config: ConvertConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ConvertConfig {
        &self.config
    }

    /// Convert an archive, never cancelling.
    pub fn convert(&self, bytes: &Bytes) -> Result<SkinPackage, ConvertError> {
        self.convert_cancellable(bytes, &CancellationToken::new())
    }

    /// Convert an archive with cooperative cancellation.
    ///
    /// The token is checked between stages; once a check fails the
    /// conversion returns [`ConvertError::Cancelled`] and every partial
    /// result is dropped.
    ///
    /// # Errors
    ///
    /// [`ConvertError::Archive`] when the container fails structural
    /// validation. All other damage degrades into package diagnostics.
    #[instrument(skip(self, bytes, cancel), fields(input_bytes = bytes.len()))]
    pub fn convert_cancellable(
        &self,
        bytes: &Bytes,
        cancel: &CancellationToken,
    ) -> Result<SkinPackage, ConvertError> {
        let mut diagnostics = Vec::new();

        let archive = read_stage(bytes, &mut diagnostics)?;
        checkpoint(cancel)?;

        let (color_scheme, region_defs, metadata) = parse_stage(&archive, &mut diagnostics);
        let mut sprites = decode_stage(&archive, &self.config, &mut diagnostics);
        checkpoint(cancel)?;

        assemble::substitute_missing_sheets(
            &mut sprites,
            self.config.placeholder_color,
            &mut diagnostics,
        );
        let hit_regions = geometry_stage(&region_defs, &sprites, &mut diagnostics);
        let atlas_pages = pack_stage(&sprites, self.config.page_size, &mut diagnostics);
        checkpoint(cancel)?;

        let package = assemble::assemble(
            AssemblyParts {
                atlas_pages,
                hit_regions,
                color_scheme,
                metadata,
                diagnostics,
            },
            &sprites,
            self.config.alpha_threshold,
        );
        Ok(package)
    }
}

/// Fail fast if the conversion was cancelled.
fn checkpoint(cancel: &CancellationToken) -> Result<(), ConvertError> {
    if cancel.is_cancelled() {
        return Err(ConvertError::Cancelled);
    }
    Ok(())
}

/// Stage 1: open and validate the archive.
#[instrument(skip_all)]
fn read_stage(bytes: &Bytes, diagnostics: &mut Vec<Diagnostic>) -> Result<SkinArchive, ConvertError> {
    let archive = SkinArchive::open(bytes)?;
    for path in archive.skipped() {
        diagnostics.push(Diagnostic::new(
            DiagnosticKind::EntryUnreadable,
            path.clone(),
            "entry present but unreadable, skipped".to_string(),
        ));
    }
    Ok(archive)
}

/// Stage 2a: parse the embedded text configs.
#[instrument(skip_all)]
fn parse_stage(
    archive: &SkinArchive,
    diagnostics: &mut Vec<Diagnostic>,
) -> (BTreeMap<String, Rgb>, Vec<RegionDefinition>, SkinMetadata) {
    let color_scheme = match find_text(archive, PALETTE_FILES) {
        Some(text) => text::parse_color_scheme(&text),
        None => {
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::ConfigMissing,
                PALETTE_FILES[0],
                "no palette config, default color scheme used".to_string(),
            ));
            text::default_color_scheme()
        }
    };

    let region_defs = match find_text(archive, REGION_FILES) {
        Some(text) => text::parse_regions(&text),
        None => {
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::ConfigMissing,
                REGION_FILES[0],
                "no region declarations, geometry will fall back to alpha".to_string(),
            ));
            Vec::new()
        }
    };

    let metadata = match find_text(archive, METADATA_FILES) {
        Some(text) => text::parse_metadata(&text),
        None => {
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::ConfigMissing,
                METADATA_FILES[0],
                "no metadata config, fields default to Unknown".to_string(),
            ));
            SkinMetadata::default()
        }
    };

    (color_scheme, region_defs, metadata)
}

/// First present entry among `names`, decoded as text.
fn find_text(archive: &SkinArchive, names: &[&str]) -> Option<String> {
    names
        .iter()
        .find_map(|name| archive.entry(name))
        .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
}

/// Stage 2b: decode every bitmap entry, in parallel.
///
/// Sprites are keyed by file name (directory prefixes dropped), matching
/// how sheets are referenced everywhere downstream. When two entries
/// collide on a file name the first in path order wins.
#[instrument(skip_all)]
fn decode_stage(
    archive: &SkinArchive,
    config: &ConvertConfig,
    diagnostics: &mut Vec<Diagnostic>,
) -> BTreeMap<String, DecodedSprite> {
    let mut inputs: Vec<(String, Bytes)> = Vec::new();
    for (path, bytes) in archive.entries() {
        if !BITMAP_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
            continue;
        }
        let key = path.rsplit('/').next().unwrap_or(path).to_string();
        if !inputs.iter().any(|(existing, _)| *existing == key) {
            inputs.push((key, bytes.clone()));
        }
    }

    let sprites = sprite::decode_all(&inputs, config.target_color_space);

    for (key, _) in &inputs {
        if !sprites.contains_key(key) {
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::SpriteCorrupt,
                key.clone(),
                "bitmap payload failed to decode".to_string(),
            ));
        }
    }
    debug!(decoded = sprites.len(), requested = inputs.len(), "decode stage complete");
    sprites
}

/// Stage 3a: derive hit-test geometry from declarations.
#[instrument(skip_all)]
fn geometry_stage(
    region_defs: &[RegionDefinition],
    sprites: &BTreeMap<String, DecodedSprite>,
    diagnostics: &mut Vec<Diagnostic>,
) -> BTreeMap<String, HitRegionGeometry> {
    geometry::build_hit_regions(region_defs, sprites, diagnostics)
}

/// Stage 3b: pack all sprites into atlas pages.
#[instrument(skip_all)]
fn pack_stage(
    sprites: &BTreeMap<String, DecodedSprite>,
    page_size: u32,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<AtlasPage> {
    atlas::pack(sprites.values(), page_size, diagnostics)
}
