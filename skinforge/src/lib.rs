//! Skinforge - legacy skin archive conversion
//!
//! This library converts legacy media-player skin archives into validated,
//! render-ready asset packages. A skin archive bundles several undocumented
//! sub-formats produced by years of inconsistent third-party tooling: packed
//! bitmap sprite sheets, ad-hoc plain-text configuration (palettes,
//! hit-region declarations, metadata) and legacy cursor images.
//!
//! The conversion pipeline is a fixed sequence of pure transforms:
//!
//! ```text
//! bytes -> archive -> {text, sprite} -> {geometry, atlas} -> assemble
//! ```
//!
//! Assembled [`package::SkinPackage`] values are immutable and are normally
//! obtained through a [`cache::ConversionCache`], which memoizes packages by
//! content hash, runs at most one conversion per key, and evicts under a
//! configurable byte budget.
//!
//! Conversion policy favors a visibly-degraded-but-functional package over
//! outright failure: only a structurally unreadable archive is fatal, and
//! every fallback or substitution along the way is recorded as a
//! [`package::Diagnostic`] on the final package.

pub mod archive;
pub mod assemble;
pub mod atlas;
pub mod cache;
pub mod convert;
pub mod geometry;
pub mod package;
pub mod sprite;
pub mod text;

#[cfg(test)]
pub(crate) mod testutil;

// Archive input arrives as `bytes::Bytes`; re-exported so callers need
// not pin a matching version themselves.
pub use bytes;

pub use archive::{ArchiveError, SkinArchive};
pub use cache::{CacheConfig, CacheStats, ConversionCache, PackageKey};
pub use convert::{ConvertConfig, ConvertError, Converter, FORMAT_VERSION};
pub use package::{Diagnostic, DiagnosticKind, SkinPackage};
pub use sprite::{ColorSpace, DecodedSprite};
