//! Conversion tunables.

use crate::sprite::ColorSpace;

/// Default opacity threshold for alpha-contour silhouette fallback.
///
/// Half opacity keeps anti-aliased edge pixels out of the clickable
/// region, matching the click-through behavior users expect on soft
/// shadows. The legacy sources never documented a consistent value, so
/// this stays a tunable rather than a constant of the format.
pub const DEFAULT_ALPHA_THRESHOLD: u8 = 128;

/// Default atlas page edge in texels.
///
/// Large enough to hold every standard sheet without oversized-page
/// fallbacks while staying far below any real texture size limit.
pub const DEFAULT_PAGE_SIZE: u32 = 1024;

/// Default placeholder fill: opaque magenta, the traditional loudly
/// visible "this asset was substituted" color.
pub const DEFAULT_PLACEHOLDER_COLOR: [u8; 4] = [255, 0, 255, 255];

/// Configuration for one converter instance.
///
/// All fields are deterministic inputs to the pipeline: two conversions
/// with the same archive bytes and the same config produce bit-identical
/// packages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertConfig {
    /// Minimum alpha for a pixel to count as opaque during contour
    /// tracing.
    pub alpha_threshold: u8,
    /// Atlas page edge length in texels.
    pub page_size: u32,
    /// Working space decoded pixels are remapped into.
    pub target_color_space: ColorSpace,
    /// Fill color for substituted placeholder sprites.
    pub placeholder_color: [u8; 4],
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            alpha_threshold: DEFAULT_ALPHA_THRESHOLD,
            page_size: DEFAULT_PAGE_SIZE,
            target_color_space: ColorSpace::Srgb,
            placeholder_color: DEFAULT_PLACEHOLDER_COLOR,
        }
    }
}

impl ConvertConfig {
    /// Set the contour alpha threshold.
    pub fn with_alpha_threshold(mut self, threshold: u8) -> Self {
        self.alpha_threshold = threshold;
        self
    }

    /// Set the atlas page size.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set the target color space.
    pub fn with_target_color_space(mut self, space: ColorSpace) -> Self {
        self.target_color_space = space;
        self
    }

    /// Set the placeholder fill color.
    pub fn with_placeholder_color(mut self, color: [u8; 4]) -> Self {
        self.placeholder_color = color;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ConvertConfig::default();
        assert_eq!(config.alpha_threshold, DEFAULT_ALPHA_THRESHOLD);
        assert_eq!(config.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(config.target_color_space, ColorSpace::Srgb);
    }

    #[test]
    fn test_builder_methods() {
        let config = ConvertConfig::default()
            .with_alpha_threshold(1)
            .with_page_size(256)
            .with_target_color_space(ColorSpace::Linear)
            .with_placeholder_color([1, 2, 3, 4]);
        assert_eq!(config.alpha_threshold, 1);
        assert_eq!(config.page_size, 256);
        assert_eq!(config.target_color_space, ColorSpace::Linear);
        assert_eq!(config.placeholder_color, [1, 2, 3, 4]);
    }
}
