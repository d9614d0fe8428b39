//! Compression options and the per-tier policy derived from them.

use crate::error::OptionsError;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Aggressiveness dial for every transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionTier {
    Low,
    Medium,
    High,
}

impl CompressionTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompressionTier::Low => "low",
            CompressionTier::Medium => "medium",
            CompressionTier::High => "high",
        }
    }

    fn index(&self) -> usize {
        match self {
            CompressionTier::Low => 0,
            CompressionTier::Medium => 1,
            CompressionTier::High => 2,
        }
    }
}

impl fmt::Display for CompressionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompressionTier {
    type Err = OptionsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(CompressionTier::Low),
            "medium" => Ok(CompressionTier::Medium),
            "high" => Ok(CompressionTier::High),
            _ => Err(OptionsError::UnknownTier(s.to_string())),
        }
    }
}

/// Logical DPI class images are resampled towards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TargetResolution {
    Dpi72,
    Dpi96,
    Dpi150,
}

impl TargetResolution {
    pub fn dpi(&self) -> u32 {
        match self {
            TargetResolution::Dpi72 => 72,
            TargetResolution::Dpi96 => 96,
            TargetResolution::Dpi150 => 150,
        }
    }

    fn index(&self) -> usize {
        match self {
            TargetResolution::Dpi72 => 0,
            TargetResolution::Dpi96 => 1,
            TargetResolution::Dpi150 => 2,
        }
    }
}

impl TryFrom<u32> for TargetResolution {
    type Error = OptionsError;

    fn try_from(dpi: u32) -> Result<Self, Self::Error> {
        match dpi {
            72 => Ok(TargetResolution::Dpi72),
            96 => Ok(TargetResolution::Dpi96),
            150 => Ok(TargetResolution::Dpi150),
            other => Err(OptionsError::InvalidResolution(other)),
        }
    }
}

/// JPEG quality, always within 10..=100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct JpegQuality(u8);

impl JpegQuality {
    pub const MIN: u8 = 10;
    pub const MAX: u8 = 100;

    pub fn new(quality: u8) -> Result<Self, OptionsError> {
        if (Self::MIN..=Self::MAX).contains(&quality) {
            Ok(JpegQuality(quality))
        } else {
            Err(OptionsError::InvalidQuality(quality))
        }
    }

    pub fn get(&self) -> u8 {
        self.0
    }
}

impl Default for JpegQuality {
    fn default() -> Self {
        JpegQuality(75)
    }
}

impl TryFrom<u8> for JpegQuality {
    type Error = OptionsError;

    fn try_from(quality: u8) -> Result<Self, Self::Error> {
        JpegQuality::new(quality)
    }
}

/// Options for PDF compression
#[derive(Debug, Clone)]
pub struct CompressionOptions {
    pub tier: CompressionTier,
    /// Resolution class used to pick the image scale factor
    pub target_resolution: TargetResolution,
    /// Remove page-level metadata and private application data
    pub strip_metadata: bool,
    /// Remove page annotations and the interactive form (implied by the high tier)
    pub strip_annotations: bool,
    /// Remove outlines and named destinations (implied by medium and high tiers)
    pub strip_outlines: bool,
    /// Retag images as JPEG and re-encode their payload with `jpeg_quality`
    pub recode_images_as_jpeg: bool,
    pub jpeg_quality: JpegQuality,
    /// Re-encode decodable image payloads at the new dimensions
    pub resample_pixels: bool,
    /// Merge structurally identical objects instead of only reporting them
    pub merge_duplicates: bool,
    /// On the high tier, wrap content streams in an ASCII85 filter after flate
    pub ascii_armor_content: bool,
}

impl Default for CompressionOptions {
    fn default() -> Self {
        Self {
            tier: CompressionTier::Medium,
            target_resolution: TargetResolution::Dpi96,
            strip_metadata: true,
            strip_annotations: false,
            strip_outlines: false,
            recode_images_as_jpeg: true,
            jpeg_quality: JpegQuality::default(),
            resample_pixels: true,
            merge_duplicates: false,
            ascii_armor_content: false,
        }
    }
}

impl CompressionOptions {
    pub fn for_tier(tier: CompressionTier) -> Self {
        Self {
            tier,
            ..Self::default()
        }
    }

    /// Derive the tier policy for this call.
    pub fn policy(&self) -> TierPolicy {
        TierPolicy::new(self)
    }
}

/// Image scale factors in percent, rows by resolution (72, 96, 150), columns by tier.
const SCALE_PERCENT: [[u32; 3]; 3] = [[70, 50, 30], [80, 60, 40], [90, 80, 60]];

/// Every tier-keyed decision, resolved once at the start of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierPolicy {
    pub tier: CompressionTier,
    pub strip_page_metadata: bool,
    pub strip_annotations: bool,
    pub strip_outlines: bool,
    pub strip_structure: bool,
    pub strip_font_descriptors: bool,
    pub strip_soft_masks: bool,
    pub ascii_armor_content: bool,
    pub recode_images_as_jpeg: bool,
    pub resample_pixels: bool,
    pub merge_duplicates: bool,
    pub jpeg_quality: u8,
    /// Image scale factor in percent
    pub scale_percent: u32,
}

impl TierPolicy {
    pub fn new(options: &CompressionOptions) -> Self {
        let tier = options.tier;
        let high = tier == CompressionTier::High;

        Self {
            tier,
            strip_page_metadata: options.strip_metadata,
            strip_annotations: options.strip_annotations || high,
            strip_outlines: options.strip_outlines || tier != CompressionTier::Low,
            strip_structure: high,
            strip_font_descriptors: high,
            strip_soft_masks: high,
            ascii_armor_content: options.ascii_armor_content && high,
            recode_images_as_jpeg: options.recode_images_as_jpeg,
            resample_pixels: options.resample_pixels,
            merge_duplicates: options.merge_duplicates,
            jpeg_quality: options.jpeg_quality.get(),
            scale_percent: scale_percent(options.target_resolution, tier),
        }
    }

    /// Bits per component recorded for images retagged as JPEG.
    pub fn jpeg_bits_per_component(&self) -> i64 {
        let quality = i64::from(self.jpeg_quality);
        match self.tier {
            CompressionTier::High => (quality / 25).max(1),
            CompressionTier::Medium => (quality / 20).max(4),
            CompressionTier::Low => 8,
        }
    }
}

/// Look up the image scale factor (percent) for a resolution class and tier.
pub fn scale_percent(resolution: TargetResolution, tier: CompressionTier) -> u32 {
    SCALE_PERCENT[resolution.index()][tier.index()]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(tier: CompressionTier, quality: u8) -> CompressionOptions {
        CompressionOptions {
            tier,
            jpeg_quality: JpegQuality::new(quality).unwrap(),
            ..CompressionOptions::default()
        }
    }

    #[test]
    fn scale_table_matches_policy() {
        use CompressionTier::*;
        use TargetResolution::*;

        assert_eq!(scale_percent(Dpi72, Low), 70);
        assert_eq!(scale_percent(Dpi72, Medium), 50);
        assert_eq!(scale_percent(Dpi72, High), 30);
        assert_eq!(scale_percent(Dpi96, Low), 80);
        assert_eq!(scale_percent(Dpi96, Medium), 60);
        assert_eq!(scale_percent(Dpi96, High), 40);
        assert_eq!(scale_percent(Dpi150, Low), 90);
        assert_eq!(scale_percent(Dpi150, Medium), 80);
        assert_eq!(scale_percent(Dpi150, High), 60);
    }

    #[test]
    fn bits_per_component_follow_tier_and_quality() {
        assert_eq!(options(CompressionTier::High, 50).policy().jpeg_bits_per_component(), 2);
        assert_eq!(options(CompressionTier::High, 10).policy().jpeg_bits_per_component(), 1);
        assert_eq!(options(CompressionTier::High, 100).policy().jpeg_bits_per_component(), 4);
        assert_eq!(options(CompressionTier::Medium, 50).policy().jpeg_bits_per_component(), 4);
        assert_eq!(options(CompressionTier::Medium, 100).policy().jpeg_bits_per_component(), 5);
        assert_eq!(options(CompressionTier::Low, 10).policy().jpeg_bits_per_component(), 8);
    }

    #[test]
    fn tier_implies_structural_removals() {
        let low = CompressionOptions::for_tier(CompressionTier::Low).policy();
        assert!(!low.strip_annotations);
        assert!(!low.strip_outlines);
        assert!(!low.strip_structure);

        let medium = CompressionOptions::for_tier(CompressionTier::Medium).policy();
        assert!(!medium.strip_annotations);
        assert!(medium.strip_outlines);
        assert!(!medium.strip_font_descriptors);

        let high = CompressionOptions::for_tier(CompressionTier::High).policy();
        assert!(high.strip_annotations);
        assert!(high.strip_outlines);
        assert!(high.strip_structure);
        assert!(high.strip_soft_masks);
    }

    #[test]
    fn explicit_flags_override_low_tier() {
        let opts = CompressionOptions {
            strip_annotations: true,
            strip_outlines: true,
            ..CompressionOptions::for_tier(CompressionTier::Low)
        };
        let policy = opts.policy();
        assert!(policy.strip_annotations);
        assert!(policy.strip_outlines);
    }

    #[test]
    fn ascii_armor_only_on_high_tier() {
        let medium = CompressionOptions {
            ascii_armor_content: true,
            ..CompressionOptions::for_tier(CompressionTier::Medium)
        };
        assert!(!medium.policy().ascii_armor_content);

        let high = CompressionOptions {
            ascii_armor_content: true,
            ..CompressionOptions::for_tier(CompressionTier::High)
        };
        assert!(high.policy().ascii_armor_content);
    }

    #[test]
    fn quality_bounds_are_enforced() {
        assert_eq!(JpegQuality::new(9), Err(OptionsError::InvalidQuality(9)));
        assert_eq!(JpegQuality::new(101), Err(OptionsError::InvalidQuality(101)));
        assert_eq!(JpegQuality::new(10).unwrap().get(), 10);
        assert_eq!(JpegQuality::new(100).unwrap().get(), 100);
    }

    #[test]
    fn parses_tiers_and_resolutions() {
        assert_eq!("HIGH".parse::<CompressionTier>(), Ok(CompressionTier::High));
        assert!("extreme".parse::<CompressionTier>().is_err());
        assert_eq!(TargetResolution::try_from(96), Ok(TargetResolution::Dpi96));
        assert_eq!(
            TargetResolution::try_from(300),
            Err(OptionsError::InvalidResolution(300))
        );
    }
}
