//! The result handed back to callers, and the wording of its optimization lines.

use crate::options::CompressionTier;
use serde::Serialize;

pub const DOCUMENT_METADATA_REMOVED: &str = "Document metadata removed";
pub const PAGE_METADATA_REMOVED: &str = "Page metadata removed";
pub const ANNOTATIONS_REMOVED: &str = "Annotations removed";
pub const INTERACTIVE_FORM_REMOVED: &str = "Interactive form removed";
pub const OUTLINES_REMOVED: &str = "Outlines removed";
pub const NAMED_DESTINATIONS_REMOVED: &str = "Named destinations removed";
pub const STRUCTURE_TREE_REMOVED: &str = "Structure tree removed";
pub const MARK_INFO_REMOVED: &str = "Mark info removed";
pub const VIEWER_PREFERENCES_REMOVED: &str = "Viewer preferences removed";
pub const NAME_TREE_REMOVED: &str = "Name tree removed";
pub const IMAGES_COMPRESSED: &str = "Images compressed";
pub const FONT_METADATA_OPTIMIZED: &str = "Font metadata optimized";
pub const FONT_PROGRAM_DATA_REMOVED: &str = "Font descriptors and ToUnicode maps removed";
pub const CONTENT_STREAMS_COMPRESSED: &str = "Content streams compressed";
pub const CONTENT_STREAMS_ARMORED: &str = "Content streams ASCII85-armored";
pub const DUPLICATES_DETECTED: &str = "Duplicate objects detected";
pub const DUPLICATES_MERGED: &str = "Duplicate objects merged";
pub const UNREFERENCED_OBJECTS_REMOVED: &str = "Unreferenced objects removed";
pub const OBJECT_STREAMS_ENABLED: &str = "Object streams enabled";
pub const CORE_METADATA_REMOVED: &str = "Core metadata removed";
pub const FALLBACK_APPLIED: &str = "Fallback compression applied";
pub const ORIGINAL_RETAINED: &str = "Original bytes retained";

/// Appended to main-pipeline lines once the fallback output replaces theirs.
pub const SUPERSEDED_BY_FALLBACK: &str = "(superseded by fallback)";

/// Result of a compression run
#[derive(Debug, Clone, Serialize)]
pub struct CompressionResult {
    #[serde(skip)]
    pub output_bytes: Vec<u8>,
    pub original_size: usize,
    pub output_size: usize,
    /// Size reduction in whole percent; negative when the output grew
    pub ratio_percent: i64,
    /// What actually ran, in order
    pub applied_optimizations: Vec<String>,
    pub tier_used: CompressionTier,
    pub fallback_used: bool,
}

impl CompressionResult {
    pub(crate) fn new(
        output_bytes: Vec<u8>,
        original_size: usize,
        applied_optimizations: Vec<String>,
        tier_used: CompressionTier,
        fallback_used: bool,
    ) -> Self {
        let output_size = output_bytes.len();
        Self {
            output_bytes,
            original_size,
            output_size,
            ratio_percent: ratio_percent(original_size, output_size),
            applied_optimizations,
            tier_used,
            fallback_used,
        }
    }

    /// Whether an optimization line starting with `label` was recorded.
    pub fn applied(&self, label: &str) -> bool {
        self.applied_optimizations
            .iter()
            .any(|line| line.starts_with(label))
    }
}

/// `round((original - output) / original * 100)`, zero for an empty original.
pub fn ratio_percent(original_size: usize, output_size: usize) -> i64 {
    if original_size == 0 {
        return 0;
    }
    let saved = original_size as f64 - output_size as f64;
    (saved / original_size as f64 * 100.0).round() as i64
}
