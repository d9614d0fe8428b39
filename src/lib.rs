//! PDF Compression Library
//!
//! Core logic for shrinking PDFs. Shared between CLI and WASM targets.
//!
//! A document is parsed into an object graph, then pruned of optional structure, its images
//! resampled, its fonts and content streams slimmed and duplicate objects found, before being
//! written back with object streams. When that saves less than 5% the engine falls back to a
//! conservative re-save, and it never returns a document larger than its input.
//!
//! ```no_run
//! use squeeze_pdf::{compress, CompressionOptions, CompressionTier};
//!
//! let input = std::fs::read("report.pdf").unwrap();
//! let result = compress(&input, &CompressionOptions::for_tier(CompressionTier::High)).unwrap();
//! println!("{}% smaller", result.ratio_percent);
//! ```

#[cfg(target_arch = "wasm32")]
pub mod wasm;

pub mod codec;
pub mod content;
pub mod dedup;
pub mod error;
pub mod fonts;
pub mod graph;
pub mod images;
pub mod inspect;
pub mod options;
pub mod pipeline;
pub mod prune;
pub mod report;
pub mod serialize;

#[cfg(test)]
mod testutil;

pub use error::{CompressionError, GraphError, OptionsError, PayloadError};
pub use graph::ObjectGraph;
pub use inspect::{inspect, DocumentSummary, ImageInfo, PageImages};
pub use options::{CompressionOptions, CompressionTier, JpegQuality, TargetResolution, TierPolicy};
pub use pipeline::compress;
pub use report::CompressionResult;

#[cfg(not(target_arch = "wasm32"))]
pub mod file_ops {
    use super::*;
    use std::path::Path;

    /// Compress a PDF from file path to file path
    pub fn compress_pdf_file(
        input_path: &Path,
        output_path: &Path,
        options: &CompressionOptions,
    ) -> Result<CompressionResult, CompressionError> {
        let input = std::fs::read(input_path)?;
        log::info!("Read {} bytes from {:?}", input.len(), input_path);

        let result = compress(&input, options)?;

        std::fs::write(output_path, &result.output_bytes)?;
        log::info!("Wrote {} bytes to {:?}", result.output_size, output_path);
        Ok(result)
    }

    /// Summarize a PDF on disk
    pub fn inspect_pdf_file(input_path: &Path) -> Result<DocumentSummary, CompressionError> {
        let input = std::fs::read(input_path)?;
        inspect(&input)
    }
}
