//! Error types for PDF compression.

use lopdf::ObjectId;
use std::fmt;
use thiserror::Error;

/// Errors surfaced by the compression engine.
///
/// `compress` only ever returns [`CompressionError::CompressionFailed`]; the other variants are
/// raised by the individual stages and folded into the fallback decision.
#[derive(Error, Debug)]
pub enum CompressionError {
    #[error("Failed to load PDF: {0}")]
    Parse(String),

    #[error("Failed to save PDF: {0}")]
    Serialize(String),

    #[error("Compression failed ({pipeline}); fallback also failed: {fallback}")]
    CompressionFailed { pipeline: String, fallback: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while walking or mutating the object graph.
///
/// None of these escape a pipeline step: they mark a single object as skipped.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("object {0:?} is not in the object table")]
    DanglingReference(ObjectId),

    #[error("expected {expected}, found {found}")]
    UnexpectedType {
        expected: &'static str,
        found: &'static str,
    },

    #[error("missing key /{0}")]
    MissingKey(String),

    #[error("stream codec error: {0}")]
    Codec(String),
}

/// Invalid user-supplied option values.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OptionsError {
    #[error("JPEG quality must be between 10 and 100, got {0}")]
    InvalidQuality(u8),

    #[error("Target resolution must be 72, 96 or 150 DPI, got {0}")]
    InvalidResolution(u32),

    #[error("Unknown compression tier: {0}")]
    UnknownTier(String),
}

/// Why an image payload could not be re-encoded. The image keeps its metadata rewrite.
#[derive(Error, Debug)]
pub enum PayloadError {
    #[error("unsupported filter: {0}")]
    UnsupportedFilter(String),

    #[error("unsupported color space: {0}")]
    UnsupportedColorSpace(String),

    #[error("failed to decode image: {0}")]
    Decode(String),

    #[error("failed to encode image: {0}")]
    Encode(String),
}

/// Run one best-effort step, turning any graph error into a logged skip.
///
/// Dangling references are the expected outcome of earlier deletions and are logged quietly;
/// anything else is a malformed object and gets a warning.
pub(crate) fn skip_on_error<T>(
    context: impl fmt::Display,
    result: Result<T, GraphError>,
) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(GraphError::DanglingReference(id)) => {
            log::debug!("{}: object {:?} already removed, skipping", context, id);
            None
        }
        Err(e) => {
            log::warn!("{}: {}, skipping", context, e);
            None
        }
    }
}
