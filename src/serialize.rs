//! Writing the graph back out with object streams and cross-reference streams.

use crate::error::CompressionError;
use crate::graph::ObjectGraph;
use crate::report;
use lopdf::SaveOptions;

/// Object streams need a 1.5 header.
const MIN_OBJECT_STREAM_VERSION: (u32, u32) = (1, 5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerializeMode {
    /// Main pipeline: prune, renumber, pack hard.
    Compact,
    /// Fallback: keep the table as parsed.
    Standard,
}

impl SerializeMode {
    fn compression_level(self) -> u32 {
        match self {
            SerializeMode::Compact => 9,
            SerializeMode::Standard => 6,
        }
    }

    fn max_objects_per_stream(self) -> usize {
        match self {
            SerializeMode::Compact => 200,
            SerializeMode::Standard => 100,
        }
    }
}

/// Serialize the graph, appending the lines the compact mode earns.
pub fn serialize(
    graph: &mut ObjectGraph,
    mode: SerializeMode,
    applied: &mut Vec<String>,
) -> Result<Vec<u8>, CompressionError> {
    let doc = graph.document_mut();

    let pruned = if mode == SerializeMode::Compact {
        let removed = doc.prune_objects();
        doc.renumber_objects();
        removed.len()
    } else {
        0
    };

    // Compress any stream still stored without a filter
    doc.compress();

    if version_below(&doc.version, MIN_OBJECT_STREAM_VERSION) {
        log::debug!("[Serialize] Raising header version {} to 1.5", doc.version);
        doc.version = "1.5".to_string();
    }

    let options = SaveOptions::builder()
        .use_object_streams(true)
        .use_xref_streams(true)
        .max_objects_per_stream(mode.max_objects_per_stream())
        .compression_level(mode.compression_level())
        .build();

    let mut output = Vec::new();
    doc.save_with_options(&mut output, options)
        .map_err(|e| CompressionError::Serialize(e.to_string()))?;

    log::info!(
        "[Serialize] {:?} mode: {} bytes, {} unreferenced objects dropped",
        mode,
        output.len(),
        pruned
    );
    if pruned > 0 {
        applied.push(format!("{}: {}", report::UNREFERENCED_OBJECTS_REMOVED, pruned));
    }
    if mode == SerializeMode::Compact {
        applied.push(report::OBJECT_STREAMS_ENABLED.to_string());
    }

    Ok(output)
}

/// Whether a header version such as `1.4` is older than `min`. Unparseable versions count as old.
fn version_below(version: &str, min: (u32, u32)) -> bool {
    let mut parts = version.trim().split('.');
    let major = parts.next().and_then(|p| p.parse::<u32>().ok());
    let minor = parts.next().and_then(|p| p.parse::<u32>().ok()).unwrap_or(0);
    match major {
        Some(major) => (major, minor) < min,
        None => true,
    }
}
