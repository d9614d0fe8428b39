//! Compression orchestrator
//!
//! Runs the transforms in a fixed order over one parsed graph, measures the result, and falls
//! back to a conservative re-save when the main pipeline fails or saves too little.

use crate::content;
use crate::dedup;
use crate::error::{skip_on_error, CompressionError};
use crate::fonts;
use crate::graph::{unexpected, ObjectGraph};
use crate::images;
use crate::options::{CompressionOptions, CompressionTier, TierPolicy};
use crate::prune;
use crate::report::{self, CompressionResult};
use crate::serialize::{self, SerializeMode};
use lopdf::{Dictionary, Object};

/// Below this many percent saved, the fallback runs.
pub const MIN_RATIO_PERCENT: i64 = 5;

/// Info keys the fallback removes.
const CORE_METADATA_KEYS: [&[u8]; 3] = [b"Title", b"Author", b"Subject"];

/// Where a compression run is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Parsed,
    Pruned,
    ImagesProcessed,
    FontsProcessed,
    StreamsProcessed,
    DuplicatesScanned,
    Serialized,
    Failed,
    Fallback,
    Done,
}

/// State carried through one call to [`compress`].
struct Run {
    stage: Stage,
    applied: Vec<String>,
}

impl Run {
    fn new() -> Self {
        Self {
            stage: Stage::Parsed,
            applied: Vec::new(),
        }
    }

    fn enter(&mut self, stage: Stage) {
        log::debug!("[Pipeline] {:?} -> {:?}", self.stage, stage);
        self.stage = stage;
    }
}

/// Compress a PDF held in memory.
///
/// Only fails with [`CompressionError::CompressionFailed`], when both the main pipeline and the
/// fallback could not produce a document.
pub fn compress(
    input: &[u8],
    options: &CompressionOptions,
) -> Result<CompressionResult, CompressionError> {
    let policy = options.policy();
    log::info!(
        "[Pipeline] Compressing {} bytes at {} tier, {}% image scale",
        input.len(),
        policy.tier,
        policy.scale_percent
    );

    let mut run = Run::new();
    let reason = match run_main(input, &policy, &mut run) {
        Ok(output) => {
            let ratio = report::ratio_percent(input.len(), output.len());
            if ratio >= MIN_RATIO_PERCENT {
                run.enter(Stage::Done);
                log::info!("[Pipeline] {} -> {} bytes ({}%)", input.len(), output.len(), ratio);
                return Ok(CompressionResult::new(
                    output,
                    input.len(),
                    run.applied,
                    policy.tier,
                    false,
                ));
            }
            format!("only {}% saved", ratio)
        }
        Err(e) => {
            log::warn!("[Pipeline] Main pipeline failed at {:?}: {}", run.stage, e);
            e.to_string()
        }
    };

    run.enter(Stage::Failed);
    run_fallback(input, policy.tier, run, reason)
}

/// Parse, transform and serialize. Lines are appended to `run` as steps report them.
fn run_main(input: &[u8], policy: &TierPolicy, run: &mut Run) -> Result<Vec<u8>, CompressionError> {
    let mut graph = ObjectGraph::parse(input)?;
    run.enter(Stage::Parsed);
    log::info!("[Pipeline] Parsed {} objects", graph.len());

    prune::prune_structure(&mut graph, policy, &mut run.applied);
    run.enter(Stage::Pruned);

    let image_stats = images::transform_images(&mut graph, policy, &mut run.applied);
    log::info!(
        "[Pipeline] Images: {} rewritten, {} re-encoded",
        image_stats.touched,
        image_stats.reencoded
    );
    run.enter(Stage::ImagesProcessed);

    let fonts = fonts::optimize_fonts(&mut graph, policy, &mut run.applied);
    log::info!("[Pipeline] Fonts: {} optimized", fonts);
    run.enter(Stage::FontsProcessed);

    let content_stats = content::recompress_content_streams(&mut graph, policy, &mut run.applied);
    log::info!(
        "[Pipeline] Content streams: {} recompressed",
        content_stats.recompressed
    );
    run.enter(Stage::StreamsProcessed);

    let duplicates = dedup::scan_duplicates(&mut graph, policy, &mut run.applied);
    log::info!(
        "[Pipeline] Duplicates: {} detected, {} merged",
        duplicates.detected,
        duplicates.merged
    );
    run.enter(Stage::DuplicatesScanned);

    let output = serialize::serialize(&mut graph, SerializeMode::Compact, &mut run.applied)?;
    run.enter(Stage::Serialized);
    Ok(output)
}

fn run_fallback(
    input: &[u8],
    tier: CompressionTier,
    mut run: Run,
    reason: String,
) -> Result<CompressionResult, CompressionError> {
    run.enter(Stage::Fallback);
    log::info!("[Pipeline] Fallback ({})", reason);

    for line in &mut run.applied {
        line.push(' ');
        line.push_str(report::SUPERSEDED_BY_FALLBACK);
    }

    let output = match fallback_bytes(input, &mut run.applied) {
        Ok(output) => output,
        Err(e) => {
            log::warn!("[Pipeline] Fallback failed: {}", e);
            return Err(CompressionError::CompressionFailed {
                pipeline: reason,
                fallback: e.to_string(),
            });
        }
    };
    run.applied.push(report::FALLBACK_APPLIED.to_string());

    let output = if output.len() > input.len() {
        log::info!("[Pipeline] Fallback output is larger, returning the input unchanged");
        run.applied.push(report::ORIGINAL_RETAINED.to_string());
        input.to_vec()
    } else {
        output
    };

    run.enter(Stage::Done);
    Ok(CompressionResult::new(output, input.len(), run.applied, tier, true))
}

/// Re-parse the original bytes, drop core metadata, save in standard mode.
fn fallback_bytes(input: &[u8], applied: &mut Vec<String>) -> Result<Vec<u8>, CompressionError> {
    let mut graph = ObjectGraph::parse(input)?;
    if remove_core_metadata(&mut graph) {
        applied.push(report::CORE_METADATA_REMOVED.to_string());
    }
    serialize::serialize(&mut graph, SerializeMode::Standard, applied)
}

/// Remove `Title`, `Author` and `Subject` from the Info dictionary, wherever it lives.
fn remove_core_metadata(graph: &mut ObjectGraph) -> bool {
    let info = ObjectGraph::dict_entry(graph.trailer(), b"Info").cloned();
    let removed = match info {
        Some(Object::Reference(info_id)) => graph.dictionary_mut(info_id).map(strip_core_keys),
        Some(Object::Dictionary(_)) => match graph.trailer_mut().get_mut(b"Info") {
            Ok(Object::Dictionary(inline)) => Ok(strip_core_keys(inline)),
            _ => Ok(false),
        },
        Some(other) => Err(unexpected("info dictionary", &other)),
        None => Ok(false),
    };
    skip_on_error("trailer /Info", removed).unwrap_or(false)
}

fn strip_core_keys(info: &mut Dictionary) -> bool {
    let mut removed = false;
    for key in CORE_METADATA_KEYS {
        removed |= info.remove(key).is_some();
    }
    removed
}
