//! Content-stream filter manager
//!
//! Every page content stream is decoded through its current filter chain and re-encoded with a
//! single best-level flate pass. On the High tier the flate output can additionally be wrapped in
//! ASCII85 for 7-bit-safe transports.

use crate::codec;
use crate::error::{skip_on_error, GraphError};
use crate::graph::{filter_names, unexpected, ObjectGraph};
use crate::options::TierPolicy;
use crate::report;
use lopdf::{Object, ObjectId, Stream};
use std::collections::HashSet;

/// What the content pass did
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ContentStats {
    /// Streams whose payload was replaced by a fresh flate encoding
    pub recompressed: usize,
    pub armored: usize,
}

enum Rewrite {
    /// Fresh flate payload
    Flate(Vec<u8>),
    /// ASCII85 around a flate payload
    Armored(Vec<u8>, bool),
    /// Already flate and not improvable
    Keep,
}

/// Re-encode every page content stream.
pub fn recompress_content_streams(
    graph: &mut ObjectGraph,
    policy: &TierPolicy,
    applied: &mut Vec<String>,
) -> ContentStats {
    let stream_ids = collect_content_ids(graph);
    log::debug!("[Content] Found {} content streams", stream_ids.len());

    let mut stats = ContentStats::default();
    for stream_id in stream_ids {
        let context = format!("content stream {:?}", stream_id);
        let rewrite = skip_on_error(context, plan_rewrite(graph, stream_id, policy));
        let Some(rewrite) = rewrite else {
            continue;
        };

        let Ok(Object::Stream(stream)) = graph.lookup_mut(stream_id) else {
            continue;
        };
        match rewrite {
            Rewrite::Flate(bytes) => {
                stream.dict.set("Filter", "FlateDecode");
                stream.dict.remove(b"DecodeParms");
                stream.set_content(bytes);
                stats.recompressed += 1;
            }
            Rewrite::Armored(bytes, recompressed) => {
                stream.dict.set(
                    "Filter",
                    vec![Object::from("ASCII85Decode"), Object::from("FlateDecode")],
                );
                stream.dict.remove(b"DecodeParms");
                stream.set_content(bytes);
                stats.armored += 1;
                if recompressed {
                    stats.recompressed += 1;
                }
            }
            Rewrite::Keep => {}
        }
    }

    if stats.recompressed > 0 {
        applied.push(format!(
            "{}: {} stream(s)",
            report::CONTENT_STREAMS_COMPRESSED,
            stats.recompressed
        ));
    }
    if stats.armored > 0 {
        applied.push(report::CONTENT_STREAMS_ARMORED.to_string());
    }
    stats
}

/// Content stream ids across all pages, each once, in page order.
pub fn collect_content_ids(graph: &ObjectGraph) -> Vec<ObjectId> {
    let mut seen = HashSet::new();
    let mut ids = Vec::new();
    for page_id in graph.page_ids() {
        let context = format!("page {:?} contents", page_id);
        for id in skip_on_error(context, graph.page_content_ids(page_id)).unwrap_or_default() {
            if seen.insert(id) {
                ids.push(id);
            }
        }
    }
    ids
}

fn plan_rewrite(
    graph: &ObjectGraph,
    stream_id: ObjectId,
    policy: &TierPolicy,
) -> Result<Rewrite, GraphError> {
    let stream = match graph.lookup(stream_id)? {
        Object::Stream(stream) => stream,
        other => return Err(unexpected("content stream", other)),
    };

    let filters = filter_names(&stream.dict);
    let decoded = decode_chain(stream, &filters)?;
    let candidate = codec::deflate(&decoded)?;

    let already_flate = filters.len() == 1 && filters[0] == "FlateDecode";
    let improved = !already_flate || candidate.len() < stream.content.len();

    if policy.ascii_armor_content {
        let flate = if improved { &candidate } else { &stream.content };
        return Ok(Rewrite::Armored(codec::encode_ascii85(flate), improved));
    }

    if improved {
        log::debug!(
            "[Content] {:?}: {} -> {} bytes",
            stream_id,
            stream.content.len(),
            candidate.len()
        );
        Ok(Rewrite::Flate(candidate))
    } else {
        Ok(Rewrite::Keep)
    }
}

/// Decode a stream through its filter chain.
///
/// Filters other than the ones handled here, and any chain with decode parameters, are left to
/// lopdf's own decoder.
fn decode_chain(stream: &Stream, filters: &[String]) -> Result<Vec<u8>, GraphError> {
    let has_params = ObjectGraph::dict_entry(&stream.dict, b"DecodeParms").is_some();
    let handled = filters
        .iter()
        .all(|f| matches!(f.as_str(), "FlateDecode" | "ASCII85Decode" | "ASCIIHexDecode"));

    if has_params || !handled {
        return stream
            .decompressed_content()
            .map_err(|e| GraphError::Codec(format!("{}: {}", filters.join(" "), e)));
    }

    let mut data = stream.content.clone();
    for filter in filters {
        data = match filter.as_str() {
            "FlateDecode" => codec::inflate(&data)?,
            "ASCII85Decode" => codec::decode_ascii85(&data)?,
            _ => codec::decode_ascii_hex(&data)?,
        };
    }
    Ok(data)
}
