//! Font dictionary optimizer.

use crate::error::{skip_on_error, GraphError};
use crate::graph::{unexpected, ObjectGraph};
use crate::options::TierPolicy;
use crate::report;
use lopdf::{Object, ObjectId};
use std::collections::HashSet;

#[derive(Debug, Default, Clone, Copy)]
struct FontOutcome {
    touched: bool,
    program_data_removed: bool,
}

/// Strip font metadata (and, on the High tier, descriptors and ToUnicode maps).
///
/// Returns the number of fonts that lost at least one entry.
pub fn optimize_fonts(
    graph: &mut ObjectGraph,
    policy: &TierPolicy,
    applied: &mut Vec<String>,
) -> usize {
    let font_ids = collect_font_ids(graph);
    log::debug!("[Fonts] Found {} font dictionaries", font_ids.len());

    let mut optimized = 0;
    let mut program_data_removed = false;
    for font_id in font_ids {
        let context = format!("font {:?}", font_id);
        if let Some(outcome) = skip_on_error(context, optimize_font(graph, font_id, policy)) {
            if outcome.touched {
                optimized += 1;
            }
            program_data_removed |= outcome.program_data_removed;
        }
    }

    if optimized > 0 {
        applied.push(format!(
            "{}: {} font(s)",
            report::FONT_METADATA_OPTIMIZED,
            optimized
        ));
    }
    if program_data_removed {
        applied.push(report::FONT_PROGRAM_DATA_REMOVED.to_string());
    }
    optimized
}

/// Fonts named by page resources, followed by the descendants of composite fonts. Each id once.
pub fn collect_font_ids(graph: &ObjectGraph) -> Vec<ObjectId> {
    let mut fonts = Vec::new();
    let mut seen = HashSet::new();

    for page_id in graph.page_ids() {
        let context = format!("page {:?} fonts", page_id);
        let page_fonts = skip_on_error(context, graph.page_resource_refs(page_id, b"Font"));
        for font_id in page_fonts.unwrap_or_default() {
            if !seen.insert(font_id) {
                continue;
            }
            fonts.push(font_id);
            for descendant in descendant_fonts(graph, font_id) {
                if seen.insert(descendant) {
                    fonts.push(descendant);
                }
            }
        }
    }

    fonts
}

/// `/DescendantFonts` of a Type0 font, which may itself be an indirect array.
fn descendant_fonts(graph: &ObjectGraph, font_id: ObjectId) -> Vec<ObjectId> {
    let descendants = graph
        .dictionary(font_id)
        .ok()
        .and_then(|font| ObjectGraph::dict_entry(font, b"DescendantFonts"))
        .and_then(|entry| graph.resolve(entry).ok());

    match descendants {
        Some(Object::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Object::Reference(id) => Some(*id),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn optimize_font(
    graph: &mut ObjectGraph,
    font_id: ObjectId,
    policy: &TierPolicy,
) -> Result<FontOutcome, GraphError> {
    let mut outcome = FontOutcome::default();

    outcome.touched |= graph.delete_dict_entry(font_id, b"Metadata")?.is_some();

    let font = graph.dictionary(font_id)?;
    let descriptor = ObjectGraph::dict_entry(font, b"FontDescriptor").cloned();
    match descriptor {
        Some(Object::Reference(descriptor_id)) => {
            let context = format!("font descriptor {:?}", descriptor_id);
            let removed =
                skip_on_error(context, graph.delete_dict_entry(descriptor_id, b"Metadata"));
            outcome.touched |= removed.flatten().is_some();
        }
        Some(Object::Dictionary(_)) => {
            let font = graph.dictionary_mut(font_id)?;
            if let Ok(Object::Dictionary(inline)) = font.get_mut(b"FontDescriptor") {
                outcome.touched |= inline.remove(b"Metadata").is_some();
            }
        }
        Some(other) => return Err(unexpected("font descriptor", &other)),
        None => {}
    }

    if policy.strip_font_descriptors {
        let descriptor = graph.delete_dict_entry(font_id, b"FontDescriptor")?.is_some();
        let to_unicode = graph.delete_dict_entry(font_id, b"ToUnicode")?.is_some();
        if descriptor || to_unicode {
            log::debug!("[Fonts] {:?}: dropped descriptor/ToUnicode", font_id);
            outcome.touched = true;
            outcome.program_data_removed = true;
        }
    }

    Ok(outcome)
}
