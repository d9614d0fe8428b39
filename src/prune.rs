//! Structural pruning of optional catalog and page entries.
//!
//! Deleting an entry only unlinks the subtree; the objects it referenced stay in the table
//! until the serializer drops everything unreachable.

use crate::error::{skip_on_error, GraphError};
use crate::graph::{name_of, ObjectGraph};
use crate::options::TierPolicy;
use crate::report;
use lopdf::{Object, ObjectId};

/// Remove the optional subtrees selected by `policy`, appending one line per removal that
/// actually happened.
pub fn prune_structure(graph: &mut ObjectGraph, policy: &TierPolicy, applied: &mut Vec<String>) {
    let catalog = skip_on_error("catalog lookup", graph.catalog_id());
    let pages = graph.page_ids();

    if remove_document_metadata(graph, catalog) {
        applied.push(report::DOCUMENT_METADATA_REMOVED.to_string());
    }

    if policy.strip_page_metadata {
        let mut removed = remove_catalog_entry(graph, catalog, b"PieceInfo");
        for &page in &pages {
            removed |= remove_page_entry(graph, page, b"Metadata");
            removed |= remove_page_entry(graph, page, b"PieceInfo");
        }
        if removed {
            applied.push(report::PAGE_METADATA_REMOVED.to_string());
        }
    }

    if policy.strip_annotations {
        let annotated = pages
            .iter()
            .filter(|&&page| remove_page_entry(graph, page, b"Annots"))
            .count();
        if annotated > 0 {
            applied.push(format!(
                "{} from {} page(s)",
                report::ANNOTATIONS_REMOVED,
                annotated
            ));
        }
        if remove_catalog_entry(graph, catalog, b"AcroForm") {
            applied.push(report::INTERACTIVE_FORM_REMOVED.to_string());
        }
    }

    if policy.strip_outlines {
        if remove_catalog_entry(graph, catalog, b"Outlines") {
            applied.push(report::OUTLINES_REMOVED.to_string());
            reset_outline_page_mode(graph, catalog);
        }
        let mut dests = remove_catalog_entry(graph, catalog, b"Dests");
        if !policy.strip_structure {
            // The whole name tree goes on the structural pass; otherwise only its destinations.
            dests |= remove_named_destinations(graph, catalog);
        }
        if dests {
            applied.push(report::NAMED_DESTINATIONS_REMOVED.to_string());
        }
    }

    if policy.strip_structure {
        let removals: [(&[u8], &str); 4] = [
            (b"StructTreeRoot".as_slice(), report::STRUCTURE_TREE_REMOVED),
            (b"MarkInfo".as_slice(), report::MARK_INFO_REMOVED),
            (b"ViewerPreferences".as_slice(), report::VIEWER_PREFERENCES_REMOVED),
            (b"Names".as_slice(), report::NAME_TREE_REMOVED),
        ];
        for (key, line) in removals {
            if remove_catalog_entry(graph, catalog, key) {
                applied.push(line.to_string());
            }
        }
        for &page in &pages {
            remove_page_entry(graph, page, b"StructParents");
        }
    }
}

/// Drop the trailer's `/Info` dictionary and the catalog's XMP `/Metadata` stream.
fn remove_document_metadata(graph: &mut ObjectGraph, catalog: Option<ObjectId>) -> bool {
    let info = graph.trailer_mut().remove(b"Info").is_some();
    let xmp = remove_catalog_entry(graph, catalog, b"Metadata");
    info || xmp
}

fn remove_catalog_entry(graph: &mut ObjectGraph, catalog: Option<ObjectId>, key: &[u8]) -> bool {
    let Some(catalog) = catalog else {
        return false;
    };
    let context = format!("catalog /{}", String::from_utf8_lossy(key));
    skip_on_error(context, graph.delete_dict_entry(catalog, key))
        .flatten()
        .is_some()
}

fn remove_page_entry(graph: &mut ObjectGraph, page: ObjectId, key: &[u8]) -> bool {
    let context = format!("page {:?} /{}", page, String::from_utf8_lossy(key));
    skip_on_error(context, graph.delete_dict_entry(page, key))
        .flatten()
        .is_some()
}

/// A catalog asking viewers to open the outline panel makes no sense once it is gone.
fn reset_outline_page_mode(graph: &mut ObjectGraph, catalog: Option<ObjectId>) {
    let Some(catalog) = catalog else {
        return;
    };
    let opens_outlines = graph
        .dictionary(catalog)
        .ok()
        .and_then(|dict| ObjectGraph::dict_entry(dict, b"PageMode"))
        .and_then(name_of)
        == Some(b"UseOutlines".as_slice());
    if opens_outlines {
        remove_catalog_entry(graph, Some(catalog), b"PageMode");
    }
}

/// Remove `/Dests` from the catalog's name tree, whether the tree is inline or indirect.
fn remove_named_destinations(graph: &mut ObjectGraph, catalog: Option<ObjectId>) -> bool {
    let Some(catalog) = catalog else {
        return false;
    };
    let result = (|| -> Result<bool, GraphError> {
        let names = graph
            .dictionary(catalog)
            .map(|dict| ObjectGraph::dict_entry(dict, b"Names").cloned())?;
        match names {
            None => Ok(false),
            Some(Object::Reference(names_id)) => {
                Ok(graph.delete_dict_entry(names_id, b"Dests")?.is_some())
            }
            Some(Object::Dictionary(_)) => {
                let catalog_dict = graph.dictionary_mut(catalog)?;
                match catalog_dict.get_mut(b"Names") {
                    Ok(Object::Dictionary(names)) => Ok(names.remove(b"Dests").is_some()),
                    _ => Ok(false),
                }
            }
            Some(other) => Err(crate::graph::unexpected("name tree", &other)),
        }
    })();
    skip_on_error("catalog /Names /Dests", result).unwrap_or(false)
}
