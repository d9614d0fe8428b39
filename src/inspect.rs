//! Read-only document summary, used to preview what compression will touch.

use crate::error::{skip_on_error, CompressionError};
use crate::fonts;
use crate::graph::{integer_of, ObjectGraph};
use crate::images;
use lopdf::{Object, ObjectId, Stream};
use serde::Serialize;
use std::collections::HashSet;

/// Information about a single image in the PDF
#[derive(Debug, Clone, Serialize)]
pub struct ImageInfo {
    /// Object ID (number, generation)
    pub object_id: (u32, u16),
    /// Image type (image or smask)
    pub image_type: String,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    pub color_space: String,
    pub bits_per_component: u32,
    /// Filter chain, space separated; empty for raw samples
    pub filter: String,
    /// Payload size in bytes
    pub size_bytes: usize,
}

/// Images first used on one page
#[derive(Debug, Clone, Serialize)]
pub struct PageImages {
    pub page_number: u32,
    pub images: Vec<ImageInfo>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentSummary {
    pub version: String,
    pub page_count: usize,
    pub object_count: usize,
    pub image_count: usize,
    pub pages: Vec<PageImages>,
    pub font_count: usize,
    pub annotation_count: usize,
    pub has_info: bool,
    pub has_xmp_metadata: bool,
    pub has_outlines: bool,
    pub has_acroform: bool,
    pub has_structure_tree: bool,
}

/// Summarize a PDF without modifying it.
pub fn inspect(pdf_bytes: &[u8]) -> Result<DocumentSummary, CompressionError> {
    let graph = ObjectGraph::parse(pdf_bytes)?;
    Ok(summarize(&graph))
}

pub fn summarize(graph: &ObjectGraph) -> DocumentSummary {
    let pages_by_number = graph.document().get_pages();

    let mut seen = HashSet::new();
    let mut pages = Vec::new();
    for (&page_number, &page_id) in &pages_by_number {
        let mut image_ids = Vec::new();
        images::collect_page_images(graph, page_id, &mut image_ids, &mut seen);

        let mut page_images = Vec::new();
        for image_id in image_ids {
            let Ok(Object::Stream(stream)) = graph.lookup(image_id) else {
                continue;
            };
            page_images.push(image_info(graph, image_id, stream, false));

            // Check for SMask
            let smask = ObjectGraph::dict_entry(&stream.dict, b"SMask");
            if let Some(Object::Reference(smask_id)) = smask {
                if let Ok(Object::Stream(smask)) = graph.lookup(*smask_id) {
                    page_images.push(image_info(graph, *smask_id, smask, true));
                }
            }
        }

        if !page_images.is_empty() {
            pages.push(PageImages {
                page_number,
                images: page_images,
            });
        }
    }

    let catalog = skip_on_error("catalog lookup", graph.catalog_id())
        .and_then(|id| graph.dictionary(id).ok());
    let catalog_has = |key: &[u8]| catalog.map(|dict| dict.has(key)).unwrap_or(false);

    DocumentSummary {
        version: graph.document().version.clone(),
        page_count: pages_by_number.len(),
        object_count: graph.len(),
        image_count: pages.iter().map(|p| p.images.len()).sum(),
        font_count: fonts::collect_font_ids(graph).len(),
        annotation_count: pages_by_number
            .values()
            .map(|&page_id| annotation_count(graph, page_id))
            .sum(),
        has_info: graph.trailer().has(b"Info"),
        has_xmp_metadata: catalog_has(b"Metadata"),
        has_outlines: catalog_has(b"Outlines"),
        has_acroform: catalog_has(b"AcroForm"),
        has_structure_tree: catalog_has(b"StructTreeRoot"),
        pages,
    }
}

fn image_info(
    graph: &ObjectGraph,
    object_id: ObjectId,
    stream: &Stream,
    is_smask: bool,
) -> ImageInfo {
    let number = |key: &[u8]| {
        ObjectGraph::dict_entry(&stream.dict, key)
            .and_then(|value| graph.resolve(value).ok())
            .and_then(integer_of)
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(0)
    };

    let color_space = if is_smask {
        "DeviceGray".to_string()
    } else {
        ObjectGraph::dict_entry(&stream.dict, b"ColorSpace")
            .map(|cs| images::color_space_name(graph, cs))
            .unwrap_or_else(|| "Unknown".to_string())
    };

    ImageInfo {
        object_id,
        image_type: if is_smask { "smask" } else { "image" }.to_string(),
        width: number(b"Width"),
        height: number(b"Height"),
        color_space,
        bits_per_component: number(b"BitsPerComponent"),
        filter: crate::graph::filter_names(&stream.dict).join(" "),
        size_bytes: stream.content.len(),
    }
}

fn annotation_count(graph: &ObjectGraph, page_id: ObjectId) -> usize {
    graph
        .dictionary(page_id)
        .ok()
        .and_then(|page| ObjectGraph::dict_entry(page, b"Annots"))
        .and_then(|annots| graph.resolve(annots).ok())
        .map(|annots| match annots {
            Object::Array(items) => items.len(),
            _ => 0,
        })
        .unwrap_or(0)
}
