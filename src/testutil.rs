//! Fixture documents for unit tests.

use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use std::io::Write;

/// Builds small but structurally complete documents.
pub(crate) struct DocBuilder {
    pub doc: Document,
    pub pages_id: ObjectId,
    pub catalog_id: ObjectId,
    page_ids: Vec<ObjectId>,
    pages_resources: Option<Dictionary>,
}

impl DocBuilder {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.4");
        let pages_id = doc.new_object_id();
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        Self {
            doc,
            pages_id,
            catalog_id,
            page_ids: Vec::new(),
            pages_resources: None,
        }
    }

    pub fn add_page(&mut self, resources: Option<Dictionary>, content: &[u8]) -> ObjectId {
        let content_id = self
            .doc
            .add_object(Stream::new(dictionary! {}, content.to_vec()));
        let mut page = dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "Contents" => content_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        };
        if let Some(resources) = resources {
            page.set("Resources", resources);
        }
        let page_id = self.doc.add_object(page);
        self.page_ids.push(page_id);
        page_id
    }

    /// A TrueType font with descriptor, ToUnicode map and XMP metadata attached.
    pub fn add_font(&mut self, base_font: &str) -> ObjectId {
        let font_metadata = self.doc.add_object(xmp_stream());
        let descriptor_metadata = self.doc.add_object(xmp_stream());
        let to_unicode = self.doc.add_object(Stream::new(
            dictionary! {},
            b"/CIDInit /ProcSet findresource begin 12 dict begin begincmap endcmap end end"
                .to_vec(),
        ));
        let descriptor = self.doc.add_object(dictionary! {
            "Type" => "FontDescriptor",
            "FontName" => base_font,
            "Flags" => 32,
            "FontBBox" => vec![(-166).into(), (-225).into(), 1000.into(), 931.into()],
            "ItalicAngle" => 0,
            "Ascent" => 718,
            "Descent" => -207,
            "CapHeight" => 718,
            "StemV" => 88,
            "Metadata" => descriptor_metadata,
        });
        self.doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "TrueType",
            "BaseFont" => base_font,
            "FontDescriptor" => descriptor,
            "ToUnicode" => to_unicode,
            "Metadata" => font_metadata,
        })
    }

    pub fn add_text_page(&mut self, text: &str) -> ObjectId {
        let font_id = self.add_font("Helvetica");
        let content = format!("BT /F1 12 Tf 72 720 Td ({}) Tj ET", text);
        self.add_page(
            Some(dictionary! { "Font" => dictionary! { "F1" => font_id } }),
            content.as_bytes(),
        )
    }

    /// Add a page drawing one image; returns `(page_id, image_id)`.
    pub fn add_image_page(&mut self, image: Stream) -> (ObjectId, ObjectId) {
        let image_id = self.doc.add_object(image);
        let page_id = self.add_page(
            Some(dictionary! { "XObject" => dictionary! { "Im1" => image_id } }),
            b"q 400 0 0 300 100 400 cm /Im1 Do Q",
        );
        (page_id, image_id)
    }

    pub fn set_pages_resources(&mut self, resources: Dictionary) {
        self.pages_resources = Some(resources);
    }

    pub fn add_info(&mut self) -> ObjectId {
        let info_id = self.doc.add_object(dictionary! {
            "Title" => Object::string_literal("Quarterly report"),
            "Author" => Object::string_literal("Finance team"),
            "Subject" => Object::string_literal("Results"),
            "Producer" => Object::string_literal("fixture builder"),
        });
        self.doc.trailer.set("Info", info_id);
        info_id
    }

    pub fn add_xmp_metadata(&mut self) -> ObjectId {
        let metadata_id = self.doc.add_object(xmp_stream());
        self.catalog_mut().set("Metadata", metadata_id);
        metadata_id
    }

    /// Outline with a single entry pointing at `page_id`, plus a `/Dests` dictionary.
    pub fn add_outlines(&mut self, page_id: ObjectId) -> ObjectId {
        let outlines_id = self.doc.new_object_id();
        let item_id = self.doc.add_object(dictionary! {
            "Title" => Object::string_literal("Chapter 1"),
            "Parent" => outlines_id,
            "Dest" => vec![Object::Reference(page_id), "Fit".into()],
        });
        self.doc.objects.insert(
            outlines_id,
            Object::Dictionary(dictionary! {
                "Type" => "Outlines",
                "First" => item_id,
                "Last" => item_id,
                "Count" => 1,
            }),
        );
        let dests_id = self.doc.add_object(dictionary! {
            "chapter1" => vec![Object::Reference(page_id), "Fit".into()],
        });
        let catalog = self.catalog_mut();
        catalog.set("Outlines", outlines_id);
        catalog.set("Dests", dests_id);
        catalog.set("PageMode", "UseOutlines");
        outlines_id
    }

    pub fn annotate(&mut self, page_id: ObjectId) -> ObjectId {
        let annot_id = self.doc.add_object(dictionary! {
            "Type" => "Annot",
            "Subtype" => "Text",
            "Rect" => vec![10.into(), 10.into(), 40.into(), 40.into()],
            "Contents" => Object::string_literal("Reviewed"),
            "P" => page_id,
        });
        if let Ok(page) = self.doc.get_dictionary_mut(page_id) {
            page.set("Annots", vec![Object::Reference(annot_id)]);
        }
        annot_id
    }

    pub fn add_acroform(&mut self) {
        let form_id = self.doc.add_object(dictionary! {
            "Fields" => Vec::<Object>::new(),
            "NeedAppearances" => true,
        });
        self.catalog_mut().set("AcroForm", form_id);
    }

    /// Tagged-PDF structure, viewer preferences and a name tree.
    pub fn add_structure(&mut self) {
        let struct_tree = self.doc.add_object(dictionary! {
            "Type" => "StructTreeRoot",
            "K" => Vec::<Object>::new(),
        });
        let names = self.doc.add_object(dictionary! {
            "Dests" => dictionary! { "Names" => Vec::<Object>::new() },
            "JavaScript" => dictionary! { "Names" => Vec::<Object>::new() },
        });
        let catalog = self.catalog_mut();
        catalog.set("StructTreeRoot", struct_tree);
        catalog.set("MarkInfo", dictionary! { "Marked" => true });
        catalog.set("ViewerPreferences", dictionary! { "DisplayDocTitle" => true });
        catalog.set("Names", names);
    }

    fn catalog_mut(&mut self) -> &mut Dictionary {
        self.doc
            .get_dictionary_mut(self.catalog_id)
            .expect("fixture catalog exists")
    }

    pub fn build(mut self) -> Document {
        let kids: Vec<Object> = self
            .page_ids
            .iter()
            .map(|id| Object::Reference(*id))
            .collect();
        let mut pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => self.page_ids.len() as i64,
        };
        if let Some(resources) = self.pages_resources.take() {
            pages.set("Resources", resources);
        }
        self.doc
            .objects
            .insert(self.pages_id, Object::Dictionary(pages));
        self.doc
    }

    pub fn to_bytes(self) -> Vec<u8> {
        let mut doc = self.build();
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).expect("fixture saves");
        bytes
    }
}

fn xmp_stream() -> Stream {
    Stream::new(
        dictionary! { "Type" => "Metadata", "Subtype" => "XML" },
        b"<?xpacket begin=''?><x:xmpmeta xmlns:x='adobe:ns:meta/'></x:xmpmeta><?xpacket end='w'?>"
            .to_vec(),
    )
}

pub(crate) fn flate(bytes: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes).expect("in-memory write");
    encoder.finish().expect("in-memory finish")
}

/// Deterministic gradient-plus-noise samples.
pub(crate) fn pattern_pixels(width: u32, height: u32, channels: u32, seed: u32) -> Vec<u8> {
    let mut state = seed.wrapping_mul(2_654_435_761).wrapping_add(1);
    let mut pixels = Vec::with_capacity((width * height * channels) as usize);
    for y in 0..height {
        for x in 0..width {
            for c in 0..channels {
                state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                let noise = (state >> 27) as u8;
                let base = (x * 255 / width.max(1) + y * 127 / height.max(1) + c * 40) as u8;
                pixels.push(base.wrapping_add(noise));
            }
        }
    }
    pixels
}

/// A flate-compressed 8-bit image XObject.
pub(crate) fn raw_image_stream(
    width: u32,
    height: u32,
    color_space: &str,
    pixels: &[u8],
) -> Stream {
    Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => color_space,
            "BitsPerComponent" => 8,
            "Filter" => "FlateDecode",
            "Interpolate" => true,
            "Intent" => "Perceptual",
        },
        flate(pixels),
    )
}

/// An image XObject whose JPEG payload cannot be decoded.
pub(crate) fn opaque_jpeg_stream(width: u32, height: u32) -> Stream {
    Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
        },
        vec![0x5a; 2048],
    )
}
