#![allow(dead_code)]

#[path = "../../src/testutil.rs"]
mod testutil;

use lopdf::{dictionary, ObjectId, SaveOptions, Stream};
use testutil::{opaque_jpeg_stream, pattern_pixels, raw_image_stream, DocBuilder};

/// Printable text that deflate cannot squeeze much.
pub fn noisy_text(len: usize, seed: u32) -> String {
    let mut state = seed.wrapping_mul(2_654_435_761).wrapping_add(1);
    (0..len)
        .map(|_| {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            (b'a' + ((state >> 8) % 26) as u8) as char
        })
        .collect()
}

/// Builds whole test documents page by page.
pub struct Fixture {
    builder: DocBuilder,
    page_ids: Vec<ObjectId>,
}

impl Fixture {
    pub fn new() -> Self {
        Fixture {
            builder: DocBuilder::new(),
            page_ids: Vec::new(),
        }
    }

    fn track(&mut self, page_id: ObjectId) -> ObjectId {
        self.page_ids.push(page_id);
        page_id
    }

    /// A page of uncompressed text set in a font that carries XMP metadata.
    pub fn text_page(&mut self, lines: usize) -> ObjectId {
        let font = self.builder.add_font("Helvetica");
        let mut content = String::new();
        for i in 0..lines {
            content.push_str(&format!(
                "BT /F1 10 Tf 72 {} Td (Line {} of the quarterly figures) Tj ET\n",
                760 - (i % 70) * 10,
                i
            ));
        }
        let page = self.builder.add_page(
            Some(dictionary! { "Font" => dictionary! { "F1" => font } }),
            content.as_bytes(),
        );
        self.track(page)
    }

    /// A page showing one flate-compressed 8-bit image.
    pub fn image_page(&mut self, width: u32, height: u32, gray: bool, seed: u32) -> ObjectId {
        let (channels, color_space) = if gray {
            (1, "DeviceGray")
        } else {
            (3, "DeviceRGB")
        };
        let pixels = pattern_pixels(width, height, channels, seed);
        let (page, image) = self
            .builder
            .add_image_page(raw_image_stream(width, height, color_space, &pixels));
        self.track(page);
        image
    }

    /// A page showing an image whose JPEG payload cannot be decoded.
    pub fn opaque_image_page(&mut self, width: u32, height: u32) -> ObjectId {
        let (page, image) = self.builder.add_image_page(opaque_jpeg_stream(width, height));
        self.track(page);
        image
    }

    pub fn info(&mut self) {
        self.builder.add_info();
    }

    pub fn outlines(&mut self) {
        let first = self.page_ids[0];
        self.builder.add_outlines(first);
    }

    pub fn annotations(&mut self) {
        for page in self.page_ids.clone() {
            self.builder.annotate(page);
        }
    }

    /// Classic cross-reference table, nothing compressed beyond what the fixture did.
    pub fn bytes(self) -> Vec<u8> {
        self.builder.to_bytes()
    }

    /// Object streams at maximum compression: already about as small as it gets.
    pub fn compact_bytes(self) -> Vec<u8> {
        let mut doc = self.builder.build();
        doc.version = "1.5".to_string();
        let options = SaveOptions::builder()
            .use_object_streams(true)
            .use_xref_streams(true)
            .max_objects_per_stream(200)
            .compression_level(9)
            .build();
        let mut out = Vec::new();
        doc.save_with_options(&mut out, options).unwrap();
        out
    }
}

/// Ten documents mixing text, images, metadata and navigation.
pub fn varied_fixtures() -> Vec<Vec<u8>> {
    (0..10u32)
        .map(|i| {
            let mut fixture = Fixture::new();
            fixture.text_page(20 + (i as usize) * 15);
            fixture.image_page(240 + i * 16, 180 + i * 12, i % 3 == 0, i);
            if i % 2 == 0 {
                fixture.image_page(160, 160, i % 4 == 0, i + 100);
            }
            fixture.info();
            if i % 3 != 1 {
                fixture.outlines();
            }
            if i % 4 == 2 {
                fixture.annotations();
            }
            fixture.bytes()
        })
        .collect()
}

/// About 10 KB of text, already flate-packed at the best level inside object streams.
pub fn compact_text_document() -> Vec<u8> {
    let mut fixture = Fixture::new();
    let font = fixture.builder.doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let text = format!("BT /F1 9 Tf 36 760 Td ({}) Tj ET", noisy_text(12_000, 7));
    let page = fixture.builder.add_page(
        Some(dictionary! { "Font" => dictionary! { "F1" => font } }),
        b"",
    );
    let content = fixture.builder.doc.add_object(Stream::new(
        dictionary! { "Filter" => "FlateDecode" },
        squeeze_pdf::codec::deflate(text.as_bytes()).unwrap(),
    ));
    fixture
        .builder
        .doc
        .get_dictionary_mut(page)
        .unwrap()
        .set("Contents", content);
    fixture.track(page);
    fixture.info();
    fixture.compact_bytes()
}
