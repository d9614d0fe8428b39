//! Image transform engine
//!
//! Finds image XObjects through page resources (and the Form XObjects they use), shrinks their
//! recorded dimensions by the tier's scale factor, rewrites filter and bit-depth metadata, and
//! re-encodes the pixel payload at the new size whenever it can be decoded.

use crate::error::{skip_on_error, GraphError, PayloadError};
use crate::graph::{as_dictionary, filter_names, has_subtype, integer_of, unexpected, ObjectGraph};
use crate::options::TierPolicy;
use crate::report;
use flate2::read::ZlibDecoder;
use image::{DynamicImage, ImageFormat, RgbImage};
use lopdf::{Object, ObjectId, Stream};
use std::collections::HashSet;
use std::io::{Read, Write};

/// Smallest edge, in pixels, an image is resampled to
pub const MIN_IMAGE_EDGE: u32 = 32;

/// Payloads above this many pixels keep their bytes; decoding them would cost too much memory.
const MAX_DECODE_PIXELS: usize = 64 * 1024 * 1024;

/// What the image pass did
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImageStats {
    /// Images whose metadata was rewritten
    pub touched: usize,
    /// Of those, images whose pixel payload was re-encoded
    pub reencoded: usize,
}

/// Re-encoded pixel data ready to replace a stream's content
enum Payload {
    Jpeg(Vec<u8>),
    Flate {
        bytes: Vec<u8>,
        color_space: &'static str,
    },
}

/// Edge length after scaling: `max(32, floor(edge * scale))`, never larger than the original.
pub fn scaled_edge(edge: u32, scale_percent: u32) -> u32 {
    let scaled = (u64::from(edge) * u64::from(scale_percent) / 100) as u32;
    scaled.max(MIN_IMAGE_EDGE).min(edge)
}

/// Resample and retag every image reachable from the page tree.
pub fn transform_images(
    graph: &mut ObjectGraph,
    policy: &TierPolicy,
    applied: &mut Vec<String>,
) -> ImageStats {
    let image_ids = collect_image_ids(graph);
    log::debug!("[Images] Found {} image XObjects", image_ids.len());

    let mut stats = ImageStats::default();
    for image_id in image_ids {
        let context = format!("image {:?}", image_id);
        let outcome = skip_on_error(context, transform_image(graph, image_id, policy)).flatten();
        if let Some(reencoded) = outcome {
            stats.touched += 1;
            if reencoded {
                stats.reencoded += 1;
            }
        }
    }

    if stats.touched > 0 {
        applied.push(format!(
            "{}: {} image(s) at {}% scale",
            report::IMAGES_COMPRESSED,
            stats.touched,
            policy.scale_percent
        ));
    }
    stats
}

/// Image XObject ids used by any page, each listed once, in page order.
pub fn collect_image_ids(graph: &ObjectGraph) -> Vec<ObjectId> {
    let mut images = Vec::new();
    let mut seen = HashSet::new();

    for page_id in graph.page_ids() {
        collect_page_images(graph, page_id, &mut images, &mut seen);
    }

    images
}

/// Append the images one page uses, skipping ids already in `seen`.
pub(crate) fn collect_page_images(
    graph: &ObjectGraph,
    page_id: ObjectId,
    images: &mut Vec<ObjectId>,
    seen: &mut HashSet<ObjectId>,
) {
    let context = format!("page {:?} XObjects", page_id);
    let xobjects = skip_on_error(context, graph.page_resource_refs(page_id, b"XObject"));
    for xobject_id in xobjects.unwrap_or_default() {
        collect_images_recursive(graph, xobject_id, images, seen);
    }
}

/// Recursively collect images from an XObject (descends into Form XObjects)
fn collect_images_recursive(
    graph: &ObjectGraph,
    obj_id: ObjectId,
    images: &mut Vec<ObjectId>,
    seen: &mut HashSet<ObjectId>,
) {
    if !seen.insert(obj_id) {
        return;
    }

    let stream = match graph.lookup(obj_id) {
        Ok(Object::Stream(s)) => s,
        _ => return,
    };

    if has_subtype(&stream.dict, b"Image") {
        images.push(obj_id);
    } else if has_subtype(&stream.dict, b"Form") {
        if let Some(resources) = ObjectGraph::dict_entry(&stream.dict, b"Resources") {
            let children = graph
                .resolve(resources)
                .and_then(as_dictionary)
                .and_then(|res| graph.category_refs(res, b"XObject"));
            let context = format!("form {:?} XObjects", obj_id);
            for child_id in skip_on_error(context, children).unwrap_or_default() {
                collect_images_recursive(graph, child_id, images, seen);
            }
        }
    }
}

fn image_stream(graph: &ObjectGraph, id: ObjectId) -> Result<&Stream, GraphError> {
    match graph.lookup(id)? {
        Object::Stream(stream) => Ok(stream),
        other => Err(unexpected("image stream", other)),
    }
}

fn image_stream_mut(graph: &mut ObjectGraph, id: ObjectId) -> Result<&mut Stream, GraphError> {
    match graph.lookup_mut(id)? {
        Object::Stream(stream) => Ok(stream),
        other => Err(unexpected("image stream", other)),
    }
}

/// Rewrite one image. `Ok(None)` means the image was skipped silently; otherwise the flag says
/// whether the payload was re-encoded.
fn transform_image(
    graph: &mut ObjectGraph,
    id: ObjectId,
    policy: &TierPolicy,
) -> Result<Option<bool>, GraphError> {
    // Read phase: everything that needs the rest of the graph.
    let (width, height, decoded) = {
        let stream = image_stream(graph, id)?;
        let dict = &stream.dict;

        if matches!(ObjectGraph::dict_entry(dict, b"ImageMask"), Some(Object::Boolean(true))) {
            log::debug!("[Images] {:?}: stencil mask, leaving as is", id);
            return Ok(None);
        }

        let number = |key: &[u8]| {
            ObjectGraph::dict_entry(dict, key)
                .and_then(|value| graph.resolve(value).ok())
                .and_then(integer_of)
        };
        let dimension = |key: &[u8]| {
            number(key)
                .and_then(|n| u32::try_from(n).ok())
                .filter(|&n| n > 0)
        };
        let (Some(width), Some(height)) = (dimension(b"Width"), dimension(b"Height")) else {
            log::debug!("[Images] {:?}: no usable Width/Height, skipping", id);
            return Ok(None);
        };

        let decoded = if policy.resample_pixels {
            let color_space = ObjectGraph::dict_entry(dict, b"ColorSpace")
                .map(|cs| sample_color_space(graph, cs))
                .unwrap_or_else(|| "DeviceRGB".to_string());
            let bits_per_component = number(b"BitsPerComponent").unwrap_or(8);

            match decode_image_stream(stream, width, height, &color_space, bits_per_component) {
                Ok(img) => Some(img),
                Err(e) => {
                    log::debug!("[Images] {:?}: keeping payload, could not decode: {}", id, e);
                    None
                }
            }
        } else {
            None
        };

        (width, height, decoded)
    };

    let new_width = scaled_edge(width, policy.scale_percent);
    let new_height = scaled_edge(height, policy.scale_percent);
    log::debug!(
        "[Images] {:?}: {}x{} -> {}x{}",
        id,
        width,
        height,
        new_width,
        new_height
    );

    let payload = decoded.and_then(|img| {
        let resampled = resample_image(&img, new_width, new_height);
        match encode_payload(&resampled, policy) {
            Ok(payload) => Some(payload),
            Err(e) => {
                log::debug!("[Images] {:?}: keeping payload: {}", id, e);
                None
            }
        }
    });

    // Write phase.
    let stream = image_stream_mut(graph, id)?;
    stream.dict.set("Width", i64::from(new_width));
    stream.dict.set("Height", i64::from(new_height));

    if policy.recode_images_as_jpeg {
        stream.dict.set("Filter", "DCTDecode");
        stream.dict.remove(b"DecodeParms");
        stream
            .dict
            .set("BitsPerComponent", policy.jpeg_bits_per_component());
    }

    stream.dict.remove(b"Metadata");
    stream.dict.remove(b"ColorSpace");
    stream.dict.remove(b"Interpolate");
    if policy.strip_soft_masks {
        stream.dict.remove(b"SMask");
        stream.dict.remove(b"Intent");
    }

    let reencoded = match payload {
        Some(Payload::Jpeg(bytes)) => {
            stream.set_content(bytes);
            true
        }
        Some(Payload::Flate { bytes, color_space }) => {
            // A raw payload is unreadable without its color model.
            stream.dict.set("Filter", "FlateDecode");
            stream.dict.remove(b"DecodeParms");
            stream.dict.set("ColorSpace", color_space);
            stream.dict.set("BitsPerComponent", 8);
            stream.set_content(bytes);
            true
        }
        None => false,
    };

    Ok(Some(reencoded))
}

/// Get color space name from PDF object
pub(crate) fn color_space_name(graph: &ObjectGraph, obj: &Object) -> String {
    match graph.resolve(obj) {
        Ok(Object::Name(name)) => String::from_utf8_lossy(name).to_string(),
        Ok(Object::Array(arr)) => match arr.first() {
            Some(Object::Name(name)) => String::from_utf8_lossy(name).to_string(),
            _ => "Unknown".to_string(),
        },
        _ => "Unknown".to_string(),
    }
}

/// Device space the samples are stored in. An ICC profile maps to the device space with the same
/// component count; without a usable `/N` it stays `ICCBased` and is not decoded.
fn sample_color_space(graph: &ObjectGraph, obj: &Object) -> String {
    let name = color_space_name(graph, obj);
    if name != "ICCBased" {
        return name;
    }

    let components = match graph.resolve(obj) {
        Ok(Object::Array(arr)) => arr
            .get(1)
            .and_then(|profile| graph.resolve(profile).ok())
            .and_then(|profile| as_dictionary(profile).ok())
            .and_then(|profile| ObjectGraph::dict_entry(profile, b"N"))
            .and_then(|n| graph.resolve(n).ok())
            .and_then(integer_of),
        _ => None,
    };
    match components {
        Some(1) => "DeviceGray".to_string(),
        Some(3) => "DeviceRGB".to_string(),
        Some(4) => "DeviceCMYK".to_string(),
        _ => name,
    }
}

/// Decode a PDF image stream into pixels
fn decode_image_stream(
    stream: &Stream,
    width: u32,
    height: u32,
    color_space: &str,
    bits_per_component: i64,
) -> Result<DynamicImage, PayloadError> {
    let pixels = (width as usize)
        .checked_mul(height as usize)
        .filter(|&n| n <= MAX_DECODE_PIXELS)
        .ok_or_else(|| PayloadError::Decode(format!("{}x{} is too large", width, height)))?;

    let filters = filter_names(&stream.dict);
    if filters.len() > 1 {
        return Err(PayloadError::UnsupportedFilter(filters.join(" ")));
    }

    let content = &stream.content;
    let decoded_data = match filters.first().map(String::as_str) {
        Some("FlateDecode") => {
            if ObjectGraph::dict_entry(&stream.dict, b"DecodeParms").is_some() {
                return Err(PayloadError::UnsupportedFilter(
                    "FlateDecode with predictor".to_string(),
                ));
            }
            let mut decoder = ZlibDecoder::new(&content[..]);
            let mut decoded = Vec::new();
            decoder
                .read_to_end(&mut decoded)
                .map_err(|e| PayloadError::Decode(e.to_string()))?;
            decoded
        }
        Some("DCTDecode") => {
            // JPEG data carries its own color model
            return image::load_from_memory_with_format(content, ImageFormat::Jpeg)
                .map_err(|e| PayloadError::Decode(e.to_string()));
        }
        None => content.clone(),
        Some(other) => return Err(PayloadError::UnsupportedFilter(other.to_string())),
    };

    if bits_per_component != 8 {
        return Err(PayloadError::Decode(format!(
            "{} bits per component",
            bits_per_component
        )));
    }

    let sized = |channels: usize| -> Result<Vec<u8>, PayloadError> {
        let expected = pixels * channels;
        if decoded_data.len() >= expected {
            Ok(decoded_data[..expected].to_vec())
        } else {
            Err(PayloadError::Decode(format!(
                "{} bytes of samples, expected {}",
                decoded_data.len(),
                expected
            )))
        }
    };

    match color_space {
        "DeviceRGB" | "RGB" => {
            let img = RgbImage::from_raw(width, height, sized(3)?)
                .ok_or_else(|| PayloadError::Decode("bad RGB buffer".to_string()))?;
            Ok(DynamicImage::ImageRgb8(img))
        }
        "DeviceGray" | "Gray" => {
            let img = image::GrayImage::from_raw(width, height, sized(1)?)
                .ok_or_else(|| PayloadError::Decode("bad grayscale buffer".to_string()))?;
            Ok(DynamicImage::ImageLuma8(img))
        }
        "DeviceCMYK" | "CMYK" => {
            // Convert CMYK to RGB
            let cmyk = sized(4)?;
            let mut rgb_data = Vec::with_capacity(pixels * 3);
            for chunk in cmyk.chunks(4) {
                let c = chunk[0] as f32 / 255.0;
                let m = chunk[1] as f32 / 255.0;
                let y = chunk[2] as f32 / 255.0;
                let k = chunk[3] as f32 / 255.0;

                rgb_data.push(((1.0 - c) * (1.0 - k) * 255.0) as u8);
                rgb_data.push(((1.0 - m) * (1.0 - k) * 255.0) as u8);
                rgb_data.push(((1.0 - y) * (1.0 - k) * 255.0) as u8);
            }
            let img = RgbImage::from_raw(width, height, rgb_data)
                .ok_or_else(|| PayloadError::Decode("bad CMYK buffer".to_string()))?;
            Ok(DynamicImage::ImageRgb8(img))
        }
        other => Err(PayloadError::UnsupportedColorSpace(other.to_string())),
    }
}

/// Resample an image to target dimensions
fn resample_image(img: &DynamicImage, target_width: u32, target_height: u32) -> DynamicImage {
    if img.width() == target_width && img.height() == target_height {
        return img.clone();
    }
    img.resize_exact(
        target_width,
        target_height,
        image::imageops::FilterType::Lanczos3,
    )
}

fn encode_payload(img: &DynamicImage, policy: &TierPolicy) -> Result<Payload, PayloadError> {
    if policy.recode_images_as_jpeg {
        encode_jpeg(img, policy.jpeg_quality).map(Payload::Jpeg)
    } else {
        encode_flate(img)
    }
}

/// Encode as baseline JPEG; grayscale stays single-channel
fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, PayloadError> {
    let too_large = || {
        PayloadError::Encode(format!(
            "{}x{} exceeds JPEG limits",
            img.width(),
            img.height()
        ))
    };
    let width = u16::try_from(img.width()).map_err(|_| too_large())?;
    let height = u16::try_from(img.height()).map_err(|_| too_large())?;

    let mut jpeg_bytes = Vec::new();
    let encoded = match img {
        DynamicImage::ImageLuma8(gray) => {
            let encoder = jpeg_encoder::Encoder::new(&mut jpeg_bytes, quality);
            encoder.encode(gray.as_raw(), width, height, jpeg_encoder::ColorType::Luma)
        }
        _ => {
            let rgb = img.to_rgb8();
            let mut encoder = jpeg_encoder::Encoder::new(&mut jpeg_bytes, quality);
            encoder.set_sampling_factor(jpeg_encoder::SamplingFactor::R_4_2_0);
            encoder.encode(rgb.as_raw(), width, height, jpeg_encoder::ColorType::Rgb)
        }
    };
    encoded.map_err(|e| PayloadError::Encode(e.to_string()))?;

    Ok(jpeg_bytes)
}

/// Encode as flate-compressed 8-bit samples
fn encode_flate(img: &DynamicImage) -> Result<Payload, PayloadError> {
    let (samples, color_space) = match img {
        DynamicImage::ImageLuma8(gray) => (gray.as_raw().clone(), "DeviceGray"),
        _ => (img.to_rgb8().into_raw(), "DeviceRGB"),
    };

    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::best());
    encoder
        .write_all(&samples)
        .map_err(|e| PayloadError::Encode(e.to_string()))?;
    let bytes = encoder
        .finish()
        .map_err(|e| PayloadError::Encode(e.to_string()))?;

    Ok(Payload::Flate { bytes, color_space })
}
