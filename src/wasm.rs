//! WebAssembly bindings for the PDF compressor

use crate::{compress, inspect, CompressionOptions, CompressionTier, JpegQuality, TargetResolution};
use wasm_bindgen::prelude::*;

/// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// Compress a PDF held in memory
///
/// # Arguments
/// * `pdf_bytes` - The input PDF file as a byte array
/// * `tier` - "low", "medium" or "high" (default: "medium")
/// * `dpi` - Target resolution class, 72, 96 or 150 (default: 96)
/// * `quality` - JPEG quality 10-100 (default: 75)
/// * `strip_annotations` - Remove annotations on every tier (default: false)
/// * `strip_outlines` - Remove outlines on every tier (default: false)
///
/// # Returns
/// A `CompressionResultJs` with the output PDF and what was done, or throws an error
#[wasm_bindgen]
pub fn compress_pdf(
    pdf_bytes: &[u8],
    tier: Option<String>,
    dpi: Option<u32>,
    quality: Option<u8>,
    strip_annotations: Option<bool>,
    strip_outlines: Option<bool>,
) -> Result<CompressionResultJs, JsError> {
    let tier = match tier {
        Some(name) => name.parse::<CompressionTier>()?,
        None => CompressionTier::Medium,
    };
    let options = CompressionOptions {
        tier,
        target_resolution: TargetResolution::try_from(dpi.unwrap_or(96))?,
        jpeg_quality: JpegQuality::new(quality.unwrap_or(75))?,
        strip_annotations: strip_annotations.unwrap_or(false),
        strip_outlines: strip_outlines.unwrap_or(false),
        ..CompressionOptions::default()
    };

    let result = compress(pdf_bytes, &options).map_err(|e| JsError::new(&e.to_string()))?;

    let applied_json = serde_json::to_string(&result.applied_optimizations)
        .unwrap_or_else(|_| "[]".to_string());

    Ok(CompressionResultJs {
        original_size: result.original_size,
        output_size: result.output_size,
        ratio_percent: result.ratio_percent as i32,
        fallback_used: result.fallback_used,
        tier_used: result.tier_used.to_string(),
        applied_json,
        pdf_bytes: result.output_bytes,
    })
}

/// Summarize a PDF as a JSON string
#[wasm_bindgen]
pub fn inspect_pdf(pdf_bytes: &[u8]) -> Result<String, JsError> {
    let summary = inspect(pdf_bytes).map_err(|e| JsError::new(&e.to_string()))?;
    serde_json::to_string(&summary).map_err(|e| JsError::new(&e.to_string()))
}

/// Result of a compression run
#[wasm_bindgen]
pub struct CompressionResultJs {
    pdf_bytes: Vec<u8>,
    original_size: usize,
    output_size: usize,
    ratio_percent: i32,
    fallback_used: bool,
    tier_used: String,
    applied_json: String,
}

#[wasm_bindgen]
impl CompressionResultJs {
    /// Get the compressed PDF bytes
    #[wasm_bindgen(getter)]
    pub fn pdf_bytes(&self) -> Vec<u8> {
        self.pdf_bytes.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn original_size(&self) -> usize {
        self.original_size
    }

    #[wasm_bindgen(getter)]
    pub fn output_size(&self) -> usize {
        self.output_size
    }

    /// Size reduction in whole percent
    #[wasm_bindgen(getter)]
    pub fn ratio_percent(&self) -> i32 {
        self.ratio_percent
    }

    #[wasm_bindgen(getter)]
    pub fn fallback_used(&self) -> bool {
        self.fallback_used
    }

    #[wasm_bindgen(getter)]
    pub fn tier_used(&self) -> String {
        self.tier_used.clone()
    }

    /// Get the applied optimizations as a JSON array of strings
    #[wasm_bindgen(getter)]
    pub fn applied_json(&self) -> String {
        self.applied_json.clone()
    }
}
