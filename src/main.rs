//! PDF Compression CLI
//!
//! Command-line interface for shrinking PDFs.

use anyhow::{Context, Result};
use clap::Parser;
use squeeze_pdf::{
    file_ops::compress_pdf_file, CompressionOptions, CompressionTier, JpegQuality, TargetResolution,
};
use std::path::PathBuf;

/// Shrink a PDF by pruning structure, resampling images and packing objects
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input PDF file path
    #[arg(short, long)]
    input: PathBuf,

    /// Output PDF file path
    #[arg(short, long)]
    output: PathBuf,

    /// Compression tier: low, medium or high
    #[arg(short, long, default_value = "medium")]
    tier: CompressionTier,

    /// Target image resolution class (72, 96 or 150)
    #[arg(short, long, default_value = "96")]
    dpi: u32,

    /// JPEG quality (10-100)
    #[arg(short, long, default_value = "75")]
    quality: u8,

    /// Remove annotations and interactive forms on every tier
    #[arg(long)]
    strip_annotations: bool,

    /// Remove outlines and named destinations on every tier
    #[arg(long)]
    strip_outlines: bool,

    /// Keep page-level metadata and PieceInfo
    #[arg(long)]
    keep_page_metadata: bool,

    /// Do not retag images as JPEG
    #[arg(long)]
    no_jpeg: bool,

    /// Rewrite image metadata only, leaving pixel data untouched
    #[arg(long)]
    no_resample: bool,

    /// Merge duplicate objects instead of only reporting them
    #[arg(long)]
    merge_duplicates: bool,

    /// ASCII85-armor content streams (high tier only)
    #[arg(long)]
    ascii_armor: bool,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Verbose output (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(match args.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .init();

    let options = CompressionOptions {
        tier: args.tier,
        target_resolution: TargetResolution::try_from(args.dpi)?,
        strip_metadata: !args.keep_page_metadata,
        strip_annotations: args.strip_annotations,
        strip_outlines: args.strip_outlines,
        recode_images_as_jpeg: !args.no_jpeg,
        jpeg_quality: JpegQuality::new(args.quality)?,
        resample_pixels: !args.no_resample,
        merge_duplicates: args.merge_duplicates,
        ascii_armor_content: args.ascii_armor,
    };

    let result = compress_pdf_file(&args.input, &args.output, &options)
        .with_context(|| format!("Failed to compress {}", args.input.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("PDF Compressor");
    println!("==============");
    println!("Tier: {}", result.tier_used);
    for line in &result.applied_optimizations {
        println!("  - {}", line);
    }
    println!(
        "\nDone! {} -> {} bytes ({}% smaller{})",
        result.original_size,
        result.output_size,
        result.ratio_percent,
        if result.fallback_used { ", fallback" } else { "" }
    );
    println!("Output saved to: {:?}", args.output);

    Ok(())
}
