//! Print what a PDF contains before compressing it.

use anyhow::{Context, Result};
use clap::Parser;
use squeeze_pdf::file_ops::inspect_pdf_file;
use std::path::PathBuf;

/// Summarize pages, images, fonts and optional structure of a PDF
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// PDF file to inspect
    file: PathBuf,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let summary = inspect_pdf_file(&args.file)
        .with_context(|| format!("Failed to inspect {}", args.file.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("PDF {} with {} objects", summary.version, summary.object_count);
    println!("Pages: {}", summary.page_count);
    println!("Fonts: {}", summary.font_count);
    println!("Annotations: {}", summary.annotation_count);
    println!("Images: {}", summary.image_count);
    for page in &summary.pages {
        println!("  Page {}:", page.page_number);
        for img in &page.images {
            println!(
                "    {} {} {}: {}x{} {} {}bpc [{}] {} bytes",
                img.object_id.0,
                img.object_id.1,
                img.image_type,
                img.width,
                img.height,
                img.color_space,
                img.bits_per_component,
                img.filter,
                img.size_bytes
            );
        }
    }

    let flags = [
        ("Info dictionary", summary.has_info),
        ("XMP metadata", summary.has_xmp_metadata),
        ("Outlines", summary.has_outlines),
        ("Interactive form", summary.has_acroform),
        ("Structure tree", summary.has_structure_tree),
    ];
    for (label, present) in flags {
        println!("{}: {}", label, if present { "yes" } else { "no" });
    }

    Ok(())
}
