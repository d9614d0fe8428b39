mod common;

use common::Fixture;
use squeeze_pdf::file_ops::{compress_pdf_file, inspect_pdf_file};
use squeeze_pdf::{CompressionError, CompressionOptions};

#[test]
fn compresses_file_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let input_path = dir.path().join("in.pdf");
    let output_path = dir.path().join("out.pdf");

    let mut fixture = Fixture::new();
    fixture.text_page(120);
    fixture.image_page(200, 150, false, 9);
    fixture.info();
    std::fs::write(&input_path, fixture.bytes()).unwrap();

    let result =
        compress_pdf_file(&input_path, &output_path, &CompressionOptions::default()).unwrap();

    let written = std::fs::read(&output_path).unwrap();
    assert_eq!(written.len(), result.output_size);
    assert_eq!(
        std::fs::metadata(&input_path).unwrap().len() as usize,
        result.original_size
    );
    assert_eq!(inspect_pdf_file(&output_path).unwrap().page_count, 2);
}

#[test]
fn missing_input_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = compress_pdf_file(
        &dir.path().join("absent.pdf"),
        &dir.path().join("out.pdf"),
        &CompressionOptions::default(),
    )
    .unwrap_err();

    assert!(matches!(err, CompressionError::Io(_)));
    assert!(!dir.path().join("out.pdf").exists());
}
