//! Text extraction from uploaded files.
//!
//! Extractors turn a [`SourceDocument`] into trimmed text. An empty result
//! is not an error; the ingestion pipeline reports it as an empty document.

use crate::document::{FileType, SourceDocument};
use crate::error::{RagError, Result};

/// Extracts plain text from raw file contents.
pub trait TextExtractor: Send + Sync {
    /// Extract the document's text, trimmed of surrounding whitespace.
    fn extract(&self, document: &SourceDocument) -> Result<String>;
}

/// Decodes the file as UTF-8 text.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, document: &SourceDocument) -> Result<String> {
        let text = std::str::from_utf8(&document.bytes).map_err(|e| RagError::ExtractionError {
            source_file: document.file_name.clone(),
            message: format!("file is not valid UTF-8: {e}"),
        })?;
        Ok(text.trim().to_string())
    }
}

/// Extracts the text layer of a PDF.
#[cfg(feature = "pdf")]
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTextExtractor;

#[cfg(feature = "pdf")]
impl TextExtractor for PdfTextExtractor {
    fn extract(&self, document: &SourceDocument) -> Result<String> {
        let text = pdf_extract::extract_text_from_mem(&document.bytes).map_err(|e| {
            RagError::ExtractionError {
                source_file: document.file_name.clone(),
                message: format!("failed to read PDF: {e}"),
            }
        })?;
        Ok(text.trim().to_string())
    }
}

/// Picks an extractor by file type: PDFs go to the PDF extractor, every
/// other type is decoded as plain text.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultExtractor;

impl TextExtractor for DefaultExtractor {
    fn extract(&self, document: &SourceDocument) -> Result<String> {
        match document.file_type {
            FileType::Pdf => extract_pdf(document),
            FileType::PlainText | FileType::Other(_) => PlainTextExtractor.extract(document),
        }
    }
}

#[cfg(feature = "pdf")]
fn extract_pdf(document: &SourceDocument) -> Result<String> {
    PdfTextExtractor.extract(document)
}

#[cfg(not(feature = "pdf"))]
fn extract_pdf(document: &SourceDocument) -> Result<String> {
    Err(RagError::ExtractionError {
        source_file: document.file_name.clone(),
        message: "PDF support is not enabled (build with the `pdf` feature)".into(),
    })
}
