//! Document text extraction
//!
//! Turns uploaded document bytes into raw text for the normalizer. Three
//! backends are available:
//! - `plain`: the document is UTF-8 text already
//! - `ocr`: PDF pages are rasterized with `pdftoppm` and read by `tesseract`
//! - `auto`: PDFs (by magic bytes) go to `ocr`, anything else to `plain`

pub mod ocr;
pub mod plain;

pub use ocr::OcrExtractor;
pub use plain::PlainTextExtractor;

use crate::config::{ExtractionBackendKind, ExtractionSection};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// PDF file signature
pub const PDF_MAGIC: &[u8] = b"%PDF-";

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Document is empty")]
    EmptyDocument,

    #[error("Text encoding error: {0}")]
    Encoding(String),

    #[error("Unsupported document: {0}")]
    Unsupported(String),

    #[error("External tool '{0}' is not available")]
    ToolUnavailable(String),

    #[error("{tool} exited with {status}: {stderr}")]
    ToolFailed {
        tool: String,
        status: String,
        stderr: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Extraction collaborator
#[async_trait]
pub trait TextExtractor: Send + Sync {
    fn name(&self) -> &str;

    /// Extract raw (un-normalized) text from document bytes
    async fn extract(&self, document: &[u8]) -> Result<String, ExtractionError>;
}

/// Dispatches PDFs to OCR and everything else to the plain extractor
pub struct AutoExtractor {
    plain: PlainTextExtractor,
    ocr: OcrExtractor,
}

impl AutoExtractor {
    pub fn new(plain: PlainTextExtractor, ocr: OcrExtractor) -> Self {
        Self { plain, ocr }
    }
}

#[async_trait]
impl TextExtractor for AutoExtractor {
    fn name(&self) -> &str {
        "auto"
    }

    async fn extract(&self, document: &[u8]) -> Result<String, ExtractionError> {
        if is_pdf(document) {
            self.ocr.extract(document).await
        } else {
            self.plain.extract(document).await
        }
    }
}

pub fn is_pdf(document: &[u8]) -> bool {
    document.starts_with(PDF_MAGIC)
}

/// Build the configured extractor
pub fn build_extractor(config: &ExtractionSection) -> Arc<dyn TextExtractor> {
    match config.backend {
        ExtractionBackendKind::Plain => Arc::new(PlainTextExtractor),
        ExtractionBackendKind::Ocr => Arc::new(OcrExtractor::from_config(config)),
        ExtractionBackendKind::Auto => Arc::new(AutoExtractor::new(
            PlainTextExtractor,
            OcrExtractor::from_config(config),
        )),
    }
}
