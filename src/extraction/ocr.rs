//! OCR extraction through poppler's `pdftoppm` and `tesseract`
//!
//! Each PDF is written to a scratch directory, rasterized to one PNG per page
//! at the configured DPI and recognized page by page. Page texts are joined
//! with a newline and lower-cased.

use super::{is_pdf, ExtractionError, TextExtractor};
use crate::config::ExtractionSection;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Output;
use tokio::process::Command;
use tracing::debug;

const PAGE_PREFIX: &str = "page";

pub struct OcrExtractor {
    pdftoppm_bin: String,
    tesseract_bin: String,
    dpi: u32,
    language: String,
}

impl OcrExtractor {
    pub fn from_config(config: &ExtractionSection) -> Self {
        Self {
            pdftoppm_bin: config.pdftoppm_bin.clone(),
            tesseract_bin: config.tesseract_bin.clone(),
            dpi: config.dpi,
            language: config.language.clone(),
        }
    }

    async fn rasterize(&self, pdf_path: &Path, out_dir: &Path) -> Result<Vec<PathBuf>, ExtractionError> {
        let dpi = self.dpi.to_string();
        let output = run_tool(
            &self.pdftoppm_bin,
            Command::new(&self.pdftoppm_bin)
                .arg("-r")
                .arg(&dpi)
                .arg("-png")
                .arg(pdf_path)
                .arg(out_dir.join(PAGE_PREFIX)),
        )
        .await?;
        check_status(&self.pdftoppm_bin, &output)?;

        // pdftoppm zero-pads page numbers, so name order is page order
        let mut pages = Vec::new();
        let mut entries = tokio::fs::read_dir(out_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(PAGE_PREFIX) && name.ends_with(".png") {
                pages.push(entry.path());
            }
        }
        pages.sort();

        if pages.is_empty() {
            return Err(ExtractionError::Unsupported(
                "PDF produced no pages".to_string(),
            ));
        }
        Ok(pages)
    }

    async fn recognize(&self, image: &Path) -> Result<String, ExtractionError> {
        let output = run_tool(
            &self.tesseract_bin,
            Command::new(&self.tesseract_bin)
                .arg(image)
                .arg("stdout")
                .arg("-l")
                .arg(&self.language),
        )
        .await?;
        check_status(&self.tesseract_bin, &output)?;

        String::from_utf8(output.stdout).map_err(|e| ExtractionError::Encoding(e.to_string()))
    }
}

#[async_trait]
impl TextExtractor for OcrExtractor {
    fn name(&self) -> &str {
        "ocr"
    }

    async fn extract(&self, document: &[u8]) -> Result<String, ExtractionError> {
        if document.is_empty() {
            return Err(ExtractionError::EmptyDocument);
        }
        if !is_pdf(document) {
            return Err(ExtractionError::Unsupported(
                "OCR extraction expects a PDF document".to_string(),
            ));
        }

        let scratch = tempfile::TempDir::new()?;
        let pdf_path = scratch.path().join("invoice.pdf");
        tokio::fs::write(&pdf_path, document).await?;

        let pages = self.rasterize(&pdf_path, scratch.path()).await?;
        debug!(pages = pages.len(), dpi = self.dpi, "PDF rasterized");

        let mut texts = Vec::with_capacity(pages.len());
        for page in &pages {
            texts.push(self.recognize(page).await?);
        }

        Ok(texts.join("\n").to_lowercase())
    }
}

async fn run_tool(tool: &str, command: &mut Command) -> Result<Output, ExtractionError> {
    command.kill_on_drop(true).output().await.map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            ExtractionError::ToolUnavailable(tool.to_string())
        } else {
            ExtractionError::Io(e)
        }
    })
}

fn check_status(tool: &str, output: &Output) -> Result<(), ExtractionError> {
    if output.status.success() {
        return Ok(());
    }
    Err(ExtractionError::ToolFailed {
        tool: tool.to_string(),
        status: output.status.to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor(pdftoppm: &str) -> OcrExtractor {
        OcrExtractor::from_config(&ExtractionSection {
            pdftoppm_bin: pdftoppm.to_string(),
            ..ExtractionSection::default()
        })
    }

    #[tokio::test]
    async fn test_rejects_non_pdf() {
        let err = extractor("pdftoppm").extract(b"hello").await.unwrap_err();
        assert!(matches!(err, ExtractionError::Unsupported(_)));
    }

    #[tokio::test]
    async fn test_rejects_empty() {
        let err = extractor("pdftoppm").extract(b"").await.unwrap_err();
        assert!(matches!(err, ExtractionError::EmptyDocument));
    }

    #[tokio::test]
    async fn test_missing_tool_is_unavailable() {
        let err = extractor("no-such-pdftoppm-binary")
            .extract(b"%PDF-1.4\n%%EOF")
            .await
            .unwrap_err();
        match err {
            ExtractionError::ToolUnavailable(tool) => assert_eq!(tool, "no-such-pdftoppm-binary"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
