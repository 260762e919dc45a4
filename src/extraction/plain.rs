//! Plain text documents

use super::{ExtractionError, TextExtractor};
use async_trait::async_trait;

const UTF8_BOM: &str = "\u{FEFF}";

/// Reads documents that are already UTF-8 text (pre-extracted OCR output)
pub struct PlainTextExtractor;

#[async_trait]
impl TextExtractor for PlainTextExtractor {
    fn name(&self) -> &str {
        "plain"
    }

    async fn extract(&self, document: &[u8]) -> Result<String, ExtractionError> {
        if document.is_empty() {
            return Err(ExtractionError::EmptyDocument);
        }
        if document.contains(&0) {
            return Err(ExtractionError::Unsupported(
                "binary content in text document".to_string(),
            ));
        }

        let text = std::str::from_utf8(document)
            .map_err(|e| ExtractionError::Encoding(e.to_string()))?;
        Ok(text.strip_prefix(UTF8_BOM).unwrap_or(text).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reads_utf8() {
        let text = PlainTextExtractor
            .extract("Rechnung\nUSt-IdNr: DE123".as_bytes())
            .await
            .unwrap();
        assert_eq!(text, "Rechnung\nUSt-IdNr: DE123");
    }

    #[tokio::test]
    async fn test_strips_bom() {
        let text = PlainTextExtractor
            .extract("\u{FEFF}invoice".as_bytes())
            .await
            .unwrap();
        assert_eq!(text, "invoice");
    }

    #[tokio::test]
    async fn test_rejects_invalid_utf8() {
        let err = PlainTextExtractor.extract(&[0xff, 0xfe, 0x41]).await.unwrap_err();
        assert!(matches!(err, ExtractionError::Encoding(_)));
    }

    #[tokio::test]
    async fn test_rejects_empty_and_binary() {
        assert!(matches!(
            PlainTextExtractor.extract(b"").await,
            Err(ExtractionError::EmptyDocument)
        ));
        assert!(matches!(
            PlainTextExtractor.extract(b"abc\0def").await,
            Err(ExtractionError::Unsupported(_))
        ));
    }
}
