//! Test helpers and utilities for integration tests

use invoice_router::classifier::{LabelMapping, LexiconBackend, TextClassifier};
use invoice_router::processing::RoutingPipeline;
use invoice_router::store::{DecisionStore, JsonlDecisionStore, MemoryDecisionStore};
use invoice_router::testing::MockExtractor;
use std::path::Path;
use std::sync::Arc;

/// Multipart boundary used by [`multipart_upload`]
#[allow(dead_code)]
pub const BOUNDARY: &str = "----invoice-router-test-boundary";

/// Lexicon classifier over the built-in labels
#[allow(dead_code)]
pub fn lexicon_classifier() -> Arc<TextClassifier> {
    let labels = LabelMapping::builtin();
    Arc::new(TextClassifier::new(
        Arc::new(LexiconBackend::new(&labels)),
        labels,
        512,
    ))
}

/// Pipeline whose extractor passes document bytes through as text
#[allow(dead_code)]
pub fn pipeline_with_store(store: Arc<dyn DecisionStore>) -> RoutingPipeline {
    RoutingPipeline::new(Arc::new(MockExtractor::new()), lexicon_classifier(), store)
}

#[allow(dead_code)]
pub fn memory_pipeline() -> (RoutingPipeline, Arc<MemoryDecisionStore>) {
    let store = Arc::new(MemoryDecisionStore::new());
    (pipeline_with_store(store.clone()), store)
}

#[allow(dead_code)]
pub fn jsonl_pipeline(path: &Path) -> RoutingPipeline {
    pipeline_with_store(Arc::new(JsonlDecisionStore::new(path)))
}

/// `(content-type, body)` for a multipart form with one `file` part
#[allow(dead_code)]
pub fn multipart_upload(field: &str, filename: &str, content: &[u8]) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    (format!("multipart/form-data; boundary={BOUNDARY}"), body)
}

/// Realistic OCR text of a Chinese supplier invoice
#[allow(dead_code)]
pub const CHINA_INVOICE: &str = "■ COMMERCIAL INVOICE ■\r\nShenzhen Bright Electronics Co., Ltd.\r\nAddress: Nanshan District, Shenzhen, China\r\nTel: +86 755 8888 1234\r\n\r\n\r\n\r\nTotal Amount:   CNY 48,200.00\r\n增值税专用发票";

/// Realistic OCR text of a German supplier invoice
#[allow(dead_code)]
pub const GERMANY_INVOICE: &str = "RECHNUNG\nMüller Maschinenbau GmbH\nBerlin, Germany\nUSt-IdNr: DE123456789\nTel: +49 30 1234567\nEs gilt ausschließlich deutschem Recht.";
