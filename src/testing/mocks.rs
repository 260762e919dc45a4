//! Mock implementations for testing
//!
//! Provides mock inference backends, extractors and stores so the pipeline
//! and HTTP layer can be exercised without model artifacts, OCR tools or disk.

use crate::classifier::{ClassifierError, InferenceBackend, ModelInput};
use crate::extraction::{ExtractionError, TextExtractor};
use crate::processing::decision::DecisionRecord;
use crate::store::{DecisionListing, DecisionStore, StoreError};
use async_trait::async_trait;
use std::sync::Mutex;

/// Backend returning fixed logits and recording every input it scores
#[derive(Debug, Default)]
pub struct MockBackend {
    logits: Vec<f32>,
    should_fail: bool,
    seen: Mutex<Vec<ModelInput>>,
}

impl MockBackend {
    pub fn with_logits(logits: Vec<f32>) -> Self {
        Self {
            logits,
            ..Default::default()
        }
    }

    pub fn with_failure() -> Self {
        Self {
            should_fail: true,
            ..Default::default()
        }
    }

    pub fn seen_inputs(&self) -> Vec<ModelInput> {
        self.seen.lock().map(|seen| seen.clone()).unwrap_or_default()
    }
}

impl InferenceBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    fn num_classes(&self) -> usize {
        self.logits.len()
    }

    fn encode(&self, text: &str) -> Result<Vec<i64>, ClassifierError> {
        if self.should_fail {
            return Err(ClassifierError::BackendUnavailable(
                "mock backend offline".to_string(),
            ));
        }
        Ok(text.chars().map(|c| c as i64).collect())
    }

    fn logits(&self, input: &ModelInput) -> Result<Vec<f32>, ClassifierError> {
        if self.should_fail {
            return Err(ClassifierError::BackendUnavailable(
                "mock backend offline".to_string(),
            ));
        }
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(input.clone());
        }
        Ok(self.logits.clone())
    }
}

/// Extractor that returns the document bytes as text, or always fails
#[derive(Debug, Default)]
pub struct MockExtractor {
    fixed_text: Option<String>,
    should_fail: bool,
}

impl MockExtractor {
    /// Pass-through: the document bytes are the extracted text
    pub fn new() -> Self {
        Self::default()
    }

    /// Ignore the document and return `text`
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            fixed_text: Some(text.into()),
            should_fail: false,
        }
    }

    pub fn with_failure() -> Self {
        Self {
            fixed_text: None,
            should_fail: true,
        }
    }
}

#[async_trait]
impl TextExtractor for MockExtractor {
    fn name(&self) -> &str {
        "mock"
    }

    async fn extract(&self, document: &[u8]) -> Result<String, ExtractionError> {
        if self.should_fail {
            return Err(ExtractionError::Unsupported(
                "mock extractor cannot read documents".to_string(),
            ));
        }
        match &self.fixed_text {
            Some(text) => Ok(text.clone()),
            None => Ok(String::from_utf8_lossy(document).into_owned()),
        }
    }
}

/// Store whose every operation fails
#[derive(Debug, Default)]
pub struct FailingStore;

#[async_trait]
impl DecisionStore for FailingStore {
    fn source(&self) -> &str {
        "failing"
    }

    async fn append(&self, _record: &DecisionRecord) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("disk full".to_string()))
    }

    async fn read_all(&self) -> Result<DecisionListing, StoreError> {
        Err(StoreError::Unavailable("log unreadable".to_string()))
    }

    async fn probe(&self) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("log unreadable".to_string()))
    }
}
