//! Classification glue shared by every backend

use super::backend::{ClassifierError, InferenceBackend, ModelInput};
use super::labels::LabelMapping;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Predicted label with its rounded confidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub label: String,
    pub confidence: f64,
}

/// Pre-loaded classifier shared read-only across requests
pub struct TextClassifier {
    backend: Arc<dyn InferenceBackend>,
    labels: LabelMapping,
    max_length: usize,
}

impl TextClassifier {
    pub fn new(backend: Arc<dyn InferenceBackend>, labels: LabelMapping, max_length: usize) -> Self {
        let classifier = Self {
            backend,
            labels,
            max_length,
        };

        if let Some((num_classes, mapped_indices)) = classifier.class_count_mismatch() {
            warn!(
                backend = classifier.backend.name(),
                num_classes,
                mapped_indices,
                "Backend output size does not match the label mapping"
            );
        }

        classifier
    }

    /// `(backend classes, mapped index space)` when the two disagree
    ///
    /// A mismatch is not fatal here; it surfaces per request as an unknown
    /// label once the model picks an unmapped index.
    pub fn class_count_mismatch(&self) -> Option<(usize, usize)> {
        let num_classes = self.backend.num_classes();
        let mapped = self.labels.index_space();
        (num_classes != mapped).then_some((num_classes, mapped))
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn labels(&self) -> &LabelMapping {
        &self.labels
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Classify normalized text
    pub fn classify(&self, text: &str) -> Result<ClassificationResult, ClassifierError> {
        let ids = self.backend.encode(text)?;
        let input = ModelInput::fixed_length(ids, self.max_length, self.backend.pad_id());

        let logits = self.backend.logits(&input)?;
        if logits.is_empty() {
            return Err(ClassifierError::Inference(
                "backend returned no logits".to_string(),
            ));
        }
        if logits.iter().any(|l| !l.is_finite()) {
            return Err(ClassifierError::Inference(
                "backend returned non-finite logits".to_string(),
            ));
        }

        let probabilities = softmax(&logits);
        let (index, probability) = argmax(&probabilities);

        let label = self
            .labels
            .label(index)
            .ok_or(ClassifierError::UnknownLabel {
                index,
                known: self.labels.len(),
            })?;

        let confidence = round_confidence(probability);
        debug!(
            label,
            confidence,
            active_tokens = input.active_len(),
            "Classified text"
        );

        Ok(ClassificationResult {
            label: label.to_string(),
            confidence,
        })
    }
}

/// Numerically stable softmax
pub fn softmax(logits: &[f32]) -> Vec<f64> {
    let max = logits
        .iter()
        .copied()
        .fold(f32::NEG_INFINITY, f32::max) as f64;
    let exps: Vec<f64> = logits.iter().map(|&l| (l as f64 - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Round a probability to 4 decimal places, clamped to [0, 1]
pub fn round_confidence(probability: f64) -> f64 {
    ((probability * 10_000.0).round() / 10_000.0).clamp(0.0, 1.0)
}

/// First index holding the maximum value
fn argmax(values: &[f64]) -> (usize, f64) {
    values
        .iter()
        .copied()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |best, (index, value)| {
            if value > best.1 {
                (index, value)
            } else {
                best
            }
        })
}
