//! Inference backend trait and fixed-length model input

use thiserror::Error;

/// Classification errors
#[derive(Debug, Clone, Error)]
pub enum ClassifierError {
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),
    #[error("Model initialization failed: {0}")]
    ModelInit(String),
    #[error("Tokenization failed: {0}")]
    Tokenization(String),
    #[error("Inference failed: {0}")]
    Inference(String),
    #[error("Invalid label mapping: {0}")]
    LabelMapping(String),
    #[error("Model produced class index {index} but the label mapping has no such entry ({known} labels)")]
    UnknownLabel { index: usize, known: usize },
}

impl ClassifierError {
    /// True when the error reflects a build/deployment inconsistency
    pub fn is_unknown_label(&self) -> bool {
        matches!(self, ClassifierError::UnknownLabel { .. })
    }
}

/// Token ids truncated or padded to exactly `max_length`, with attention mask
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInput {
    pub input_ids: Vec<i64>,
    pub attention_mask: Vec<i64>,
}

impl ModelInput {
    /// Truncate `ids` to `max_length` or pad them with `pad_id` up to it
    pub fn fixed_length(mut ids: Vec<i64>, max_length: usize, pad_id: i64) -> Self {
        ids.truncate(max_length);
        let active = ids.len();
        ids.resize(max_length, pad_id);

        let mut attention_mask = vec![1; active];
        attention_mask.resize(max_length, 0);

        Self {
            input_ids: ids,
            attention_mask,
        }
    }

    pub fn len(&self) -> usize {
        self.input_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.input_ids.is_empty()
    }

    /// Number of non-padding positions
    pub fn active_len(&self) -> usize {
        self.attention_mask.iter().filter(|&&m| m == 1).count()
    }

    /// Token ids at non-padding positions
    pub fn active_ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.input_ids
            .iter()
            .zip(&self.attention_mask)
            .filter(|(_, mask)| **mask == 1)
            .map(|(id, _)| *id)
    }
}

/// Inference backend for dependency injection and testing
///
/// Implementations must be reentrant: `logits` is called concurrently from
/// the blocking thread pool.
pub trait InferenceBackend: Send + Sync {
    /// Backend name (e.g., "lexicon", "onnx")
    fn name(&self) -> &str;

    /// Size of the logit vector this backend produces
    fn num_classes(&self) -> usize;

    /// Token id used for padding
    fn pad_id(&self) -> i64 {
        0
    }

    /// Encode text into token ids, without truncation or padding
    fn encode(&self, text: &str) -> Result<Vec<i64>, ClassifierError>;

    /// Score a fixed-length input, returning one logit per class index
    fn logits(&self, input: &ModelInput) -> Result<Vec<f32>, ClassifierError>;
}
