//! ONNX Runtime sequence classifier backend (`onnx` feature)
//!
//! Requires two files in the model directory:
//! - `model.onnx`: a sequence classification model taking `input_ids` and
//!   `attention_mask` and producing logits of shape `[1, num_labels]`
//! - `tokenizer.json`: the matching HuggingFace tokenizer definition

use super::backend::{ClassifierError, InferenceBackend, ModelInput};
use ort::session::Session;
use std::path::Path;
use std::sync::Mutex;
use tokenizers::TruncationParams;

/// Sequence classifier backed by ONNX Runtime
///
/// `Session::run` requires `&mut self`, so the session sits behind a mutex to
/// keep the `&self` backend interface.
pub struct OnnxBackend {
    session: Mutex<Session>,
    tokenizer: tokenizers::Tokenizer,
    num_classes: usize,
    pad_id: i64,
}

impl OnnxBackend {
    /// Load `model.onnx` and `tokenizer.json` from `model_dir`
    ///
    /// The tokenizer truncates to `max_length` itself so the special tokens
    /// survive truncation. The class count is the width of the logits a
    /// warm-up run on empty text produces.
    pub fn load(model_dir: &Path, max_length: usize) -> Result<Self, ClassifierError> {
        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");

        for path in [&model_path, &tokenizer_path] {
            if !path.exists() {
                return Err(ClassifierError::BackendUnavailable(format!(
                    "{} not found",
                    path.display()
                )));
            }
        }

        let session = Session::builder()
            .map_err(|e: ort::Error| ClassifierError::ModelInit(e.to_string()))?
            .with_intra_threads(2)
            .map_err(|e: ort::Error| ClassifierError::ModelInit(e.to_string()))?
            .commit_from_file(&model_path)
            .map_err(|e: ort::Error| ClassifierError::ModelInit(format!("ONNX load failed: {e}")))?;

        let mut tokenizer = tokenizers::Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| ClassifierError::ModelInit(format!("Tokenizer load failed: {e}")))?;
        let pad_id = configure_tokenizer(&mut tokenizer, max_length)?;

        let mut backend = Self {
            session: Mutex::new(session),
            tokenizer,
            num_classes: 0,
            pad_id,
        };

        let warm_up = ModelInput::fixed_length(backend.encode("")?, max_length, pad_id);
        backend.num_classes = backend.logits(&warm_up)?.len();

        tracing::info!(
            "ONNX classifier loaded from {} ({} classes)",
            model_dir.display(),
            backend.num_classes
        );

        Ok(backend)
    }
}

/// Truncate inside the tokenizer and leave padding to [`ModelInput`]
///
/// Returns the pad id the tokenizer was configured with (0 when none).
fn configure_tokenizer(
    tokenizer: &mut tokenizers::Tokenizer,
    max_length: usize,
) -> Result<i64, ClassifierError> {
    let pad_id = tokenizer
        .get_padding()
        .map(|padding| padding.pad_id as i64)
        .unwrap_or(0);

    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length,
            ..Default::default()
        }))
        .map_err(|e| ClassifierError::ModelInit(format!("Tokenizer truncation: {e}")))?;
    tokenizer.with_padding(None);

    Ok(pad_id)
}

impl InferenceBackend for OnnxBackend {
    fn name(&self) -> &str {
        "onnx"
    }

    fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn pad_id(&self) -> i64 {
        self.pad_id
    }

    fn encode(&self, text: &str) -> Result<Vec<i64>, ClassifierError> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| ClassifierError::Tokenization(e.to_string()))?;
        Ok(encoding.get_ids().iter().map(|&id| id as i64).collect())
    }

    fn logits(&self, input: &ModelInput) -> Result<Vec<f32>, ClassifierError> {
        use ort::value::TensorRef;

        let seq_len = input.len();
        let ids_array = ndarray::Array2::from_shape_vec((1, seq_len), input.input_ids.clone())
            .map_err(|e| ClassifierError::Inference(e.to_string()))?;
        let mask_array =
            ndarray::Array2::from_shape_vec((1, seq_len), input.attention_mask.clone())
                .map_err(|e| ClassifierError::Inference(e.to_string()))?;

        let ids_tensor = TensorRef::from_array_view(&ids_array)
            .map_err(|e| ClassifierError::Inference(e.to_string()))?;
        let mask_tensor = TensorRef::from_array_view(&mask_array)
            .map_err(|e| ClassifierError::Inference(e.to_string()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| ClassifierError::Inference("Session lock poisoned".to_string()))?;

        let outputs = session
            .run(ort::inputs![ids_tensor, mask_tensor])
            .map_err(|e| ClassifierError::Inference(format!("ONNX inference failed: {e}")))?;

        let (shape, logits) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| ClassifierError::Inference(format!("Output extraction: {e}")))?;

        if shape.len() != 2 || shape[0] != 1 {
            return Err(ClassifierError::Inference(format!(
                "Unexpected output shape: {shape:?}, expected [1, num_labels]"
            )));
        }

        Ok(logits.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    /// Word-level tokenizer wrapping input as `[CLS] ... [SEP]`
    const TOKENIZER_JSON: &str = r#"{
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [],
        "normalizer": null,
        "pre_tokenizer": {"type": "Whitespace"},
        "post_processor": {
            "type": "TemplateProcessing",
            "single": [
                {"SpecialToken": {"id": "[CLS]", "type_id": 0}},
                {"Sequence": {"id": "A", "type_id": 0}},
                {"SpecialToken": {"id": "[SEP]", "type_id": 0}}
            ],
            "pair": [
                {"SpecialToken": {"id": "[CLS]", "type_id": 0}},
                {"Sequence": {"id": "A", "type_id": 0}},
                {"SpecialToken": {"id": "[SEP]", "type_id": 0}},
                {"Sequence": {"id": "B", "type_id": 1}},
                {"SpecialToken": {"id": "[SEP]", "type_id": 1}}
            ],
            "special_tokens": {
                "[CLS]": {"id": "[CLS]", "ids": [101], "tokens": ["[CLS]"]},
                "[SEP]": {"id": "[SEP]", "ids": [102], "tokens": ["[SEP]"]}
            }
        },
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": {"[PAD]": 0, "[UNK]": 1, "[CLS]": 101, "[SEP]": 102, "invoice": 7, "total": 8},
            "unk_token": "[UNK]"
        }
    }"#;

    fn encode(tokenizer: &tokenizers::Tokenizer, text: &str) -> Vec<u32> {
        tokenizer.encode(text, true).unwrap().get_ids().to_vec()
    }

    #[test]
    fn test_truncation_keeps_closing_special_token() {
        let mut tokenizer = tokenizers::Tokenizer::from_str(TOKENIZER_JSON).unwrap();
        let pad_id = configure_tokenizer(&mut tokenizer, 8).unwrap();
        assert_eq!(pad_id, 0);

        let ids = encode(&tokenizer, &"invoice total ".repeat(20));
        assert_eq!(ids.len(), 8);
        assert_eq!(ids.first(), Some(&101));
        assert_eq!(ids.last(), Some(&102));
        assert_eq!(&ids[1..7], &[7, 8, 7, 8, 7, 8]);
    }

    #[test]
    fn test_short_text_is_not_padded_by_tokenizer() {
        let mut tokenizer = tokenizers::Tokenizer::from_str(TOKENIZER_JSON).unwrap();
        configure_tokenizer(&mut tokenizer, 8).unwrap();

        assert_eq!(encode(&tokenizer, "invoice"), vec![101, 7, 102]);
    }
}
