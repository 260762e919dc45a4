//! Supplier country classification
//!
//! The classifier is split in two layers:
//!
//! - [`InferenceBackend`]: turns text into token ids and scores a fixed-length
//!   input into one logit per label index. Backends are pluggable.
//! - [`TextClassifier`]: the shared glue. It truncates and pads the encoded
//!   input to `max_length`, applies softmax, picks the most probable index,
//!   maps it through the [`LabelMapping`] and rounds the confidence to 4
//!   decimal places.
//!
//! A `TextClassifier` is built once at startup and shared behind an `Arc`.
//! Classification never mutates it.

pub mod backend;
pub mod classify;
pub mod labels;
pub mod lexicon;
#[cfg(feature = "onnx")]
pub mod onnx;

pub use backend::{ClassifierError, InferenceBackend, ModelInput};
pub use classify::{round_confidence, softmax, ClassificationResult, TextClassifier};
pub use labels::LabelMapping;
pub use lexicon::LexiconBackend;
#[cfg(feature = "onnx")]
pub use onnx::OnnxBackend;

use crate::config::{ClassifierBackendKind, ClassifierSection};
use std::sync::Arc;
use tracing::info;

/// Build the process-wide classifier from configuration
///
/// A configured label mapping must exist; the built-in mapping of routable
/// countries is used only when no artifact is configured.
pub fn build_classifier(config: &ClassifierSection) -> Result<TextClassifier, ClassifierError> {
    let labels = match &config.label_mapping {
        Some(path) if !path.exists() => {
            return Err(ClassifierError::LabelMapping(format!(
                "{} not found",
                path.display()
            )))
        }
        Some(path) => LabelMapping::load(path)?,
        None => {
            info!("No label mapping configured, using built-in labels");
            LabelMapping::builtin()
        }
    };

    let backend: Arc<dyn InferenceBackend> = match config.backend {
        ClassifierBackendKind::Lexicon => Arc::new(LexiconBackend::new(&labels)),
        #[cfg(feature = "onnx")]
        ClassifierBackendKind::Onnx => {
            Arc::new(OnnxBackend::load(&config.model_dir, config.max_length)?)
        }
        #[cfg(not(feature = "onnx"))]
        ClassifierBackendKind::Onnx => {
            return Err(ClassifierError::BackendUnavailable(
                "onnx backend requires building with the `onnx` feature".to_string(),
            ))
        }
    };

    info!(
        backend = backend.name(),
        labels = labels.len(),
        max_length = config.max_length,
        "Classifier loaded"
    );

    Ok(TextClassifier::new(backend, labels, config.max_length))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_missing_label_mapping_is_fatal() {
        let config = ClassifierSection {
            label_mapping: Some("/nonexistent/models/label_mapping.json".into()),
            ..Default::default()
        };
        let err = build_classifier(&config).err().unwrap();
        assert!(matches!(err, ClassifierError::LabelMapping(_)));
        assert!(err.to_string().contains("label_mapping.json not found"));
    }

    #[test]
    fn test_unset_label_mapping_uses_builtin() {
        let classifier = build_classifier(&ClassifierSection::default()).unwrap();
        assert_eq!(classifier.labels().len(), 22);
        assert_eq!(classifier.backend_name(), "lexicon");
    }

    #[test]
    fn test_configured_label_mapping_is_loaded() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"Japan": 0, "Brazil": 1}}"#).unwrap();

        let config = ClassifierSection {
            label_mapping: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        let classifier = build_classifier(&config).unwrap();
        assert_eq!(classifier.labels().len(), 2);
        assert_eq!(classifier.classify("japan jpy").unwrap().label, "Japan");
    }
}
