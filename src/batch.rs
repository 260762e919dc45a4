//! Offline batch jobs behind the CLI subcommands
//!
//! - [`route_directory`]: route already-extracted `.txt` invoices
//! - [`normalize_directory`]: write normalized copies of `.txt` invoices
//! - [`validate_file`]: score the classifier against a labelled JSONL file

use crate::classifier::{ClassificationResult, ClassifierError, TextClassifier};
use crate::error::PipelineError;
use crate::processing::decision::DecisionRecord;
use crate::processing::normalizer::normalize;
use crate::processing::RoutingPipeline;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}:{line}: invalid validation record: {source}")]
    InvalidRecord {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Classification failed: {0}")]
    Classifier(#[from] ClassifierError),

    #[error("Batch task failed: {0}")]
    Task(String),
}

impl BatchError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Outcome of a directory routing run
#[derive(Debug, Default)]
pub struct BatchReport {
    pub routed: Vec<DecisionRecord>,
    pub failed: Vec<(PathBuf, PipelineError)>,
}

/// `.txt` files directly inside `dir`, sorted by path
pub async fn list_text_files(dir: &Path) -> Result<Vec<PathBuf>, BatchError> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| BatchError::io(dir, e))?;

    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| BatchError::io(dir, e))?
    {
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "txt") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Route every `.txt` invoice in `dir`; the file stem is the invoice id
///
/// A file that fails is reported and the run continues with the next one.
pub async fn route_directory(
    pipeline: &RoutingPipeline,
    dir: &Path,
) -> Result<BatchReport, BatchError> {
    let mut report = BatchReport::default();

    for path in list_text_files(dir).await? {
        let raw_text = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| BatchError::io(&path, e))?;
        let invoice_id = path.file_stem().map(|stem| stem.to_string_lossy().into_owned());

        match pipeline.route_text(&raw_text, invoice_id.as_deref()).await {
            Ok(record) => report.routed.push(record),
            Err(e) => {
                warn!(file = %path.display(), error = %e, "Failed to route invoice");
                report.failed.push((path, e));
            }
        }
    }

    info!(
        routed = report.routed.len(),
        failed = report.failed.len(),
        "Batch routing complete"
    );
    Ok(report)
}

/// Write a normalized copy of every `.txt` file in `input` to `output`
pub async fn normalize_directory(input: &Path, output: &Path) -> Result<usize, BatchError> {
    tokio::fs::create_dir_all(output)
        .await
        .map_err(|e| BatchError::io(output, e))?;

    let files = list_text_files(input).await?;
    for path in &files {
        let raw_text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| BatchError::io(path, e))?;

        let target = output.join(path.file_name().unwrap_or_default());
        tokio::fs::write(&target, normalize(&raw_text))
            .await
            .map_err(|e| BatchError::io(&target, e))?;
    }

    info!(files = files.len(), output = %output.display(), "Normalized OCR text");
    Ok(files.len())
}

/// One labelled line of a validation file
#[derive(Debug, Clone, Deserialize)]
pub struct ValidationRecord {
    pub text: String,
    /// Label index in the label mapping
    pub label: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationPrediction {
    pub predicted_country: String,
    pub confidence: f64,
    pub expected_country: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub total: usize,
    pub correct: usize,
    pub accuracy: f64,
    pub average_confidence: f64,
    pub sample: Vec<ValidationPrediction>,
}

/// Predictions kept for display
pub const VALIDATION_SAMPLE_SIZE: usize = 5;

/// Classify every record of a validation JSONL file
pub async fn validate_file(
    classifier: Arc<TextClassifier>,
    path: &Path,
) -> Result<ValidationReport, BatchError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| BatchError::io(path, e))?;

    let mut records = Vec::new();
    for (number, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let record: ValidationRecord =
            serde_json::from_str(line).map_err(|source| BatchError::InvalidRecord {
                path: path.to_path_buf(),
                line: number + 1,
                source,
            })?;
        records.push(record);
    }

    tokio::task::spawn_blocking(move || score(&classifier, &records))
        .await
        .map_err(|e| BatchError::Task(e.to_string()))?
}

fn score(
    classifier: &TextClassifier,
    records: &[ValidationRecord],
) -> Result<ValidationReport, BatchError> {
    let mut predictions = Vec::with_capacity(records.len());
    let mut correct = 0;

    for record in records {
        let ClassificationResult { label, confidence } = classifier.classify(&record.text)?;
        let expected = classifier.labels().label(record.label).map(str::to_string);
        if expected.as_deref() == Some(label.as_str()) {
            correct += 1;
        }
        predictions.push(ValidationPrediction {
            predicted_country: label,
            confidence,
            expected_country: expected,
        });
    }

    let total = predictions.len();
    let (accuracy, average_confidence) = if total == 0 {
        (0.0, 0.0)
    } else {
        (
            correct as f64 / total as f64,
            predictions.iter().map(|p| p.confidence).sum::<f64>() / total as f64,
        )
    };

    predictions.truncate(VALIDATION_SAMPLE_SIZE);
    Ok(ValidationReport {
        total,
        correct,
        accuracy,
        average_confidence,
        sample: predictions,
    })
}
