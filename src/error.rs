//! Pipeline error types
//!
//! Layer errors (`ExtractionError`, `ClassifierError`, `StoreError`) fold into
//! [`PipelineError`], which maps each failure kind to an HTTP status and a
//! stable error code for the `{error: {code, message}}` response body.

use crate::classifier::ClassifierError;
use crate::extraction::ExtractionError;
use crate::store::StoreError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable, machine-readable error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    ExtractionFailed,
    ClassifierUnavailable,
    ClassificationFailed,
    UnknownLabel,
    StoreWriteFailed,
    StoreReadFailed,
    InvalidInput,
    PayloadTooLarge,
    NotFound,
    MethodNotAllowed,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ExtractionFailed => "extraction_failed",
            ErrorCode::ClassifierUnavailable => "classifier_unavailable",
            ErrorCode::ClassificationFailed => "classification_failed",
            ErrorCode::UnknownLabel => "unknown_label",
            ErrorCode::StoreWriteFailed => "store_write_failed",
            ErrorCode::StoreReadFailed => "store_read_failed",
            ErrorCode::InvalidInput => "invalid_input",
            ErrorCode::PayloadTooLarge => "payload_too_large",
            ErrorCode::NotFound => "not_found",
            ErrorCode::MethodNotAllowed => "method_not_allowed",
            ErrorCode::InternalError => "internal_error",
        }
    }

    /// HTTP status carried by this code
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorCode::ExtractionFailed => 422,
            ErrorCode::ClassifierUnavailable => 503,
            ErrorCode::ClassificationFailed => 502,
            ErrorCode::InvalidInput => 400,
            ErrorCode::PayloadTooLarge => 413,
            ErrorCode::NotFound => 404,
            ErrorCode::MethodNotAllowed => 405,
            ErrorCode::UnknownLabel
            | ErrorCode::StoreWriteFailed
            | ErrorCode::StoreReadFailed
            | ErrorCode::InternalError => 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub message: String,
}

/// HTTP error body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

impl ErrorResponse {
    pub fn new(code: ErrorCode, message: &str) -> Self {
        Self {
            error: ErrorDetails {
                code,
                message: sanitize_error_message(message),
            },
        }
    }
}

/// Failure of one submission (or listing)
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Text extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Classification failed: {0}")]
    Classification(ClassifierError),

    #[error("Model produced class index {index} with no label ({known} labels mapped)")]
    UnknownLabel { index: usize, known: usize },

    #[error("Decision was not persisted: {0}")]
    StoreWrite(StoreError),

    #[error("Failed to read decisions: {0}")]
    StoreRead(StoreError),

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Upload exceeds {limit} bytes")]
    PayloadTooLarge { limit: u64 },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl From<ClassifierError> for PipelineError {
    fn from(err: ClassifierError) -> Self {
        match err {
            ClassifierError::UnknownLabel { index, known } => {
                PipelineError::UnknownLabel { index, known }
            }
            other => PipelineError::Classification(other),
        }
    }
}

impl PipelineError {
    pub fn invalid_input<S: Into<String>>(message: S) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn error_code(&self) -> ErrorCode {
        match self {
            PipelineError::Extraction(_) => ErrorCode::ExtractionFailed,
            PipelineError::Classification(ClassifierError::BackendUnavailable(_)) => {
                ErrorCode::ClassifierUnavailable
            }
            PipelineError::Classification(_) => ErrorCode::ClassificationFailed,
            PipelineError::UnknownLabel { .. } => ErrorCode::UnknownLabel,
            PipelineError::StoreWrite(_) => ErrorCode::StoreWriteFailed,
            PipelineError::StoreRead(_) => ErrorCode::StoreReadFailed,
            PipelineError::InvalidInput { .. } => ErrorCode::InvalidInput,
            PipelineError::PayloadTooLarge { .. } => ErrorCode::PayloadTooLarge,
            PipelineError::Internal { .. } => ErrorCode::InternalError,
        }
    }

    /// HTTP status for this failure
    pub fn status_code(&self) -> u16 {
        self.error_code().status_code()
    }

    /// Label used for per-kind failure metrics
    pub fn kind(&self) -> &'static str {
        self.error_code().as_str()
    }

    /// Response body with the message sanitized
    pub fn to_error_response(&self) -> ErrorResponse {
        ErrorResponse::new(self.error_code(), &self.to_string())
    }
}

static SECRET_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(password|token|key|secret)[=:]\s*\S+").expect("secret pattern is valid")
});

static SENSITIVE_PATH_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/[a-zA-Z0-9._/-]+/(secrets?|\.ssh|\.aws|\.config)/[a-zA-Z0-9._/-]+")
        .expect("path pattern is valid")
});

const MAX_MESSAGE_LEN: usize = 500;
const TRUNCATE_SUFFIX: &str = "...[truncated]";

/// Redact secrets and sensitive paths, cap length at 500 bytes
pub fn sanitize_error_message(message: &str) -> String {
    let sanitized = SECRET_PATTERN.replace_all(message, "${1}=***");
    let mut sanitized = SENSITIVE_PATH_PATTERN
        .replace_all(&sanitized, "/***REDACTED***/")
        .into_owned();

    if sanitized.len() > MAX_MESSAGE_LEN {
        let mut cut = MAX_MESSAGE_LEN - TRUNCATE_SUFFIX.len();
        while !sanitized.is_char_boundary(cut) {
            cut -= 1;
        }
        sanitized.truncate(cut);
        sanitized.push_str(TRUNCATE_SUFFIX);
    }

    sanitized
}

pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_per_kind() {
        let extraction = PipelineError::from(ExtractionError::EmptyDocument);
        assert_eq!(extraction.status_code(), 422);

        let unavailable =
            PipelineError::from(ClassifierError::BackendUnavailable("down".to_string()));
        assert_eq!(unavailable.status_code(), 503);

        let inference = PipelineError::from(ClassifierError::Inference("nan".to_string()));
        assert_eq!(inference.status_code(), 502);

        let write = PipelineError::StoreWrite(StoreError::Unavailable("disk".to_string()));
        assert_eq!(write.status_code(), 500);
        assert_eq!(write.error_code(), ErrorCode::StoreWriteFailed);

        assert_eq!(PipelineError::invalid_input("no file").status_code(), 400);
        assert_eq!(PipelineError::PayloadTooLarge { limit: 10 }.status_code(), 413);
    }

    #[test]
    fn test_unknown_label_is_split_out() {
        let err = PipelineError::from(ClassifierError::UnknownLabel { index: 30, known: 22 });
        assert!(matches!(err, PipelineError::UnknownLabel { index: 30, known: 22 }));
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.kind(), "unknown_label");
    }

    #[test]
    fn test_error_response_shape() {
        let err = PipelineError::invalid_input("missing `file` part");
        let body = serde_json::to_value(err.to_error_response()).unwrap();
        assert_eq!(body["error"]["code"], "invalid_input");
        assert_eq!(body["error"]["message"], "Invalid input: missing `file` part");
    }

    #[test]
    fn test_error_message_sanitization() {
        let err = PipelineError::internal("Failed to authenticate: password=secret123 token=abc456");
        let message = err.to_error_response().error.message;

        assert!(!message.contains("secret123"));
        assert!(!message.contains("abc456"));
        assert!(message.contains("password=***"));
        assert!(message.contains("token=***"));
    }

    #[test]
    fn test_file_path_redaction() {
        let sanitized =
            sanitize_error_message("Failed to read /home/user/.ssh/id_rsa and /etc/secrets/api.key");
        assert!(sanitized.contains("/***REDACTED***/"));
        assert!(!sanitized.contains("/home/user/.ssh/id_rsa"));
    }

    #[test]
    fn test_long_message_truncation() {
        let sanitized = sanitize_error_message(&"x".repeat(600));
        assert!(sanitized.len() <= 500);
        assert!(sanitized.ends_with(TRUNCATE_SUFFIX));

        assert_eq!(sanitize_error_message(&"x".repeat(500)).len(), 500);
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        let sanitized = sanitize_error_message(&"日".repeat(300));
        assert!(sanitized.len() <= 500);
        assert!(sanitized.ends_with(TRUNCATE_SUFFIX));
    }

    #[test]
    fn test_error_code_as_str_matches_serde() {
        for code in [
            ErrorCode::ExtractionFailed,
            ErrorCode::ClassifierUnavailable,
            ErrorCode::UnknownLabel,
            ErrorCode::PayloadTooLarge,
        ] {
            assert_eq!(
                serde_json::to_value(code).unwrap(),
                serde_json::Value::from(code.as_str())
            );
        }
    }
}
