//! Service configuration
//!
//! Loaded from a TOML file. Every section has defaults, so a missing section
//! (or a missing file, see `main.rs`) yields a runnable configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RouterConfig {
    #[serde(default)]
    pub service: ServiceSection,
    #[serde(default)]
    pub classifier: ClassifierSection,
    #[serde(default)]
    pub store: StoreSection,
    #[serde(default)]
    pub extraction: ExtractionSection,
}

/// HTTP service section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceSection {
    /// Service identifier (must match [a-zA-Z0-9._-]+)
    #[serde(default = "default_service_id")]
    pub id: String,
    /// Address the HTTP server binds to
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// HTTP port (default: 8000)
    #[serde(default = "default_port")]
    pub port: u16,
    /// Maximum accepted upload size in bytes (default: 20 MiB)
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,
}

impl Default for ServiceSection {
    fn default() -> Self {
        Self {
            id: default_service_id(),
            bind_address: default_bind_address(),
            port: default_port(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_service_id() -> String {
    "invoice-router".to_string()
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_max_upload_bytes() -> u64 {
    20 * 1024 * 1024
}

/// Classifier backend selection
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierBackendKind {
    #[default]
    Lexicon,
    Onnx,
}

/// Classifier section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassifierSection {
    #[serde(default)]
    pub backend: ClassifierBackendKind,
    /// Directory holding `model.onnx` and `tokenizer.json` (onnx backend)
    #[serde(default = "default_model_dir")]
    pub model_dir: PathBuf,
    /// Label mapping artifact; the built-in labels are used only when unset
    #[serde(default)]
    pub label_mapping: Option<PathBuf>,
    /// Fixed input length; longer input is truncated, shorter is padded
    #[serde(default = "default_max_length")]
    pub max_length: usize,
}

impl Default for ClassifierSection {
    fn default() -> Self {
        Self {
            backend: ClassifierBackendKind::default(),
            model_dir: default_model_dir(),
            label_mapping: None,
            max_length: default_max_length(),
        }
    }
}

fn default_model_dir() -> PathBuf {
    PathBuf::from("models/country_classifier")
}

fn default_max_length() -> usize {
    512
}

/// Decision store backend selection
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackendKind {
    #[default]
    Jsonl,
    Memory,
}

/// Decision store section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreSection {
    #[serde(default)]
    pub backend: StoreBackendKind,
    /// Decision log path (jsonl backend)
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            backend: StoreBackendKind::default(),
            path: default_store_path(),
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("outputs/routing_decisions.jsonl")
}

/// Extraction backend selection
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionBackendKind {
    /// PDF documents go through OCR, everything else is read as text
    #[default]
    Auto,
    Ocr,
    Plain,
}

/// Extraction section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractionSection {
    #[serde(default)]
    pub backend: ExtractionBackendKind,
    /// Rasterization resolution for OCR (default: 300)
    #[serde(default = "default_dpi")]
    pub dpi: u32,
    /// Tesseract language (default: "eng")
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_pdftoppm_bin")]
    pub pdftoppm_bin: String,
    #[serde(default = "default_tesseract_bin")]
    pub tesseract_bin: String,
}

impl Default for ExtractionSection {
    fn default() -> Self {
        Self {
            backend: ExtractionBackendKind::default(),
            dpi: default_dpi(),
            language: default_language(),
            pdftoppm_bin: default_pdftoppm_bin(),
            tesseract_bin: default_tesseract_bin(),
        }
    }
}

fn default_dpi() -> u32 {
    300
}

fn default_language() -> String {
    "eng".to_string()
}

fn default_pdftoppm_bin() -> String {
    "pdftoppm".to_string()
}

fn default_tesseract_bin() -> String {
    "tesseract".to_string()
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Invalid service ID format: {0}")]
    InvalidServiceId(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl RouterConfig {
    /// Load configuration from a TOML file and validate it
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: RouterConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field constraints
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_service_id(&self.service.id)?;

        if self.service.port == 0 {
            return Err(ConfigError::InvalidConfig(
                "service.port must be non-zero".to_string(),
            ));
        }
        if self.service.max_upload_bytes == 0 {
            return Err(ConfigError::InvalidConfig(
                "service.max_upload_bytes must be non-zero".to_string(),
            ));
        }
        if self.classifier.max_length == 0 {
            return Err(ConfigError::InvalidConfig(
                "classifier.max_length must be non-zero".to_string(),
            ));
        }
        if !(72..=1200).contains(&self.extraction.dpi) {
            return Err(ConfigError::InvalidConfig(format!(
                "extraction.dpi {} outside 72..=1200",
                self.extraction.dpi
            )));
        }
        if self.classifier.backend == ClassifierBackendKind::Onnx && !cfg!(feature = "onnx") {
            return Err(ConfigError::InvalidConfig(
                "classifier.backend = \"onnx\" requires the `onnx` feature".to_string(),
            ));
        }

        Ok(())
    }

    /// Apply the `PORT` environment override
    pub fn apply_env_overrides(&mut self) {
        if let Some(port) = std::env::var("PORT").ok().and_then(|p| p.parse().ok()) {
            self.service.port = port;
        }
    }
}

/// Validate service ID format
fn validate_service_id(service_id: &str) -> Result<(), ConfigError> {
    let valid_chars = service_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-');

    if service_id.is_empty() || !valid_chars {
        return Err(ConfigError::InvalidServiceId(format!(
            "Service ID '{service_id}' must match pattern [a-zA-Z0-9._-]+"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_config() {
        let toml_content = r#"
[service]
id = "router-eu"
bind_address = "127.0.0.1"
port = 9000
max_upload_bytes = 1048576

[classifier]
backend = "lexicon"
model_dir = "/opt/models/country"
label_mapping = "/opt/models/label_mapping.json"
max_length = 256

[store]
backend = "jsonl"
path = "/var/lib/router/decisions.jsonl"

[extraction]
backend = "ocr"
dpi = 200
language = "eng+deu"
"#;

        let config = RouterConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.service.id, "router-eu");
        assert_eq!(config.service.port, 9000);
        assert_eq!(config.classifier.max_length, 256);
        assert_eq!(
            config.classifier.label_mapping,
            Some(PathBuf::from("/opt/models/label_mapping.json"))
        );
        assert_eq!(config.store.path, PathBuf::from("/var/lib/router/decisions.jsonl"));
        assert_eq!(config.extraction.backend, ExtractionBackendKind::Ocr);
        assert_eq!(config.extraction.language, "eng+deu");
        assert_eq!(config.extraction.tesseract_bin, "tesseract");
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = RouterConfig::from_toml_str("").unwrap();
        assert_eq!(config, RouterConfig::default());
        assert_eq!(config.service.port, 8000);
        assert_eq!(config.classifier.backend, ClassifierBackendKind::Lexicon);
        assert_eq!(config.classifier.max_length, 512);
        assert!(config.classifier.label_mapping.is_none());
        assert_eq!(config.store.backend, StoreBackendKind::Jsonl);
        assert_eq!(
            config.store.path,
            PathBuf::from("outputs/routing_decisions.jsonl")
        );
        assert_eq!(config.extraction.backend, ExtractionBackendKind::Auto);
        assert_eq!(config.extraction.dpi, 300);
    }

    #[test]
    fn test_invalid_service_id() {
        assert!(validate_service_id("invalid@router").is_err());
        assert!(validate_service_id("").is_err());
        assert!(validate_service_id("valid-router_1.eu").is_ok());
    }

    #[test]
    fn test_zero_max_length_rejected() {
        let result = RouterConfig::from_toml_str("[classifier]\nmax_length = 0\n");
        assert!(matches!(result, Err(ConfigError::InvalidConfig(_))));
    }

    #[test]
    fn test_dpi_out_of_range_rejected() {
        let result = RouterConfig::from_toml_str("[extraction]\ndpi = 20\n");
        assert!(matches!(result, Err(ConfigError::InvalidConfig(_))));
    }

    #[test]
    fn test_unknown_backend_is_parse_error() {
        let result = RouterConfig::from_toml_str("[store]\nbackend = \"postgres\"\n");
        assert!(matches!(result, Err(ConfigError::TomlParse(_))));
    }

    #[cfg(not(feature = "onnx"))]
    #[test]
    fn test_onnx_backend_requires_feature() {
        let result = RouterConfig::from_toml_str("[classifier]\nbackend = \"onnx\"\n");
        assert!(matches!(result, Err(ConfigError::InvalidConfig(_))));
    }

    #[test]
    fn test_config_round_trips_through_toml() {
        let config = RouterConfig::default();
        let rendered = toml::to_string_pretty(&config).unwrap();
        let parsed = RouterConfig::from_toml_str(&rendered).unwrap();
        assert_eq!(parsed, config);
    }
}
