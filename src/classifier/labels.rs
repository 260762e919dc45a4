//! Label ↔ index mapping artifact
//!
//! The artifact is a JSON object `{ "<label>": <index>, ... }` written when the
//! classifier was built. It is loaded once and treated as read-only.

use super::backend::ClassifierError;
use crate::routing::known_labels;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Fixed mapping from class index to label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMapping {
    labels: BTreeMap<usize, String>,
}

impl LabelMapping {
    /// Build from the artifact's `label → index` form
    pub fn from_label_to_id(label_to_id: HashMap<String, usize>) -> Result<Self, ClassifierError> {
        let mut labels = BTreeMap::new();
        for (label, index) in label_to_id {
            if let Some(existing) = labels.insert(index, label.clone()) {
                return Err(ClassifierError::LabelMapping(format!(
                    "index {index} assigned to both '{existing}' and '{label}'"
                )));
            }
        }
        Ok(Self { labels })
    }

    /// Build with indices assigned in iteration order
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: labels
                .into_iter()
                .enumerate()
                .map(|(index, label)| (index, label.into()))
                .collect(),
        }
    }

    /// Built-in mapping: the routable country labels sorted alphabetically
    pub fn builtin() -> Self {
        let mut labels: Vec<&str> = known_labels().collect();
        labels.sort_unstable();
        Self::from_labels(labels)
    }

    /// Load the JSON artifact from disk
    pub fn load(path: &Path) -> Result<Self, ClassifierError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ClassifierError::LabelMapping(format!("failed to read {}: {e}", path.display()))
        })?;
        let label_to_id: HashMap<String, usize> = serde_json::from_str(&content).map_err(|e| {
            ClassifierError::LabelMapping(format!("failed to parse {}: {e}", path.display()))
        })?;
        if label_to_id.is_empty() {
            return Err(ClassifierError::LabelMapping(format!(
                "{} contains no labels",
                path.display()
            )));
        }
        Self::from_label_to_id(label_to_id)
    }

    pub fn label(&self, index: usize) -> Option<&str> {
        self.labels.get(&index).map(String::as_str)
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.labels
            .iter()
            .find(|(_, l)| l.as_str() == label)
            .map(|(index, _)| *index)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Number of logit slots needed to cover every index (highest index + 1)
    pub fn index_space(&self) -> usize {
        self.labels.keys().next_back().map_or(0, |max| max + 1)
    }

    /// `(index, label)` pairs in index order
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.labels.iter().map(|(index, label)| (*index, label.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_builtin_is_sorted_and_complete() {
        let mapping = LabelMapping::builtin();
        assert_eq!(mapping.len(), 22);
        assert_eq!(mapping.label(0), Some("Australia"));
        assert_eq!(mapping.label(21), Some("Vietnam"));
        assert_eq!(mapping.index_space(), 22);
    }

    #[test]
    fn test_load_artifact() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"China": 1, "Brazil": 0, "Germany": 2}}"#).unwrap();

        let mapping = LabelMapping::load(file.path()).unwrap();
        assert_eq!(mapping.len(), 3);
        assert_eq!(mapping.label(0), Some("Brazil"));
        assert_eq!(mapping.label(1), Some("China"));
        assert_eq!(mapping.index_of("Germany"), Some(2));
        assert_eq!(mapping.label(3), None);
    }

    #[test]
    fn test_duplicate_index_rejected() {
        let mut map = HashMap::new();
        map.insert("China".to_string(), 0);
        map.insert("Japan".to_string(), 0);
        let err = LabelMapping::from_label_to_id(map).unwrap_err();
        assert!(matches!(err, ClassifierError::LabelMapping(_)));
    }

    #[test]
    fn test_empty_artifact_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{}}").unwrap();
        assert!(LabelMapping::load(file.path()).is_err());
    }

    #[test]
    fn test_malformed_artifact_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let err = LabelMapping::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("failed to parse"));
    }

    #[test]
    fn test_sparse_indices_index_space() {
        let mut map = HashMap::new();
        map.insert("China".to_string(), 0);
        map.insert("Japan".to_string(), 4);
        let mapping = LabelMapping::from_label_to_id(map).unwrap();
        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping.index_space(), 5);
        assert_eq!(mapping.label(2), None);
    }
}
