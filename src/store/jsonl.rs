//! JSON Lines decision log
//!
//! One JSON object per line, UTF-8, newline-terminated. Appends are
//! serialized through an async mutex and written on the blocking pool while
//! the lock is held, so concurrent submissions never interleave partial
//! lines, even when a caller is cancelled mid-append. On read, lines that are blank, not UTF-8 or not
//! a decision record (for example a line torn by a crash) are skipped with a
//! warning instead of failing the whole listing.

use super::{DecisionListing, DecisionStore, StoreError};
use crate::observability::metrics::metrics;
use crate::processing::decision::DecisionRecord;
use async_trait::async_trait;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub struct JsonlDecisionStore {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl JsonlDecisionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl DecisionStore for JsonlDecisionStore {
    fn source(&self) -> &str {
        "file"
    }

    async fn append(&self, record: &DecisionRecord) -> Result<(), StoreError> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        // The guard moves into the blocking task, so a caller that stops
        // waiting cannot release the lock while bytes are still being written.
        let guard = Arc::clone(&self.write_lock).lock_owned().await;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            let _guard = guard;
            append_line(&path, line)
        })
        .await
        .map_err(|e| StoreError::Write(std::io::Error::other(e)))?
        .map_err(StoreError::Write)?;

        debug!(
            invoice_id = %record.invoice_id,
            path = %self.path.display(),
            "Decision appended"
        );
        Ok(())
    }

    async fn read_all(&self) -> Result<DecisionListing, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Ok(DecisionListing::new(self.source(), Vec::new()))
            }
            Err(e) => return Err(StoreError::Read(e)),
        };

        Ok(DecisionListing::new(self.source(), parse_lines(&bytes)))
    }

    async fn probe(&self) -> Result<(), StoreError> {
        match tokio::fs::metadata(&self.path).await {
            Ok(meta) if meta.is_file() => Ok(()),
            Ok(_) => Err(StoreError::Unavailable(format!(
                "{} is not a regular file",
                self.path.display()
            ))),
            // Created on first append
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Read(e)),
        }
    }
}

/// Write one complete line, creating parent directories on first use
///
/// A crash mid-write can leave the last line unterminated; it is closed off
/// first so the new record starts on its own line.
fn append_line(path: &Path, mut line: Vec<u8>) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .read(true)
        .append(true)
        .open(path)?;

    if !ends_with_newline(&mut file)? {
        line.insert(0, b'\n');
    }
    file.write_all(&line)?;
    file.flush()
}

/// True for an empty file or one whose last byte is a newline
fn ends_with_newline(file: &mut File) -> std::io::Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(true);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

/// Parse every well-formed record, skipping the rest
fn parse_lines(bytes: &[u8]) -> Vec<DecisionRecord> {
    let mut decisions = Vec::new();

    for (number, raw) in bytes.split(|&b| b == b'\n').enumerate() {
        let Ok(line) = std::str::from_utf8(raw) else {
            warn!(line = number + 1, "Skipping decision line that is not UTF-8");
            metrics().store_corrupt_line();
            continue;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match serde_json::from_str::<DecisionRecord>(line) {
            Ok(record) => decisions.push(record),
            Err(e) => {
                warn!(line = number + 1, error = %e, "Skipping malformed decision line");
                metrics().store_corrupt_line();
            }
        }
    }

    decisions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ClassificationResult;
    use crate::processing::decision::build;
    use crate::routing::route;
    use tempfile::TempDir;

    fn record(id: &str, country: &str) -> DecisionRecord {
        build(
            Some(id),
            ClassificationResult {
                label: country.to_string(),
                confidence: 0.5,
            },
            route(country),
        )
    }

    #[tokio::test]
    async fn test_missing_file_reads_empty() {
        let dir = TempDir::new().unwrap();
        let store = JsonlDecisionStore::new(dir.path().join("nope.jsonl"));

        let listing = store.read_all().await.unwrap();
        assert_eq!(listing.meta.count, 0);
        assert!(listing.decisions.is_empty());
        assert!(store.probe().await.is_ok());
    }

    #[tokio::test]
    async fn test_append_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("outputs/nested/decisions.jsonl");
        let store = JsonlDecisionStore::new(&path);

        store.append(&record("a", "China")).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.ends_with('\n'));
        assert_eq!(content.lines().count(), 1);
    }

    #[tokio::test]
    async fn test_read_preserves_append_order() {
        let dir = TempDir::new().unwrap();
        let store = JsonlDecisionStore::new(dir.path().join("d.jsonl"));

        store.append(&record("first", "China")).await.unwrap();
        store.append(&record("second", "Germany")).await.unwrap();

        let listing = store.read_all().await.unwrap();
        let ids: Vec<_> = listing.decisions.iter().map(|d| d.invoice_id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second"]);
        assert_eq!(listing.meta.source, "file");
    }

    #[test]
    fn test_parse_lines_skips_garbage() {
        let good = serde_json::to_string(&record("ok", "Brazil")).unwrap();
        let mut bytes = Vec::new();
        bytes.extend_from_slice(good.as_bytes());
        bytes.extend_from_slice(b"\n\n   \n");
        bytes.extend_from_slice(b"{\"invoice_id\":\"torn\",\"supp");
        bytes.extend_from_slice(b"\n\xff\xfe\n");
        bytes.extend_from_slice(good.as_bytes());

        let decisions = parse_lines(&bytes);
        assert_eq!(decisions.len(), 2);
        assert!(decisions.iter().all(|d| d.invoice_id == "ok"));
    }

    #[tokio::test]
    async fn test_abandoned_append_still_completes() {
        let dir = TempDir::new().unwrap();
        let store = JsonlDecisionStore::new(dir.path().join("d.jsonl"));

        // Give up on the first append as soon as its write is scheduled
        let first = record("abandoned", "Japan");
        let _ = tokio::time::timeout(std::time::Duration::ZERO, store.append(&first)).await;
        store.append(&record("next", "Mexico")).await.unwrap();

        let content = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(content.lines().count(), 2);
        let listing = store.read_all().await.unwrap();
        let ids: Vec<_> = listing.decisions.iter().map(|d| d.invoice_id.as_str()).collect();
        assert_eq!(ids, vec!["abandoned", "next"]);
    }

    #[tokio::test]
    async fn test_append_terminates_torn_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("d.jsonl");
        std::fs::write(&path, b"{\"invoice_id\":\"torn\",\"supp").unwrap();
        let store = JsonlDecisionStore::new(&path);

        store.append(&record("after", "Poland")).await.unwrap();

        let listing = store.read_all().await.unwrap();
        assert_eq!(listing.meta.count, 1);
        assert_eq!(listing.decisions[0].invoice_id, "after");
    }

    #[tokio::test]
    async fn test_probe_rejects_directory() {
        let dir = TempDir::new().unwrap();
        let store = JsonlDecisionStore::new(dir.path());
        assert!(matches!(store.probe().await, Err(StoreError::Unavailable(_))));
    }
}
