//! Decision persistence
//!
//! Decisions are appended once and never updated. Reads return every
//! well-formed record in append order together with listing metadata.

pub mod jsonl;
pub mod memory;

pub use jsonl::JsonlDecisionStore;
pub use memory::MemoryDecisionStore;

use crate::config::{StoreBackendKind, StoreSection};
use crate::processing::decision::DecisionRecord;
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to write decision: {0}")]
    Write(#[source] std::io::Error),
    #[error("Failed to serialize decision: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Failed to read decisions: {0}")]
    Read(#[source] std::io::Error),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Listing metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingMeta {
    /// Where the records came from ("file" or "memory")
    pub source: String,
    /// RFC 3339 UTC timestamp of the read, microsecond precision
    pub generated_at: String,
    /// Number of records returned
    pub count: usize,
}

/// Decisions plus metadata, as returned by `GET /decisions`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionListing {
    pub meta: ListingMeta,
    pub decisions: Vec<DecisionRecord>,
}

impl DecisionListing {
    pub fn new(source: &str, decisions: Vec<DecisionRecord>) -> Self {
        Self {
            meta: ListingMeta {
                source: source.to_string(),
                generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
                count: decisions.len(),
            },
            decisions,
        }
    }

    /// Keep only the decisions matching `keep`, updating the count
    pub fn retain<F>(&mut self, keep: F)
    where
        F: FnMut(&DecisionRecord) -> bool,
    {
        self.decisions.retain(keep);
        self.meta.count = self.decisions.len();
    }
}

/// Append-only decision store
///
/// Concurrent appends never interleave: each record lands as one complete
/// line (or entry) and none is lost.
#[async_trait]
pub trait DecisionStore: Send + Sync {
    /// Source label reported in listing metadata
    fn source(&self) -> &str;

    /// Persist one decision
    async fn append(&self, record: &DecisionRecord) -> Result<(), StoreError>;

    /// All decisions in append order; an empty store is not an error
    async fn read_all(&self) -> Result<DecisionListing, StoreError>;

    /// Readiness probe
    async fn probe(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Build the configured store
pub fn build_store(config: &StoreSection) -> Arc<dyn DecisionStore> {
    match config.backend {
        StoreBackendKind::Jsonl => Arc::new(JsonlDecisionStore::new(config.path.clone())),
        StoreBackendKind::Memory => Arc::new(MemoryDecisionStore::new()),
    }
}
