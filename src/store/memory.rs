//! In-process decision store

use super::{DecisionListing, DecisionStore, StoreError};
use crate::processing::decision::DecisionRecord;
use async_trait::async_trait;
use tokio::sync::RwLock;

/// Volatile store, used with `store.backend = "memory"` and in tests
#[derive(Default)]
pub struct MemoryDecisionStore {
    decisions: RwLock<Vec<DecisionRecord>>,
}

impl MemoryDecisionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.decisions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.decisions.read().await.is_empty()
    }
}

#[async_trait]
impl DecisionStore for MemoryDecisionStore {
    fn source(&self) -> &str {
        "memory"
    }

    async fn append(&self, record: &DecisionRecord) -> Result<(), StoreError> {
        self.decisions.write().await.push(record.clone());
        Ok(())
    }

    async fn read_all(&self) -> Result<DecisionListing, StoreError> {
        let decisions = self.decisions.read().await.clone();
        Ok(DecisionListing::new(self.source(), decisions))
    }
}
