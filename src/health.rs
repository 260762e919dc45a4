//! Component health checks
//!
//! Backs the `/ready` endpoint: the service is ready when the classifier can
//! score text and the decision store is reachable.

use crate::classifier::TextClassifier;
use crate::store::DecisionStore;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Health check result
#[derive(Debug, Clone, Serialize)]
pub struct HealthCheckResult {
    pub component: String,
    pub healthy: bool,
    pub message: Option<String>,
    pub response_time_ms: Option<u64>,
}

impl HealthCheckResult {
    fn new(component: &str, healthy: bool, message: String, started: Instant) -> Self {
        Self {
            component: component.to_string(),
            healthy,
            message: Some(message),
            response_time_ms: Some(started.elapsed().as_millis() as u64),
        }
    }
}

/// Trait for components that can be health checked
#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn health_check(&self) -> HealthCheckResult;

    fn component_name(&self) -> &str;
}

/// Runs one warm inference on empty text
pub struct ClassifierHealthCheck {
    classifier: Arc<TextClassifier>,
}

impl ClassifierHealthCheck {
    pub fn new(classifier: Arc<TextClassifier>) -> Self {
        Self { classifier }
    }
}

#[async_trait]
impl HealthCheck for ClassifierHealthCheck {
    async fn health_check(&self) -> HealthCheckResult {
        let started = Instant::now();
        let classifier = Arc::clone(&self.classifier);
        let backend = classifier.backend_name().to_string();

        let result = tokio::task::spawn_blocking(move || classifier.classify("")).await;

        match result {
            Ok(Ok(_)) => {
                debug!(backend = %backend, "Classifier health check passed");
                HealthCheckResult::new(
                    self.component_name(),
                    true,
                    format!("{backend} classifier healthy"),
                    started,
                )
            }
            Ok(Err(e)) => {
                warn!(backend = %backend, error = %e, "Classifier health check failed");
                HealthCheckResult::new(
                    self.component_name(),
                    false,
                    format!("{backend} classifier error: {e}"),
                    started,
                )
            }
            Err(e) => HealthCheckResult::new(
                self.component_name(),
                false,
                format!("classifier task failed: {e}"),
                started,
            ),
        }
    }

    fn component_name(&self) -> &str {
        "classifier"
    }
}

/// Probes the decision store
pub struct StoreHealthCheck {
    store: Arc<dyn DecisionStore>,
}

impl StoreHealthCheck {
    pub fn new(store: Arc<dyn DecisionStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl HealthCheck for StoreHealthCheck {
    async fn health_check(&self) -> HealthCheckResult {
        let started = Instant::now();
        match self.store.probe().await {
            Ok(()) => HealthCheckResult::new(
                self.component_name(),
                true,
                format!("{} store reachable", self.store.source()),
                started,
            ),
            Err(e) => {
                warn!(error = %e, "Store health check failed");
                HealthCheckResult::new(
                    self.component_name(),
                    false,
                    format!("{} store error: {e}", self.store.source()),
                    started,
                )
            }
        }
    }

    fn component_name(&self) -> &str {
        "decision_store"
    }
}

/// Aggregated health check manager
#[derive(Default)]
pub struct HealthCheckManager {
    health_checks: Vec<Box<dyn HealthCheck>>,
}

impl HealthCheckManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_health_check(&mut self, health_check: Box<dyn HealthCheck>) {
        self.health_checks.push(health_check);
    }

    pub async fn run_health_checks(&self) -> Vec<HealthCheckResult> {
        let mut results = Vec::with_capacity(self.health_checks.len());
        for health_check in &self.health_checks {
            results.push(health_check.health_check().await);
        }
        results
    }

    /// All components must be healthy; no checks means healthy
    pub fn overall_health(results: &[HealthCheckResult]) -> bool {
        let healthy_count = results.iter().filter(|r| r.healthy).count();
        debug!(
            "Overall health check: {}/{} components healthy",
            healthy_count,
            results.len()
        );
        healthy_count == results.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{LabelMapping, LexiconBackend};
    use crate::store::MemoryDecisionStore;
    use crate::testing::mocks::{FailingStore, MockBackend};

    #[tokio::test]
    async fn test_classifier_health_check() {
        let labels = LabelMapping::builtin();
        let classifier = Arc::new(TextClassifier::new(
            Arc::new(LexiconBackend::new(&labels)),
            labels,
            512,
        ));

        let result = ClassifierHealthCheck::new(classifier).health_check().await;
        assert!(result.healthy);
        assert_eq!(result.component, "classifier");
        assert!(result.response_time_ms.is_some());
    }

    #[tokio::test]
    async fn test_classifier_health_check_failure() {
        let classifier = Arc::new(TextClassifier::new(
            Arc::new(MockBackend::with_failure()),
            LabelMapping::builtin(),
            16,
        ));

        let result = ClassifierHealthCheck::new(classifier).health_check().await;
        assert!(!result.healthy);
        assert!(result.message.unwrap().contains("error"));
    }

    #[tokio::test]
    async fn test_manager_aggregates() {
        let mut manager = HealthCheckManager::new();
        assert!(HealthCheckManager::overall_health(&manager.run_health_checks().await));

        manager.add_health_check(Box::new(StoreHealthCheck::new(Arc::new(
            MemoryDecisionStore::new(),
        ))));
        let results = manager.run_health_checks().await;
        assert!(HealthCheckManager::overall_health(&results));

        manager.add_health_check(Box::new(StoreHealthCheck::new(Arc::new(FailingStore))));
        let results = manager.run_health_checks().await;
        assert_eq!(results.len(), 2);
        assert!(!HealthCheckManager::overall_health(&results));
    }
}
