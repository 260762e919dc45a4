//! Submission orchestrator

use super::decision::{self, DecisionRecord};
use super::normalizer::normalize;
use crate::classifier::TextClassifier;
use crate::error::{PipelineError, PipelineResult};
use crate::extraction::TextExtractor;
use crate::observability::metrics::metrics;
use crate::routing::route;
use crate::store::{DecisionListing, DecisionStore};
use crate::submission_span;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn, Instrument};

/// Classify-and-route pipeline shared by every request
///
/// Holds no per-request state. Concurrent submissions only contend on the
/// store's append lock.
#[derive(Clone)]
pub struct RoutingPipeline {
    extractor: Arc<dyn TextExtractor>,
    classifier: Arc<TextClassifier>,
    store: Arc<dyn DecisionStore>,
}

impl RoutingPipeline {
    pub fn new(
        extractor: Arc<dyn TextExtractor>,
        classifier: Arc<TextClassifier>,
        store: Arc<dyn DecisionStore>,
    ) -> Self {
        Self {
            extractor,
            classifier,
            store,
        }
    }

    pub fn classifier(&self) -> &Arc<TextClassifier> {
        &self.classifier
    }

    pub fn store(&self) -> &Arc<dyn DecisionStore> {
        &self.store
    }

    /// Route one uploaded document
    ///
    /// `invoice_name` becomes the invoice id; a fresh UUID is used when it is
    /// absent. The returned record has been appended to the store.
    pub async fn submit(
        &self,
        document: &[u8],
        invoice_name: Option<&str>,
    ) -> PipelineResult<DecisionRecord> {
        self.tracked(invoice_name, async {
            let raw_text = self.extractor.extract(document).await?;
            debug!(
                extractor = self.extractor.name(),
                chars = raw_text.chars().count(),
                "Text extracted"
            );
            self.decide(&raw_text, invoice_name).await
        })
        .await
    }

    /// Route text that was already extracted (batch mode)
    pub async fn route_text(
        &self,
        raw_text: &str,
        invoice_id: Option<&str>,
    ) -> PipelineResult<DecisionRecord> {
        self.tracked(invoice_id, self.decide(raw_text, invoice_id))
            .await
    }

    /// All persisted decisions in append order
    pub async fn list_decisions(&self) -> PipelineResult<DecisionListing> {
        self.store
            .read_all()
            .await
            .map_err(PipelineError::StoreRead)
    }

    async fn decide(
        &self,
        raw_text: &str,
        invoice_id: Option<&str>,
    ) -> PipelineResult<DecisionRecord> {
        let text = normalize(raw_text);

        let classifier = Arc::clone(&self.classifier);
        let classification = tokio::task::spawn_blocking(move || classifier.classify(&text))
            .await
            .map_err(|e| PipelineError::internal(format!("classification task failed: {e}")))??;

        let routing = route(&classification.label);
        let record = decision::build(invoice_id, classification, routing);

        if let Err(e) = self.store.append(&record).await {
            metrics().store_append_failed();
            return Err(PipelineError::StoreWrite(e));
        }
        metrics().store_append();

        Ok(record)
    }

    async fn tracked<F>(&self, invoice_id: Option<&str>, work: F) -> PipelineResult<DecisionRecord>
    where
        F: Future<Output = PipelineResult<DecisionRecord>>,
    {
        metrics().submission_received();
        let started = Instant::now();
        let span = submission_span!(invoice_id = invoice_id.unwrap_or("<generated>"));

        let result = work.instrument(span).await;

        match &result {
            Ok(record) => {
                info!(
                    invoice_id = %record.invoice_id,
                    supplier_country = %record.supplier_country,
                    confidence = record.confidence,
                    routing_code = %record.routing_code,
                    "Invoice routed"
                );
                metrics().submission_completed(record.region.as_str(), started.elapsed());
            }
            Err(e) => {
                warn!(invoice_id = ?invoice_id, error = %e, "Invoice routing failed");
                metrics().submission_failed(e.kind(), started.elapsed());
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{LabelMapping, LexiconBackend};
    use crate::routing::{Region, TransportMode};
    use crate::store::MemoryDecisionStore;
    use crate::testing::mocks::{FailingStore, MockBackend, MockExtractor};

    fn lexicon() -> Arc<TextClassifier> {
        let labels = LabelMapping::builtin();
        Arc::new(TextClassifier::new(
            Arc::new(LexiconBackend::new(&labels)),
            labels,
            512,
        ))
    }

    fn pipeline_with(
        extractor: MockExtractor,
        classifier: Arc<TextClassifier>,
        store: Arc<dyn DecisionStore>,
    ) -> RoutingPipeline {
        RoutingPipeline::new(Arc::new(extractor), classifier, store)
    }

    #[tokio::test]
    async fn test_submit_appends_record() {
        let store = Arc::new(MemoryDecisionStore::new());
        let pipeline = pipeline_with(MockExtractor::new(), lexicon(), store.clone());

        let record = pipeline
            .submit(
                "Shenzhen Trading Co.\nPEOPLE'S REPUBLIC OF CHINA\nTotal: 1200 CNY\n+86 755".as_bytes(),
                Some("INV-CN-1.pdf"),
            )
            .await
            .unwrap();

        assert_eq!(record.invoice_id, "INV-CN-1.pdf");
        assert_eq!(record.supplier_country, "China");
        assert_eq!(record.region, Region::Apac);
        assert_eq!(record.primary_transport, Some(TransportMode::Sea));
        assert_eq!(store.len().await, 1);

        let listing = pipeline.list_decisions().await.unwrap();
        assert_eq!(listing.decisions, vec![record]);
    }

    #[tokio::test]
    async fn test_extraction_failure_appends_nothing() {
        let store = Arc::new(MemoryDecisionStore::new());
        let pipeline = pipeline_with(MockExtractor::with_failure(), lexicon(), store.clone());

        let err = pipeline.submit(b"%PDF-1.4", None).await.unwrap_err();
        assert!(matches!(err, PipelineError::Extraction(_)));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_classifier_failure_appends_nothing() {
        let store = Arc::new(MemoryDecisionStore::new());
        let classifier = Arc::new(TextClassifier::new(
            Arc::new(MockBackend::with_failure()),
            LabelMapping::builtin(),
            16,
        ));
        let pipeline = pipeline_with(MockExtractor::new(), classifier, store.clone());

        let err = pipeline.route_text("anything", None).await.unwrap_err();
        assert_eq!(err.status_code(), 503);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_unknown_label_is_fatal() {
        let store = Arc::new(MemoryDecisionStore::new());
        let classifier = Arc::new(TextClassifier::new(
            Arc::new(MockBackend::with_logits(vec![0.0, 0.0, 5.0])),
            LabelMapping::from_labels(["China", "Germany"]),
            16,
        ));
        let pipeline = pipeline_with(MockExtractor::new(), classifier, store.clone());

        let err = pipeline.route_text("text", Some("x")).await.unwrap_err();
        assert!(matches!(err, PipelineError::UnknownLabel { index: 2, known: 2 }));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_store_failure_is_surfaced() {
        let pipeline = pipeline_with(MockExtractor::new(), lexicon(), Arc::new(FailingStore));

        let err = pipeline.route_text("germany", Some("x")).await.unwrap_err();
        assert!(matches!(err, PipelineError::StoreWrite(_)));
        assert!(matches!(
            pipeline.list_decisions().await,
            Err(PipelineError::StoreRead(_))
        ));
    }

    #[tokio::test]
    async fn test_classifier_sees_normalized_text() {
        let backend = Arc::new(MockBackend::with_logits(vec![1.0]));
        let classifier = Arc::new(TextClassifier::new(
            backend.clone(),
            LabelMapping::from_labels(["Atlantis"]),
            64,
        ));
        let pipeline = pipeline_with(
            MockExtractor::with_text("  ■ HELLO\r\n\r\n\r\n\r\nWORLD  "),
            classifier,
            Arc::new(MemoryDecisionStore::new()),
        );

        let record = pipeline.submit(b"ignored", None).await.unwrap();
        assert_eq!(record.routing_code, "UNKNOWN-None");

        let seen = backend.seen_inputs();
        let text: String = seen[0]
            .active_ids()
            .map(|id| char::from_u32(id as u32).unwrap())
            .collect();
        assert_eq!(text, "hello\nworld");
    }
}
