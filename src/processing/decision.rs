//! Decision record assembly
//!
//! A [`DecisionRecord`] is the immutable, persisted outcome of one
//! classify-and-route run.

use crate::classifier::ClassificationResult;
use crate::routing::{Region, RoutingOutcome, TransportMode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One line of the decision log
///
/// Absent transports serialize as `null`. The `predicted_country` and
/// `continent` keys written by older tooling are accepted on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub invoice_id: String,
    #[serde(alias = "predicted_country")]
    pub supplier_country: String,
    pub confidence: f64,
    #[serde(alias = "continent")]
    pub region: Region,
    pub primary_transport: Option<TransportMode>,
    pub secondary_transport: Option<TransportMode>,
    pub routing_code: String,
}

/// Assemble a decision record
///
/// A missing or blank `invoice_id` is replaced with a fresh UUID v4.
pub fn build(
    invoice_id: Option<&str>,
    classification: ClassificationResult,
    routing: RoutingOutcome,
) -> DecisionRecord {
    let invoice_id = invoice_id
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    DecisionRecord {
        invoice_id,
        supplier_country: classification.label,
        confidence: classification.confidence,
        region: routing.region,
        primary_transport: routing.primary_transport,
        secondary_transport: routing.secondary_transport,
        routing_code: routing.routing_code,
    }
}
