//! Decision listing filters and aggregate summary

use crate::error::PipelineError;
use crate::processing::decision::DecisionRecord;
use crate::routing::{Region, TransportMode, ABSENT_TRANSPORT_PLACEHOLDER};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Upper bound (exclusive) of the low band
pub const LOW_CONFIDENCE_BELOW: f64 = 0.08;
/// Upper bound (inclusive) of the medium band
pub const MEDIUM_CONFIDENCE_MAX: f64 = 0.10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceBand {
    Low,
    Medium,
    High,
}

impl ConfidenceBand {
    pub fn of(confidence: f64) -> Self {
        if confidence < LOW_CONFIDENCE_BELOW {
            ConfidenceBand::Low
        } else if confidence <= MEDIUM_CONFIDENCE_MAX {
            ConfidenceBand::Medium
        } else {
            ConfidenceBand::High
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceBand::Low => "low",
            ConfidenceBand::Medium => "medium",
            ConfidenceBand::High => "high",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "low" => Some(ConfidenceBand::Low),
            "medium" => Some(ConfidenceBand::Medium),
            "high" => Some(ConfidenceBand::High),
            _ => None,
        }
    }
}

/// Raw `GET /decisions` query parameters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DecisionQuery {
    pub country: Option<String>,
    pub region: Option<String>,
    pub primary_transport: Option<String>,
    pub confidence_band: Option<String>,
}

/// Primary transport filter; `None` selects decisions without one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportFilter {
    Absent,
    Mode(TransportMode),
}

/// Validated filter; every present criterion must match
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecisionFilter {
    pub country: Option<String>,
    pub region: Option<Region>,
    pub primary_transport: Option<TransportFilter>,
    pub confidence_band: Option<ConfidenceBand>,
}

impl DecisionFilter {
    pub fn from_query(query: &DecisionQuery) -> Result<Self, PipelineError> {
        let region = non_empty(&query.region)
            .map(|value| {
                Region::parse(value)
                    .ok_or_else(|| PipelineError::invalid_input(format!("unknown region '{value}'")))
            })
            .transpose()?;

        let primary_transport = non_empty(&query.primary_transport)
            .map(|value| {
                if value.eq_ignore_ascii_case(ABSENT_TRANSPORT_PLACEHOLDER) {
                    Ok(TransportFilter::Absent)
                } else {
                    TransportMode::parse(value).map(TransportFilter::Mode).ok_or_else(|| {
                        PipelineError::invalid_input(format!("unknown transport '{value}'"))
                    })
                }
            })
            .transpose()?;

        let confidence_band = non_empty(&query.confidence_band)
            .map(|value| {
                ConfidenceBand::parse(value).ok_or_else(|| {
                    PipelineError::invalid_input(format!(
                        "unknown confidence band '{value}' (expected low, medium or high)"
                    ))
                })
            })
            .transpose()?;

        Ok(Self {
            country: non_empty(&query.country).map(str::to_string),
            region,
            primary_transport,
            confidence_band,
        })
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn matches(&self, decision: &DecisionRecord) -> bool {
        if let Some(country) = &self.country {
            if decision.supplier_country != *country {
                return false;
            }
        }
        if let Some(region) = self.region {
            if decision.region != region {
                return false;
            }
        }
        match self.primary_transport {
            Some(TransportFilter::Absent) if decision.primary_transport.is_some() => return false,
            Some(TransportFilter::Mode(mode)) if decision.primary_transport != Some(mode) => {
                return false
            }
            _ => {}
        }
        if let Some(band) = self.confidence_band {
            if ConfidenceBand::of(decision.confidence) != band {
                return false;
            }
        }
        true
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Aggregates served at `GET /decisions/summary`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DecisionSummary {
    pub total: usize,
    pub average_confidence: f64,
    pub by_region: BTreeMap<String, usize>,
    pub by_country: BTreeMap<String, usize>,
    pub by_primary_transport: BTreeMap<String, usize>,
    pub by_routing_code: BTreeMap<String, usize>,
    pub by_confidence_band: BTreeMap<String, usize>,
}

impl DecisionSummary {
    pub fn from_decisions(decisions: &[DecisionRecord]) -> Self {
        let mut summary = DecisionSummary {
            total: decisions.len(),
            ..Default::default()
        };

        for decision in decisions {
            bump(&mut summary.by_region, decision.region.as_str());
            bump(&mut summary.by_country, &decision.supplier_country);
            bump(
                &mut summary.by_primary_transport,
                decision
                    .primary_transport
                    .map(|mode| mode.as_str())
                    .unwrap_or(ABSENT_TRANSPORT_PLACEHOLDER),
            );
            bump(&mut summary.by_routing_code, &decision.routing_code);
            bump(
                &mut summary.by_confidence_band,
                ConfidenceBand::of(decision.confidence).as_str(),
            );
        }

        if !decisions.is_empty() {
            let sum: f64 = decisions.iter().map(|d| d.confidence).sum();
            summary.average_confidence =
                crate::classifier::round_confidence(sum / decisions.len() as f64);
        }

        summary
    }
}

fn bump(counts: &mut BTreeMap<String, usize>, key: &str) {
    *counts.entry(key.to_string()).or_insert(0) += 1;
}
