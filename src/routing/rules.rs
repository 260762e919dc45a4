//! Locked routing tables and the `route` lookup
//!
//! The tables are closed data. They are not derived from the classifier and
//! cannot be changed at runtime.

use super::region::{Region, TransportMode};
use serde::{Deserialize, Serialize};

/// Token written into the routing code when a region has no primary transport
pub const ABSENT_TRANSPORT_PLACEHOLDER: &str = "None";

const COUNTRY_REGIONS: [(&str, Region); 22] = [
    ("India", Region::Apac),
    ("China", Region::Apac),
    ("Vietnam", Region::Apac),
    ("Thailand", Region::Apac),
    ("Indonesia", Region::Apac),
    ("Japan", Region::Apac),
    ("South Korea", Region::Apac),
    ("Australia", Region::Apac),
    ("Germany", Region::Emea),
    ("France", Region::Emea),
    ("United Kingdom", Region::Emea),
    ("Italy", Region::Emea),
    ("Spain", Region::Emea),
    ("Netherlands", Region::Emea),
    ("Poland", Region::Emea),
    ("Czech Republic", Region::Emea),
    ("Saudi Arabia", Region::Emea),
    ("United Arab Emirates", Region::Emea),
    ("United States", Region::Amer),
    ("Canada", Region::Amer),
    ("Mexico", Region::Amer),
    ("Brazil", Region::Amer),
];

/// Result of routing a single label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingOutcome {
    pub region: Region,
    pub primary_transport: Option<TransportMode>,
    pub secondary_transport: Option<TransportMode>,
    pub routing_code: String,
}

/// Labels covered by the region table, in table order
pub fn known_labels() -> impl Iterator<Item = &'static str> {
    COUNTRY_REGIONS.iter().map(|(label, _)| *label)
}

/// Region for a country label; `Region::Unknown` when the label is not in the table
pub fn region_for(label: &str) -> Region {
    COUNTRY_REGIONS
        .iter()
        .find(|(country, _)| *country == label)
        .map(|(_, region)| *region)
        .unwrap_or(Region::Unknown)
}

/// Primary and secondary transport for a region
pub fn transports_for(region: Region) -> (Option<TransportMode>, Option<TransportMode>) {
    match region {
        Region::Apac => (Some(TransportMode::Sea), Some(TransportMode::Air)),
        Region::Emea => (Some(TransportMode::RoadRail), Some(TransportMode::Sea)),
        Region::Amer => (Some(TransportMode::Road), Some(TransportMode::Rail)),
        Region::Unknown => (None, None),
    }
}

/// Route a classified label. Never fails.
pub fn route(label: &str) -> RoutingOutcome {
    let region = region_for(label);
    let (primary_transport, secondary_transport) = transports_for(region);
    let routing_code = format!(
        "{}-{}",
        region,
        primary_transport
            .map(|mode| mode.as_str())
            .unwrap_or(ABSENT_TRANSPORT_PLACEHOLDER)
    );

    RoutingOutcome {
        region,
        primary_transport,
        secondary_transport,
        routing_code,
    }
}
