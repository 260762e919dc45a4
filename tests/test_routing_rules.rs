//! Routing table properties

use invoice_router::routing::{known_labels, region_for, route, Region, TransportMode};
use proptest::prelude::*;
use proptest::sample::select;

#[test]
fn test_region_transport_table() {
    let expectations = [
        ("China", "APAC-SEA", Some(TransportMode::Air)),
        ("Australia", "APAC-SEA", Some(TransportMode::Air)),
        ("Germany", "EMEA-ROAD_RAIL", Some(TransportMode::Sea)),
        ("Saudi Arabia", "EMEA-ROAD_RAIL", Some(TransportMode::Sea)),
        ("Brazil", "AMER-ROAD", Some(TransportMode::Rail)),
        ("Canada", "AMER-ROAD", Some(TransportMode::Rail)),
    ];
    for (label, code, secondary) in expectations {
        let outcome = route(label);
        assert_eq!(outcome.routing_code, code, "label {label}");
        assert_eq!(outcome.secondary_transport, secondary, "label {label}");
    }
}

#[test]
fn test_every_region_has_members() {
    for region in [Region::Apac, Region::Emea, Region::Amer] {
        assert!(known_labels().any(|label| region_for(label) == region));
    }
    assert_eq!(known_labels().count(), 22);
}

proptest! {
    #[test]
    fn prop_known_labels_route_consistently(label in select(known_labels().collect::<Vec<_>>())) {
        let outcome = route(label);
        let primary = outcome.primary_transport.expect("known labels have a primary transport");

        prop_assert_ne!(outcome.region, Region::Unknown);
        prop_assert!(outcome.secondary_transport.is_some());
        prop_assert_eq!(outcome.routing_code, format!("{}-{}", outcome.region, primary));
        prop_assert_eq!(route(label), route(label));
    }

    #[test]
    fn prop_unknown_labels_have_no_transport(label in "[A-Za-z ]{0,30}") {
        prop_assume!(!known_labels().any(|known| known == label));

        let outcome = route(&label);
        prop_assert_eq!(outcome.region, Region::Unknown);
        prop_assert!(outcome.primary_transport.is_none());
        prop_assert!(outcome.secondary_transport.is_none());
        prop_assert_eq!(outcome.routing_code, "UNKNOWN-None");
    }
}
