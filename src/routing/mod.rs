//! Routing Rules
//!
//! Maps a classified supplier country to a logistics routing decision using two
//! locked tables: country → region and region → transport modes.
//!
//! ```text
//! label → Region → (primary, secondary) → routing_code
//! ```
//!
//! A label missing from the region table is not an error: it resolves to
//! [`Region::Unknown`] with no transports.

pub mod region;
pub mod rules;

pub use region::{Region, TransportMode};
pub use rules::{
    known_labels, region_for, route, transports_for, RoutingOutcome, ABSENT_TRANSPORT_PLACEHOLDER,
};
