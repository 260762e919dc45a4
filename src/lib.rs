//! Invoice Router
//!
//! Classifies the supplier country of an invoice from its OCR text and derives
//! a logistics routing decision from a fixed region table.
//!
//! # Overview
//!
//! - [`extraction`]: document bytes to raw text (plain text or PDF via OCR)
//! - [`processing`]: normalization, the submission pipeline and decision records
//! - [`classifier`]: pluggable inference backends behind a shared softmax glue
//! - [`routing`]: country → region → transport rules
//! - [`store`]: append-only decision log (JSON Lines file or memory)
//! - [`api`]: warp HTTP surface
//!
//! # Quick Start
//!
//! ```rust
//! use invoice_router::routing::{route, Region};
//!
//! let outcome = route("Germany");
//! assert_eq!(outcome.region, Region::Emea);
//! assert_eq!(outcome.routing_code, "EMEA-ROAD_RAIL");
//!
//! let gap = route("Atlantis");
//! assert_eq!(gap.routing_code, "UNKNOWN-None");
//! ```

pub mod api;
pub mod batch;
pub mod classifier;
pub mod config;
pub mod error;
pub mod extraction;
pub mod health;
pub mod observability;
pub mod processing;
pub mod routing;
pub mod store;
pub mod testing;

pub use config::RouterConfig;
pub use error::{PipelineError, PipelineResult};
pub use processing::{normalize, DecisionRecord, RoutingPipeline};
pub use routing::{route, Region, RoutingOutcome, TransportMode};
pub use store::{DecisionListing, DecisionStore};
