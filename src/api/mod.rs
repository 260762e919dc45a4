//! HTTP surface
//!
//! - `POST /route-invoice`: multipart upload (field `file`), returns the decision
//! - `GET /decisions`: persisted decisions with optional filters
//! - `GET /decisions/summary`: counts by region, country, transport, code, band
//! - `GET /health`, `/ready`, `/live`, `/metrics`, `/`: operational endpoints

pub mod query;
pub mod server;

pub use query::{ConfidenceBand, DecisionFilter, DecisionQuery, DecisionSummary};
pub use server::{ApiServer, ServerError};
