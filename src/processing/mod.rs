//! Invoice processing: normalize, classify, route, record
//!
//! [`RoutingPipeline`] runs one submission to completion:
//! extraction → normalization → classification → routing → record → append.

pub mod decision;
pub mod normalizer;
pub mod pipeline;

pub use decision::DecisionRecord;
pub use normalizer::normalize;
pub use pipeline::RoutingPipeline;
