//! Observability: structured logging and process-wide metrics

pub mod logging;
pub mod metrics;

pub use logging::{init_default_logging, init_logging, LogFormat};
pub use metrics::{metrics, MetricsCollector, MetricsSnapshot};

pub use logging::{lifecycle_span, submission_span};
