//! Observability: plan pipeline telemetry and sink abstractions.
//!
//! This module never reaches into collectors or work states directly;
//! the plan records events through the sink boundary.

pub(crate) mod metrics;
pub mod sink;

// re-exports
pub use metrics::{EntityEventReport, EventReport};
pub use sink::{MetricsEvent, MetricsSink, metrics_report, metrics_reset_all, with_sink};
