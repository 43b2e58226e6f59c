//! Observability: runtime counters and the sink abstraction.
//!
//! Transactions and services emit `MetricsEvent`s; nothing in `db` touches
//! the counter state directly.

pub(crate) mod metrics;
pub(crate) mod sink;

// re-exports
pub use metrics::{EventOps, EventReport, EventState, PropertyCounters, PropertySummary};
pub use sink::{MetricsEvent, MetricsSink, metrics_report, metrics_reset_all, with_metrics_sink};
