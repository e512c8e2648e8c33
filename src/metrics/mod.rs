pub mod base;
pub mod functions;

pub use base::{compute_metrics, ForecastMetric, Metric, MetricAggregationMode, MetricKind};
