mod metrics;
mod registry;

pub use metrics::{
    Metric, MetricHandle, MetricKind, MetricSummary, MetricValues, TrendSnapshot,
};
pub use registry::{Error, Registry, Result};
