//! Staged load generation engine: a ramp schedule drives a pool of
//! virtual users executing a [`Workload`], samples flow into a metric
//! registry, and thresholds over the final aggregates decide the
//! run verdict.

mod config;
mod error;
mod executor;
mod exit;
mod pool;
mod run;
mod schedule;
mod signal;
mod summary;
mod thresholds;
mod workload;

pub use config::{NoDataPolicy, RampMode, ScenarioConfig, Stage};
pub use error::{ConfigError, Error, Result};
pub use exit::ExitCode;
pub use run::{Phase, PhaseFn, RunHooks, TickFn, TickUpdate, run, run_with};
pub use schedule::RampSchedule;
pub use signal::Signal;
pub use summary::RunReport;
pub use thresholds::{
    Threshold, ThresholdOutcome, ThresholdReport, ThresholdResult, ThresholdSpec,
    evaluate_thresholds,
};
pub use workload::{IterationOutcome, VuInfo, Workload, WorkloadError};

pub use rampr_metrics::{
    Metric, MetricHandle, MetricKind, MetricSummary, MetricValues, Registry, TrendSnapshot,
};
