use std::sync::Arc;
use std::time::Instant;

use rampr_metrics::{MetricHandle, Registry};

use crate::workload::{IterationOutcome, VuInfo, Workload};

/// Wraps the user-supplied workload with iteration timing and the
/// flush of each [`IterationOutcome`] into the metric registry.
///
/// Built-in metrics, recorded for every workload:
/// - `iterations` (Counter): iterations started
/// - `iteration_duration` (Trend, ms)
/// - `checks` (Rate): all check evaluations, passed fraction
/// - `errors` (Rate): failed iterations
/// - `iteration_timeouts` (Counter): iterations cancelled at the drain
///   grace deadline
pub(crate) struct Executor<W: Workload> {
    workload: W,
    registry: Arc<Registry>,
    iterations: MetricHandle,
    iteration_duration: MetricHandle,
    checks: MetricHandle,
    errors: MetricHandle,
    timeouts: MetricHandle,
}

impl<W: Workload> Executor<W> {
    pub(crate) fn new(workload: W, registry: Arc<Registry>) -> Result<Self, rampr_metrics::Error> {
        Ok(Self {
            iterations: registry.counter("iterations")?,
            iteration_duration: registry.trend("iteration_duration")?,
            checks: registry.rate("checks")?,
            errors: registry.rate("errors")?,
            timeouts: registry.counter("iteration_timeouts")?,
            workload,
            registry,
        })
    }

    pub(crate) async fn run_iteration(&self, ctx: &W::Context, vu: VuInfo) {
        let started = Instant::now();
        let outcome = self.workload.iterate(ctx, vu).await;
        self.flush(&outcome, started.elapsed());
    }

    fn flush(&self, outcome: &IterationOutcome, elapsed: std::time::Duration) {
        let mut failed = outcome.is_failed();

        for (label, d) in &outcome.durations {
            match self.registry.trend(label) {
                Ok(h) => h.add(d.as_secs_f64() * 1000.0),
                // A label registered under a conflicting kind is a
                // workload defect; drop the sample, fail the iteration.
                Err(_) => failed = true,
            }
        }

        for (label, ok) in &outcome.checks {
            self.checks.add_bool(*ok);
            match self.registry.rate(label) {
                Ok(h) => h.add_bool(*ok),
                Err(_) => failed = true,
            }
        }

        for (name, v) in &outcome.counters {
            match self.registry.counter(name) {
                Ok(h) => h.add(*v),
                Err(_) => failed = true,
            }
        }

        self.iterations.add(1.0);
        self.iteration_duration.add(elapsed.as_secs_f64() * 1000.0);
        self.errors.add_bool(failed);
    }

    /// Flush a hard-cancelled iteration as a synthetic failed outcome.
    pub(crate) fn record_timeout(&self) {
        self.iterations.add(1.0);
        self.timeouts.add(1.0);
        self.errors.add_bool(true);
    }

    /// A teardown failure is recorded, never thrown; it does not flip
    /// the run verdict.
    pub(crate) async fn teardown(&self, ctx: &W::Context) -> Option<String> {
        self.workload.teardown(ctx).await.err().map(|e| e.to_string())
    }
}
