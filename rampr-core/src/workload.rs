use async_trait::async_trait;
use std::time::Duration;

pub type WorkloadError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Identity of the virtual user running the current iteration.
#[derive(Debug, Clone, Copy)]
pub struct VuInfo {
    /// 1-based VU index, stable for the run.
    pub id: u64,
    /// 1-based iteration count for this VU.
    pub iteration: u64,
}

/// Result of one workload iteration: labeled step durations, named
/// check results, and counter increments, flushed into the metric
/// registry before the VU's next iteration begins.
#[derive(Debug, Default)]
pub struct IterationOutcome {
    pub(crate) durations: Vec<(String, Duration)>,
    pub(crate) checks: Vec<(String, bool)>,
    pub(crate) counters: Vec<(String, f64)>,
    pub(crate) error: Option<String>,
}

impl IterationOutcome {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a labeled duration; flushed as a Trend sample (ms).
    pub fn time(&mut self, label: impl Into<String>, elapsed: Duration) {
        self.durations.push((label.into(), elapsed));
    }

    /// Evaluate a named check. Each evaluation contributes one boolean
    /// sample to a Rate metric keyed by the label; a failed check marks
    /// this outcome failed. Returns `pass` so callers can short-circuit.
    pub fn check(&mut self, label: impl Into<String>, pass: bool) -> bool {
        self.checks.push((label.into(), pass));
        pass
    }

    /// Record a counter increment.
    pub fn count(&mut self, name: impl Into<String>, value: f64) {
        self.counters.push((name.into(), value));
    }

    /// Mark this iteration failed with an error description.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.error = Some(error.into());
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some() || self.checks.iter().any(|(_, ok)| !ok)
    }
}

/// The user-supplied three-phase workload. `setup` runs exactly once
/// before the first iteration; its output is shared read-only across
/// all VUs. `iterate` runs once per VU loop pass. `teardown` runs
/// exactly once after the run terminates.
#[async_trait]
pub trait Workload: Send + Sync + 'static {
    type Context: Send + Sync + 'static;

    async fn setup(&self) -> Result<Self::Context, WorkloadError>;

    async fn iterate(&self, ctx: &Self::Context, vu: VuInfo) -> IterationOutcome;

    async fn teardown(&self, _ctx: &Self::Context) -> Result<(), WorkloadError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_check_marks_outcome_failed() {
        let mut out = IterationOutcome::new();
        assert!(!out.is_failed());

        assert!(out.check("status is 200", true));
        assert!(!out.is_failed());

        assert!(!out.check("body has id", false));
        assert!(out.is_failed());
    }

    #[test]
    fn explicit_error_marks_outcome_failed() {
        let mut out = IterationOutcome::new();
        out.fail("connection refused");
        assert!(out.is_failed());
        assert_eq!(out.error(), Some("connection refused"));
    }

    #[test]
    fn check_returns_the_result_for_short_circuiting() {
        let mut out = IterationOutcome::new();
        if out.check("create ok", false) {
            out.time("update", Duration::from_millis(1));
        }
        assert!(out.durations.is_empty());
        assert_eq!(out.checks.len(), 1);
    }
}
