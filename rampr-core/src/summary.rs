use std::fmt::Write as _;
use std::time::Duration;

use rampr_metrics::{MetricSummary, MetricValues};

use crate::exit::ExitCode;
use crate::thresholds::{ThresholdOutcome, ThresholdReport};

/// Final report for a completed run. Metrics are sorted by name and the
/// threshold verdict is already folded into `thresholds.passed`.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub scenario: String,
    pub elapsed: Duration,
    pub iterations_total: u64,
    pub timeouts_total: u64,
    pub teardown_error: Option<String>,
    pub metrics: Vec<MetricSummary>,
    pub thresholds: ThresholdReport,
}

impl RunReport {
    /// The run fails only on thresholds; a teardown error is reported
    /// but does not flip the verdict.
    pub fn passed(&self) -> bool {
        self.thresholds.passed
    }

    pub fn exit_code(&self) -> ExitCode {
        if self.passed() {
            ExitCode::Success
        } else {
            ExitCode::ThresholdsFailed
        }
    }

    /// One record per line, `key=value` fields, machine-parseable.
    pub fn render(&self) -> String {
        let mut out = String::new();

        writeln!(
            &mut out,
            "run scenario={} elapsed={:.3}s iterations={} timeouts={}",
            self.scenario,
            self.elapsed.as_secs_f64(),
            self.iterations_total,
            self.timeouts_total
        )
        .ok();

        for metric in &self.metrics {
            out.push_str(&render_metric(metric));
        }

        for result in &self.thresholds.results {
            let observed = match result.observed {
                Some(v) => format_num(v),
                None => "-".to_string(),
            };
            writeln!(
                &mut out,
                "threshold metric={} expr=\"{}\" outcome={} observed={}",
                result.metric, result.expression, result.outcome, observed
            )
            .ok();
        }

        if let Some(err) = &self.teardown_error {
            writeln!(&mut out, "teardown outcome=fail error=\"{err}\"").ok();
        }

        let verdict = if self.passed() { "pass" } else { "fail" };
        writeln!(&mut out, "verdict {verdict}").ok();

        out
    }
}

fn render_metric(metric: &MetricSummary) -> String {
    let mut line = format!("metric name={} kind={}", metric.name, metric.kind);
    match &metric.values {
        MetricValues::Trend(t) => {
            if t.count() == 0 {
                line.push_str(" count=0");
            } else {
                write!(
                    &mut line,
                    " count={} min={} max={} mean={} p50={} p90={} p95={} p99={}",
                    t.count(),
                    format_opt(t.min()),
                    format_opt(t.max()),
                    format_opt(t.mean()),
                    format_opt(t.percentile(50.0)),
                    format_opt(t.percentile(90.0)),
                    format_opt(t.percentile(95.0)),
                    format_opt(t.percentile(99.0)),
                )
                .ok();
            }
        }
        MetricValues::Rate { total, trues, rate } => {
            write!(
                &mut line,
                " total={total} trues={trues} rate={}",
                match rate {
                    Some(r) => format_num(*r),
                    None => "-".to_string(),
                }
            )
            .ok();
        }
        MetricValues::Counter { value } => {
            write!(&mut line, " value={}", format_num(*value)).ok();
        }
    }
    line.push('\n');
    line
}

fn format_opt(v: Option<f64>) -> String {
    match v {
        Some(v) => format_num(v),
        None => "-".to_string(),
    }
}

fn format_num(v: f64) -> String {
    if v == v.trunc() && v.abs() < 1e15 {
        format!("{v:.0}")
    } else {
        format!("{v:.4}")
    }
}

impl ThresholdReport {
    pub fn failed_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.outcome == ThresholdOutcome::Fail)
            .count()
    }
}
