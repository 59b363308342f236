use std::io::Write as _;
use std::sync::Arc;

use rampr_core::{MetricValues, RunReport, TickUpdate};
use serde::Serialize;

use crate::cli::OutputFormat;

pub(crate) trait OutputFormatter: Send + Sync {
    fn progress(&self) -> Option<rampr_core::TickFn>;
    fn print_report(&self, report: &RunReport) -> anyhow::Result<()>;
}

pub(crate) fn formatter(format: OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::HumanReadable => Box::new(HumanReadableOutput),
        OutputFormat::Json => Box::new(JsonOutput),
    }
}

/// `key=value` records on stdout, one line per tick on stderr.
pub(crate) struct HumanReadableOutput;

impl OutputFormatter for HumanReadableOutput {
    fn progress(&self) -> Option<rampr_core::TickFn> {
        Some(Arc::new(|u: TickUpdate| {
            eprintln!(
                "tick elapsed={:.1}s target={} live={}",
                u.elapsed.as_secs_f64(),
                u.target,
                u.live
            );
        }))
    }

    fn print_report(&self, report: &RunReport) -> anyhow::Result<()> {
        print!("{}", report.render());
        std::io::stdout().flush()?;
        Ok(())
    }
}

pub(crate) struct JsonOutput;

impl OutputFormatter for JsonOutput {
    fn progress(&self) -> Option<rampr_core::TickFn> {
        None
    }

    fn print_report(&self, report: &RunReport) -> anyhow::Result<()> {
        let doc = build_report_doc(report);
        let mut stdout = std::io::stdout().lock();
        serde_json::to_writer(&mut stdout, &doc)?;
        writeln!(&mut stdout)?;
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct JsonReport {
    scenario: String,
    elapsed_secs: f64,
    iterations_total: u64,
    timeouts_total: u64,
    passed: bool,
    exit_code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    teardown_error: Option<String>,
    metrics: Vec<JsonMetric>,
    thresholds: Vec<JsonThreshold>,
}

#[derive(Debug, Serialize)]
struct JsonMetric {
    name: String,
    kind: String,
    #[serde(flatten)]
    values: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct JsonThreshold {
    metric: String,
    expression: String,
    outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    observed: Option<f64>,
}

fn build_report_doc(report: &RunReport) -> JsonReport {
    let metrics = report
        .metrics
        .iter()
        .map(|m| JsonMetric {
            name: m.name.clone(),
            kind: m.kind.to_string(),
            values: metric_values(&m.values),
        })
        .collect();

    let thresholds = report
        .thresholds
        .results
        .iter()
        .map(|r| JsonThreshold {
            metric: r.metric.clone(),
            expression: r.expression.clone(),
            outcome: r.outcome.to_string(),
            observed: r.observed,
        })
        .collect();

    JsonReport {
        scenario: report.scenario.clone(),
        elapsed_secs: report.elapsed.as_secs_f64(),
        iterations_total: report.iterations_total,
        timeouts_total: report.timeouts_total,
        passed: report.passed(),
        exit_code: report.exit_code().as_i32(),
        teardown_error: report.teardown_error.clone(),
        metrics,
        thresholds,
    }
}

fn metric_values(values: &MetricValues) -> serde_json::Value {
    match values {
        MetricValues::Trend(t) => serde_json::json!({
            "count": t.count(),
            "min": t.min(),
            "max": t.max(),
            "mean": t.mean(),
            "p50": t.percentile(50.0),
            "p90": t.percentile(90.0),
            "p95": t.percentile(95.0),
            "p99": t.percentile(99.0),
        }),
        MetricValues::Rate { total, trues, rate } => serde_json::json!({
            "total": total,
            "trues": trues,
            "rate": rate,
        }),
        MetricValues::Counter { value } => serde_json::json!({ "value": value }),
    }
}
