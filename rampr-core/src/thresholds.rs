use rampr_metrics::{MetricSummary, MetricValues};

use crate::config::NoDataPolicy;
use crate::error::ConfigError;

/// Raw threshold configuration: one metric name, one or more
/// expression strings. Parsed into [`Threshold`]s before the run.
#[derive(Debug, Clone)]
pub struct ThresholdSpec {
    pub metric: String,
    pub expressions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdOp {
    Lt,
    Lte,
    Gt,
    Gte,
    Eq,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ThresholdAgg {
    Percentile(f64),
    Mean,
    Rate,
    Count,
    Max,
    Min,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdExpr {
    pub agg: ThresholdAgg,
    pub op: ThresholdOp,
    pub value: f64,
}

/// A parsed, immutable threshold. Evaluation dispatches over the
/// variant set; expression strings are never re-parsed at run end.
#[derive(Debug, Clone)]
pub struct Threshold {
    pub metric: String,
    pub raw: String,
    pub expr: ThresholdExpr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ThresholdOutcome {
    Pass,
    Fail,
    #[strum(serialize = "no-data")]
    NoData,
}

#[derive(Debug, Clone)]
pub struct ThresholdResult {
    pub metric: String,
    pub expression: String,
    pub observed: Option<f64>,
    pub outcome: ThresholdOutcome,
}

#[derive(Debug, Clone, Default)]
pub struct ThresholdReport {
    pub results: Vec<ThresholdResult>,
    pub passed: bool,
}

pub fn compile_thresholds(specs: &[ThresholdSpec]) -> Result<Vec<Threshold>, ConfigError> {
    let mut out = Vec::new();
    for spec in specs {
        for raw in &spec.expressions {
            let expr =
                parse_threshold_expr(raw).map_err(|error| ConfigError::InvalidThreshold {
                    metric: spec.metric.clone(),
                    error,
                })?;
            out.push(Threshold {
                metric: spec.metric.clone(),
                raw: raw.clone(),
                expr,
            });
        }
    }
    Ok(out)
}

pub fn parse_threshold_expr(raw: &str) -> Result<ThresholdExpr, String> {
    let s: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    if s.is_empty() {
        return Err("empty threshold".to_string());
    }

    // Find operator
    let ops = [
        ("<=", ThresholdOp::Lte),
        (">=", ThresholdOp::Gte),
        ("==", ThresholdOp::Eq),
        ("<", ThresholdOp::Lt),
        (">", ThresholdOp::Gt),
    ];
    let (op_pos, op_len, op) = ops
        .iter()
        .find_map(|(tok, op)| s.find(tok).map(|pos| (pos, tok.len(), *op)))
        .ok_or_else(|| format!("invalid threshold (missing operator): {raw}"))?;

    let (left, right_with_op) = s.split_at(op_pos);
    let right = &right_with_op[op_len..];
    if left.is_empty() || right.is_empty() {
        return Err(format!("invalid threshold: {raw}"));
    }

    let agg = parse_agg(left).map_err(|e| format!("{e}: {raw}"))?;

    let value: f64 = right
        .parse()
        .map_err(|_| format!("invalid numeric value in threshold: {raw}"))?;

    Ok(ThresholdExpr { agg, op, value })
}

fn parse_agg(left: &str) -> Result<ThresholdAgg, String> {
    if left.eq_ignore_ascii_case("mean") || left.eq_ignore_ascii_case("avg") {
        return Ok(ThresholdAgg::Mean);
    }
    if left.eq_ignore_ascii_case("min") {
        return Ok(ThresholdAgg::Min);
    }
    if left.eq_ignore_ascii_case("max") {
        return Ok(ThresholdAgg::Max);
    }
    if left.eq_ignore_ascii_case("count") {
        return Ok(ThresholdAgg::Count);
    }
    if left.eq_ignore_ascii_case("rate") {
        return Ok(ThresholdAgg::Rate);
    }

    let inner = left
        .strip_prefix("percentile(")
        .or_else(|| left.strip_prefix("p("))
        .and_then(|v| v.strip_suffix(')'));
    if let Some(inner) = inner {
        let p: f64 = inner
            .parse()
            .map_err(|_| "invalid percentile in threshold".to_string())?;
        if !(p > 0.0 && p <= 100.0) {
            return Err("percentile out of range in threshold".to_string());
        }
        return Ok(ThresholdAgg::Percentile(p));
    }

    Err(format!("unknown aggregation `{left}` in threshold"))
}

/// Evaluate the configured thresholds against a frozen metric
/// snapshot. A threshold whose metric never recorded (or whose
/// aggregator does not apply to the metric's kind) yields
/// [`ThresholdOutcome::NoData`] and counts toward the verdict per the
/// configured policy.
pub fn evaluate_thresholds(
    thresholds: &[Threshold],
    metrics: &[MetricSummary],
    no_data: NoDataPolicy,
) -> ThresholdReport {
    let mut results = Vec::with_capacity(thresholds.len());
    let mut passed = true;

    for t in thresholds {
        let series = metrics.iter().find(|m| m.name == t.metric);
        let observed = series.and_then(|s| observed_value(&s.values, t.expr.agg));

        let outcome = match observed {
            Some(v) => {
                if compare(v, t.expr.op, t.expr.value) {
                    ThresholdOutcome::Pass
                } else {
                    ThresholdOutcome::Fail
                }
            }
            None => ThresholdOutcome::NoData,
        };

        match outcome {
            ThresholdOutcome::Pass => {}
            ThresholdOutcome::Fail => passed = false,
            ThresholdOutcome::NoData => match no_data {
                NoDataPolicy::Pass | NoDataPolicy::Skip => {}
                NoDataPolicy::Fail => passed = false,
            },
        }

        results.push(ThresholdResult {
            metric: t.metric.clone(),
            expression: t.raw.clone(),
            observed,
            outcome,
        });
    }

    ThresholdReport { results, passed }
}

fn compare(left: f64, op: ThresholdOp, right: f64) -> bool {
    match op {
        ThresholdOp::Lt => left < right,
        ThresholdOp::Lte => left <= right,
        ThresholdOp::Gt => left > right,
        ThresholdOp::Gte => left >= right,
        ThresholdOp::Eq => left == right,
    }
}

fn observed_value(values: &MetricValues, agg: ThresholdAgg) -> Option<f64> {
    match (values, agg) {
        (MetricValues::Trend(t), _) if t.is_empty() => None,
        (MetricValues::Trend(t), ThresholdAgg::Percentile(p)) => t.percentile(p),
        (MetricValues::Trend(t), ThresholdAgg::Mean) => t.mean(),
        (MetricValues::Trend(t), ThresholdAgg::Min) => t.min(),
        (MetricValues::Trend(t), ThresholdAgg::Max) => t.max(),
        (MetricValues::Trend(t), ThresholdAgg::Count) => Some(t.count() as f64),

        (MetricValues::Rate { total, .. }, _) if *total == 0 => None,
        (MetricValues::Rate { rate, .. }, ThresholdAgg::Rate) => *rate,
        (MetricValues::Rate { total, .. }, ThresholdAgg::Count) => Some(*total as f64),

        (MetricValues::Counter { value }, ThresholdAgg::Count) => Some(*value),

        // Non-sensical combinations.
        (_, _) => None,
    }
}
