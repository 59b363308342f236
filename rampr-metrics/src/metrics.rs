use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum MetricKind {
    Trend,
    Rate,
    Counter,
}

/// Point-in-time aggregate of a single metric series.
#[derive(Debug, Clone)]
pub struct MetricSummary {
    pub name: String,
    pub kind: MetricKind,
    pub values: MetricValues,
}

#[derive(Debug, Clone)]
pub enum MetricValues {
    Trend(TrendSnapshot),
    Rate {
        total: u64,
        trues: u64,
        rate: Option<f64>,
    },
    Counter {
        value: f64,
    },
}

/// Sorted copy of a Trend's samples, answering arbitrary percentile
/// queries with linear interpolation over the sorted values.
#[derive(Debug, Clone)]
pub struct TrendSnapshot {
    sorted: Vec<f64>,
}

impl TrendSnapshot {
    pub fn from_samples(mut samples: Vec<f64>) -> Self {
        samples.sort_by(f64::total_cmp);
        Self { sorted: samples }
    }

    pub fn count(&self) -> u64 {
        self.sorted.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }

    pub fn min(&self) -> Option<f64> {
        self.sorted.first().copied()
    }

    pub fn max(&self) -> Option<f64> {
        self.sorted.last().copied()
    }

    pub fn mean(&self) -> Option<f64> {
        if self.sorted.is_empty() {
            return None;
        }
        let sum: f64 = self.sorted.iter().sum();
        Some(sum / self.sorted.len() as f64)
    }

    /// Percentile at rank `p/100 * (n-1)`, interpolating between the
    /// neighbouring sorted samples. `p` outside 0..=100 is clamped.
    pub fn percentile(&self, p: f64) -> Option<f64> {
        if self.sorted.is_empty() {
            return None;
        }

        let p = p.clamp(0.0, 100.0);
        let n = self.sorted.len();
        if n == 1 {
            return Some(self.sorted[0]);
        }

        let rank = (p / 100.0) * ((n - 1) as f64);
        let lo = rank.floor() as usize;
        let hi = (lo + 1).min(n - 1);
        let frac = rank - lo as f64;

        Some(self.sorted[lo] + (self.sorted[hi] - self.sorted[lo]) * frac)
    }
}

#[derive(Debug)]
struct TrendAgg {
    samples: Mutex<Vec<f64>>,
}

impl TrendAgg {
    fn new() -> Self {
        Self {
            samples: Mutex::new(Vec::new()),
        }
    }

    fn record(&self, value: f64) {
        if !value.is_finite() {
            return;
        }
        self.samples.lock().push(value);
    }

    fn snapshot(&self) -> TrendSnapshot {
        TrendSnapshot::from_samples(self.samples.lock().clone())
    }
}

#[derive(Debug, Default)]
struct RateAgg {
    total: AtomicU64,
    trues: AtomicU64,
}

impl RateAgg {
    fn record(&self, value: bool) {
        self.total.fetch_add(1, Ordering::Relaxed);
        if value {
            self.trues.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn values(&self) -> MetricValues {
        let total = self.total.load(Ordering::Relaxed);
        let trues = self.trues.load(Ordering::Relaxed);
        let rate = if total == 0 {
            None
        } else {
            Some(trues as f64 / total as f64)
        };
        MetricValues::Rate { total, trues, rate }
    }
}

#[derive(Debug, Default)]
struct CounterAgg {
    value: Mutex<f64>,
}

impl CounterAgg {
    fn add(&self, v: f64) {
        if !v.is_finite() {
            return;
        }
        *self.value.lock() += v;
    }

    fn get(&self) -> f64 {
        *self.value.lock()
    }
}

#[derive(Debug)]
enum MetricAgg {
    Trend(TrendAgg),
    Rate(RateAgg),
    Counter(CounterAgg),
}

#[derive(Debug)]
pub struct Metric {
    name: Arc<str>,
    kind: MetricKind,
    agg: MetricAgg,
}

impl Metric {
    pub(crate) fn new(name: Arc<str>, kind: MetricKind) -> Self {
        let agg = match kind {
            MetricKind::Trend => MetricAgg::Trend(TrendAgg::new()),
            MetricKind::Rate => MetricAgg::Rate(RateAgg::default()),
            MetricKind::Counter => MetricAgg::Counter(CounterAgg::default()),
        };
        Self { name, kind, agg }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    fn add(&self, value: f64) {
        match &self.agg {
            MetricAgg::Trend(t) => t.record(value),
            MetricAgg::Counter(c) => c.add(value),
            // Rate samples are booleans; use `add_bool`.
            MetricAgg::Rate(_) => {}
        }
    }

    fn add_bool(&self, value: bool) {
        if let MetricAgg::Rate(r) = &self.agg {
            r.record(value);
        }
    }

    pub(crate) fn summarize(&self) -> MetricSummary {
        let values = match &self.agg {
            MetricAgg::Trend(t) => MetricValues::Trend(t.snapshot()),
            MetricAgg::Rate(r) => r.values(),
            MetricAgg::Counter(c) => MetricValues::Counter { value: c.get() },
        };
        MetricSummary {
            name: self.name.to_string(),
            kind: self.kind,
            values,
        }
    }
}

/// Cheap writer handle to one metric. Writes after the owning registry
/// has been frozen are silently dropped.
#[derive(Debug, Clone)]
pub struct MetricHandle {
    pub(crate) inner: Arc<Metric>,
    pub(crate) frozen: Arc<AtomicBool>,
}

impl MetricHandle {
    #[inline]
    pub fn add(&self, value: f64) {
        if self.frozen.load(Ordering::Acquire) {
            return;
        }
        self.inner.add(value);
    }

    #[inline]
    pub fn add_bool(&self, value: bool) {
        if self.frozen.load(Ordering::Acquire) {
            return;
        }
        self.inner.add_bool(value);
    }

    pub fn kind(&self) -> MetricKind {
        self.inner.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trend_of(samples: &[f64]) -> TrendSnapshot {
        TrendSnapshot::from_samples(samples.to_vec())
    }

    #[test]
    fn percentile_interpolates_between_sorted_samples() {
        let t = trend_of(&[10.0, 20.0, 30.0, 40.0]);
        assert_eq!(t.percentile(0.0), Some(10.0));
        assert_eq!(t.percentile(100.0), Some(40.0));
        assert_eq!(t.percentile(50.0), Some(25.0));
        // rank = 0.75 * 3 = 2.25 => 30 + 0.25 * 10
        assert_eq!(t.percentile(75.0), Some(32.5));
    }

    #[test]
    fn percentile_is_order_independent() {
        let a = trend_of(&[5.0, 1.0, 3.0, 2.0, 4.0]);
        let b = trend_of(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        for p in [0.0, 25.0, 50.0, 90.0, 95.0, 99.0, 100.0] {
            assert_eq!(a.percentile(p), b.percentile(p));
        }
    }

    #[test]
    fn percentile_of_known_ladder() {
        // 100 samples: 10, 20, ..., 1000.
        let samples: Vec<f64> = (1..=100).map(|i| (i * 10) as f64).collect();
        let t = trend_of(&samples);

        // rank = 0.95 * 99 = 94.05 => 950 + 0.05 * 10
        let p95 = match t.percentile(95.0) {
            Some(v) => v,
            None => panic!("expected p95"),
        };
        assert!((p95 - 950.5).abs() < 1e-9);
        assert!(p95 > 100.0);
    }

    #[test]
    fn empty_trend_has_no_stats() {
        let t = trend_of(&[]);
        assert_eq!(t.count(), 0);
        assert_eq!(t.min(), None);
        assert_eq!(t.max(), None);
        assert_eq!(t.mean(), None);
        assert_eq!(t.percentile(50.0), None);
    }

    #[test]
    fn trend_ignores_non_finite_samples() {
        let agg = TrendAgg::new();
        agg.record(f64::NAN);
        agg.record(f64::INFINITY);
        agg.record(1.0);
        agg.record(2.0);

        let snap = agg.snapshot();
        assert_eq!(snap.count(), 2);
        assert_eq!(snap.mean(), Some(1.5));
    }

    #[test]
    fn rate_reports_trues_over_total() {
        let r = RateAgg::default();
        r.record(true);
        r.record(false);
        r.record(true);
        r.record(true);

        let MetricValues::Rate { total, trues, rate } = r.values() else {
            panic!("expected rate values");
        };
        assert_eq!(total, 4);
        assert_eq!(trues, 3);
        assert_eq!(rate, Some(0.75));
    }

    #[test]
    fn rate_with_no_samples_has_no_data() {
        let r = RateAgg::default();
        let MetricValues::Rate { total, rate, .. } = r.values() else {
            panic!("expected rate values");
        };
        assert_eq!(total, 0);
        assert_eq!(rate, None);
    }

    #[test]
    fn counter_sums_increments_and_defaults_to_zero() {
        let c = CounterAgg::default();
        assert_eq!(c.get(), 0.0);
        c.add(2.0);
        c.add(3.5);
        c.add(f64::NAN);
        assert_eq!(c.get(), 5.5);
    }
}
