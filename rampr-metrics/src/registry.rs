use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::metrics::{Metric, MetricHandle, MetricKind, MetricSummary};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    #[error("metric `{name}` is a {existing}, requested as {requested}")]
    KindMismatch {
        name: String,
        existing: MetricKind,
        requested: MetricKind,
    },
}

/// Concurrent store of named metrics. Metrics are created lazily on
/// first use and live until the registry is dropped; once `freeze` is
/// called, further writes through handles are dropped.
#[derive(Debug, Default)]
pub struct Registry {
    series: DashMap<Arc<str>, Arc<Metric>>,
    frozen: Arc<AtomicBool>,
}

impl Registry {
    pub fn handle(&self, name: &str, kind: MetricKind) -> Result<MetricHandle> {
        let key: Arc<str> = Arc::from(name);
        let metric = self
            .series
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Metric::new(key, kind)))
            .clone();

        if metric.kind() != kind {
            return Err(Error::KindMismatch {
                name: name.to_string(),
                existing: metric.kind(),
                requested: kind,
            });
        }

        Ok(MetricHandle {
            inner: metric,
            frozen: self.frozen.clone(),
        })
    }

    pub fn trend(&self, name: &str) -> Result<MetricHandle> {
        self.handle(name, MetricKind::Trend)
    }

    pub fn rate(&self, name: &str) -> Result<MetricHandle> {
        self.handle(name, MetricKind::Rate)
    }

    pub fn counter(&self, name: &str) -> Result<MetricHandle> {
        self.handle(name, MetricKind::Counter)
    }

    /// Append a numeric sample (Trend) or increment (Counter).
    pub fn record(&self, name: &str, kind: MetricKind, value: f64) -> Result<()> {
        self.handle(name, kind)?.add(value);
        Ok(())
    }

    /// Append a boolean sample to a Rate metric.
    pub fn record_bool(&self, name: &str, value: bool) -> Result<()> {
        self.rate(name)?.add_bool(value);
        Ok(())
    }

    pub fn freeze(&self) {
        self.frozen.store(true, Ordering::Release);
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn snapshot(&self) -> Vec<MetricSummary> {
        let mut out: Vec<MetricSummary> = self
            .series
            .iter()
            .map(|entry| entry.value().summarize())
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricValues;

    #[test]
    fn metrics_are_created_lazily_on_first_write() {
        let registry = Registry::default();
        assert!(registry.is_empty());

        let r = registry.record("latency", MetricKind::Trend, 12.5);
        assert!(r.is_ok());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn kind_mismatch_is_an_error() {
        let registry = Registry::default();
        let first = registry.counter("requests_total");
        assert!(first.is_ok());

        let err = match registry.trend("requests_total") {
            Ok(_) => panic!("expected kind mismatch"),
            Err(e) => e,
        };
        assert_eq!(
            err,
            Error::KindMismatch {
                name: "requests_total".to_string(),
                existing: MetricKind::Counter,
                requested: MetricKind::Trend,
            }
        );
    }

    #[test]
    fn frozen_registry_drops_writes() {
        let registry = Registry::default();
        let h = match registry.counter("c") {
            Ok(h) => h,
            Err(e) => panic!("{e}"),
        };
        h.add(1.0);
        registry.freeze();
        h.add(1.0);

        let snap = registry.snapshot();
        let MetricValues::Counter { value } = &snap[0].values else {
            panic!("expected counter");
        };
        assert_eq!(*value, 1.0);
    }

    #[test]
    fn snapshot_is_sorted_by_name() {
        let registry = Registry::default();
        let _ = registry.record("zzz", MetricKind::Counter, 1.0);
        let _ = registry.record("aaa", MetricKind::Counter, 1.0);
        let _ = registry.record("mmm", MetricKind::Counter, 1.0);

        let names: Vec<String> = registry.snapshot().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["aaa", "mmm", "zzz"]);
    }

    #[test]
    fn concurrent_writers_are_all_counted() {
        let registry = std::sync::Arc::new(Registry::default());

        let mut joins = Vec::new();
        for _ in 0..8 {
            let registry = registry.clone();
            joins.push(std::thread::spawn(move || {
                for i in 0..100 {
                    let _ = registry.record("t", MetricKind::Trend, i as f64);
                    let _ = registry.record_bool("r", i % 2 == 0);
                }
            }));
        }
        for j in joins {
            if j.join().is_err() {
                panic!("writer thread panicked");
            }
        }

        let snap = registry.snapshot();
        let trend = snap.iter().find(|s| s.name == "t");
        let rate = snap.iter().find(|s| s.name == "r");

        match trend.map(|s| &s.values) {
            Some(MetricValues::Trend(t)) => assert_eq!(t.count(), 800),
            _ => panic!("missing trend"),
        }
        match rate.map(|s| &s.values) {
            Some(MetricValues::Rate { total, trues, .. }) => {
                assert_eq!(*total, 800);
                assert_eq!(*trues, 400);
            }
            _ => panic!("missing rate"),
        }
    }
}
