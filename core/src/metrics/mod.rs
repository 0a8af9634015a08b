//! Trust metrics: the scoring interface, the ordered registry, and the net
//! score aggregator.
//!
//! Concrete metrics live in `trustd-plugins`; `core` only fixes the contract.

mod metadata;
mod net_score;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

pub use metadata::{file_name, PackageMetadata};
pub use net_score::{aggregate, score_package, NetScoreReport};

/// Reserved score meaning "not applicable / insufficient signal".
pub const NOT_APPLICABLE: f64 = -1.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricValue {
    pub name: String,
    pub value: f64,
    pub latency_ms: u64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub breakdown: BTreeMap<String, f64>,
}

impl MetricValue {
    pub fn new(name: impl Into<String>, value: f64, latency_ms: u64) -> Self {
        Self {
            name: name.into(),
            value,
            latency_ms,
            breakdown: BTreeMap::new(),
        }
    }

    pub fn is_not_applicable(&self) -> bool {
        self.value == NOT_APPLICABLE
    }
}

/// Raw output of a metric heuristic, before bounding and timing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricScore {
    pub value: f64,
    pub breakdown: BTreeMap<String, f64>,
}

impl From<f64> for MetricScore {
    fn from(value: f64) -> Self {
        Self {
            value,
            breakdown: BTreeMap::new(),
        }
    }
}

pub trait Metric: Send + Sync {
    /// Stable name used as the weight key.
    fn name(&self) -> &'static str;

    /// The heuristic. Must not panic on missing or malformed input.
    fn compute(&self, metadata: &PackageMetadata) -> MetricScore;

    /// Whether [`NOT_APPLICABLE`] may pass through unclamped.
    fn allows_sentinel(&self) -> bool {
        false
    }

    /// Times `compute` and bounds the result.
    fn score(&self, metadata: &PackageMetadata) -> MetricValue {
        let started = Instant::now();
        let raw = self.compute(metadata);
        let latency_ms = started.elapsed().as_millis() as u64;

        let breakdown = raw
            .breakdown
            .into_iter()
            .map(|(k, v)| (k, clamp_unit(v)))
            .collect();
        MetricValue {
            name: self.name().to_string(),
            value: bound(raw.value, self.allows_sentinel()),
            latency_ms,
            breakdown,
        }
    }
}

/// Clamps into `[0,1]`; NaN degrades to `0.0`.
pub fn clamp_unit(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

fn bound(v: f64, allows_sentinel: bool) -> f64 {
    if allows_sentinel && v == NOT_APPLICABLE {
        v
    } else {
        clamp_unit(v)
    }
}

/// Explicit, ordered metric set. Names are unique.
#[derive(Clone, Default)]
pub struct MetricRegistry {
    metrics: Vec<Arc<dyn Metric>>,
}

impl MetricRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a metric. A second metric with an already registered name is ignored.
    pub fn register(&mut self, metric: Arc<dyn Metric>) -> &mut Self {
        if self.metrics.iter().any(|m| m.name() == metric.name()) {
            tracing::warn!(metric = metric.name(), "duplicate metric registration ignored");
            return self;
        }
        self.metrics.push(metric);
        self
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.metrics.iter().map(|m| m.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Metric>> {
        self.metrics.iter()
    }

    /// Runs every metric in registration order.
    pub fn score_all(&self, metadata: &PackageMetadata) -> BTreeMap<String, MetricValue> {
        self.metrics
            .iter()
            .map(|m| {
                let v = m.score(metadata);
                (v.name.clone(), v)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(&'static str, f64, bool);

    impl Metric for Fixed {
        fn name(&self) -> &'static str {
            self.0
        }

        fn compute(&self, _metadata: &PackageMetadata) -> MetricScore {
            self.1.into()
        }

        fn allows_sentinel(&self) -> bool {
            self.2
        }
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let md = PackageMetadata::new();
        assert_eq!(Fixed("hi", 3.5, false).score(&md).value, 1.0);
        assert_eq!(Fixed("lo", -0.2, false).score(&md).value, 0.0);
        assert_eq!(Fixed("nan", f64::NAN, false).score(&md).value, 0.0);
    }

    #[test]
    fn sentinel_survives_only_when_allowed() {
        let md = PackageMetadata::new();
        assert_eq!(Fixed("a", NOT_APPLICABLE, true).score(&md).value, -1.0);
        assert_eq!(Fixed("b", NOT_APPLICABLE, false).score(&md).value, 0.0);
        assert_eq!(Fixed("c", -0.5, true).score(&md).value, 0.0);
    }

    #[test]
    fn registry_keeps_order_and_rejects_duplicates() {
        let mut reg = MetricRegistry::new();
        reg.register(Arc::new(Fixed("b", 0.1, false)))
            .register(Arc::new(Fixed("a", 0.2, false)))
            .register(Arc::new(Fixed("b", 0.9, false)));
        assert_eq!(reg.names(), vec!["b", "a"]);

        let scores = reg.score_all(&PackageMetadata::new());
        assert_eq!(scores["b"].value, 0.1);
    }
}
