use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{clamp_unit, MetricRegistry, MetricValue, PackageMetadata};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetScoreReport {
    pub net_score: f64,
    pub per_metric: BTreeMap<String, MetricValue>,
    /// Sum of per-metric latencies.
    pub latency_ms: u64,
    /// Weighted metrics left out because they reported "not applicable".
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub not_applicable: Vec<String>,
}

/// Weighted combination of metric values.
///
/// A metric reporting the sentinel is dropped and the remaining weights are
/// renormalized over the weight mass that is left. A weighted metric missing
/// from `per_metric` counts as `0.0` at full weight. Metrics without a weight
/// do not influence the score.
pub fn aggregate(
    per_metric: BTreeMap<String, MetricValue>,
    weights: &BTreeMap<String, f64>,
) -> NetScoreReport {
    let mut weighted = 0.0;
    let mut mass = 0.0;
    let mut not_applicable = Vec::new();

    for (name, &weight) in weights {
        if !weight.is_finite() || weight <= 0.0 {
            continue;
        }
        match per_metric.get(name) {
            Some(v) if v.is_not_applicable() => not_applicable.push(name.clone()),
            Some(v) => {
                weighted += weight * clamp_unit(v.value);
                mass += weight;
            }
            None => mass += weight,
        }
    }

    let net_score = if mass > 0.0 {
        clamp_unit(weighted / mass)
    } else {
        0.0
    };
    let latency_ms = per_metric.values().map(|v| v.latency_ms).sum();

    NetScoreReport {
        net_score,
        per_metric,
        latency_ms,
        not_applicable,
    }
}

/// Runs the registry against one package and aggregates the results.
pub fn score_package(
    metadata: &PackageMetadata,
    registry: &MetricRegistry,
    weights: &BTreeMap<String, f64>,
) -> NetScoreReport {
    let report = aggregate(registry.score_all(metadata), weights);
    tracing::debug!(
        net_score = report.net_score,
        latency_ms = report.latency_ms,
        metrics = report.per_metric.len(),
        "net score computed"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::NOT_APPLICABLE;

    fn values(pairs: &[(&str, f64)]) -> BTreeMap<String, MetricValue> {
        pairs
            .iter()
            .map(|(n, v)| (n.to_string(), MetricValue::new(*n, *v, 3)))
            .collect()
    }

    fn weights(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(n, w)| (n.to_string(), *w)).collect()
    }

    #[test]
    fn all_zero_inputs_yield_zero() {
        let w = weights(&[("a", 0.5), ("b", 0.3), ("c", 0.2)]);
        let report = aggregate(values(&[("a", 0.0), ("b", 0.0), ("c", 0.0)]), &w);
        assert_eq!(report.net_score, 0.0);
    }

    #[test]
    fn weighted_sum_of_in_range_values() {
        let w = weights(&[("a", 0.5), ("b", 0.5)]);
        let report = aggregate(values(&[("a", 1.0), ("b", 0.5)]), &w);
        assert!((report.net_score - 0.75).abs() < 1e-12);
        assert_eq!(report.latency_ms, 6);
    }

    #[test]
    fn sentinel_is_excluded_and_weights_renormalized() {
        let w = weights(&[("a", 0.5), ("reviewedness", 0.5)]);
        let report = aggregate(values(&[("a", 0.8), ("reviewedness", NOT_APPLICABLE)]), &w);

        // A raw weighted sum would give 0.5*0.8 + 0.5*(-1) = -0.1.
        assert!((report.net_score - 0.8).abs() < 1e-12);
        assert_eq!(report.not_applicable, vec!["reviewedness".to_string()]);
        assert_eq!(report.per_metric["reviewedness"].value, NOT_APPLICABLE);
    }

    #[test]
    fn all_sentinel_yields_zero() {
        let w = weights(&[("reviewedness", 1.0)]);
        let report = aggregate(values(&[("reviewedness", NOT_APPLICABLE)]), &w);
        assert_eq!(report.net_score, 0.0);
    }

    #[test]
    fn missing_weighted_metric_counts_as_zero() {
        let w = weights(&[("a", 0.5), ("b", 0.5)]);
        let report = aggregate(values(&[("a", 1.0)]), &w);
        assert!((report.net_score - 0.5).abs() < 1e-12);
    }

    #[test]
    fn in_range_combinations_stay_bounded() {
        let w = weights(&[("a", 0.1), ("b", 0.2), ("c", 0.3), ("d", 0.4)]);
        let grid = [0.0, 0.13, 0.5, 0.77, 1.0];
        for &a in &grid {
            for &b in &grid {
                for &c in &grid {
                    let r = aggregate(values(&[("a", a), ("b", b), ("c", c), ("d", 1.0 - a)]), &w);
                    assert!((0.0..=1.0).contains(&r.net_score), "{a} {b} {c}");
                }
            }
        }
    }

    #[test]
    fn empty_weights_yield_zero() {
        let report = aggregate(values(&[("a", 1.0)]), &BTreeMap::new());
        assert_eq!(report.net_score, 0.0);
        assert_eq!(report.per_metric.len(), 1);
    }
}
