use serde_json::Value;
use trustd_core::api as core_api;

/// Contributors needed before the count stops limiting the score.
const FULL_TEAM: f64 = 10.0;

/// Knowledge concentration: how many people contribute and how evenly.
///
/// `score = min(n, 10) / 10 * (0.3 + 0.7 * evenness)` where evenness is the
/// Shannon entropy of the contribution shares normalised by `ln n`.
#[derive(Debug, Default, Clone, Copy)]
pub struct BusFactorMetric;

fn contributions(md: &core_api::PackageMetadata) -> Vec<f64> {
    let counts: Vec<f64> = match md.get("contributors") {
        Some(Value::Object(map)) => map.values().filter_map(Value::as_f64).collect(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|c| match c {
                Value::Number(n) => n.as_f64(),
                Value::Object(o) => o
                    .get("contributions")
                    .or_else(|| o.get("commits"))
                    .and_then(Value::as_f64),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };
    counts
        .into_iter()
        .filter(|c| c.is_finite() && *c > 0.0)
        .collect()
}

fn evenness(counts: &[f64]) -> f64 {
    let n = counts.len();
    if n < 2 {
        return 0.0;
    }
    let total: f64 = counts.iter().sum();
    let entropy: f64 = counts
        .iter()
        .map(|c| c / total)
        .map(|p| -p * p.ln())
        .sum();
    entropy / (n as f64).ln()
}

impl core_api::Metric for BusFactorMetric {
    fn name(&self) -> &'static str {
        "bus_factor"
    }

    fn compute(&self, md: &core_api::PackageMetadata) -> core_api::MetricScore {
        let counts = contributions(md);
        if counts.is_empty() {
            return 0.0.into();
        }
        let team = (counts.len() as f64).min(FULL_TEAM) / FULL_TEAM;
        (team * (0.3 + 0.7 * evenness(&counts))).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use trustd_core::api::{Metric, PackageMetadata};

    fn score(contributors: Value) -> f64 {
        BusFactorMetric
            .score(&PackageMetadata::new().with("contributors", contributors))
            .value
    }

    #[test]
    fn empty_is_zero() {
        assert_eq!(BusFactorMetric.score(&PackageMetadata::new()).value, 0.0);
        assert_eq!(score(json!({})), 0.0);
    }

    #[test]
    fn single_maintainer_is_low() {
        let v = score(json!({"alice": 500}));
        assert!(v > 0.0 && v < 0.1, "{v}");
    }

    #[test]
    fn even_team_scores_high() {
        let team: serde_json::Map<_, _> = (0..10)
            .map(|i| (format!("dev{i}"), json!(20)))
            .collect();
        let v = score(Value::Object(team));
        assert!((v - 1.0).abs() < 1e-9, "{v}");
    }

    #[test]
    fn skewed_team_scores_below_even_team() {
        let skewed = score(json!([
            {"name": "a", "contributions": 970},
            {"name": "b", "contributions": 10},
            {"name": "c", "contributions": 10},
            {"name": "d", "contributions": 10}
        ]));
        let even = score(json!([250, 250, 250, 250]));
        assert!(skewed < even, "{skewed} vs {even}");
    }
}
