use lazy_static::lazy_static;
use regex::Regex;
use trustd_core::api as core_api;

use super::text::{count_hits, has_heading};

const EVAL_TERMS: &[&str] = &[
    "accuracy", "f1", "bleu", "rouge", "perplexity", "precision", "recall", "benchmark",
    "state-of-the-art", "sota", "word error rate", "mean average precision",
];

lazy_static! {
    static ref PERCENT: Regex = Regex::new(r"\d+(\.\d+)?\s*%").unwrap();
    static ref TABLE_RULE: Regex = Regex::new(r"(?m)^\s*\|?\s*:?-{3,}").unwrap();
}

/// Whether performance claims are backed by reported numbers.
#[derive(Debug, Default, Clone, Copy)]
pub struct PerformanceClaimsMetric;

impl core_api::Metric for PerformanceClaimsMetric {
    fn name(&self) -> &'static str {
        "performance_claims"
    }

    fn compute(&self, md: &core_api::PackageMetadata) -> core_api::MetricScore {
        let doc = md.doc_text();
        if doc.is_empty() {
            return 0.0.into();
        }
        let section = if has_heading(&doc, &["evaluation", "results", "benchmark", "performance"]) {
            1.0
        } else {
            0.0
        };
        let terms = (count_hits(&doc, EVAL_TERMS) as f64 / 3.0).min(1.0);
        let numbers = if TABLE_RULE.is_match(&doc) || PERCENT.is_match(&doc) {
            1.0
        } else {
            0.0
        };
        (0.3 * section + 0.4 * terms + 0.3 * numbers).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use trustd_core::api::{Metric, PackageMetadata};

    fn score(readme: &str) -> f64 {
        PerformanceClaimsMetric
            .score(&PackageMetadata::new().with("readme", json!(readme)))
            .value
    }

    #[test]
    fn empty_is_zero() {
        assert_eq!(
            PerformanceClaimsMetric.score(&PackageMetadata::new()).value,
            0.0
        );
        assert_eq!(score("Nice model."), 0.0);
    }

    #[test]
    fn backed_claims_score_full() {
        let readme = "## Evaluation\n| task | accuracy | f1 |\n|---|---|---|\n| squad | 91.2% | 88.0 |\nbeats the benchmark";
        assert!((score(readme) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn bare_claims_score_partially() {
        let v = score("State-of-the-art accuracy.");
        assert!(v > 0.0 && v < 0.5, "{v}");
    }
}
