use serde_json::Value;
use trustd_core::api as core_api;

use super::reviewedness::is_reviewed;

/// Additions above which a pull request counts as too large to review well.
const LARGE_PR: f64 = 400.0;

/// Mean per-PR hygiene: descriptive title, a body, a review, reviewable size.
#[derive(Debug, Default, Clone, Copy)]
pub struct PullRequestHygieneMetric;

fn additions(pr: &Value) -> f64 {
    if let Some(n) = pr.get("additions").and_then(Value::as_f64) {
        return n;
    }
    pr.get("files")
        .and_then(Value::as_array)
        .map(|files| {
            files
                .iter()
                .filter_map(|f| f.get("additions").and_then(Value::as_f64))
                .sum()
        })
        .unwrap_or(0.0)
}

fn hygiene(pr: &Value) -> f64 {
    let text_len = |k: &str| {
        pr.get(k)
            .and_then(Value::as_str)
            .map(|s| s.trim().chars().count())
            .unwrap_or(0)
    };
    let checks = [
        text_len("title") >= 10,
        text_len("body") >= 20,
        is_reviewed(pr),
        additions(pr) <= LARGE_PR,
    ];
    checks.iter().filter(|c| **c).count() as f64 / checks.len() as f64
}

impl core_api::Metric for PullRequestHygieneMetric {
    fn name(&self) -> &'static str {
        "pull_request_hygiene"
    }

    fn compute(&self, md: &core_api::PackageMetadata) -> core_api::MetricScore {
        let prs = md.array("pull_requests");
        if prs.is_empty() {
            return 0.0.into();
        }
        (prs.iter().map(hygiene).sum::<f64>() / prs.len() as f64).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use trustd_core::api::{Metric, PackageMetadata};

    fn score(prs: Value) -> f64 {
        PullRequestHygieneMetric
            .score(&PackageMetadata::new().with("pull_requests", prs))
            .value
    }

    #[test]
    fn empty_is_zero() {
        assert_eq!(score(json!([])), 0.0);
    }

    #[test]
    fn tidy_and_sloppy_prs_average() {
        let v = score(json!([
            {
                "title": "Fix tokenizer padding bug",
                "body": "Pads to the longest sequence instead of a fixed width.",
                "review_count": 2,
                "files": [{"filename": "tok.py", "additions": 12}]
            },
            {"title": "wip", "additions": 5000}
        ]));
        assert!((v - 0.5).abs() < 1e-12, "{v}");
    }
}
