use trustd_core::api as core_api;

use super::text::has_any;

/// Whether the training data and the code are both discoverable.
#[derive(Debug, Default, Clone, Copy)]
pub struct DatasetAndCodeMetric;

impl core_api::Metric for DatasetAndCodeMetric {
    fn name(&self) -> &'static str {
        "dataset_and_code_score"
    }

    fn compute(&self, md: &core_api::PackageMetadata) -> core_api::MetricScore {
        let doc = md.doc_text();

        let dataset = if md.str("dataset_url").is_some() {
            0.5
        } else if has_any(&doc, &["huggingface.co/datasets/", "trained on", "training data", "dataset:"]) {
            0.25
        } else {
            0.0
        };

        let code = if md.first_str(&["code_url", "repository_url", "github_url"]).is_some() {
            0.5
        } else if has_any(&doc, &["github.com/", "gitlab.com/", "source code"]) {
            0.25
        } else {
            0.0
        };

        (dataset + code).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use trustd_core::api::{Metric, PackageMetadata};

    fn score(md: PackageMetadata) -> f64 {
        DatasetAndCodeMetric.score(&md).value
    }

    #[test]
    fn empty_is_zero() {
        assert_eq!(score(PackageMetadata::new()), 0.0);
    }

    #[test]
    fn explicit_links_score_full() {
        let md = PackageMetadata::new()
            .with("dataset_url", json!("https://huggingface.co/datasets/squad"))
            .with("code_url", json!("https://github.com/org/repo"));
        assert_eq!(score(md), 1.0);
    }

    #[test]
    fn readme_mentions_score_partially() {
        let md = PackageMetadata::new().with(
            "readme",
            json!("Trained on the SQuAD dataset. Source: https://github.com/org/repo"),
        );
        assert_eq!(score(md), 0.5);
    }
}
