use trustd_core::api as core_api;

use super::text::{coverage, has_any};

const CARD_TOPICS: &[&str] = &[
    "data collection",
    "preprocessing",
    "license",
    "bias",
    "limitation",
    "split",
    "citation",
    "annotation",
];

/// Depth of the dataset documentation, when a dataset is involved at all.
#[derive(Debug, Default, Clone, Copy)]
pub struct DatasetQualityMetric;

impl core_api::Metric for DatasetQualityMetric {
    fn name(&self) -> &'static str {
        "dataset_quality"
    }

    fn compute(&self, md: &core_api::PackageMetadata) -> core_api::MetricScore {
        let doc = md.doc_text();
        let linked = md.str("dataset_url").is_some();
        if !linked && !has_any(&doc, &["dataset", "corpus"]) {
            return 0.0.into();
        }
        let base = if linked { 0.2 } else { 0.0 };
        (base + 0.8 * coverage(&doc, CARD_TOPICS)).into()
    }
}
