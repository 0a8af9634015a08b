use trustd_core::api as core_api;

use super::text::{coverage, has_heading};

const GUIDE_SECTIONS: &[&str] = &["install", "usage", "quickstart", "quick start", "example", "tutorial", "getting started"];

/// How quickly a newcomer can get productive: documentation depth, guide
/// sections and community uptake.
#[derive(Debug, Default, Clone, Copy)]
pub struct RampUpMetric;

impl core_api::Metric for RampUpMetric {
    fn name(&self) -> &'static str {
        "ramp_up_time"
    }

    fn compute(&self, md: &core_api::PackageMetadata) -> core_api::MetricScore {
        let doc = md.doc_text();
        let words = doc.split_whitespace().count() as f64;
        let depth = (words / 500.0).min(1.0);

        let sections = GUIDE_SECTIONS
            .iter()
            .filter(|s| has_heading(&doc, &[**s]))
            .count() as f64;
        let guides = (sections / 3.0).min(1.0);

        let downloads = md.f64("downloads").unwrap_or(0.0).max(0.0);
        let likes = md.f64("likes").unwrap_or(0.0).max(0.0);
        let uptake = 0.7 * ((1.0 + downloads).log10() / 6.0).min(1.0)
            + 0.3 * ((1.0 + likes).log10() / 4.0).min(1.0);

        // keyword mentions count a little even without headings
        let mentions = coverage(&doc, GUIDE_SECTIONS);

        (0.35 * depth + 0.35 * guides.max(mentions * 0.5) + 0.3 * uptake).into()
    }
}
