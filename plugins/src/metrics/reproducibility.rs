use trustd_core::api as core_api;

use super::text::{code_blocks, has_any, has_heading};

const INSTALL: &[&str] = &["pip install", "conda install", "npm install", "cargo add", "cargo install", "poetry add", "docker pull"];
const RUN: &[&str] = &["import ", "from ", "python ", "cargo run", "npm run", "docker run", "$ ", "./"];

/// Whether the documentation lets someone rerun the package: an example plus
/// install and run steps is 1.0, a partial recipe 0.5, nothing 0.0.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReproducibilityMetric;

impl core_api::Metric for ReproducibilityMetric {
    fn name(&self) -> &'static str {
        "reproducibility"
    }

    fn compute(&self, md: &core_api::PackageMetadata) -> core_api::MetricScore {
        let doc = md.doc_text();
        let has_example = has_heading(&doc, &["example", "usage", "quickstart", "quick start", "demo"]);
        let has_install = has_heading(&doc, &["install"]) || has_any(&doc, INSTALL);
        let has_run = code_blocks(&doc).any(|block| has_any(block, RUN));

        if has_example && has_install && has_run {
            1.0
        } else if has_run || has_example {
            0.5
        } else {
            0.0
        }
        .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use trustd_core::api::{Metric, PackageMetadata};

    fn score(readme: &str) -> f64 {
        ReproducibilityMetric
            .score(&PackageMetadata::new().with("readme", json!(readme)))
            .value
    }

    #[test]
    fn full_recipe() {
        let readme = "# m\n## Installation\n```\npip install m\n```\n## Example\n```python\nfrom m import run\nrun()\n```\n";
        assert_eq!(score(readme), 1.0);
    }

    #[test]
    fn run_without_install_is_partial() {
        assert_eq!(score("# m\n```\n$ m --input x\n```\n"), 0.5);
        assert_eq!(score("# m\n## Usage\nCall the thing.\n"), 0.5);
    }

    #[test]
    fn no_signal() {
        assert_eq!(score("A model."), 0.0);
        assert_eq!(
            ReproducibilityMetric.score(&PackageMetadata::new()).value,
            0.0
        );
    }
}
