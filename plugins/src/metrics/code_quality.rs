use trustd_core::api as core_api;

use super::text::has_any;

const CI_MARKERS: &[&str] = &[".github/workflows/", ".gitlab-ci.yml", ".circleci/", "azure-pipelines.yml", "jenkinsfile", ".travis.yml"];
const LINT_MARKERS: &[&str] = &[
    ".flake8", "pyproject.toml", "setup.cfg", ".pylintrc", "ruff.toml", ".eslintrc", ".prettierrc",
    "rustfmt.toml", "clippy.toml", ".pre-commit-config.yaml", ".editorconfig",
];
const TYPE_MARKERS: &[&str] = &["py.typed", "tsconfig.json", "mypy.ini", ".pyi", "cargo.toml"];

/// Engineering hygiene visible from the file listing and docs: tests, CI,
/// lint configuration, typing and written documentation.
#[derive(Debug, Default, Clone, Copy)]
pub struct CodeQualityMetric;

impl core_api::Metric for CodeQualityMetric {
    fn name(&self) -> &'static str {
        "code_quality"
    }

    fn compute(&self, md: &core_api::PackageMetadata) -> core_api::MetricScore {
        let files: Vec<String> = md
            .array("files")
            .iter()
            .filter_map(core_api::file_name)
            .map(str::to_lowercase)
            .collect();
        let doc = md.doc_text();
        if files.is_empty() && doc.is_empty() {
            return 0.0.into();
        }

        let any_file = |markers: &[&str]| files.iter().any(|f| has_any(f, markers));
        let tests = files
            .iter()
            .any(|f| f.contains("test") || f.contains("spec/") || f.ends_with("_spec.rb"));
        let signals = [
            tests || has_any(&doc, &["pytest", "cargo test", "npm test", "unit test"]),
            any_file(CI_MARKERS) || has_any(&doc, &["ci status", "build status", "workflow"]),
            any_file(LINT_MARKERS) || has_any(&doc, &["lint", "flake8", "black", "clippy", "eslint"]),
            any_file(TYPE_MARKERS) || has_any(&doc, &["type hints", "typed", "mypy"]),
            files.iter().any(|f| f.starts_with("docs/") || f.starts_with("doc/"))
                || doc.split_whitespace().count() >= 200,
        ];
        let hits = signals.iter().filter(|s| **s).count();
        (hits as f64 / signals.len() as f64).into()
    }
}
