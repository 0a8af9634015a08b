use trustd_core::api as core_api;

use super::text::coverage;

/// Documentation terms showing logging and environment configuration are covered.
const DOC_TERMS: &[&str] = &["logging", "log level", "environment variable", ".env"];

/// File names that document configuration without leaking it.
const CONFIG_FILES: &[&str] = &[
    ".env.example",
    ".env.sample",
    ".env.template",
    "logging.conf",
    "logging.yaml",
    "logging.yml",
    "logging.ini",
    "log4rs.yaml",
];

const COMMITTED_ENV_PENALTY: f64 = 0.3;

/// Logging and environment-variable hygiene; a committed `.env` is penalized.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingEnvHygieneMetric;

impl core_api::Metric for LoggingEnvHygieneMetric {
    fn name(&self) -> &'static str {
        "logging_env_hygiene"
    }

    fn compute(&self, md: &core_api::PackageMetadata) -> core_api::MetricScore {
        let names: Vec<String> = md
            .array("files")
            .iter()
            .filter_map(core_api::file_name)
            .map(|f| {
                let lower = f.to_lowercase();
                lower.rsplit('/').next().unwrap_or_default().to_string()
            })
            .collect();

        let docs = coverage(&md.doc_text(), DOC_TERMS);
        let files = if names.iter().any(|n| CONFIG_FILES.contains(&n.as_str())) {
            1.0
        } else {
            0.0
        };
        let leaked = names.iter().any(|n| n == ".env");

        let mut s = 0.6 * docs + 0.4 * files;
        if leaked {
            s -= COMMITTED_ENV_PENALTY;
        }
        s.max(0.0).into()
    }
}
