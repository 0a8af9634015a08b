use lazy_static::lazy_static;
use regex::Regex;
use trustd_core::api as core_api;

use super::text::count_hits;

lazy_static! {
    static ref CLI_WORD: Regex = Regex::new(r"\bcli\b").unwrap();
}

const ENTRY_FILES: &[&str] = &["cli.py", "__main__.py", "main.rs", "main.go"];
const ENTRY_DIRS: &[&str] = &["bin/", "cmd/", "src/bin/"];
const DOC_HINTS: &[&str] = &[
    "command line",
    "command-line",
    "usage:",
    "--help",
    "console_scripts",
    "entry_points",
];

/// Whether the package ships a usable command-line entry point.
#[derive(Debug, Default, Clone, Copy)]
pub struct CliPresenceMetric;

fn has_entry_file(md: &core_api::PackageMetadata) -> bool {
    md.array("files")
        .iter()
        .filter_map(core_api::file_name)
        .map(|f| f.to_lowercase().replace('\\', "/"))
        .any(|path| {
            let base = path.rsplit('/').next().unwrap_or(&path);
            ENTRY_FILES.contains(&base)
                || ENTRY_DIRS
                    .iter()
                    .any(|d| path.starts_with(d) || path.contains(&format!("/{d}")))
        })
}

impl core_api::Metric for CliPresenceMetric {
    fn name(&self) -> &'static str {
        "cli_presence"
    }

    fn compute(&self, md: &core_api::PackageMetadata) -> core_api::MetricScore {
        let doc = md.doc_text();
        let hits = count_hits(&doc, DOC_HINTS) + usize::from(CLI_WORD.is_match(&doc));
        let docs = (hits as f64 / 2.0).min(1.0);
        let files = if has_entry_file(md) { 1.0 } else { 0.0 };
        (0.5 * files + 0.5 * docs).into()
    }
}
