use anyhow::Context;
use trustd_core::api as core_api;

use super::cli::ScoreArgs;
use super::{print_json, read_input};

pub fn handle_score(args: ScoreArgs, cfg: &core_api::AppConfig) -> anyhow::Result<i32> {
    let raw = read_input(&args.metadata)?;
    let value: serde_json::Value =
        serde_json::from_str(&raw).context("package metadata is not valid JSON")?;
    if !value.is_object() {
        anyhow::bail!("package metadata must be a JSON object");
    }
    let metadata = core_api::PackageMetadata::from_value(value);
    let report = trustd_plugins::factory::score(&cfg.scoring, &metadata);
    tracing::info!(
        net_score = report.net_score,
        latency_ms = report.latency_ms,
        not_applicable = report.not_applicable.len(),
        "score.done"
    );
    print_json(&report, args.pretty)?;
    Ok(0)
}
