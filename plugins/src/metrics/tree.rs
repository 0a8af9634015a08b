use serde_json::Value;
use trustd_core::api as core_api;

/// Lineage levels followed before a parent counts as unknown.
pub const MAX_DEPTH: usize = 8;

/// Mean trust of declared parents (base models, source datasets).
///
/// A parent's trust is its explicit `score`, otherwise the tree score of its
/// own parents. Unknown parents count as 0.0.
#[derive(Debug, Default, Clone, Copy)]
pub struct TreeScoreMetric;

fn lineage(parents: &[Value], depth: usize) -> f64 {
    if parents.is_empty() || depth > MAX_DEPTH {
        return 0.0;
    }
    let total: f64 = parents.iter().map(|p| parent_score(p, depth)).sum();
    total / parents.len() as f64
}

fn parent_score(parent: &Value, depth: usize) -> f64 {
    if let Some(s) = parent.get("score").and_then(Value::as_f64) {
        return core_api::clamp_unit(s);
    }
    match parent.get("parents").and_then(Value::as_array) {
        Some(grand) => lineage(grand, depth + 1),
        None => 0.0,
    }
}

impl core_api::Metric for TreeScoreMetric {
    fn name(&self) -> &'static str {
        "tree_score"
    }

    fn compute(&self, md: &core_api::PackageMetadata) -> core_api::MetricScore {
        lineage(md.array("parents"), 1).into()
    }
}
