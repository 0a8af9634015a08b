use serde_json::Value;
use trustd_core::api as core_api;

/// Dependency count at which the count component halves.
const HALF_AT: f64 = 10.0;

/// Dependency surface: fewer and pinned is better.
///
/// No `dependencies` key at all scores 0.0 (nothing known); an explicit empty
/// list scores 1.0.
#[derive(Debug, Default, Clone, Copy)]
pub struct DependencyCountMetric;

fn is_pinned(version: &str) -> bool {
    let v = version.trim();
    !v.is_empty()
        && v != "latest"
        && v.chars().next().is_some_and(|c| c.is_ascii_digit() || c == '=')
        && !v.contains(['^', '~', '*', '>', '<', 'x'])
}

/// `(count, pinned)` for list entries like `"numpy==1.26.0"`, `"lodash@4.17.21"`
/// or `{name, version}` and for `name -> version` maps.
fn inventory(deps: &Value) -> Option<(usize, usize)> {
    match deps {
        Value::Array(items) => {
            let pinned = items
                .iter()
                .filter(|d| match d {
                    Value::String(s) => s
                        .split_once("==")
                        .map(|(_, v)| v)
                        .or_else(|| s.rsplit_once('@').filter(|(n, _)| !n.is_empty()).map(|(_, v)| v))
                        .is_some_and(is_pinned),
                    Value::Object(o) => o.get("version").and_then(Value::as_str).is_some_and(is_pinned),
                    _ => false,
                })
                .count();
            Some((items.len(), pinned))
        }
        Value::Object(map) => {
            let pinned = map
                .values()
                .filter(|v| v.as_str().is_some_and(is_pinned))
                .count();
            Some((map.len(), pinned))
        }
        _ => None,
    }
}

impl core_api::Metric for DependencyCountMetric {
    fn name(&self) -> &'static str {
        "dependency_count"
    }

    fn compute(&self, md: &core_api::PackageMetadata) -> core_api::MetricScore {
        let Some((count, pinned)) = md.get("dependencies").and_then(inventory) else {
            return 0.0.into();
        };
        if count == 0 {
            return 1.0.into();
        }
        let lean = HALF_AT / (HALF_AT + count as f64);
        let pinned = pinned as f64 / count as f64;
        (0.7 * lean + 0.3 * pinned).into()
    }
}
