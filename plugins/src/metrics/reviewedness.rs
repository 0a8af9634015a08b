use serde_json::Value;
use trustd_core::api as core_api;

/// Extensions of artifacts that are not reviewable source code.
const NON_CODE_EXTENSIONS: &[&str] = &[
    ".bin", ".safetensors", ".pt", ".pth", ".ckpt", ".h5", ".onnx", ".pb", ".tflite", ".gguf",
    ".msgpack", ".npz", ".npy", ".pkl", ".zip", ".tar", ".gz", ".png", ".jpg", ".jpeg", ".gif",
    ".parquet", ".arrow",
];

/// Share of code additions that landed through a reviewed pull request.
///
/// Returns [`core_api::NOT_APPLICABLE`] when no source repository is linked
/// or no change history is recorded. History that only touches non-code
/// artifacts scores 1.0.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReviewednessMetric;

pub fn is_code_file(name: &str) -> bool {
    let lower = name.to_lowercase();
    !NON_CODE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

pub fn is_reviewed(pr: &Value) -> bool {
    let flag = |k: &str| pr.get(k).and_then(Value::as_bool).unwrap_or(false);
    flag("reviewed")
        || flag("approved")
        || pr
            .get("review_count")
            .and_then(Value::as_f64)
            .is_some_and(|n| n > 0.0)
}

/// Code additions in a change record's `files`.
fn code_additions(change: &Value) -> f64 {
    change
        .get("files")
        .and_then(Value::as_array)
        .map(|files| {
            files
                .iter()
                .filter(|f| core_api::file_name(f).is_some_and(is_code_file))
                .filter_map(|f| f.get("additions").and_then(Value::as_f64))
                .filter(|a| a.is_finite() && *a > 0.0)
                .sum()
        })
        .unwrap_or(0.0)
}

impl core_api::Metric for ReviewednessMetric {
    fn name(&self) -> &'static str {
        "reviewedness"
    }

    fn allows_sentinel(&self) -> bool {
        true
    }

    fn compute(&self, md: &core_api::PackageMetadata) -> core_api::MetricScore {
        if md
            .first_str(&["repository_url", "github_url", "code_url"])
            .is_none()
        {
            return core_api::NOT_APPLICABLE.into();
        }
        let prs = md.array("pull_requests");
        let commits = md.array("commits");
        if prs.is_empty() && commits.is_empty() {
            return core_api::NOT_APPLICABLE.into();
        }

        let mut reviewed = 0.0;
        let mut total = 0.0;
        for pr in prs {
            let added = code_additions(pr);
            total += added;
            if is_reviewed(pr) {
                reviewed += added;
            }
        }
        for commit in commits {
            let via_pr = commit
                .get("via_pull_request")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            if !via_pr {
                total += code_additions(commit);
            }
        }

        if total <= 0.0 {
            return 1.0.into();
        }
        (reviewed / total).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use trustd_core::api::{Metric, PackageMetadata};

    fn repo() -> PackageMetadata {
        PackageMetadata::new().with("repository_url", json!("https://github.com/org/model"))
    }

    #[test]
    fn no_repository_is_not_applicable() {
        assert_eq!(ReviewednessMetric.score(&PackageMetadata::new()).value, -1.0);
        let md = PackageMetadata::new().with(
            "pull_requests",
            json!([{"reviewed": true, "files": [{"filename": "a.py", "additions": 1}]}]),
        );
        assert_eq!(ReviewednessMetric.score(&md).value, -1.0);
    }

    #[test]
    fn no_history_is_not_applicable() {
        assert_eq!(ReviewednessMetric.score(&repo()).value, -1.0);
    }

    #[test]
    fn only_weights_changed_is_fully_reviewed() {
        let md = repo().with(
            "commits",
            json!([{"files": [{"filename": "model.safetensors", "additions": 900}]}]),
        );
        assert_eq!(ReviewednessMetric.score(&md).value, 1.0);
    }

    #[test]
    fn reviewed_share_of_code_additions() {
        let md = repo().with(
            "pull_requests",
            json!([
                {"reviewed": true, "files": [
                    {"filename": "train.py", "additions": 100},
                    {"filename": "weights.bin", "additions": 5000}
                ]},
                {"reviewed": false, "files": [{"filename": "eval.py", "additions": 50}]}
            ]),
        );
        let v = ReviewednessMetric.score(&md).value;
        assert!((v - 100.0 / 150.0).abs() < 1e-12, "{v}");
    }

    #[test]
    fn direct_commits_count_as_unreviewed() {
        let md = repo()
            .with(
                "pull_requests",
                json!([{"approved": true, "files": [{"filename": "a.rs", "additions": 30}]}]),
            )
            .with(
                "commits",
                json!([
                    {"via_pull_request": true, "files": [{"filename": "a.rs", "additions": 30}]},
                    {"files": [{"filename": "b.rs", "additions": 10}]}
                ]),
            );
        assert!((ReviewednessMetric.score(&md).value - 0.75).abs() < 1e-12);
    }
}
