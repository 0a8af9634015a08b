use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{ErrorCode, SandboxError};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationRequest {
    pub package_name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub requester_identity: String,
    #[serde(default)]
    pub requester_groups: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    /// Extra package facts handed to the script alongside the identity fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl ValidationRequest {
    /// Non-blank script, if any.
    pub fn script(&self) -> Option<&str> {
        self.script.as_deref().filter(|s| !s.trim().is_empty())
    }

    /// Sandbox payload: metadata keys first, identity fields on top.
    pub fn payload(&self) -> Value {
        let mut map = self.metadata.clone().unwrap_or_default();
        map.insert("package_name".into(), Value::from(self.package_name.clone()));
        map.insert("version".into(), Value::from(self.version.clone()));
        map.insert(
            "requester_identity".into(),
            Value::from(self.requester_identity.clone()),
        );
        map.insert(
            "requester_groups".into(),
            Value::from(self.requester_groups.clone()),
        );
        Value::Object(map)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// No script attached; nothing to run.
    Allowed,
    Passed,
    Failed,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
}

impl From<&SandboxError> for ErrorBody {
    fn from(e: &SandboxError) -> Self {
        let code = e.code();
        let message = match code {
            ErrorCode::Timeout => format!("validation took too long: {e}"),
            _ => e.to_string(),
        };
        Self { code, message }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub ok: bool,
    pub status: Verdict,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issues: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
    /// Merged sandbox object, kept for audit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Map<String, Value>>,
    pub duration_ms_total: u64,
}

impl ValidationResult {
    pub fn allowed(duration_ms_total: u64) -> Self {
        Self {
            ok: true,
            status: Verdict::Allowed,
            score: None,
            issues: None,
            error: None,
            result: None,
            duration_ms_total,
        }
    }

    pub fn from_error(e: &SandboxError, duration_ms_total: u64) -> Self {
        Self {
            ok: false,
            status: Verdict::Error,
            score: None,
            issues: None,
            error: Some(ErrorBody::from(e)),
            result: None,
            duration_ms_total,
        }
    }

    /// Overlays the sandbox object on `{ok: true, score: null, issues: []}`.
    /// A non-boolean `ok` counts as false.
    pub fn from_sandbox(raw: Map<String, Value>, duration_ms_total: u64) -> Self {
        let mut merged = default_result();
        merged.extend(raw);

        let ok = merged.get("ok").and_then(Value::as_bool).unwrap_or(false);
        let score = merged.get("score").and_then(Value::as_f64);
        let issues = match merged.get("issues") {
            Some(Value::Array(items)) => Some(items.clone()),
            Some(Value::Null) | None => None,
            Some(other) => Some(vec![other.clone()]),
        };

        Self {
            ok,
            status: if ok { Verdict::Passed } else { Verdict::Failed },
            score,
            issues,
            error: None,
            result: Some(merged),
            duration_ms_total,
        }
    }

    pub fn error_code(&self) -> Option<ErrorCode> {
        self.error.as_ref().map(|e| e.code)
    }
}

fn default_result() -> Map<String, Value> {
    let mut m = Map::new();
    m.insert("ok".into(), Value::Bool(true));
    m.insert("score".into(), Value::Null);
    m.insert("issues".into(), Value::Array(Vec::new()));
    m
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn object(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            other => panic!("not an object: {other}"),
        }
    }

    #[test]
    fn defaults_fill_missing_fields() {
        let r = ValidationResult::from_sandbox(object(json!({"score": 0.7})), 12);
        assert!(r.ok);
        assert_eq!(r.status, Verdict::Passed);
        assert_eq!(r.score, Some(0.7));
        assert_eq!(r.issues, Some(vec![]));
        assert_eq!(
            r.result.unwrap(),
            object(json!({"ok": true, "score": 0.7, "issues": []}))
        );
    }

    #[test]
    fn script_verdict_wins() {
        let r = ValidationResult::from_sandbox(
            object(json!({"ok": false, "issues": ["no license"], "extra": 1})),
            3,
        );
        assert!(!r.ok);
        assert_eq!(r.status, Verdict::Failed);
        assert_eq!(r.score, None);
        assert_eq!(r.issues, Some(vec![json!("no license")]));
        assert_eq!(r.result.unwrap().get("extra"), Some(&json!(1)));
    }

    #[test]
    fn error_results_serialize_code() {
        let r = ValidationResult::from_error(&SandboxError::Timeout { elapsed_ms: 1500 }, 1501);
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["ok"], json!(false));
        assert_eq!(v["status"], json!("error"));
        assert_eq!(v["error"]["code"], json!("TIMEOUT"));
        assert!(v["error"]["message"]
            .as_str()
            .unwrap()
            .starts_with("validation took too long"));
        assert!(v.get("score").is_none());
    }

    #[test]
    fn payload_merges_metadata_under_identity() {
        let req = ValidationRequest {
            package_name: "left-pad".into(),
            version: "1.3.0".into(),
            requester_identity: "alice".into(),
            requester_groups: vec!["dev".into()],
            script: Some("  ".into()),
            metadata: Some(object(json!({"stars": 5, "package_name": "spoofed"}))),
        };
        assert_eq!(req.script(), None);
        assert_eq!(
            req.payload(),
            json!({
                "stars": 5,
                "package_name": "left-pad",
                "version": "1.3.0",
                "requester_identity": "alice",
                "requester_groups": ["dev"]
            })
        );
    }
}
