//! Wire format between the executor and the sandbox child.
//!
//! stdin carries one [`SandboxRequest`]; stdout carries exactly one JSON
//! object (the script's `result`); stderr is advisory.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::SandboxError;

use super::limits::ResourceLimits;

/// Child exit codes.
pub const EXIT_OK: i32 = 0;
pub const EXIT_BAD_REQUEST: i32 = 2;
pub const EXIT_SCRIPT_ERROR: i32 = 3;
pub const EXIT_CONTRACT_VIOLATION: i32 = 4;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxRequest {
    pub script: String,
    pub payload: Value,
    pub heap_mb: u64,
    pub cpu_s: u64,
}

impl SandboxRequest {
    pub fn limits(&self) -> ResourceLimits {
        ResourceLimits {
            heap_mb: self.heap_mb,
            cpu_s: self.cpu_s,
        }
    }
}

/// Parses the child's stdout. Anything but a single JSON object is a protocol error.
pub fn parse_response(stdout: &[u8]) -> Result<Map<String, Value>, SandboxError> {
    let text = std::str::from_utf8(stdout)
        .map_err(|_| SandboxError::Protocol("stdout is not valid UTF-8".into()))?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(SandboxError::Protocol("empty stdout".into()));
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(SandboxError::Protocol(format!(
            "expected a JSON object, got {}",
            kind_of(&other)
        ))),
        Err(e) => Err(SandboxError::Protocol(format!("invalid JSON on stdout: {e}"))),
    }
}

/// Lossy UTF-8 view of `bytes`, cut to at most `max` bytes on a char boundary.
pub fn truncate_diagnostic(bytes: &[u8], max: usize) -> String {
    let text = String::from_utf8_lossy(bytes);
    let text = text.trim_end();
    if text.len() <= max {
        return text.to_string();
    }
    let mut cut = max;
    while cut > 0 && !text.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…[truncated]", &text[..cut])
}

fn kind_of(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_object() {
        let map = parse_response(b"{\"ok\":true,\"score\":0.5}\n").unwrap();
        assert_eq!(map.get("score"), Some(&json!(0.5)));
    }

    #[test]
    fn rejects_non_objects() {
        let cases: [&[u8]; 5] = [b"[1,2]", b"42", b"", b"not json", b"\xff\xfe"];
        for raw in cases {
            let err = parse_response(raw).unwrap_err();
            assert!(matches!(err, SandboxError::Protocol(_)), "{raw:?}");
        }
    }

    #[test]
    fn truncates_on_char_boundary() {
        let s = "é".repeat(10);
        let out = truncate_diagnostic(s.as_bytes(), 5);
        assert!(out.starts_with("éé"));
        assert!(out.ends_with("[truncated]"));
        assert_eq!(truncate_diagnostic(b"short\n", 64), "short");
    }

    #[test]
    fn request_roundtrips_limits() {
        let req: SandboxRequest = serde_json::from_value(json!({
            "script": "result = {}",
            "payload": {"name": "x"},
            "heap_mb": 64,
            "cpu_s": 2
        }))
        .unwrap();
        assert_eq!(
            req.limits(),
            ResourceLimits {
                heap_mb: 64,
                cpu_s: 2
            }
        );
    }
}
