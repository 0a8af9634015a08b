//! Embedded scoring language evaluated inside the sandbox child.
//!
//! Scripts get their own copy of the request as `payload` and must leave an
//! object in `result`. There is no I/O, no module loading and no host access; the only
//! builtins are pure functions plus `now_ms()`.

mod ast;
mod interp;
mod lexer;
mod parser;
mod value;

use serde_json::{Map, Value as Json};
use thiserror::Error;

pub use interp::MAX_LOOP_ITERATIONS;

/// Name of the binding a script must assign.
pub const RESULT_SLOT: &str = "result";
/// Name of the binding holding the request payload.
pub const PAYLOAD_SLOT: &str = "payload";

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("syntax error on line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("runtime error on line {line}: {message}")]
    Runtime { line: usize, message: String },

    #[error("script failed on line {line}: {message}")]
    Raised { line: usize, message: String },

    #[error("script must assign an object to `result`, found {found}")]
    MissingResult { found: &'static str },
}

impl ScriptError {
    /// True when the script ran but did not honor the result contract.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, ScriptError::MissingResult { .. })
    }
}

fn wall_clock_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Parses and runs `src` against `payload`, returning the `result` object.
pub fn run_script(src: &str, payload: &Json) -> Result<Map<String, Json>, ScriptError> {
    let program = parser::parse(src)?;
    let mut interp = interp::Interpreter::new(wall_clock_ms);
    interp.bind(PAYLOAD_SLOT, value::Value::from(payload));
    interp.run(&program)?;

    match interp.get(RESULT_SLOT).map(value::Value::to_json) {
        Some(Json::Object(map)) => Ok(map),
        Some(other) => Err(ScriptError::MissingResult {
            found: json_kind(&other),
        }),
        None => Err(ScriptError::MissingResult { found: "nothing" }),
    }
}

/// Syntax check without execution.
pub fn check_syntax(src: &str) -> Result<(), ScriptError> {
    parser::parse(src).map(|_| ())
}

fn json_kind(v: &Json) -> &'static str {
    match v {
        Json::Null => "null",
        Json::Bool(_) => "bool",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn scores_a_payload() {
        let src = r#"
            # flag packages with no license
            issues = []
            if payload.metadata.license == null {
                issues = issues + ["missing license"]
            }
            stars = payload.metadata.stars
            result = {
                ok: len(issues) == 0,
                score: clamp(stars / 1000, 0, 1),
                issues: issues,
            }
        "#;
        let payload = json!({"name": "left-pad", "metadata": {"stars": 250}});
        let out = run_script(src, &payload).unwrap();
        assert_eq!(
            Json::Object(out),
            json!({"ok": false, "score": 0.25, "issues": ["missing license"]})
        );
    }

    #[test]
    fn payload_is_not_mutated_outside_the_script() {
        let payload = json!({"a": 1});
        let out = run_script("payload.a = 2\nresult = {a: payload.a}", &payload).unwrap();
        assert_eq!(out.get("a"), Some(&json!(2)));
        assert_eq!(payload, json!({"a": 1}));
    }

    #[test]
    fn result_must_be_an_object() {
        let err = run_script("result = 5", &json!({})).unwrap_err();
        assert!(err.is_contract_violation());
        assert_eq!(
            err.to_string(),
            "script must assign an object to `result`, found number"
        );

        let err = run_script("x = 1", &json!({})).unwrap_err();
        assert!(matches!(err, ScriptError::MissingResult { found: "nothing" }));
    }

    #[test]
    fn syntax_errors_carry_line_numbers() {
        let err = check_syntax("a = 1\nb = (2\n").unwrap_err();
        assert!(matches!(err, ScriptError::Syntax { .. }));
        assert!(check_syntax("result = {}").is_ok());
    }

    #[test]
    fn host_access_is_unavailable() {
        for src in [
            "result = {env: env(\"HOME\")}",
            "result = {f: read_file(\"/etc/passwd\")}",
            "result = {p: process.pid}",
        ] {
            assert!(run_script(src, &json!({})).is_err(), "{src}");
        }
    }
}
