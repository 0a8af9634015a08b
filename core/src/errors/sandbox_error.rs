// core/src/errors/sandbox_error.rs
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Externally visible failure taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Caller-supplied data violates a size or shape limit. Never retried.
    BadInput,
    /// The script exceeded its time budget.
    Timeout,
    /// The script crashed, broke its output contract, or the sandbox failed to start.
    Internal,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::BadInput => "BAD_INPUT",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("script too large: {size} bytes (max {max})")]
    ScriptTooLarge { size: usize, max: usize },

    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("too many files: {count} (max {max})")]
    TooManyFiles { count: usize, max: usize },

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("sandbox timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    #[error("failed to spawn sandbox: {program}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("sandbox io error while {stage}")]
    Io {
        stage: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("sandbox exited with code {code}: {diagnostic}")]
    ChildFailed { code: i32, diagnostic: String },

    #[error("sandbox output violates protocol: {0}")]
    Protocol(String),

    #[error("admission control is closed")]
    AdmissionClosed,
}

impl SandboxError {
    pub fn code(&self) -> ErrorCode {
        match self {
            SandboxError::ScriptTooLarge { .. }
            | SandboxError::PayloadTooLarge { .. }
            | SandboxError::TooManyFiles { .. }
            | SandboxError::InvalidPayload(_) => ErrorCode::BadInput,
            SandboxError::Timeout { .. } => ErrorCode::Timeout,
            SandboxError::Spawn { .. }
            | SandboxError::Io { .. }
            | SandboxError::ChildFailed { .. }
            | SandboxError::Protocol(_)
            | SandboxError::AdmissionClosed => ErrorCode::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_follow_taxonomy() {
        let too_big = SandboxError::ScriptTooLarge { size: 10, max: 5 };
        assert_eq!(too_big.code(), ErrorCode::BadInput);
        assert_eq!(
            SandboxError::Timeout { elapsed_ms: 10 }.code(),
            ErrorCode::Timeout
        );
        assert_eq!(
            SandboxError::Protocol("not an object".into()).code(),
            ErrorCode::Internal
        );
    }

    #[test]
    fn error_code_serializes_screaming_snake() {
        let s = serde_json::to_string(&ErrorCode::BadInput).unwrap();
        assert_eq!(s, "\"BAD_INPUT\"");
        assert_eq!(ErrorCode::Internal.to_string(), "INTERNAL");
    }
}
