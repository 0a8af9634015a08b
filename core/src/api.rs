//! Stable re-exports for consumers (`cli`, `plugins`, and external crates).
//!
//! Prefer importing from `trustd_core::api` instead of reaching into internal modules.

pub use crate::config::{
    load_default, load_from, AppConfig, HttpServerConfig, LoggingConfig, SandboxConfig,
    ScoringConfig,
};
pub use crate::context::AppContext;
pub use crate::errors::{ConfigError, ErrorCode, SandboxError};
pub use crate::metrics::{
    aggregate, clamp_unit, file_name, score_package, Metric, MetricRegistry, MetricScore,
    MetricValue, NetScoreReport, PackageMetadata, NOT_APPLICABLE,
};
pub use crate::sandbox::{
    SandboxCommand, SandboxExecutor, SandboxOutput, ScriptRunner, StatsSnapshot,
};
pub use crate::validation::{
    Admission, AdmissionSnapshot, ErrorBody, ServiceSnapshot, ValidationRequest,
    ValidationResult, ValidationService, Verdict,
};
