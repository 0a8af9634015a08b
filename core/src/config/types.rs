use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub sandbox: SandboxConfig,

    #[serde(default)]
    pub http_server: HttpServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub scoring: ScoringConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.sandbox.validate()?;
        self.scoring.validate()?;
        if self.http_server.request_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "http_server.request_timeout_ms must be > 0".into(),
            ));
        }
        Ok(())
    }
}

/// Limits and budgets for untrusted script execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// Nominal execution budget. The CPU ceiling is derived from it in whole
    /// seconds, so the effective timeout is second-granular: 100 ms still
    /// allows one CPU second and a kill at `1000 + wall_grace_ms`.
    #[serde(default = "default_exec_timeout_ms")]
    pub exec_timeout_ms: u64,

    #[serde(default = "default_heap_mb")]
    pub heap_mb: u64,

    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    #[serde(default = "default_max_script_bytes")]
    pub max_script_bytes: usize,

    #[serde(default = "default_max_files")]
    pub max_files: usize,

    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: usize,

    #[serde(default = "default_max_diagnostic_bytes")]
    pub max_diagnostic_bytes: usize,

    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,

    /// Headroom added on top of the CPU budget before the parent kills the child.
    #[serde(default = "default_wall_grace_ms")]
    pub wall_grace_ms: u64,

    /// Headroom added on top of the wall timeout for the service-level supervisor.
    #[serde(default = "default_supervise_grace_ms")]
    pub supervise_grace_ms: u64,

    /// Child program. `None` means "the running executable".
    #[serde(default)]
    pub program: Option<String>,

    #[serde(default = "default_program_args")]
    pub program_args: Vec<String>,
}

fn default_exec_timeout_ms() -> u64 {
    5_000
}

fn default_heap_mb() -> u64 {
    256
}

fn default_max_concurrency() -> usize {
    2
}

fn default_max_script_bytes() -> usize {
    64 * 1024
}

fn default_max_files() -> usize {
    1_000
}

fn default_max_payload_bytes() -> usize {
    1024 * 1024
}

fn default_max_diagnostic_bytes() -> usize {
    2_048
}

fn default_max_output_bytes() -> usize {
    1024 * 1024
}

fn default_wall_grace_ms() -> u64 {
    500
}

fn default_supervise_grace_ms() -> u64 {
    1_000
}

fn default_program_args() -> Vec<String> {
    vec!["sandbox-child".to_string()]
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            exec_timeout_ms: default_exec_timeout_ms(),
            heap_mb: default_heap_mb(),
            max_concurrency: default_max_concurrency(),
            max_script_bytes: default_max_script_bytes(),
            max_files: default_max_files(),
            max_payload_bytes: default_max_payload_bytes(),
            max_diagnostic_bytes: default_max_diagnostic_bytes(),
            max_output_bytes: default_max_output_bytes(),
            wall_grace_ms: default_wall_grace_ms(),
            supervise_grace_ms: default_supervise_grace_ms(),
            program: None,
            program_args: default_program_args(),
        }
    }
}

impl SandboxConfig {
    /// CPU ceiling in whole seconds, rounded up, never zero.
    pub fn cpu_seconds(&self) -> u64 {
        self.exec_timeout_ms.div_ceil(1_000).max(1)
    }

    /// Parent-side kill deadline. Always strictly above the CPU budget, which
    /// is whole seconds, so sub-second `exec_timeout_ms` values round up.
    pub fn wall_timeout(&self) -> Duration {
        Duration::from_millis(self.cpu_seconds() * 1_000 + self.wall_grace_ms.max(1))
    }

    /// Outer supervision deadline used by the validation service.
    pub fn supervise_timeout(&self) -> Duration {
        self.wall_timeout() + Duration::from_millis(self.supervise_grace_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.exec_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "sandbox.exec_timeout_ms must be > 0".into(),
            ));
        }
        if self.heap_mb == 0 {
            return Err(ConfigError::Validation("sandbox.heap_mb must be > 0".into()));
        }
        if self.max_concurrency == 0 {
            return Err(ConfigError::Validation(
                "sandbox.max_concurrency must be > 0".into(),
            ));
        }
        if self.max_script_bytes == 0
            || self.max_payload_bytes == 0
            || self.max_output_bytes == 0
        {
            return Err(ConfigError::Validation(
                "sandbox size limits must be > 0".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpServerConfig {
    #[serde(default = "default_http_host")]
    pub host: String,

    #[serde(default = "default_http_port")]
    pub port: u16,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Where `serve` drops its `http-<port>.pid` file. Defaults to `~/.trustd/servers`.
    #[serde(default)]
    pub state_dir: Option<String>,
}

fn default_http_host() -> String {
    "127.0.0.1".to_string()
}

fn default_http_port() -> u16 {
    8080
}

fn default_request_timeout_ms() -> u64 {
    // Long enough to cover admission wait under a burst.
    120_000
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            host: default_http_host(),
            port: default_http_port(),
            request_timeout_ms: default_request_timeout_ms(),
            state_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Directory for a daily rolling log file. Console only when unset.
    #[serde(default)]
    pub dir: Option<String>,

    #[serde(default = "default_log_file_prefix")]
    pub file_prefix: String,
}

fn default_log_file_prefix() -> String {
    "trustd.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: None,
            file_prefix: default_log_file_prefix(),
        }
    }
}

/// Per-metric weights for the net score. Supplied by policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default = "default_weights")]
    pub weights: BTreeMap<String, f64>,
}

fn default_weights() -> BTreeMap<String, f64> {
    [
        ("license", 0.14),
        ("bus_factor", 0.10),
        ("ramp_up_time", 0.08),
        ("code_quality", 0.08),
        ("dataset_and_code_score", 0.06),
        ("dataset_quality", 0.06),
        ("reproducibility", 0.08),
        ("reviewedness", 0.08),
        ("performance_claims", 0.06),
        ("size_score", 0.06),
        ("dependency_count", 0.04),
        ("pull_request_hygiene", 0.04),
        ("tree_score", 0.06),
        ("cli_presence", 0.03),
        ("logging_env_hygiene", 0.03),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: default_weights(),
        }
    }
}

impl ScoringConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, w) in &self.weights {
            if !w.is_finite() || *w < 0.0 {
                return Err(ConfigError::Validation(format!(
                    "scoring.weights.{name} must be a finite, non-negative number"
                )));
            }
        }
        let total: f64 = self.weights.values().sum();
        if (total - 1.0).abs() > 1e-6 {
            tracing::warn!(
                total,
                "scoring weights do not sum to 1; net score will be renormalized"
            );
        }
        Ok(())
    }
}
