use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tracing::Instrument;
use uuid::Uuid;

use crate::config::SandboxConfig;
use crate::errors::SandboxError;

use super::exit::ChildExit;
use super::limits::{platform_limiter, ResourceLimiter, ResourceLimits};
use super::protocol::{parse_response, truncate_diagnostic, SandboxRequest};
use super::ScriptRunner;

/// Program and arguments that start the sandbox child.
#[derive(Debug, Clone)]
pub struct SandboxCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl SandboxCommand {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Configured program, or the running executable with `program_args`.
    pub fn from_config(cfg: &SandboxConfig) -> Result<Self, SandboxError> {
        let program = match cfg.program.as_deref().map(str::trim) {
            Some(p) if !p.is_empty() => PathBuf::from(p),
            _ => std::env::current_exe().map_err(|source| SandboxError::Spawn {
                program: "<current executable>".into(),
                source,
            })?,
        };
        Ok(Self::new(program, cfg.program_args.clone()))
    }
}

#[derive(Debug, Default)]
pub struct ExecutorStats {
    spawned: AtomicU64,
    succeeded: AtomicU64,
    rejected: AtomicU64,
    timed_out: AtomicU64,
    failed: AtomicU64,
    degraded: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub spawned: u64,
    pub succeeded: u64,
    pub rejected: u64,
    pub timed_out: u64,
    pub failed: u64,
    /// Executions that ran without OS resource ceilings.
    pub degraded: u64,
}

impl ExecutorStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            spawned: self.spawned.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            timed_out: self.timed_out.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            degraded: self.degraded.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SandboxOutput {
    pub result: Map<String, Value>,
    pub duration_ms: u64,
}

pub struct SandboxExecutor {
    cfg: SandboxConfig,
    command: SandboxCommand,
    limiter: Arc<dyn ResourceLimiter>,
    stats: ExecutorStats,
    warned_degraded: AtomicBool,
}

impl SandboxExecutor {
    pub fn new(cfg: SandboxConfig, command: SandboxCommand) -> Self {
        Self::with_limiter(cfg, command, platform_limiter())
    }

    pub fn from_config(cfg: &SandboxConfig) -> Result<Self, SandboxError> {
        Ok(Self::new(cfg.clone(), SandboxCommand::from_config(cfg)?))
    }

    pub fn with_limiter(
        cfg: SandboxConfig,
        command: SandboxCommand,
        limiter: Arc<dyn ResourceLimiter>,
    ) -> Self {
        Self {
            cfg,
            command,
            limiter,
            stats: ExecutorStats::default(),
            warned_degraded: AtomicBool::new(false),
        }
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.cfg
    }

    pub fn command(&self) -> &SandboxCommand {
        &self.command
    }

    pub fn limits(&self) -> ResourceLimits {
        ResourceLimits {
            heap_mb: self.cfg.heap_mb,
            cpu_s: self.cfg.cpu_seconds(),
        }
    }

    /// Size and shape guards. Runs before anything is spawned.
    pub fn check_input(&self, script: &str, payload: &Value) -> Result<(), SandboxError> {
        if script.len() > self.cfg.max_script_bytes {
            return Err(SandboxError::ScriptTooLarge {
                size: script.len(),
                max: self.cfg.max_script_bytes,
            });
        }
        if !payload.is_object() {
            return Err(SandboxError::InvalidPayload(
                "payload must be a JSON object".into(),
            ));
        }
        if let Some(files) = payload.get("files").and_then(Value::as_array) {
            if files.len() > self.cfg.max_files {
                return Err(SandboxError::TooManyFiles {
                    count: files.len(),
                    max: self.cfg.max_files,
                });
            }
        }
        let size = serde_json::to_vec(payload)
            .map_err(|e| SandboxError::InvalidPayload(e.to_string()))?
            .len();
        if size > self.cfg.max_payload_bytes {
            return Err(SandboxError::PayloadTooLarge {
                size,
                max: self.cfg.max_payload_bytes,
            });
        }
        Ok(())
    }

    pub async fn execute(&self, script: &str, payload: Value) -> Result<SandboxOutput, SandboxError> {
        if let Err(e) = self.check_input(script, &payload) {
            self.stats.rejected.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(error.kind = "sandbox.rejected", error.message = %e);
            return Err(e);
        }

        let limits = self.limits();
        let request = SandboxRequest {
            script: script.to_string(),
            payload,
            heap_mb: limits.heap_mb,
            cpu_s: limits.cpu_s,
        };
        let input = serde_json::to_vec(&request)
            .map_err(|e| SandboxError::InvalidPayload(e.to_string()))?;

        let exec_id = Uuid::new_v4();
        let started = Instant::now();
        let outcome = self
            .run_child(&input, limits, started)
            .instrument(tracing::debug_span!("sandbox.exec", %exec_id))
            .await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match &outcome {
            Ok(_) => {
                self.stats.succeeded.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(%exec_id, duration_ms, "sandbox.succeeded");
            }
            Err(SandboxError::Timeout { .. }) => {
                self.stats.timed_out.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(error.kind = "sandbox.timeout", %exec_id, duration_ms);
            }
            Err(e) => {
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(error.kind = "sandbox.failed", error.message = %e, %exec_id, duration_ms);
            }
        }

        outcome.map(|result| SandboxOutput {
            result,
            duration_ms,
        })
    }

    async fn run_child(
        &self,
        input: &[u8],
        limits: ResourceLimits,
        started: Instant,
    ) -> Result<Map<String, Value>, SandboxError> {
        let mut cmd = tokio::process::Command::new(&self.command.program);
        cmd.args(&self.command.args)
            .env_clear()
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(path) = std::env::var_os("PATH") {
            cmd.env("PATH", path);
        }

        if self.limiter.is_supported() {
            #[cfg(unix)]
            {
                let limiter = Arc::clone(&self.limiter);
                // SAFETY: the hook only calls getrlimit/setrlimit, which are
                // async-signal-safe, and touches no shared state.
                unsafe {
                    cmd.pre_exec(move || limiter.apply(&limits));
                }
            }
        } else {
            self.stats.degraded.fetch_add(1, Ordering::Relaxed);
            if !self.warned_degraded.swap(true, Ordering::Relaxed) {
                tracing::warn!(
                    limiter = self.limiter.name(),
                    "resource limits unsupported on this platform; relying on wall-clock kill only"
                );
            }
        }

        let mut child = cmd.spawn().map_err(|source| SandboxError::Spawn {
            program: self.command.program.display().to_string(),
            source,
        })?;
        self.stats.spawned.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(pid = child.id(), "sandbox.spawned");

        let mut stdin = child.stdin.take().ok_or_else(|| pipe_missing("stdin"))?;
        let stdout = child.stdout.take().ok_or_else(|| pipe_missing("stdout"))?;
        let stderr = child.stderr.take().ok_or_else(|| pipe_missing("stderr"))?;

        let max_output = self.cfg.max_output_bytes;
        let max_diagnostic = self.cfg.max_diagnostic_bytes;

        let exchange = async {
            let write = async {
                let res = async {
                    stdin.write_all(input).await?;
                    stdin.shutdown().await
                }
                .await;
                drop(stdin);
                match res {
                    // The child may exit before reading everything; its exit status tells why.
                    Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
                    other => other,
                }
            };
            let (written, out, err) = tokio::join!(
                write,
                read_capped(stdout, max_output),
                // one extra byte so truncation is detectable downstream
                read_capped(stderr, max_diagnostic.saturating_add(1)),
            );
            let status = child.wait().await;
            (written, out, err, status)
        };

        let exchanged = tokio::time::timeout(self.cfg.wall_timeout(), exchange).await;
        let (written, out, err, status) = match exchanged {
            Ok(parts) => parts,
            Err(_) => {
                let _ = child.start_kill();
                let _ = child.wait().await;
                return Err(SandboxError::Timeout {
                    elapsed_ms: started.elapsed().as_millis() as u64,
                });
            }
        };

        written.map_err(|source| SandboxError::Io {
            stage: "writing request",
            source,
        })?;
        let status = status.map_err(|source| SandboxError::Io {
            stage: "waiting for child",
            source,
        })?;
        let (stdout, stdout_overflow) = out.map_err(|source| SandboxError::Io {
            stage: "reading stdout",
            source,
        })?;
        let (stderr, _) = err.map_err(|source| SandboxError::Io {
            stage: "reading stderr",
            source,
        })?;

        match ChildExit::from_status(status) {
            ChildExit::CpuExhausted => Err(SandboxError::Timeout {
                elapsed_ms: started.elapsed().as_millis() as u64,
            }),
            ChildExit::Code(0) if stdout_overflow => Err(SandboxError::Protocol(format!(
                "stdout exceeds {max_output} bytes"
            ))),
            ChildExit::Code(0) => parse_response(&stdout),
            exit => Err(SandboxError::ChildFailed {
                code: exit.normalized(),
                diagnostic: truncate_diagnostic(&stderr, max_diagnostic),
            }),
        }
    }
}

#[async_trait]
impl ScriptRunner for SandboxExecutor {
    fn check_input(&self, script: &str, payload: &Value) -> Result<(), SandboxError> {
        SandboxExecutor::check_input(self, script, payload)
    }

    async fn run(&self, script: &str, payload: Value) -> Result<SandboxOutput, SandboxError> {
        self.execute(script, payload).await
    }
}

fn pipe_missing(name: &'static str) -> SandboxError {
    SandboxError::Io {
        stage: "attaching pipes",
        source: io::Error::new(io::ErrorKind::Other, format!("{name} not piped")),
    }
}

/// Reads to EOF, keeping at most `cap` bytes. The flag reports whether more
/// was produced and discarded.
async fn read_capped<R: AsyncRead + Unpin>(mut reader: R, cap: usize) -> io::Result<(Vec<u8>, bool)> {
    let mut kept = Vec::new();
    let mut overflow = false;
    let mut buf = [0u8; 8192];
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        let room = cap.saturating_sub(kept.len());
        kept.extend_from_slice(&buf[..n.min(room)]);
        if n > room {
            overflow = true;
        }
    }
    Ok((kept, overflow))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn executor(cfg: SandboxConfig) -> SandboxExecutor {
        SandboxExecutor::new(
            cfg,
            SandboxCommand::new("/nonexistent/trustd-sandbox", Vec::new()),
        )
    }

    #[tokio::test]
    async fn oversized_script_is_rejected_without_spawning() {
        let cfg = SandboxConfig {
            max_script_bytes: 16,
            ..SandboxConfig::default()
        };
        let exec = executor(cfg);
        let err = exec
            .execute(&"x = 1\n".repeat(10), json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, SandboxError::ScriptTooLarge { size: 60, max: 16 }));
        let stats = exec.stats();
        assert_eq!(stats.spawned, 0);
        assert_eq!(stats.rejected, 1);
    }

    #[test]
    fn payload_guards() {
        let cfg = SandboxConfig {
            max_files: 2,
            max_payload_bytes: 64,
            ..SandboxConfig::default()
        };
        let exec = executor(cfg);
        assert!(matches!(
            exec.check_input("", &json!({"files": ["a", "b", "c"]})),
            Err(SandboxError::TooManyFiles { count: 3, max: 2 })
        ));
        assert!(matches!(
            exec.check_input("", &json!({"blob": "x".repeat(100)})),
            Err(SandboxError::PayloadTooLarge { .. })
        ));
        assert!(matches!(
            exec.check_input("", &json!([1, 2])),
            Err(SandboxError::InvalidPayload(_))
        ));
        assert!(exec.check_input("result = {}", &json!({"files": ["a"]})).is_ok());
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let exec = executor(SandboxConfig::default());
        let err = exec.execute("result = {}", json!({})).await.unwrap_err();
        assert!(matches!(err, SandboxError::Spawn { .. }));
        assert_eq!(exec.stats().spawned, 0);
        assert_eq!(exec.stats().failed, 1);
    }

    #[tokio::test]
    async fn read_capped_drains_everything() {
        let data = vec![b'a'; 20_000];
        let (kept, overflow) = read_capped(&data[..], 100).await.unwrap();
        assert_eq!(kept.len(), 100);
        assert!(overflow);

        let (kept, overflow) = read_capped(&b"small"[..], 100).await.unwrap();
        assert_eq!(kept, b"small");
        assert!(!overflow);
    }

    #[test]
    fn command_prefers_configured_program() {
        let cfg = SandboxConfig {
            program: Some("/usr/local/bin/trustd-sandbox".into()),
            program_args: vec![],
            ..SandboxConfig::default()
        };
        let cmd = SandboxCommand::from_config(&cfg).unwrap();
        assert_eq!(cmd.program, PathBuf::from("/usr/local/bin/trustd-sandbox"));
        assert!(cmd.args.is_empty());
    }
}
