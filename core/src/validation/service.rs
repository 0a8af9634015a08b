use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::config::SandboxConfig;
use crate::errors::{ErrorCode, SandboxError};
use crate::sandbox::ScriptRunner;

use super::admission::{Admission, AdmissionSnapshot};
use super::types::{ValidationRequest, ValidationResult, Verdict};

#[derive(Debug, Default)]
struct Counters {
    received: AtomicU64,
    allowed: AtomicU64,
    passed: AtomicU64,
    failed: AtomicU64,
    bad_input: AtomicU64,
    timed_out: AtomicU64,
    internal: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ServiceSnapshot {
    pub received: u64,
    pub allowed: u64,
    pub passed: u64,
    pub failed: u64,
    pub bad_input: u64,
    pub timed_out: u64,
    pub internal: u64,
    pub admission: AdmissionSnapshot,
}

/// Request-facing coordinator: admission, supervision timeout and error mapping.
pub struct ValidationService {
    admission: Admission,
    runner: Arc<dyn ScriptRunner>,
    supervise_timeout: Duration,
    counters: Counters,
}

impl ValidationService {
    /// `supervise_timeout` must exceed the runner's own wall-clock timeout.
    pub fn new(
        admission: Admission,
        runner: Arc<dyn ScriptRunner>,
        supervise_timeout: Duration,
    ) -> Self {
        Self {
            admission,
            runner,
            supervise_timeout,
            counters: Counters::default(),
        }
    }

    pub fn from_config(cfg: &SandboxConfig, runner: Arc<dyn ScriptRunner>) -> Self {
        Self::new(
            Admission::new(cfg.max_concurrency),
            runner,
            cfg.supervise_timeout(),
        )
    }

    pub fn admission(&self) -> &Admission {
        &self.admission
    }

    pub async fn validate(&self, req: ValidationRequest) -> ValidationResult {
        let started = Instant::now();
        self.counters.received.fetch_add(1, Ordering::Relaxed);

        let Some(script) = req.script() else {
            self.counters.allowed.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(package = %req.package_name, "validation.allowed");
            return ValidationResult::allowed(elapsed_ms(started));
        };

        let outcome = self.supervise(script, req.payload()).await;
        let total = elapsed_ms(started);
        let result = match outcome {
            Ok(raw) => ValidationResult::from_sandbox(raw, total),
            Err(e) => ValidationResult::from_error(&e, total),
        };

        match (result.status, result.error_code()) {
            (Verdict::Passed, _) => self.counters.passed.fetch_add(1, Ordering::Relaxed),
            (Verdict::Failed, _) => self.counters.failed.fetch_add(1, Ordering::Relaxed),
            (_, Some(ErrorCode::BadInput)) => self.counters.bad_input.fetch_add(1, Ordering::Relaxed),
            (_, Some(ErrorCode::Timeout)) => self.counters.timed_out.fetch_add(1, Ordering::Relaxed),
            _ => self.counters.internal.fetch_add(1, Ordering::Relaxed),
        };

        tracing::info!(
            package = %req.package_name,
            version = %req.version,
            status = ?result.status,
            error.code = ?result.error_code(),
            duration_ms = total,
            "validation.done"
        );
        result
    }

    async fn supervise(
        &self,
        script: &str,
        payload: serde_json::Value,
    ) -> Result<serde_json::Map<String, serde_json::Value>, SandboxError> {
        self.runner.check_input(script, &payload)?;
        let _permit = self.admission.acquire().await?;
        let exec_started = Instant::now();
        match tokio::time::timeout(self.supervise_timeout, self.runner.run(script, payload))
            .await
        {
            Ok(outcome) => outcome.map(|out| out.result),
            Err(_) => {
                tracing::error!(
                    error.kind = "validation.supervise_timeout",
                    timeout_ms = self.supervise_timeout.as_millis() as u64
                );
                Err(SandboxError::Timeout {
                    elapsed_ms: elapsed_ms(exec_started),
                })
            }
        }
    }

    pub fn snapshot(&self) -> ServiceSnapshot {
        let c = &self.counters;
        ServiceSnapshot {
            received: c.received.load(Ordering::Relaxed),
            allowed: c.allowed.load(Ordering::Relaxed),
            passed: c.passed.load(Ordering::Relaxed),
            failed: c.failed.load(Ordering::Relaxed),
            bad_input: c.bad_input.load(Ordering::Relaxed),
            timed_out: c.timed_out.load(Ordering::Relaxed),
            internal: c.internal.load(Ordering::Relaxed),
            admission: self.admission.snapshot(),
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::{SandboxCommand, SandboxExecutor, SandboxOutput};
    use async_trait::async_trait;
    use futures::future::join_all;
    use serde_json::{json, Value};
    use std::sync::atomic::AtomicUsize;

    /// Records concurrency and answers with a fixed object after a delay.
    struct FakeRunner {
        delay: Duration,
        reply: fn() -> Result<Value, SandboxError>,
        calls: AtomicUsize,
        running: AtomicUsize,
        max_running: AtomicUsize,
    }

    impl FakeRunner {
        fn new(delay: Duration, reply: fn() -> Result<Value, SandboxError>) -> Arc<Self> {
            Arc::new(Self {
                delay,
                reply,
                calls: AtomicUsize::new(0),
                running: AtomicUsize::new(0),
                max_running: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ScriptRunner for FakeRunner {
        async fn run(&self, _script: &str, _payload: Value) -> Result<SandboxOutput, SandboxError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_running.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.running.fetch_sub(1, Ordering::SeqCst);
            match (self.reply)()? {
                Value::Object(result) => Ok(SandboxOutput {
                    result,
                    duration_ms: self.delay.as_millis() as u64,
                }),
                other => Err(SandboxError::Protocol(format!("fake reply {other}"))),
            }
        }
    }

    fn passing() -> Result<Value, SandboxError> {
        Ok(json!({"ok": true, "score": 0.9}))
    }

    fn request(script: Option<&str>) -> ValidationRequest {
        ValidationRequest {
            package_name: "left-pad".into(),
            version: "1.0.0".into(),
            requester_identity: "alice".into(),
            requester_groups: vec![],
            script: script.map(str::to_string),
            metadata: None,
        }
    }

    fn service(capacity: usize, runner: Arc<FakeRunner>, supervise: Duration) -> ValidationService {
        ValidationService::new(Admission::new(capacity), runner, supervise)
    }

    #[tokio::test]
    async fn no_script_is_allowed_without_running() {
        let runner = FakeRunner::new(Duration::ZERO, passing);
        let svc = service(1, runner.clone(), Duration::from_secs(1));
        let r = svc.validate(request(None)).await;
        assert!(r.ok);
        assert_eq!(r.status, Verdict::Allowed);
        assert_eq!(runner.calls.load(Ordering::SeqCst), 0);
        assert_eq!(svc.snapshot().allowed, 1);
    }

    #[tokio::test]
    async fn admission_bounds_concurrent_executions() {
        let runner = FakeRunner::new(Duration::from_millis(80), passing);
        let svc = Arc::new(service(2, runner.clone(), Duration::from_secs(5)));

        let results = join_all((0..3).map(|_| {
            let svc = Arc::clone(&svc);
            async move { svc.validate(request(Some("result = {}"))).await }
        }))
        .await;

        assert!(results.iter().all(|r| r.status == Verdict::Passed));
        assert_eq!(runner.calls.load(Ordering::SeqCst), 3);
        assert_eq!(runner.max_running.load(Ordering::SeqCst), 2);
        let snap = svc.snapshot();
        assert_eq!(snap.admission.peak_in_flight, 2);
        assert_eq!(snap.admission.in_flight, 0);
        assert_eq!(snap.passed, 3);
    }

    #[tokio::test]
    async fn runner_errors_map_to_codes() {
        fn too_big() -> Result<Value, SandboxError> {
            Err(SandboxError::ScriptTooLarge { size: 10, max: 1 })
        }
        fn crashed() -> Result<Value, SandboxError> {
            Err(SandboxError::ChildFailed {
                code: 3,
                diagnostic: "runtime error on line 1: division by zero".into(),
            })
        }

        let svc = service(1, FakeRunner::new(Duration::ZERO, too_big), Duration::from_secs(1));
        let r = svc.validate(request(Some("x"))).await;
        assert!(!r.ok);
        assert_eq!(r.error_code(), Some(ErrorCode::BadInput));

        let svc = service(1, FakeRunner::new(Duration::ZERO, crashed), Duration::from_secs(1));
        let r = svc.validate(request(Some("x"))).await;
        assert_eq!(r.status, Verdict::Error);
        assert_eq!(r.error_code(), Some(ErrorCode::Internal));
        assert!(r.error.unwrap().message.contains("division by zero"));
        assert_eq!(svc.snapshot().internal, 1);
    }

    #[tokio::test]
    async fn supervision_timeout_reports_timeout() {
        let runner = FakeRunner::new(Duration::from_secs(5), passing);
        let svc = service(1, runner, Duration::from_millis(50));
        let started = Instant::now();
        let r = svc.validate(request(Some("result = {}"))).await;
        assert_eq!(r.error_code(), Some(ErrorCode::Timeout));
        assert!(started.elapsed() < Duration::from_secs(2));
        assert_eq!(svc.snapshot().admission.in_flight, 0);
    }

    #[tokio::test]
    async fn failed_verdict_keeps_raw_result() {
        fn failing() -> Result<Value, SandboxError> {
            Ok(json!({"ok": false, "issues": ["unmaintained"]}))
        }
        let svc = service(1, FakeRunner::new(Duration::ZERO, failing), Duration::from_secs(1));
        let r = svc.validate(request(Some("result = {}"))).await;
        assert_eq!(r.status, Verdict::Failed);
        assert_eq!(r.issues, Some(vec![json!("unmaintained")]));
        assert_eq!(r.result.unwrap().get("score"), Some(&Value::Null));
    }

    #[tokio::test]
    async fn oversized_request_is_rejected_without_waiting_for_capacity() {
        let mut cfg = SandboxConfig::default();
        cfg.max_concurrency = 1;
        cfg.max_script_bytes = 200;
        let executor = Arc::new(SandboxExecutor::new(
            cfg.clone(),
            SandboxCommand::new("/nonexistent/trustd-sandbox", Vec::new()),
        ));
        let svc = ValidationService::from_config(&cfg, executor.clone());
        let _busy = svc.admission().acquire().await.unwrap();

        let oversized = "x = 1\n".repeat(100);
        let r = tokio::time::timeout(
            Duration::from_millis(200),
            svc.validate(request(Some(&oversized))),
        )
        .await
        .expect("oversized request must not queue");
        assert_eq!(r.error_code(), Some(ErrorCode::BadInput));
        assert_eq!(svc.snapshot().bad_input, 1);
        assert_eq!(executor.stats().spawned, 0);

        let queued = tokio::time::timeout(
            Duration::from_millis(50),
            svc.validate(request(Some("result = {}"))),
        )
        .await;
        assert!(queued.is_err(), "well-formed request waits for the slot");
    }
}
