use std::sync::Arc;

use crate::config::AppConfig;
use crate::errors::SandboxError;
use crate::sandbox::{SandboxCommand, SandboxExecutor, ScriptRunner};
use crate::validation::ValidationService;

/// Process-wide wiring: one executor, one validation service, one config.
#[derive(Clone)]
pub struct AppContext {
    cfg: AppConfig,
    executor: Arc<SandboxExecutor>,
    validation: Arc<ValidationService>,
}

impl AppContext {
    pub fn new(cfg: AppConfig) -> Result<Self, SandboxError> {
        let command = SandboxCommand::from_config(&cfg.sandbox)?;
        Ok(Self::with_command(cfg, command))
    }

    pub fn with_command(cfg: AppConfig, command: SandboxCommand) -> Self {
        let executor = Arc::new(SandboxExecutor::new(cfg.sandbox.clone(), command));
        let runner: Arc<dyn ScriptRunner> = executor.clone();
        let validation = Arc::new(ValidationService::from_config(&cfg.sandbox, runner));
        tracing::debug!(
            program = %executor_program(&executor),
            capacity = cfg.sandbox.max_concurrency,
            "app context ready"
        );
        Self {
            cfg,
            executor,
            validation,
        }
    }

    pub fn cfg(&self) -> &AppConfig {
        &self.cfg
    }

    pub fn executor(&self) -> Arc<SandboxExecutor> {
        self.executor.clone()
    }

    pub fn validation(&self) -> Arc<ValidationService> {
        self.validation.clone()
    }
}

fn executor_program(executor: &SandboxExecutor) -> String {
    executor.command().program.display().to_string()
}
