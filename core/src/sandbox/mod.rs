//! Process-isolated execution of untrusted scoring scripts.
//!
//! Every call spawns a fresh child (see [`child::run_child`]) with OS ceilings
//! applied before any script code runs, and a wall-clock kill in the parent.

pub mod child;
mod executor;
mod exit;
pub mod limits;
pub mod protocol;
pub mod script;

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::SandboxError;

pub use executor::{SandboxCommand, SandboxExecutor, SandboxOutput, StatsSnapshot};
pub use exit::ChildExit;
pub use limits::{platform_limiter, ResourceLimiter, ResourceLimits, UnsupportedLimiter};

/// Runs one script against one payload. Implemented by [`SandboxExecutor`];
/// the validation service only sees this seam.
#[async_trait]
pub trait ScriptRunner: Send + Sync {
    /// Size and shape guards that need no child. Callers run this before
    /// waiting for capacity so oversized requests are rejected at once.
    fn check_input(&self, _script: &str, _payload: &Value) -> Result<(), SandboxError> {
        Ok(())
    }

    async fn run(&self, script: &str, payload: Value) -> Result<SandboxOutput, SandboxError>;
}
