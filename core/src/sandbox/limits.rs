//! OS resource ceilings for the sandbox child.
//!
//! `apply` runs in a `pre_exec` hook, between fork and exec, so
//! implementations must stay async-signal-safe: no allocation, no locks and
//! no logging.

use std::io;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// Address space ceiling in MiB.
    pub heap_mb: u64,
    /// CPU time ceiling in seconds. The hard limit sits one second above.
    pub cpu_s: u64,
}

impl ResourceLimits {
    pub fn heap_bytes(&self) -> u64 {
        self.heap_mb.saturating_mul(1024 * 1024)
    }
}

pub trait ResourceLimiter: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    /// False when this platform cannot enforce ceilings.
    fn is_supported(&self) -> bool;

    /// Applies the ceilings to the calling process. Limits are only ever
    /// lowered; an existing lower hard limit wins.
    fn apply(&self, limits: &ResourceLimits) -> io::Result<()>;
}

#[cfg(unix)]
#[derive(Debug, Default, Clone, Copy)]
pub struct RlimitLimiter;

#[cfg(unix)]
impl RlimitLimiter {
    fn lower(resource: RlimitResource, soft: u64, hard: u64) -> io::Result<()> {
        let mut current = libc::rlimit {
            rlim_cur: 0,
            rlim_max: 0,
        };
        // SAFETY: `current` is a valid, writable rlimit for the duration of the call.
        if unsafe { libc::getrlimit(resource, &mut current) } != 0 {
            return Err(io::Error::last_os_error());
        }
        let hard = (hard as libc::rlim_t).min(current.rlim_max);
        let soft = (soft as libc::rlim_t).min(hard);
        let wanted = libc::rlimit {
            rlim_cur: soft,
            rlim_max: hard,
        };
        // SAFETY: `wanted` is a valid rlimit and setrlimit only reads it.
        if unsafe { libc::setrlimit(resource, &wanted) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

#[cfg(all(unix, target_os = "linux", target_env = "gnu"))]
type RlimitResource = libc::__rlimit_resource_t;
#[cfg(all(unix, not(all(target_os = "linux", target_env = "gnu"))))]
type RlimitResource = libc::c_int;

#[cfg(unix)]
impl ResourceLimiter for RlimitLimiter {
    fn name(&self) -> &'static str {
        "setrlimit"
    }

    fn is_supported(&self) -> bool {
        true
    }

    fn apply(&self, limits: &ResourceLimits) -> io::Result<()> {
        let heap = limits.heap_bytes();
        Self::lower(libc::RLIMIT_AS, heap, heap)?;
        Self::lower(
            libc::RLIMIT_CPU,
            limits.cpu_s,
            limits.cpu_s.saturating_add(1),
        )?;
        Self::lower(libc::RLIMIT_CORE, 0, 0)?;
        Ok(())
    }
}

/// Stand-in for platforms without `setrlimit`. Only the parent's wall-clock
/// kill bounds the child there.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedLimiter;

impl ResourceLimiter for UnsupportedLimiter {
    fn name(&self) -> &'static str {
        "unsupported"
    }

    fn is_supported(&self) -> bool {
        false
    }

    fn apply(&self, _limits: &ResourceLimits) -> io::Result<()> {
        Ok(())
    }
}

pub fn platform_limiter() -> Arc<dyn ResourceLimiter> {
    #[cfg(unix)]
    {
        Arc::new(RlimitLimiter)
    }
    #[cfg(not(unix))]
    {
        Arc::new(UnsupportedLimiter)
    }
}
