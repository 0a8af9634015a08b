use std::process::ExitStatus;

/// How the sandbox child ended, as far as the parent can tell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildExit {
    Code(i32),
    /// Killed by the CPU ceiling.
    CpuExhausted,
    Signal(i32),
}

impl ChildExit {
    pub fn from_status(status: ExitStatus) -> Self {
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(code) = status.code() {
                ChildExit::Code(code)
            } else if let Some(sig) = status.signal() {
                if sig == libc::SIGXCPU {
                    ChildExit::CpuExhausted
                } else {
                    ChildExit::Signal(sig)
                }
            } else {
                ChildExit::Code(1)
            }
        }
        #[cfg(not(unix))]
        {
            ChildExit::Code(status.code().unwrap_or(1))
        }
    }

    /// Shell-style exit code: signals map to 128 + signo.
    pub fn normalized(&self) -> i32 {
        match self {
            ChildExit::Code(code) => *code,
            #[cfg(unix)]
            ChildExit::CpuExhausted => 128 + libc::SIGXCPU,
            #[cfg(not(unix))]
            ChildExit::CpuExhausted => 1,
            ChildExit::Signal(sig) => 128 + sig,
        }
    }
}
