mod config_error;
mod sandbox_error;

pub use config_error::ConfigError;
pub use sandbox_error::{ErrorCode, SandboxError};
