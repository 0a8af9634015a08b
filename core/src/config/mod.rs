mod load;
mod types;

pub use load::{apply_env_overrides, load_default, load_from, DEFAULT_CONFIG_FILE};
pub use types::{AppConfig, HttpServerConfig, LoggingConfig, SandboxConfig, ScoringConfig};
