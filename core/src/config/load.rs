use std::path::Path;
use std::str::FromStr;

use crate::errors::ConfigError;

use super::types::AppConfig;

pub const DEFAULT_CONFIG_FILE: &str = "trustd.toml";

/// Loads `trustd.toml` from the working directory when present, then applies
/// `TRUSTD_*` environment overrides.
pub fn load_default() -> Result<AppConfig, ConfigError> {
    load_from(None)
}

/// Loads configuration once at startup. An explicit path must exist; the
/// default path is optional.
pub fn load_from(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut cfg = match path {
        Some(p) => {
            if !p.exists() {
                return Err(ConfigError::NotFound(p.display().to_string()));
            }
            read_file(p)?
        }
        None => {
            let p = Path::new(DEFAULT_CONFIG_FILE);
            if p.exists() {
                read_file(p)?
            } else {
                AppConfig::default()
            }
        }
    };

    apply_env_overrides(&mut cfg, |key| std::env::var(key).ok())?;
    cfg.validate()?;
    Ok(cfg)
}

fn read_file(path: &Path) -> Result<AppConfig, ConfigError> {
    let s = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    toml::from_str::<AppConfig>(&s).map_err(ConfigError::Parse)
}

/// Applies overrides from any key lookup. Blank values are ignored.
pub fn apply_env_overrides<F>(cfg: &mut AppConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let sb = &mut cfg.sandbox;
    override_parsed(&lookup, "TRUSTD_EXEC_TIMEOUT_MS", &mut sb.exec_timeout_ms)?;
    override_parsed(&lookup, "TRUSTD_HEAP_MB", &mut sb.heap_mb)?;
    override_parsed(&lookup, "TRUSTD_MAX_CONCURRENCY", &mut sb.max_concurrency)?;
    override_parsed(&lookup, "TRUSTD_MAX_SCRIPT_BYTES", &mut sb.max_script_bytes)?;
    override_parsed(&lookup, "TRUSTD_MAX_FILES", &mut sb.max_files)?;
    override_parsed(&lookup, "TRUSTD_MAX_PAYLOAD_BYTES", &mut sb.max_payload_bytes)?;
    if let Some(v) = non_blank(&lookup, "TRUSTD_SANDBOX_PROGRAM") {
        sb.program = Some(v);
    }

    let http = &mut cfg.http_server;
    if let Some(v) = non_blank(&lookup, "TRUSTD_HTTP_HOST") {
        http.host = v;
    }
    override_parsed(&lookup, "TRUSTD_HTTP_PORT", &mut http.port)?;

    if let Some(v) = non_blank(&lookup, "TRUSTD_LOG_DIR") {
        cfg.logging.dir = Some(v);
    }
    Ok(())
}

fn non_blank<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn override_parsed<F, T>(lookup: &F, key: &str, slot: &mut T) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(v) = non_blank(lookup, key) {
        *slot = v.parse::<T>().map_err(|_| ConfigError::EnvInvalid {
            key: key.to_string(),
            value: v.clone(),
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn env_overrides_sandbox_limits() {
        let mut cfg = AppConfig::default();
        let lookup = lookup_from(&[
            ("TRUSTD_EXEC_TIMEOUT_MS", "1500"),
            ("TRUSTD_HEAP_MB", "128"),
            ("TRUSTD_MAX_CONCURRENCY", "4"),
            ("TRUSTD_MAX_SCRIPT_BYTES", " 2048 "),
            ("TRUSTD_MAX_FILES", "10"),
            ("TRUSTD_MAX_PAYLOAD_BYTES", "4096"),
            ("TRUSTD_HTTP_PORT", ""),
        ]);
        apply_env_overrides(&mut cfg, lookup).unwrap();

        assert_eq!(cfg.sandbox.exec_timeout_ms, 1500);
        assert_eq!(cfg.sandbox.heap_mb, 128);
        assert_eq!(cfg.sandbox.max_concurrency, 4);
        assert_eq!(cfg.sandbox.max_script_bytes, 2048);
        assert_eq!(cfg.sandbox.max_files, 10);
        assert_eq!(cfg.sandbox.max_payload_bytes, 4096);
        assert_eq!(cfg.http_server.port, 8080);
    }

    #[test]
    fn unparsable_env_value_is_an_error() {
        let mut cfg = AppConfig::default();
        let err = apply_env_overrides(&mut cfg, lookup_from(&[("TRUSTD_HEAP_MB", "lots")]))
            .unwrap_err();
        match err {
            ConfigError::EnvInvalid { key, value } => {
                assert_eq!(key, "TRUSTD_HEAP_MB");
                assert_eq!(value, "lots");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn toml_file_is_merged_with_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[sandbox]\nexec_timeout_ms = 2500\nmax_concurrency = 3\n\n[http_server]\nport = 9090"
        )
        .unwrap();

        let cfg = load_from(Some(file.path())).unwrap();
        assert_eq!(cfg.sandbox.exec_timeout_ms, 2500);
        assert_eq!(cfg.sandbox.max_concurrency, 3);
        assert_eq!(cfg.sandbox.heap_mb, 256);
        assert_eq!(cfg.http_server.port, 9090);
        assert!(cfg.scoring.weights.contains_key("reviewedness"));
    }

    #[test]
    fn explicit_missing_file_is_not_found() {
        let err = load_from(Some(Path::new("/definitely/not/here/trustd.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }
}
