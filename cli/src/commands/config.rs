use trustd_core::api as core_api;

use super::cli::ConfigArgs;

pub fn handle_config(args: ConfigArgs, cfg: &core_api::AppConfig) -> anyhow::Result<i32> {
    let out = match args.format.as_str() {
        "toml" => toml::to_string_pretty(cfg)?,
        "json" => serde_json::to_string_pretty(cfg)?,
        other => anyhow::bail!("unknown format `{other}` (expected toml or json)"),
    };
    println!("{out}");
    Ok(0)
}
