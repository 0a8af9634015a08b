use clap::Parser;
use trustd_core::api as core_api;
use trustd_core::sandbox::{child::run_child, platform_limiter};

mod commands;
mod http;
mod logging;

use commands::cli;

fn main() -> anyhow::Result<()> {
    let args = cli::Args::parse();

    // The child runs under a tight address-space ceiling: no runtime, no logging.
    if matches!(args.command, cli::Commands::SandboxChild) {
        let limiter = platform_limiter();
        let code = run_child(
            std::io::stdin().lock(),
            std::io::stdout().lock(),
            std::io::stderr().lock(),
            limiter.as_ref(),
        );
        std::process::exit(code);
    }

    let cfg = core_api::load_from(args.config.as_deref())?;
    let code = {
        let _log_guard = logging::init(&cfg.logging)?;
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        runtime.block_on(dispatch(args.command, cfg))?
    };
    std::process::exit(code);
}

async fn dispatch(cmd: cli::Commands, cfg: core_api::AppConfig) -> anyhow::Result<i32> {
    match cmd {
        cli::Commands::Serve(serve_args) => {
            let ctx = core_api::AppContext::new(cfg)?;
            commands::serve::handle_serve(serve_args, ctx).await
        }
        cli::Commands::Validate(validate_args) => {
            let ctx = core_api::AppContext::new(cfg)?;
            commands::validate::handle_validate(validate_args, &ctx).await
        }
        cli::Commands::Score(score_args) => commands::score::handle_score(score_args, &cfg),
        cli::Commands::Config(config_args) => commands::config::handle_config(config_args, &cfg),
        cli::Commands::SandboxChild => Ok(0),
    }
}
