use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(name = "trustd", version, about = "Package trust scoring with sandboxed validation scripts")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file. Defaults to `trustd.toml` in the working directory when present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ServeArgs {
    #[arg(long)]
    pub host: Option<String>,

    #[arg(long)]
    pub port: Option<u16>,

    /// Session id reported by `/health`. Generated when omitted.
    #[arg(long)]
    pub session_id: Option<String>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ValidateArgs {
    /// JSON validation request; `-` reads stdin.
    #[arg(long, default_value = "-")]
    pub request: String,

    #[arg(long, default_value_t = false)]
    pub pretty: bool,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ScoreArgs {
    /// JSON package metadata; `-` reads stdin.
    #[arg(long, default_value = "-")]
    pub metadata: String,

    #[arg(long, default_value_t = false)]
    pub pretty: bool,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ConfigArgs {
    /// Output format: toml or json
    #[arg(long, default_value = "toml")]
    pub format: String,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the HTTP validation service.
    Serve(ServeArgs),
    /// Run one validation request locally and print the result.
    Validate(ValidateArgs),
    /// Compute the net trust score for one package.
    Score(ScoreArgs),
    /// Print the effective configuration.
    Config(ConfigArgs),
    /// Sandbox child entry point. Reads one request on stdin.
    #[command(hide = true)]
    SandboxChild,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_serve_overrides() {
        let args = Args::parse_from(["trustd", "serve", "--port", "9000", "--config", "x.toml"]);
        match args.command {
            Commands::Serve(s) => {
                assert_eq!(s.port, Some(9000));
                assert_eq!(s.host, None);
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(args.config, Some(PathBuf::from("x.toml")));
    }

    #[test]
    fn score_reads_stdin_by_default() {
        let args = Args::parse_from(["trustd", "score"]);
        assert!(matches!(args.command, Commands::Score(ScoreArgs { ref metadata, .. }) if metadata == "-"));
    }

    #[test]
    fn sandbox_child_takes_no_arguments() {
        let args = Args::parse_from(["trustd", "sandbox-child"]);
        assert!(matches!(args.command, Commands::SandboxChild));
        assert!(Args::try_parse_from(["trustd", "sandbox-child", "--port", "1"]).is_err());
    }
}
