// src/cli.rs

//! CLI argument parsing using `clap`.

use std::sync::LazyLock;

use clap::{Parser, ValueEnum};
use regex::Regex;

static ENV_PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([^=]+)=(.+)$").expect("static env pair pattern is valid")
});

/// Command-line arguments for `jpar`.
///
/// Everything from the first positional argument onwards is the command
/// template, so flags meant for the command itself do not need escaping:
///
/// ```text
/// jpar -p 4 -e 'NAME={{name}}' grep -c '{{pattern}}' '{{file}}'
/// ```
#[derive(Debug, Clone, Parser)]
#[command(
    name = "jpar",
    version,
    about = "Run a templated command for every JSON value read from stdin.",
    long_about = None
)]
pub struct CliArgs {
    /// Number of commands to run concurrently (default 8).
    #[arg(short, long, value_name = "N")]
    pub parallelism: Option<usize>,

    /// Include the input value, stdin payload and worker id in each record.
    #[arg(short, long)]
    pub debug: bool,

    /// Template for the working directory. Empty means inherit.
    #[arg(long, value_name = "TEMPLATE")]
    pub dir: Option<String>,

    /// Environment variable template pair, `KEY=VALUE`. Repeatable.
    ///
    /// When any pair is given the command sees only these variables.
    #[arg(short, long = "env", value_name = "KEY=VALUE", value_parser = parse_env_pair)]
    pub env: Vec<(String, String)>,

    /// Template for the bytes written to the command's stdin.
    ///
    /// Default: `{{stdout}}`.
    #[arg(short = 'i', long, value_name = "TEMPLATE")]
    pub stdin: Option<String>,

    /// Treat fields missing from the input value as render errors.
    #[arg(long)]
    pub strict: bool,

    /// Optional TOML file providing defaults for the options above.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `JPAR_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Validate the configuration and print the compiled plan, run nothing.
    #[arg(long)]
    pub dry_run: bool,

    /// Command template: program followed by its arguments.
    #[arg(
        value_name = "CMD",
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub cmd: Vec<String>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

/// Split a `KEY=VALUE` flag into its key and value templates.
pub fn parse_env_pair(raw: &str) -> Result<(String, String), String> {
    match ENV_PAIR.captures(raw) {
        Some(caps) => Ok((caps[1].to_string(), caps[2].to_string())),
        None => Err(format!(
            "environment variables must have the format var=value and not: {raw}"
        )),
    }
}
