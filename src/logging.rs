// src/logging.rs

//! Diagnostics for `jpar`, written to stderr with `tracing-subscriber`.
//!
//! Stdout is the NDJSON result stream that the next stage of a pipeline
//! parses, so no log line may ever reach it.
//!
//! The level comes from `--log-level`, else `JPAR_LOG`, else `info`. A
//! `JPAR_LOG` value that names no level is reported once logging is up and
//! otherwise ignored.

use anyhow::Result;
use tracing::{Level, warn};
use tracing_subscriber::fmt;

use crate::cli::LogLevel;

/// Environment variable consulted when `--log-level` is absent.
pub const LOG_ENV_VAR: &str = "JPAR_LOG";

/// Install the global subscriber. A second call returns an error.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env_value = std::env::var(LOG_ENV_VAR).ok();
    let (level, rejected) = resolve_level(cli_level, env_value.as_deref());

    fmt()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("cannot install log subscriber: {e}"))?;

    if let Some(value) = rejected {
        warn!(var = LOG_ENV_VAR, value, "unrecognised log level; using info");
    }
    Ok(())
}

/// Pick the level and return the env value too if it had to be ignored.
///
/// Kept apart from [`init_logging`] so it can be tested without touching
/// the process environment.
fn resolve_level(cli_level: Option<LogLevel>, env_value: Option<&str>) -> (Level, Option<&str>) {
    if let Some(lvl) = cli_level {
        return (level_from_log_level(lvl), None);
    }
    match env_value {
        None => (Level::INFO, None),
        Some(raw) => match parse_level_str(raw) {
            Some(level) => (level, None),
            None => (Level::INFO, Some(raw)),
        },
    }
}

fn level_from_log_level(lvl: LogLevel) -> Level {
    match lvl {
        LogLevel::Error => Level::ERROR,
        LogLevel::Warn => Level::WARN,
        LogLevel::Info => Level::INFO,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Trace => Level::TRACE,
    }
}

fn parse_level_str(s: &str) -> Option<Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(Level::ERROR),
        "warn" | "warning" => Some(Level::WARN),
        "info" => Some(Level::INFO),
        "debug" => Some(Level::DEBUG),
        "trace" => Some(Level::TRACE),
        _ => None,
    }
}
