// src/config/loader.rs

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::cli::CliArgs;
use crate::config::model::{EngineConfig, EnvPair, RawConfigFile, upsert_env_pair};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw
/// `RawConfigFile`.
///
/// This only performs TOML deserialization; CLI layering and validation
/// happen in [`resolve`].
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Build the engine configuration from the CLI, optionally layered over a
/// config file.
///
/// - Scalar flags given on the command line override the file.
/// - A non-empty CLI command replaces the file's `cmd`.
/// - CLI `--env` pairs come after the file's pairs; a pair whose key
///   template equals an earlier one replaces that value in place.
pub fn resolve(args: &CliArgs) -> Result<EngineConfig> {
    let mut raw = match args.config.as_deref() {
        Some(path) => {
            debug!(path, "loading config file");
            load_from_path(path)?
        }
        None => RawConfigFile::default(),
    };
    overlay_cli(&mut raw, args);

    let mut cfg = EngineConfig::try_from(raw)?;
    for (key, value) in &args.env {
        upsert_env_pair(&mut cfg.env, EnvPair::new(key.clone(), value.clone()));
    }
    Ok(cfg)
}

fn overlay_cli(raw: &mut RawConfigFile, args: &CliArgs) {
    if args.parallelism.is_some() {
        raw.parallelism = args.parallelism;
    }
    if args.debug {
        raw.debug = Some(true);
    }
    if args.strict {
        raw.strict = Some(true);
    }
    if args.dir.is_some() {
        raw.dir = args.dir.clone();
    }
    if args.stdin.is_some() {
        raw.stdin = args.stdin.clone();
    }
    if !args.cmd.is_empty() {
        raw.cmd = args.cmd.clone();
    }
}
