// src/config/validate.rs

use crate::config::model::{
    DEFAULT_PARALLELISM, DEFAULT_STDIN_TEMPLATE, EngineConfig, EnvPair, RawConfigFile,
    upsert_env_pair,
};
use crate::errors::{JparError, Result};

impl TryFrom<RawConfigFile> for EngineConfig {
    type Error = JparError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let mut env = Vec::with_capacity(raw.env.len());
        for (key, value) in raw.env {
            upsert_env_pair(&mut env, EnvPair::new(key, value));
        }

        let config = EngineConfig {
            parallelism: raw.parallelism.unwrap_or(DEFAULT_PARALLELISM),
            debug: raw.debug.unwrap_or(false),
            strict: raw.strict.unwrap_or(false),
            cmd: raw.cmd,
            env,
            dir: raw.dir.unwrap_or_default(),
            stdin: raw
                .stdin
                .unwrap_or_else(|| DEFAULT_STDIN_TEMPLATE.to_string()),
        };

        validate_config(&config)?;
        Ok(config)
    }
}

/// Startup checks that must hold before any job is processed.
pub fn validate_config(cfg: &EngineConfig) -> Result<()> {
    if cfg.parallelism < 1 {
        return Err(JparError::ConfigError(
            "at least one worker required".to_string(),
        ));
    }
    Ok(())
}
