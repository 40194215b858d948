// src/errors.rs

//! Crate-wide error aliases and helpers.
//!
//! These errors are for failures of the engine itself (bad configuration,
//! broken output stream, shutdown protocol violations). Failures of a single
//! job never use them; they are recorded as text inside that job's
//! [`JobRun`](crate::job::JobRun).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum JparError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Template error in {field}: {message}")]
    TemplateError { field: String, message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("cannot serialize job record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Shutdown protocol error: {0}")]
    Shutdown(String),
}

pub type Result<T> = std::result::Result<T, JparError>;
