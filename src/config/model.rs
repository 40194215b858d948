// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

/// Number of workers when neither the CLI nor the config file sets one.
pub const DEFAULT_PARALLELISM: usize = 8;

/// Default stdin template: echo the input's `stdout` field.
pub const DEFAULT_STDIN_TEMPLATE: &str = "{{stdout}}";

/// Configuration as read from an optional TOML file.
///
/// ```toml
/// parallelism = 4
/// debug = false
/// strict = false
/// dir = "/srv/{{project}}"
/// stdin = "{{body}}"
/// cmd = ["curl", "-s", "{{url}}"]
///
/// [env]
/// TOKEN = "{{token}}"
/// ```
///
/// Every key is optional; unset keys fall back to CLI flags and then to the
/// built-in defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub parallelism: Option<usize>,

    #[serde(default)]
    pub debug: Option<bool>,

    #[serde(default)]
    pub strict: Option<bool>,

    #[serde(default)]
    pub dir: Option<String>,

    #[serde(default)]
    pub stdin: Option<String>,

    /// Command template tokens.
    #[serde(default)]
    pub cmd: Vec<String>,

    /// Environment key template → value template.
    ///
    /// TOML tables carry no order we can rely on, so pairs from the file are
    /// evaluated in key order.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// One `KEY=VALUE` environment template pair, both sides unrendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvPair {
    pub key: String,
    pub value: String,
}

impl EnvPair {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Validated configuration consumed by the engine.
///
/// Construct it through [`crate::config::resolve`] or
/// `EngineConfig::try_from(RawConfigFile)`; both enforce the startup
/// invariants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Number of concurrent workers, at least 1.
    pub parallelism: usize,
    /// Emit debug-only fields (`e`, `stdin`, `worker-id`).
    pub debug: bool,
    /// Missing fields are render errors instead of empty text.
    pub strict: bool,
    pub cmd: Vec<String>,
    /// Ordered; later pairs never silently replace earlier ones at render time.
    pub env: Vec<EnvPair>,
    pub dir: String,
    pub stdin: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            parallelism: DEFAULT_PARALLELISM,
            debug: false,
            strict: false,
            cmd: Vec::new(),
            env: Vec::new(),
            dir: String::new(),
            stdin: DEFAULT_STDIN_TEMPLATE.to_string(),
        }
    }
}

/// Insert or replace a pair by its key *template* text, keeping the
/// position of the first occurrence.
pub(crate) fn upsert_env_pair(pairs: &mut Vec<EnvPair>, pair: EnvPair) {
    match pairs.iter_mut().find(|p| p.key == pair.key) {
        Some(existing) => existing.value = pair.value,
        None => pairs.push(pair),
    }
}
