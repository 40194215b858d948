#![allow(dead_code)]

use jpar::config::{EngineConfig, EnvPair};
use jpar::template::TemplateSet;

/// Builder for `EngineConfig` to simplify test setup.
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    pub fn new(cmd: &[&str]) -> Self {
        Self {
            config: EngineConfig {
                cmd: cmd.iter().map(|s| s.to_string()).collect(),
                ..EngineConfig::default()
            },
        }
    }

    pub fn parallelism(mut self, n: usize) -> Self {
        self.config.parallelism = n;
        self
    }

    pub fn debug(mut self, val: bool) -> Self {
        self.config.debug = val;
        self
    }

    pub fn strict(mut self, val: bool) -> Self {
        self.config.strict = val;
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.config.env.push(EnvPair::new(key, value));
        self
    }

    pub fn dir(mut self, dir: &str) -> Self {
        self.config.dir = dir.to_string();
        self
    }

    pub fn stdin(mut self, template: &str) -> Self {
        self.config.stdin = template.to_string();
        self
    }

    pub fn build(self) -> EngineConfig {
        self.config
    }

    /// The config together with its compiled templates.
    pub fn compile(self) -> (EngineConfig, TemplateSet) {
        let templates =
            TemplateSet::compile(&self.config).expect("Failed to compile templates from builder");
        (self.config, templates)
    }
}
