// src/template.rs

//! Compiled templates for one engine run.
//!
//! Every template a job needs (command tokens, environment pairs, working
//! directory, stdin payload) is compiled once into a single handlebars
//! registry before the pool starts. Workers only ever render, so the set is
//! shared behind an `Arc` without locking.
//!
//! Rendering is mustache-compatible: `{{field}}`, `{{nested.field}}`, no
//! HTML escaping. In lenient mode a missing field renders as empty text; in
//! strict mode it is a render error.

use std::fmt;

use handlebars::{Handlebars, no_escape};
use serde_json::Value;

use crate::config::EngineConfig;
use crate::errors::{JparError, Result};

/// Which template of the set to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Cmd(usize),
    EnvKey(usize),
    EnvValue(usize),
    Dir,
    Stdin,
}

impl Slot {
    fn registry_name(self) -> String {
        match self {
            Slot::Cmd(i) => format!("cmd.{i}"),
            Slot::EnvKey(i) => format!("env.{i}.key"),
            Slot::EnvValue(i) => format!("env.{i}.value"),
            Slot::Dir => "dir".to_string(),
            Slot::Stdin => "stdin".to_string(),
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Cmd(i) => write!(f, "cmd[{i}]"),
            Slot::EnvKey(_) => f.write_str("env key"),
            Slot::EnvValue(_) => f.write_str("env value"),
            Slot::Dir => f.write_str("dir"),
            Slot::Stdin => f.write_str("stdin"),
        }
    }
}

/// Immutable, pre-compiled templates for building jobs.
#[derive(Debug)]
pub struct TemplateSet {
    registry: Handlebars<'static>,
    cmd: Vec<String>,
    env: Vec<(String, String)>,
    dir: String,
    stdin: String,
}

impl TemplateSet {
    /// Compile every template named by the configuration.
    ///
    /// A template that does not parse is a fatal configuration error naming
    /// the offending field.
    pub fn compile(cfg: &EngineConfig) -> Result<Self> {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(no_escape);
        registry.set_strict_mode(cfg.strict);

        let mut sources: Vec<(Slot, &str)> = Vec::new();
        for (i, tok) in cfg.cmd.iter().enumerate() {
            sources.push((Slot::Cmd(i), tok.as_str()));
        }
        for (i, pair) in cfg.env.iter().enumerate() {
            sources.push((Slot::EnvKey(i), pair.key.as_str()));
            sources.push((Slot::EnvValue(i), pair.value.as_str()));
        }
        sources.push((Slot::Dir, cfg.dir.as_str()));
        sources.push((Slot::Stdin, cfg.stdin.as_str()));

        for (slot, source) in sources {
            registry
                .register_template_string(&slot.registry_name(), source)
                .map_err(|e| JparError::TemplateError {
                    field: slot.to_string(),
                    message: e.to_string(),
                })?;
        }

        Ok(Self {
            registry,
            cmd: cfg.cmd.clone(),
            env: cfg
                .env
                .iter()
                .map(|p| (p.key.clone(), p.value.clone()))
                .collect(),
            dir: cfg.dir.clone(),
            stdin: cfg.stdin.clone(),
        })
    }

    /// Render one template against an input value.
    pub fn render(&self, slot: Slot, context: &Value) -> std::result::Result<String, String> {
        self.registry
            .render(&slot.registry_name(), context)
            .map_err(|e| e.to_string())
    }

    /// Number of command-token templates.
    pub fn cmd_len(&self) -> usize {
        self.cmd.len()
    }

    /// Number of environment pairs; zero means the child inherits the
    /// caller's environment.
    pub fn env_len(&self) -> usize {
        self.env.len()
    }

    pub fn has_env(&self) -> bool {
        !self.env.is_empty()
    }

    /// Whether missing fields are render errors.
    pub fn is_strict(&self) -> bool {
        self.registry.strict_mode()
    }

    /// Template sources, for `--dry-run` output.
    pub fn cmd_sources(&self) -> &[String] {
        &self.cmd
    }

    pub fn env_sources(&self) -> &[(String, String)] {
        &self.env
    }

    pub fn dir_source(&self) -> &str {
        &self.dir
    }

    pub fn stdin_source(&self) -> &str {
        &self.stdin
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::config::EnvPair;

    fn render(template: &str, context: &Value, strict: bool) -> Result<String> {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(no_escape);
        registry.set_strict_mode(strict);
        registry
            .render_template(template, context)
            .map_err(|e| JparError::TemplateError {
                field: "template".to_string(),
                message: e.to_string(),
            })
    }

    fn config(cmd: &[&str]) -> EngineConfig {
        EngineConfig {
            cmd: cmd.iter().map(|s| s.to_string()).collect(),
            ..EngineConfig::default()
        }
    }

    #[test]
    fn missing_field_renders_empty_when_lenient() {
        let out = render("{{m}}{{p}}", &json!({"m": "mv"}), false).unwrap();
        assert_eq!(out, "mv");
    }

    #[test]
    fn missing_field_is_an_error_when_strict() {
        assert!(render("{{p}}", &json!({"m": "mv"}), true).is_err());
    }

    #[test]
    fn no_html_escaping() {
        let out = render("{{q}}", &json!({"q": "a<b & 'c'"}), false).unwrap();
        assert_eq!(out, "a<b & 'c'");
    }

    #[test]
    fn numbers_and_nested_fields_render() {
        let ctx = json!({"x": 1, "job": {"name": "build"}});
        assert_eq!(render("{{x}}-{{job.name}}", &ctx, false).unwrap(), "1-build");
    }

    #[test]
    fn compile_registers_every_slot() {
        let mut cfg = config(&["echo", "{{x}}"]);
        cfg.env = vec![EnvPair::new("K_{{x}}", "{{y}}")];
        cfg.dir = "/tmp/{{x}}".to_string();

        let set = TemplateSet::compile(&cfg).unwrap();
        let ctx = json!({"x": 7, "y": "why", "stdout": "piped"});

        assert_eq!(set.cmd_len(), 2);
        assert_eq!(set.render(Slot::Cmd(1), &ctx).unwrap(), "7");
        assert_eq!(set.render(Slot::EnvKey(0), &ctx).unwrap(), "K_7");
        assert_eq!(set.render(Slot::EnvValue(0), &ctx).unwrap(), "why");
        assert_eq!(set.render(Slot::Dir, &ctx).unwrap(), "/tmp/7");
        assert_eq!(set.render(Slot::Stdin, &ctx).unwrap(), "piped");
    }

    #[test]
    fn compile_rejects_unparsable_template() {
        let cfg = config(&["echo", "{{unclosed"]);
        match TemplateSet::compile(&cfg) {
            Err(JparError::TemplateError { field, .. }) => assert_eq!(field, "cmd[1]"),
            other => panic!("expected TemplateError, got {other:?}"),
        }
    }
}
