// src/job/builder.rs

//! Render a concrete invocation from one input value.
//!
//! Building is a pure function of the template set and the input: nothing
//! shared is mutated, and the returned record is fresh. Any error recorded
//! here marks the job as failed, which makes the executor skip it.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::debug;

use crate::job::JobRun;
use crate::template::{Slot, TemplateSet};

/// Build a not-yet-executed [`JobRun`] for `input`.
///
/// - argv: one rendered token per command template (zero tokens is allowed;
///   lookup fails later).
/// - env: rendered pair by pair, in order. The first rendered key seen twice
///   records `parameter <key> is duplicate` and stops adding pairs. A pair
///   whose key fails to render is left out.
/// - dir / stdin: rendered as-is.
///
/// A template that fails to render records `cannot render <field>: <cause>`
/// and leaves that field empty.
pub fn build_job_run(templates: &TemplateSet, input: &Value) -> JobRun {
    let mut errors = Vec::new();

    let cmd: Vec<String> = (0..templates.cmd_len())
        .map(|i| render_slot(templates, Slot::Cmd(i), input, &mut errors))
        .collect();

    let env = if templates.has_env() {
        let mut env = BTreeMap::new();
        for i in 0..templates.env_len() {
            let before = errors.len();
            let key = render_slot(templates, Slot::EnvKey(i), input, &mut errors);
            let key_failed = errors.len() > before;
            let value = render_slot(templates, Slot::EnvValue(i), input, &mut errors);
            // An unrenderable key is already an error; it never enters the map.
            if key_failed {
                continue;
            }
            if env.contains_key(&key) {
                errors.push(format!("parameter {key} is duplicate"));
                break;
            }
            env.insert(key, value);
        }
        Some(env)
    } else {
        None
    };

    let dir = render_slot(templates, Slot::Dir, input, &mut errors);
    let stdin = render_slot(templates, Slot::Stdin, input, &mut errors);

    let mut run = JobRun::new(cmd, Some(input.clone()));
    run.env = env;
    run.dir = dir;
    run.stdin = stdin;
    run.errors = errors;
    run.settle();

    if run.has_failed() {
        debug!(cmd = ?run.cmd, errors = ?run.errors, "job failed to build");
    }

    run
}

fn render_slot(templates: &TemplateSet, slot: Slot, input: &Value, errors: &mut Vec<String>) -> String {
    templates.render(slot, input).unwrap_or_else(|cause| {
        errors.push(format!("cannot render {slot}: {cause}"));
        String::new()
    })
}
