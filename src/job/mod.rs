// src/job/mod.rs

//! The per-job result record and how it is built.
//!
//! - [`JobRun`] is the durable record written to stdout, one per input value.
//! - [`builder`] renders a [`JobRun`] from an input value and the compiled
//!   [`TemplateSet`](crate::template::TemplateSet).
//!
//! A record is created by the builder, filled in by an
//! [`JobExecutor`](crate::exec::JobExecutor), and never touched again once it
//! reaches the result sink.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::Outcome;

pub mod builder;

pub use builder::build_job_run;

/// Result record for one job, covering both build and execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRun {
    /// Rendered argv, including the program token.
    pub cmd: Vec<String>,

    /// Absolute program path, set once lookup succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prog: Option<String>,

    /// Rendered environment; `None` means the child inherits ours.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<BTreeMap<String, String>>,

    /// Rendered working directory; empty means inherit.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub dir: String,

    /// The input value this job was built from (debug output only).
    #[serde(rename = "e", default, skip_serializing_if = "Option::is_none")]
    pub expansions: Option<Value>,

    /// Exit status; `None` until a process actually ran to completion.
    #[serde(default)]
    pub returncode: Option<i32>,

    /// Rendered stdin payload (debug output only).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub stdin: String,

    #[serde(default)]
    pub stdout: String,

    #[serde(default)]
    pub stderr: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,

    pub outcome: Outcome,

    #[serde(rename = "worker-id", default, skip_serializing_if = "Option::is_none")]
    pub worker_id: Option<usize>,
}

impl JobRun {
    /// A not-yet-executed record.
    pub fn new(cmd: Vec<String>, expansions: Option<Value>) -> Self {
        Self {
            cmd,
            prog: None,
            env: None,
            dir: String::new(),
            expansions,
            returncode: None,
            stdin: String::new(),
            stdout: String::new(),
            stderr: String::new(),
            errors: Vec::new(),
            outcome: Outcome::Failure,
            worker_id: None,
        }
    }

    /// The synthetic record emitted for input that could not be decoded.
    pub fn parse_failure(message: &str) -> Self {
        let mut run = Self::new(Vec::new(), None);
        run.fail(format!("parse error: {message}"));
        run
    }

    /// Record an error; the outcome follows.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
        self.outcome = Outcome::Failure;
    }

    /// Recompute the outcome from the error list.
    pub fn settle(&mut self) {
        self.outcome = Outcome::from_errors(&self.errors);
    }

    pub fn has_failed(&self) -> bool {
        self.outcome == Outcome::Failure
    }

    /// Drop the fields that only appear in debug output.
    pub fn redact_debug_fields(&mut self) {
        self.expansions = None;
        self.stdin.clear();
        self.worker_id = None;
    }
}
