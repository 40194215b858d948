#![allow(dead_code)]

use std::error::Error;

use serde_json::Value;

use jpar::engine::{Engine, RunSummary};
use jpar::exec::ProcessExecutor;
use jpar_test_utils::builders::EngineConfigBuilder;
use jpar_test_utils::{init_tracing, run_engine, with_timeout};

pub type TestResult = Result<(), Box<dyn Error>>;

/// Run `input` through real child processes and return the decoded records.
pub async fn run_processes(
    builder: EngineConfigBuilder,
    input: &str,
) -> Result<(RunSummary, Vec<Value>), Box<dyn Error>> {
    init_tracing();
    let (config, templates) = builder.compile();
    let engine = Engine::new(config, templates, ProcessExecutor::new());
    Ok(with_timeout(run_engine(engine, input)).await?)
}

/// The only record of a single-job run.
pub fn single(lines: Vec<Value>) -> Value {
    assert_eq!(lines.len(), 1, "expected exactly one record, got {lines:?}");
    lines.into_iter().next().unwrap()
}
