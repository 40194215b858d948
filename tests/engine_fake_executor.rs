// tests/engine_fake_executor.rs

mod common;
use crate::common::{TestResult, single};

use serde_json::{Value, json};

use jpar::engine::{Engine, ShutdownPhase};
use jpar::errors::JparError;
use jpar_test_utils::builders::EngineConfigBuilder;
use jpar_test_utils::fake_executor::FakeExecutor;
use jpar_test_utils::writers::BrokenPipeWriter;
use jpar_test_utils::{init_tracing, run_engine, with_timeout};

fn jobs(n: usize) -> String {
    (0..n).map(|i| json!({ "i": i }).to_string()).collect()
}

#[tokio::test]
async fn one_pill_and_ack_per_worker_and_sink_closes_last() -> TestResult {
    init_tracing();
    let (config, templates) = EngineConfigBuilder::new(&["work", "{{i}}"])
        .parallelism(3)
        .compile();
    let fake = FakeExecutor::new("ok\n");
    let executed = fake.executed();

    let engine = Engine::new(config, templates, fake);
    let (summary, lines) = with_timeout(run_engine(engine, &jobs(10))).await?;

    assert_eq!(summary.jobs_read, 10);
    assert_eq!(summary.results_written, 10);
    assert_eq!(summary.pills_sent, 3);
    assert_eq!(summary.acks_received, 3);
    assert_eq!(
        summary.phases,
        vec![
            ShutdownPhase::Running,
            ShutdownPhase::DrainingWorkers { acknowledged: 0 },
            ShutdownPhase::ClosingSink,
            ShutdownPhase::Finished,
        ]
    );

    assert_eq!(lines.len(), 10);
    assert_eq!(executed.lock().unwrap().len(), 10);
    Ok(())
}

#[tokio::test]
async fn every_input_produces_exactly_one_record() -> TestResult {
    init_tracing();
    let (config, templates) = EngineConfigBuilder::new(&["work", "{{i}}"])
        .parallelism(4)
        .compile();
    let engine = Engine::new(config, templates, FakeExecutor::new(""));

    let (_, lines) = with_timeout(run_engine(engine, &jobs(50))).await?;

    let mut seen: Vec<u64> = lines
        .iter()
        .map(|l| l["cmd"][1].as_str().unwrap().parse().unwrap())
        .collect();
    seen.sort_unstable();
    assert_eq!(seen, (0..50).collect::<Vec<u64>>());
    Ok(())
}

#[tokio::test]
async fn single_worker_keeps_input_order() -> TestResult {
    init_tracing();
    let (config, templates) = EngineConfigBuilder::new(&["work", "{{i}}"])
        .parallelism(1)
        .compile();
    let engine = Engine::new(config, templates, FakeExecutor::new(""));

    let (_, lines) = with_timeout(run_engine(engine, &jobs(5))).await?;

    let order: Vec<&str> = lines.iter().map(|l| l["cmd"][1].as_str().unwrap()).collect();
    assert_eq!(order, vec!["0", "1", "2", "3", "4"]);
    Ok(())
}

#[tokio::test]
async fn empty_input_still_runs_the_full_protocol() -> TestResult {
    init_tracing();
    let (config, templates) = EngineConfigBuilder::new(&["work"]).parallelism(2).compile();
    let engine = Engine::new(config, templates, FakeExecutor::new(""));

    let (summary, lines) = with_timeout(run_engine(engine, "")).await?;

    assert!(lines.is_empty());
    assert_eq!(summary.jobs_read, 0);
    assert_eq!(summary.pills_sent, 2);
    assert_eq!(summary.acks_received, 2);
    assert_eq!(summary.phases.last(), Some(&ShutdownPhase::Finished));
    Ok(())
}

#[tokio::test]
async fn debug_fields_only_with_debug_on() -> TestResult {
    init_tracing();
    let input = r#"{"i":"a"}"#;

    let (config, templates) = EngineConfigBuilder::new(&["work", "{{i}}"])
        .stdin("in={{i}}")
        .compile();
    let engine = Engine::new(config, templates, FakeExecutor::new(""));
    let (_, lines) = with_timeout(run_engine(engine, input)).await?;
    let plain = single(lines);
    assert!(plain.get("e").is_none());
    assert!(plain.get("stdin").is_none());
    assert!(plain.get("worker-id").is_none());

    let (config, templates) = EngineConfigBuilder::new(&["work", "{{i}}"])
        .stdin("in={{i}}")
        .debug(true)
        .parallelism(1)
        .compile();
    let engine = Engine::new(config, templates, FakeExecutor::new(""));
    let (_, lines) = with_timeout(run_engine(engine, input)).await?;
    let debug = single(lines);
    assert_eq!(debug["e"], json!({"i": "a"}));
    assert_eq!(debug["stdin"], json!("in=a"));
    assert_eq!(debug["worker-id"], json!(0));
    Ok(())
}

#[tokio::test]
async fn failed_builds_never_reach_the_executor() -> TestResult {
    init_tracing();
    let (config, templates) = EngineConfigBuilder::new(&["work", "{{missing}}"])
        .strict(true)
        .compile();
    let fake = FakeExecutor::new("");
    let executed = fake.executed();

    let engine = Engine::new(config, templates, fake);
    let (_, lines) = with_timeout(run_engine(engine, r#"{"present":1}"#)).await?;
    let record = single(lines);

    assert_eq!(record["outcome"], json!("FAILURE"));
    assert_eq!(record["returncode"], Value::Null);
    let error = record["errors"][0].as_str().unwrap();
    assert!(error.starts_with("cannot render cmd[1]: "), "error = {error}");
    assert!(executed.lock().unwrap().is_empty());
    Ok(())
}

#[tokio::test]
async fn output_failure_aborts_the_run_and_stops_execution() -> TestResult {
    init_tracing();
    let parallelism = 2;
    let (config, templates) = EngineConfigBuilder::new(&["work", "{{i}}"])
        .parallelism(parallelism)
        .compile();
    let fake = FakeExecutor::new("ok\n");
    let executed = fake.executed();

    let engine = Engine::new(config, templates, fake);
    let input = std::io::Cursor::new(jobs(200).into_bytes());
    let result = with_timeout(engine.run(input, BrokenPipeWriter)).await;

    match result {
        Err(JparError::IoError(e)) => assert_eq!(e.kind(), std::io::ErrorKind::BrokenPipe),
        other => panic!("expected the write error, got {other:?}"),
    }

    // Results already queued or in flight when the write failed may have
    // run; nothing beyond that.
    let ran = executed.lock().unwrap().len();
    assert!(ran <= 4 * parallelism, "{ran} jobs ran after the output broke");
    Ok(())
}
