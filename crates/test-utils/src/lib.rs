pub mod builders;
pub mod fake_executor;
pub mod writers;

use std::io::Cursor;
use std::sync::Once;

use serde_json::Value;
use tokio::io::AsyncReadExt;
use tracing_subscriber::{EnvFilter, fmt};

use jpar::engine::{Engine, RunSummary};
use jpar::exec::JobExecutor;

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// Logs go through `with_test_writer()`, so they only show up for failing
/// tests (or with `-- --nocapture`). Pick levels with `RUST_LOG=debug`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Run a future with a 10-second timeout.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(std::time::Duration::from_secs(10), f)
        .await
        .expect("Test timed out after 10 seconds")
}

/// Feed `input` through `engine` and decode every output line.
///
/// Output is read while the engine runs, so the in-memory pipe never fills.
pub async fn run_engine<E: JobExecutor>(
    engine: Engine<E>,
    input: &str,
) -> anyhow::Result<(RunSummary, Vec<Value>)> {
    let (writer, mut reader) = tokio::io::duplex(64 * 1024);
    let input = Cursor::new(input.as_bytes().to_vec());

    let mut out = String::new();
    let (summary, read) = tokio::join!(engine.run(input, writer), reader.read_to_string(&mut out));
    let summary = summary?;
    read?;

    let lines = out
        .lines()
        .map(serde_json::from_str)
        .collect::<Result<Vec<Value>, _>>()?;
    Ok((summary, lines))
}
