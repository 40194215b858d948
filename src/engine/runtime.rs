// src/engine/runtime.rs

use std::fmt;
use std::io::Read;
use std::sync::Arc;

use tokio::io::AsyncWrite;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::config::EngineConfig;
use crate::errors::{JparError, Result};
use crate::exec::JobExecutor;
use crate::sink::ResultSink;
use crate::source::feed_jobs;
use crate::template::TemplateSet;

use super::pool::worker_loop;
use super::shutdown::{ShutdownCommand, ShutdownCoordinator, ShutdownPhase};
use super::{JobEnvelope, OutputEnvelope, RunSummary};

/// Runs one input stream through the worker pool and into the sink.
///
/// This is the IO shell around [`ShutdownCoordinator`]: it owns the
/// channels and tasks, and asks the coordinator what each shutdown event
/// should lead to.
pub struct Engine<E: JobExecutor> {
    config: EngineConfig,
    templates: Arc<TemplateSet>,
    executor: Arc<E>,
}

impl<E: JobExecutor> fmt::Debug for Engine<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Channel ends the shell needs while draining.
struct Plumbing {
    jobs: mpsc::Sender<JobEnvelope>,
    results: mpsc::Sender<OutputEnvelope>,
}

impl<E: JobExecutor> Engine<E> {
    pub fn new(config: EngineConfig, templates: TemplateSet, executor: E) -> Self {
        Self {
            config,
            templates: Arc::new(templates),
            executor: Arc::new(executor),
        }
    }

    /// Read every job from `input`, run them, and write results to `output`.
    ///
    /// Returns once the sink has flushed. Individual job failures are part
    /// of the output, not errors; only a broken sink or a protocol violation
    /// is.
    pub async fn run<R, W>(self, input: R, output: W) -> Result<RunSummary>
    where
        R: Read + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let workers = self.config.parallelism;
        let debug_fields = self.config.debug;
        info!(workers, debug = debug_fields, "jpar engine started");

        let (job_tx, job_rx) = mpsc::channel::<JobEnvelope>(workers.max(1));
        let (result_tx, result_rx) = mpsc::channel::<OutputEnvelope>(workers.max(1));
        let (ack_tx, mut ack_rx) = mpsc::channel::<usize>(workers.max(1));
        let job_rx = Arc::new(Mutex::new(job_rx));

        let mut sink = tokio::spawn(ResultSink::new(output, debug_fields).run(result_rx));

        let pool: Vec<JoinHandle<()>> = (0..workers)
            .map(|id| {
                tokio::spawn(worker_loop(
                    id,
                    Arc::clone(&self.templates),
                    Arc::clone(&self.executor),
                    Arc::clone(&job_rx),
                    result_tx.clone(),
                    ack_tx.clone(),
                    debug_fields,
                ))
            })
            .collect();
        drop(ack_tx);

        let source = tokio::task::spawn_blocking({
            let jobs = job_tx.clone();
            move || feed_jobs(input, jobs)
        });

        let plumbing = Plumbing {
            jobs: job_tx,
            results: result_tx,
        };
        let mut coordinator = ShutdownCoordinator::new(workers);
        let mut summary = RunSummary::default();

        let drain = async {
            // Phase 1: wait for the reader.
            summary.jobs_read = source
                .await
                .map_err(|e| JparError::Shutdown(format!("input reader failed: {e}")))?;
            debug!(jobs_read = summary.jobs_read, "input finished");

            for command in coordinator.input_finished()? {
                apply(command, &plumbing, &mut summary).await?;
            }

            // Phase 2: collect one acknowledgment per worker.
            while matches!(coordinator.phase(), ShutdownPhase::DrainingWorkers { .. }) {
                let Some(id) = ack_rx.recv().await else {
                    return Err(JparError::Shutdown(format!(
                        "workers exited without acknowledging ({} of {workers} received)",
                        coordinator.acknowledged()
                    )));
                };
                summary.acks_received += 1;
                debug!(worker_id = id, "worker acknowledged shutdown");

                for command in coordinator.worker_terminated(id)? {
                    apply(command, &plumbing, &mut summary).await?;
                }
            }
            Ok(())
        };

        // The sink only returns before the sentinel when it has failed. That
        // aborts the run at once; the reader and workers are abandoned.
        tokio::select! {
            biased;
            drained = drain => drained?,
            finished = &mut sink => {
                let err = match finished {
                    Ok(Err(e)) => e,
                    Ok(Ok(written)) => JparError::Shutdown(format!(
                        "result sink stopped before its sentinel ({written} records written)"
                    )),
                    Err(e) => JparError::Shutdown(format!("result sink failed: {e}")),
                };
                error!(error = %err, "output failed; aborting run");
                return Err(err);
            }
        }
        drop(plumbing);

        // Phase 3: let the sink finish.
        summary.results_written = sink
            .await
            .map_err(|e| JparError::Shutdown(format!("result sink failed: {e}")))??;
        coordinator.sink_finished()?;

        for handle in pool {
            handle
                .await
                .map_err(|e| JparError::Shutdown(format!("worker task failed: {e}")))?;
        }

        summary.phases = coordinator.history().to_vec();
        info!(
            jobs_read = summary.jobs_read,
            results_written = summary.results_written,
            "jpar engine finished"
        );
        Ok(summary)
    }
}

/// Perform one coordinator command.
async fn apply(
    command: ShutdownCommand,
    plumbing: &Plumbing,
    summary: &mut RunSummary,
) -> Result<()> {
    match command {
        ShutdownCommand::EnqueuePoisonPills(n) => {
            debug!(pills = n, "enqueueing shutdown pills");
            for _ in 0..n {
                plumbing
                    .jobs
                    .send(JobEnvelope::Shutdown)
                    .await
                    .map_err(|_| JparError::Shutdown("job queue closed early".to_string()))?;
                summary.pills_sent += 1;
            }
        }
        ShutdownCommand::CloseSink => {
            debug!("sending sink sentinel");
            if plumbing.results.send(OutputEnvelope::Shutdown).await.is_err() {
                debug!("result sink already stopped");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::future::Future;
    use std::io::Cursor;
    use std::pin::Pin;

    use serde_json::Value;
    use tokio::io::AsyncReadExt;

    use super::*;
    use crate::job::JobRun;

    struct Echo;

    impl JobExecutor for Echo {
        fn execute(&self, mut run: JobRun) -> Pin<Box<dyn Future<Output = JobRun> + Send + '_>> {
            Box::pin(async move {
                if !run.has_failed() {
                    run.stdout = run.cmd.join(" ");
                    run.returncode = Some(0);
                    run.settle();
                }
                run
            })
        }
    }

    fn engine(parallelism: usize) -> Engine<Echo> {
        let config = EngineConfig {
            parallelism,
            cmd: vec!["echo".into(), "{{x}}".into()],
            ..EngineConfig::default()
        };
        let templates = TemplateSet::compile(&config).unwrap();
        Engine::new(config, templates, Echo)
    }

    async fn run_to_lines(parallelism: usize, input: &str) -> (RunSummary, Vec<Value>) {
        let (writer, mut reader) = tokio::io::duplex(64 * 1024);
        let input = Cursor::new(input.as_bytes().to_vec());

        let summary = engine(parallelism).run(input, writer).await.unwrap();

        let mut out = String::new();
        reader.read_to_string(&mut out).await.unwrap();
        let lines = out
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        (summary, lines)
    }

    #[tokio::test]
    async fn every_job_produces_one_line() {
        let (summary, lines) = run_to_lines(2, r#"{"x":1}{"x":2}{"x":3}"#).await;

        assert_eq!(summary.jobs_read, 3);
        assert_eq!(summary.results_written, 3);
        assert_eq!(lines.len(), 3);

        let mut stdouts: Vec<_> = lines
            .iter()
            .map(|l| l["stdout"].as_str().unwrap().to_string())
            .collect();
        stdouts.sort();
        assert_eq!(stdouts, vec!["echo 1", "echo 2", "echo 3"]);
    }

    #[tokio::test]
    async fn one_pill_and_one_ack_per_worker() {
        let (summary, _) = run_to_lines(4, r#"{"x":1}"#).await;

        assert_eq!(summary.pills_sent, 4);
        assert_eq!(summary.acks_received, 4);
        assert_eq!(
            summary.phases,
            vec![
                ShutdownPhase::Running,
                ShutdownPhase::DrainingWorkers { acknowledged: 0 },
                ShutdownPhase::ClosingSink,
                ShutdownPhase::Finished,
            ]
        );
    }

    #[tokio::test]
    async fn empty_input_still_shuts_down() {
        let (summary, lines) = run_to_lines(3, "").await;
        assert_eq!(summary.jobs_read, 0);
        assert!(lines.is_empty());
        assert_eq!(summary.acks_received, 3);
    }
}
