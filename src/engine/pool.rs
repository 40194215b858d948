// src/engine/pool.rs

//! Worker loop.
//!
//! Every worker pulls from the same job queue. The receiver sits behind an
//! async mutex so exactly one worker takes each envelope; the lock is held
//! only while waiting for the next item, never while a job runs.
//!
//! The result queue closes only when the sink has failed. A worker that
//! sees it closed stops taking jobs, so nothing else gets executed.

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tracing::{debug, trace, warn};

use crate::engine::{JobEnvelope, OutputEnvelope};
use crate::exec::JobExecutor;
use crate::job::{JobRun, build_job_run};
use crate::template::TemplateSet;

/// Job queue receiver shared by the whole pool.
pub type SharedJobQueue = Arc<Mutex<mpsc::Receiver<JobEnvelope>>>;

/// Process envelopes until a poison pill arrives (or the sink is gone), then
/// acknowledge with `id`.
pub async fn worker_loop<E: JobExecutor>(
    id: usize,
    templates: Arc<TemplateSet>,
    executor: Arc<E>,
    jobs: SharedJobQueue,
    results: mpsc::Sender<OutputEnvelope>,
    acks: mpsc::Sender<usize>,
    debug: bool,
) {
    debug!(worker_id = id, "worker started");

    loop {
        if results.is_closed() {
            warn!(worker_id = id, "result queue closed; not taking further jobs");
            break;
        }
        let next = { jobs.lock().await.recv().await };

        let run = match next {
            Some(JobEnvelope::Job(input)) => {
                let run = build_job_run(&templates, &input);
                executor.execute(run).await
            }
            Some(JobEnvelope::ParseFailure(msg)) => JobRun::parse_failure(&msg),
            Some(JobEnvelope::Shutdown) => break,
            None => {
                warn!(worker_id = id, "job queue closed without a shutdown pill");
                break;
            }
        };

        if !emit(id, run, &results, debug).await {
            break;
        }
    }

    debug!(worker_id = id, "worker terminated");
    if acks.send(id).await.is_err() {
        warn!(worker_id = id, "nobody is waiting for the shutdown acknowledgment");
    }
}

/// Returns `false` once the result queue is closed.
async fn emit(
    id: usize,
    mut run: JobRun,
    results: &mpsc::Sender<OutputEnvelope>,
    debug: bool,
) -> bool {
    if debug {
        run.worker_id = Some(id);
    }
    trace!(worker_id = id, outcome = %run.outcome, "job finished");

    if results.send(OutputEnvelope::Run(run)).await.is_err() {
        warn!(worker_id = id, "result queue closed; dropping job result");
        return false;
    }
    true
}
