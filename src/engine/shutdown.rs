// src/engine/shutdown.rs

//! Pure shutdown state machine.
//!
//! Termination runs in three phases:
//! 1. the input reader finishes, so one poison pill per worker is enqueued
//! 2. every worker acknowledges its pill, so the sink sentinel is sent
//! 3. the sink finishes writing
//!
//! [`ShutdownCoordinator`] tracks which phase we are in and tells the async
//! shell what to do next. It has no channels, no Tokio types and performs no
//! IO, so every ordering rule can be unit tested directly.

use std::collections::BTreeSet;

use crate::errors::{JparError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownPhase {
    /// Input is still being read.
    Running,
    /// Pills are enqueued; waiting for workers to acknowledge.
    DrainingWorkers { acknowledged: usize },
    /// Sentinel sent; waiting for the sink.
    ClosingSink,
    Finished,
}

/// Command produced by the coordinator for the async shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownCommand {
    /// Put this many poison pills on the job queue.
    EnqueuePoisonPills(usize),
    /// Send the sentinel on the result queue.
    CloseSink,
}

#[derive(Debug)]
pub struct ShutdownCoordinator {
    workers: usize,
    phase: ShutdownPhase,
    acknowledged: BTreeSet<usize>,
    history: Vec<ShutdownPhase>,
}

impl ShutdownCoordinator {
    pub fn new(workers: usize) -> Self {
        Self {
            workers,
            phase: ShutdownPhase::Running,
            acknowledged: BTreeSet::new(),
            history: vec![ShutdownPhase::Running],
        }
    }

    pub fn phase(&self) -> ShutdownPhase {
        self.phase
    }

    /// Phases entered so far, oldest first. Acknowledgments do not add
    /// entries; only transitions do.
    pub fn history(&self) -> &[ShutdownPhase] {
        &self.history
    }

    pub fn acknowledged(&self) -> usize {
        self.acknowledged.len()
    }

    /// Phase 1 → 2: the input reader is done.
    pub fn input_finished(&mut self) -> Result<Vec<ShutdownCommand>> {
        if self.phase != ShutdownPhase::Running {
            return Err(self.out_of_order("input finished"));
        }
        self.enter(ShutdownPhase::DrainingWorkers { acknowledged: 0 });

        let mut commands = vec![ShutdownCommand::EnqueuePoisonPills(self.workers)];
        if self.workers == 0 {
            self.enter(ShutdownPhase::ClosingSink);
            commands.push(ShutdownCommand::CloseSink);
        }
        Ok(commands)
    }

    /// A worker consumed its pill and exited.
    pub fn worker_terminated(&mut self, worker_id: usize) -> Result<Vec<ShutdownCommand>> {
        if !matches!(self.phase, ShutdownPhase::DrainingWorkers { .. }) {
            return Err(self.out_of_order(&format!("acknowledgment from worker {worker_id}")));
        }
        if worker_id >= self.workers {
            return Err(JparError::Shutdown(format!(
                "acknowledgment from unknown worker {worker_id} (pool size {})",
                self.workers
            )));
        }
        if !self.acknowledged.insert(worker_id) {
            return Err(JparError::Shutdown(format!(
                "worker {worker_id} acknowledged shutdown twice"
            )));
        }

        let acknowledged = self.acknowledged.len();
        if acknowledged < self.workers {
            self.phase = ShutdownPhase::DrainingWorkers { acknowledged };
            return Ok(Vec::new());
        }

        self.enter(ShutdownPhase::ClosingSink);
        Ok(vec![ShutdownCommand::CloseSink])
    }

    /// Phase 3 done: the sink wrote everything and returned.
    pub fn sink_finished(&mut self) -> Result<()> {
        if self.phase != ShutdownPhase::ClosingSink {
            return Err(self.out_of_order("sink finished"));
        }
        self.enter(ShutdownPhase::Finished);
        Ok(())
    }

    fn enter(&mut self, phase: ShutdownPhase) {
        self.phase = phase;
        self.history.push(phase);
    }

    fn out_of_order(&self, event: &str) -> JparError {
        JparError::Shutdown(format!("{event} while in phase {:?}", self.phase))
    }
}
