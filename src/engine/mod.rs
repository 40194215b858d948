// src/engine/mod.rs

//! Orchestration engine for jpar.
//!
//! This module ties together:
//! - the job queue fed by the input reader
//! - the worker pool that builds and executes jobs
//! - the result queue drained by the sink
//! - the three-phase shutdown protocol across all of the above
//!
//! The shutdown protocol itself is a pure state machine in [`shutdown`];
//! the async/IO shell driving it lives in [`runtime`].

use serde_json::Value;

use crate::job::JobRun;

/// Items flowing through the job queue.
#[derive(Debug, Clone, PartialEq)]
pub enum JobEnvelope {
    /// One decoded input value.
    Job(Value),
    /// The input could not be decoded; carries the decoder's message.
    ParseFailure(String),
    /// Poison pill: the receiving worker acknowledges and exits.
    Shutdown,
}

/// Items flowing through the result queue.
#[derive(Debug, Clone)]
pub enum OutputEnvelope {
    Run(JobRun),
    /// Sink sentinel, sent once every worker has acknowledged.
    Shutdown,
}

/// What a completed run did, for logging and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Envelopes produced by the input reader, parse failures included.
    pub jobs_read: usize,
    /// Records the sink wrote before its sentinel.
    pub results_written: usize,
    pub pills_sent: usize,
    pub acks_received: usize,
    /// Every shutdown phase entered, in order.
    pub phases: Vec<ShutdownPhase>,
}

pub mod pool;
pub mod runtime;
pub mod shutdown;

pub use pool::{SharedJobQueue, worker_loop};
pub use runtime::Engine;
pub use shutdown::{ShutdownCommand, ShutdownCoordinator, ShutdownPhase};
