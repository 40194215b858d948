// src/exec/backend.rs

//! Pluggable executor abstraction.
//!
//! Workers hand each built [`JobRun`] to a `JobExecutor` and get the
//! finished record back. Production uses [`ProcessExecutor`], which resolves
//! the program and runs it as a child process; tests can provide their own
//! implementation that never spawns anything.

use std::ffi::OsString;
use std::future::Future;
use std::pin::Pin;

use tracing::debug;

use crate::exec::lookup::lookup_command;
use crate::exec::process::run_process;
use crate::job::JobRun;

/// Trait abstracting how a built job is executed.
///
/// Implementations must never fail outright: every problem is recorded in
/// the returned record's error list.
pub trait JobExecutor: Send + Sync + 'static {
    /// Execute `run` and return it with output, status and errors filled in.
    ///
    /// A record whose outcome is already `Failure` must be returned
    /// unchanged.
    fn execute(&self, run: JobRun) -> Pin<Box<dyn Future<Output = JobRun> + Send + '_>>;
}

/// Executor that runs real child processes.
#[derive(Debug, Clone, Default)]
pub struct ProcessExecutor {
    /// Overrides `$PATH` for command lookup.
    search_path: Option<OsString>,
}

impl ProcessExecutor {
    /// Resolve commands through the process's `$PATH`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve commands through `search_path` instead of `$PATH`.
    pub fn with_search_path(search_path: impl Into<OsString>) -> Self {
        Self {
            search_path: Some(search_path.into()),
        }
    }

    async fn run(&self, mut run: JobRun) -> JobRun {
        if run.has_failed() {
            return run;
        }

        let token = run.cmd.first().cloned().unwrap_or_default();
        let search_path = self
            .search_path
            .clone()
            .or_else(|| std::env::var_os("PATH"));

        let prog = match lookup_command(&token, search_path.as_deref()) {
            Ok(prog) => prog,
            Err(e) => {
                debug!(token = %token, error = %e, "command lookup failed");
                run.fail(format!("cannot locate command {token}: {e}"));
                return run;
            }
        };
        run.prog = Some(prog.to_string_lossy().into_owned());

        run_process(run, &prog).await
    }
}

impl JobExecutor for ProcessExecutor {
    fn execute(&self, run: JobRun) -> Pin<Box<dyn Future<Output = JobRun> + Send + '_>> {
        Box::pin(self.run(run))
    }
}
