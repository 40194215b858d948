use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use jpar::exec::JobExecutor;
use jpar::job::JobRun;

/// A fake executor that:
/// - records the argv of every job it is asked to run
/// - immediately reports exit code 0 with canned stdout
///
/// Records that already failed are returned untouched, like the real one.
#[derive(Clone, Default)]
pub struct FakeExecutor {
    stdout: String,
    executed: Arc<Mutex<Vec<Vec<String>>>>,
}

impl FakeExecutor {
    pub fn new(stdout: &str) -> Self {
        Self {
            stdout: stdout.to_string(),
            executed: Arc::default(),
        }
    }

    /// Handle onto the recorded argvs, usable after the executor is moved.
    pub fn executed(&self) -> Arc<Mutex<Vec<Vec<String>>>> {
        Arc::clone(&self.executed)
    }
}

impl JobExecutor for FakeExecutor {
    fn execute(&self, mut run: JobRun) -> Pin<Box<dyn Future<Output = JobRun> + Send + '_>> {
        Box::pin(async move {
            if run.has_failed() {
                return run;
            }

            self.executed.lock().unwrap().push(run.cmd.clone());

            run.prog = run.cmd.first().map(|p| format!("/fake/{p}"));
            run.stdout = self.stdout.clone();
            run.returncode = Some(0);
            run.settle();
            run
        })
    }
}
