// src/exec/process.rs

//! Run one built job as a child process.
//!
//! The three standard streams are plain OS pipes created before the child
//! is spawned. Once it runs, writing stdin and draining stdout and stderr
//! happen on three threads at once. Serialising them would deadlock as soon
//! as the child fills one pipe while we wait on another.
//!
//! Only one of those threads comes from tokio's blocking pool; the two
//! readers are scoped threads it owns. A saturated pool therefore delays
//! whole jobs, it never starts a job without its readers.

use std::io::{self, PipeReader, PipeWriter, Read, Write};
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::thread::{self, ScopedJoinHandle};

use tokio::process::{Child, Command};
use tracing::debug;

use crate::job::JobRun;

/// Spawn `prog` for an already-resolved job and fill in its output.
///
/// Every failure is recorded on the returned record; nothing is propagated.
pub async fn run_process(mut run: JobRun, prog: &Path) -> JobRun {
    let stdin = open_pipe(&mut run, "stdin");
    let stdout = open_pipe(&mut run, "stdout");
    let stderr = open_pipe(&mut run, "stderr");

    let (Some((child_in, parent_in)), Some((parent_out, child_out)), Some((parent_err, child_err))) =
        (stdin, stdout, stderr)
    else {
        run.settle();
        return run;
    };

    let mut child = match spawn_child(&run, prog, child_in, child_out, child_err) {
        Ok(child) => child,
        Err(e) => {
            run.fail(format!("failed to launch cmd: {e}"));
            return run;
        }
    };

    debug!(cmd = ?run.cmd, pid = ?child.id(), "child process started");

    // Three OS threads per running job, so 3 x parallelism at peak.
    let payload = run.stdin.clone().into_bytes();
    let pumped = tokio::task::spawn_blocking(move || {
        pump(parent_in, &payload, parent_out, parent_err)
    })
    .await;

    match pumped {
        Ok((written, out, err)) => {
            if let Err(e) = written {
                debug!(cmd = ?run.cmd, error = %e, "child did not consume all of stdin");
            }
            let stdout = collect_stream(&mut run, "stdout", out);
            let stderr = collect_stream(&mut run, "stderr", err);
            run.stdout = stdout;
            run.stderr = stderr;
        }
        Err(e) => run.fail(format!("cannot service child streams: {e}")),
    }

    match child.wait().await {
        Ok(status) => {
            let code = exit_code(status);
            debug!(cmd = ?run.cmd, exit_code = code, "child process exited");
            run.returncode = Some(code);
        }
        Err(e) => run.fail(format!("failed to wait for cmd: {e}")),
    }

    run.settle();
    run
}

fn open_pipe(run: &mut JobRun, name: &str) -> Option<(PipeReader, PipeWriter)> {
    match io::pipe() {
        Ok(pair) => Some(pair),
        Err(e) => {
            run.fail(format!("cannot construct {name}: {e}"));
            None
        }
    }
}

/// The `Command` (and with it the child's ends of the pipes) is dropped when
/// this returns, so our read ends see EOF once the child exits.
fn spawn_child(
    run: &JobRun,
    prog: &Path,
    stdin: PipeReader,
    stdout: PipeWriter,
    stderr: PipeWriter,
) -> io::Result<Child> {
    let mut cmd = Command::new(prog);

    #[cfg(unix)]
    if let Some(arg0) = run.cmd.first() {
        cmd.arg0(arg0);
    }
    cmd.args(run.cmd.iter().skip(1));

    if let Some(ref env) = run.env {
        cmd.env_clear().envs(env);
    }
    if !run.dir.is_empty() {
        cmd.current_dir(&run.dir);
    }

    cmd.stdin(Stdio::from(stdin))
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::from(stderr));

    cmd.spawn()
}

type Drained = (Vec<u8>, io::Result<()>);

/// Feed stdin on the calling thread while two scoped threads drain stdout
/// and stderr.
fn pump(
    stdin: PipeWriter,
    payload: &[u8],
    stdout: PipeReader,
    stderr: PipeReader,
) -> (io::Result<()>, Drained, Drained) {
    thread::scope(|s| {
        let out = s.spawn(move || drain(stdout));
        let err = s.spawn(move || drain(stderr));
        let written = feed_stdin(stdin, payload);
        (written, join_reader(out), join_reader(err))
    })
}

fn join_reader(handle: ScopedJoinHandle<'_, Drained>) -> Drained {
    handle
        .join()
        .unwrap_or_else(|_| (Vec::new(), Err(io::Error::other("reader thread panicked"))))
}

/// Write the whole payload, then close the pipe by dropping it.
fn feed_stdin(mut pipe: PipeWriter, payload: &[u8]) -> io::Result<()> {
    pipe.write_all(payload)
}

/// Read to EOF, keeping whatever arrived before an error.
fn drain(mut pipe: PipeReader) -> Drained {
    let mut buf = Vec::new();
    let res = pipe.read_to_end(&mut buf).map(|_| ());
    (buf, res)
}

/// Decode a drained stream, recording a read failure under `name`.
fn collect_stream(run: &mut JobRun, name: &str, (bytes, res): Drained) -> String {
    if let Err(e) = res {
        run.fail(format!("{name}: {e}"));
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or_else(|| {
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            128 + status.signal().unwrap_or(0)
        }
        #[cfg(not(unix))]
        {
            -1
        }
    })
}
