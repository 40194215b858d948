// src/sink.rs

//! Serialize finished jobs to the output stream, one JSON object per line.

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::debug;

use crate::engine::OutputEnvelope;
use crate::errors::{JparError, Result};

#[derive(Debug)]
pub struct ResultSink<W> {
    output: W,
    debug: bool,
}

impl<W: AsyncWrite + Unpin> ResultSink<W> {
    /// With `debug` off, the echoed input, rendered stdin and worker id are
    /// stripped from every record before it is written.
    pub fn new(output: W, debug: bool) -> Self {
        Self { output, debug }
    }

    /// Write records until the sentinel arrives, then flush.
    ///
    /// Returns how many records were written. The first write or
    /// serialization failure is fatal.
    pub async fn run(mut self, mut results: mpsc::Receiver<OutputEnvelope>) -> Result<usize> {
        let mut written = 0;

        while let Some(envelope) = results.recv().await {
            match envelope {
                OutputEnvelope::Run(mut run) => {
                    if !self.debug {
                        run.redact_debug_fields();
                    }
                    let mut line = serde_json::to_vec(&run)?;
                    line.push(b'\n');
                    self.output.write_all(&line).await?;
                    written += 1;
                }
                OutputEnvelope::Shutdown => {
                    self.output.flush().await?;
                    debug!(written, "result sink finished");
                    return Ok(written);
                }
            }
        }

        self.output.flush().await?;
        Err(JparError::Shutdown(format!(
            "result queue closed before the sink sentinel ({written} records written)"
        )))
    }
}
