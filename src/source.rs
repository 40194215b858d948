// src/source.rs

//! Decode the input stream into job envelopes.
//!
//! Input is any number of JSON values written back to back, with or without
//! whitespace between them. Decoding stops at the first error: the broken
//! value becomes one [`JobEnvelope::ParseFailure`] and nothing after it is
//! read, since there is no reliable way to resynchronise mid-stream.

use std::io::Read;

use serde_json::{Deserializer, StreamDeserializer, Value, de::IoRead};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::engine::JobEnvelope;

/// Lazy, finite sequence of envelopes read from `R`.
pub struct JobSource<R: Read> {
    values: StreamDeserializer<'static, IoRead<R>, Value>,
    finished: bool,
}

impl<R: Read> JobSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            values: Deserializer::from_reader(reader).into_iter::<Value>(),
            finished: false,
        }
    }
}

impl<R: Read> Iterator for JobSource<R> {
    type Item = JobEnvelope;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.values.next() {
            Some(Ok(value)) => Some(JobEnvelope::Job(value)),
            Some(Err(e)) => {
                self.finished = true;
                warn!(error = %e, "input is not valid JSON; no further input will be read");
                Some(JobEnvelope::ParseFailure(e.to_string()))
            }
            None => {
                self.finished = true;
                None
            }
        }
    }
}

/// Push every envelope from `reader` onto the job queue.
///
/// Runs on a blocking thread and returns the number of envelopes sent once
/// the input is exhausted (or the queue has gone away).
pub fn feed_jobs<R: Read>(reader: R, jobs: mpsc::Sender<JobEnvelope>) -> usize {
    let mut sent = 0;
    for envelope in JobSource::new(reader) {
        if jobs.blocking_send(envelope).is_err() {
            warn!(sent, "job queue closed before input was exhausted");
            break;
        }
        sent += 1;
    }
    debug!(sent, "input exhausted");
    sent
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use serde_json::json;

    use super::*;

    fn collect(input: &str) -> Vec<JobEnvelope> {
        JobSource::new(Cursor::new(input.as_bytes().to_vec())).collect()
    }

    #[test]
    fn decodes_back_to_back_values() {
        let got = collect(r#"{"a":1}{"a":2} [3]"true""#);
        assert_eq!(
            got,
            vec![
                JobEnvelope::Job(json!({"a": 1})),
                JobEnvelope::Job(json!({"a": 2})),
                JobEnvelope::Job(json!([3])),
                JobEnvelope::Job(json!("true")),
            ]
        );
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(collect("").is_empty());
        assert!(collect("  \n\t ").is_empty());
    }

    #[test]
    fn decode_error_ends_the_stream() {
        let got = collect(r#"{"a":1} {"a": oops} {"a":3}"#);
        assert_eq!(got.len(), 2);
        assert_eq!(got[0], JobEnvelope::Job(json!({"a": 1})));
        match &got[1] {
            JobEnvelope::ParseFailure(msg) => assert!(!msg.is_empty()),
            other => panic!("expected ParseFailure, got {other:?}"),
        }
    }

    #[test]
    fn truncated_value_is_a_failure() {
        let got = collect(r#"{"a":1"#);
        assert!(matches!(got.as_slice(), [JobEnvelope::ParseFailure(_)]));
    }

    #[test]
    fn feed_counts_envelopes_sent() {
        let (tx, mut rx) = mpsc::channel(8);
        let sent = feed_jobs(Cursor::new(b"1 2 3".to_vec()), tx);
        assert_eq!(sent, 3);

        let mut got = Vec::new();
        while let Ok(env) = rx.try_recv() {
            got.push(env);
        }
        assert_eq!(got.len(), 3);
    }
}
