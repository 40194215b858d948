use std::fmt;

use serde::{Deserialize, Serialize};

/// Classification of a finished job.
///
/// Driven solely by whether the job recorded any errors. A command that
/// exits non-zero without an operational error is still `Success`; the exit
/// code is reported as data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    Success,
    Failure,
}

impl Outcome {
    pub fn from_errors(errors: &[String]) -> Self {
        if errors.is_empty() {
            Outcome::Success
        } else {
            Outcome::Failure
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success => f.write_str("SUCCESS"),
            Outcome::Failure => f.write_str("FAILURE"),
        }
    }
}
