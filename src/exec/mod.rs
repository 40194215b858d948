// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`backend`] provides the `JobExecutor` trait the worker pool talks to,
//!   and `ProcessExecutor`, the production implementation.
//! - [`lookup`] resolves a command token to an absolute executable path.
//! - [`process`] spawns the child and moves bytes through its pipes.

pub mod backend;
pub mod lookup;
pub mod process;

pub use backend::{JobExecutor, ProcessExecutor};
pub use lookup::{LookupError, lookup_command};
