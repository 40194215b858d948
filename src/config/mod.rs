// src/config/mod.rs

//! Configuration loading and validation for jpar.
//!
//! Responsibilities:
//! - Define the TOML-backed data model and the validated engine config
//!   (`model.rs`).
//! - Load an optional config file and layer CLI flags on top (`loader.rs`).
//! - Validate startup invariants such as `parallelism >= 1` (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_from_path, resolve};
pub use model::{
    DEFAULT_PARALLELISM, DEFAULT_STDIN_TEMPLATE, EngineConfig, EnvPair, RawConfigFile,
};
