// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod job;
pub mod logging;
pub mod sink;
pub mod source;
pub mod template;
pub mod types;

use anyhow::Result;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::EngineConfig;
use crate::engine::Engine;
use crate::exec::ProcessExecutor;
use crate::template::TemplateSet;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config resolution (file, then CLI overrides)
/// - template compilation
/// - the engine reading stdin and writing stdout
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = config::resolve(&args)?;
    let templates = TemplateSet::compile(&cfg)?;

    if args.dry_run {
        print_dry_run(&cfg, &templates);
        return Ok(());
    }

    let engine = Engine::new(cfg, templates, ProcessExecutor::new());
    let summary = engine.run(std::io::stdin(), tokio::io::stdout()).await?;

    info!(
        jobs_read = summary.jobs_read,
        results_written = summary.results_written,
        workers = summary.acks_received,
        "all jobs finished"
    );
    Ok(())
}

/// Print the resolved configuration and the templates that would be used.
fn print_dry_run(cfg: &EngineConfig, templates: &TemplateSet) {
    println!("jpar dry-run");
    println!("  parallelism = {}", cfg.parallelism);
    println!("  debug = {}", cfg.debug);
    println!("  strict = {}", templates.is_strict());
    println!();

    println!("cmd ({} tokens):", templates.cmd_len());
    for (i, token) in templates.cmd_sources().iter().enumerate() {
        println!("  [{i}] {token}");
    }

    if templates.has_env() {
        println!("env ({} pairs):", templates.env_len());
        for (key, value) in templates.env_sources() {
            println!("  {key}={value}");
        }
    }
    if !templates.dir_source().is_empty() {
        println!("dir: {}", templates.dir_source());
    }
    println!("stdin: {}", templates.stdin_source());

    debug!("dry-run complete (no execution)");
}
