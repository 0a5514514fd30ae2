// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod demo;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod registry;
pub mod scheduler;
pub mod state;
pub mod types;

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info};

pub use crate::config::SchedulerConfig;
pub use crate::engine::RunReport;
pub use crate::errors::SemisyncError;
pub use crate::registry::{Completion, TaskError, TaskOutput, TaskSpec, WorkerInput, blocking, from_async};
pub use crate::scheduler::Scheduler;
pub use crate::state::{MergePolicy, SharedState};
pub use crate::types::{InvocationId, MergeMode, TaskId, UndeclaredFieldPolicy, Value};

use crate::cli::CliArgs;
use crate::config::{default_config_path, load_and_validate};
use crate::demo::DemoOptions;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the scheduler and the demo workload
/// - the run itself, or a dry-run listing
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = demo::declare_fields(load_config(args.config.as_deref())?);
    let mut scheduler = Scheduler::new(cfg);

    let options = DemoOptions {
        max_delay: Duration::from_millis(args.max_delay_ms),
        seed: args.seed,
    };
    demo::register(&scheduler, &options, |line| println!("{line}"))?;

    if args.dry_run {
        print_dry_run(&scheduler);
        return Ok(());
    }

    let report = scheduler.run().await?;
    info!(
        run_id = report.run_id,
        completed = report.completed,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "demo finished"
    );
    Ok(())
}

/// Explicit `--config` path, else `Semisync.toml` if present, else defaults.
fn load_config(explicit: Option<&str>) -> Result<SchedulerConfig> {
    if let Some(path) = explicit {
        return load_and_validate(path).with_context(|| format!("loading config from {path}"));
    }

    let fallback = default_config_path();
    if Path::new(&fallback).is_file() {
        return load_and_validate(&fallback)
            .with_context(|| format!("loading config from {}", fallback.display()));
    }

    debug!("no config file; using defaults");
    Ok(SchedulerConfig::default())
}

/// Simple dry-run output: print config and the registered task graph.
fn print_dry_run(scheduler: &Scheduler) {
    let cfg = scheduler.config();

    println!("semisync dry-run");
    match cfg.deadline {
        Some(deadline) => println!("  scheduler.deadline = {deadline:?}"),
        None => println!("  scheduler.deadline = none"),
    }
    println!("  scheduler.channel_capacity = {}", cfg.channel_capacity);
    println!("  merge.undeclared = {:?}", cfg.merge.undeclared);
    for (field, mode) in &cfg.merge.fields {
        println!("  merge.fields.{field} = {mode:?}");
    }
    println!();

    let tasks = scheduler.registry().snapshot();
    println!("tasks ({}):", tasks.len());
    for task in &tasks {
        println!("  - {} ({})", task.name, task.id);
        if !task.dependencies.is_empty() {
            println!("      after: {:?}", task.dependencies);
        }
        println!("      queued invocations: {}", task.pending);
    }

    debug!("dry-run complete (no execution)");
}
