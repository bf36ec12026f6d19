// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod inventory;
pub mod logging;
pub mod paths;
pub mod pattern;
pub mod task;
pub mod types;

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::engine::{Engine, EngineOptions, RunHandle};
use crate::exec::RealProcessBackend;
use crate::fs::RealFileSystem;
use crate::inventory::{Inventory, TomlTaskProvider};

/// High-level entry point used by `main.rs`. Returns the process exit code.
///
/// This wires together:
/// - task-file loading (validated once up front for `[config]`)
/// - the engine with the real filesystem and process backend
/// - `--list` / `--dry-run`
/// - sequential execution of the requested tasks
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<i32> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)
        .with_context(|| format!("loading task file {:?}", config_path))?;

    let engine = Engine::new(
        Arc::new(TomlTaskProvider::new(&config_path)),
        Arc::new(RealFileSystem),
        Arc::new(RealProcessBackend),
        EngineOptions::from(&cfg),
    );

    if args.list {
        let inventory = engine.inventory().await?;
        print_task_list(&inventory);
        return Ok(0);
    }

    if args.tasks.is_empty() {
        anyhow::bail!("no task given (use --list to see the declared tasks)");
    }

    if args.dry_run {
        for task in &args.tasks {
            let plan = engine.plan(task).await?;
            print!("{plan}");
        }
        debug!("dry-run complete (no execution)");
        return Ok(0);
    }

    for task in &args.tasks {
        info!(task = %task, "running requested task");
        let handle = engine.resolve_and_run(task).await?;
        let code = stream_to_stdout(handle).await;
        if code != 0 {
            info!(task = %task, exit_code = code, "requested task failed");
            return Ok(code);
        }
    }
    Ok(0)
}

/// Copy a run's output to stdout until it ends; Ctrl-C terminates the run.
async fn stream_to_stdout(mut handle: RunHandle) -> i32 {
    let mut stdout = std::io::stdout();
    let mut interrupted = false;

    loop {
        tokio::select! {
            chunk = handle.output.recv() => match chunk {
                Some(chunk) => {
                    let _ = stdout.write_all(chunk.as_bytes());
                    let _ = stdout.flush();
                }
                None => break,
            },
            ctrl_c = tokio::signal::ctrl_c(), if !interrupted => {
                if let Err(e) = ctrl_c {
                    warn!(error = %e, "failed to listen for Ctrl+C");
                }
                interrupted = true;
                handle.terminate();
            }
        }
    }

    handle.wait().await
}

fn print_task_list(inventory: &Inventory) {
    println!("tasks ({}):", inventory.tasks().len());
    for task in inventory.tasks() {
        match &task.action {
            Some(action) => println!("  - {}: {action}", task.id()),
            None => println!("  - {}: <no action>", task.id()),
        }
        if !task.inputs.is_empty() {
            println!("      inputs: {:?}", task.inputs);
        }
        if !task.outputs.is_empty() {
            println!("      outputs: {:?}", task.outputs);
        }
        if !task.depends_on.is_empty() {
            println!("      depends_on: {:?}", task.depends_on);
        }
        if task.ignore_errors {
            println!("      ignore_errors: true");
        }
    }
}
