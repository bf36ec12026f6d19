// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

use crate::config::DEFAULT_TASK_FILE;

/// Command-line arguments for `taskmake`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "taskmake",
    version,
    about = "Run declared build tasks, rebuilding only what is out of date.",
    long_about = None
)]
pub struct CliArgs {
    /// Tasks to run, by label or scope-qualified id (`scope:label`).
    ///
    /// Tasks run one after another; the first nonzero exit code stops the
    /// sequence and becomes the process exit code.
    #[arg(value_name = "TASK")]
    pub tasks: Vec<String>,

    /// Path to the task file (TOML).
    ///
    /// Default: `Taskmake.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = DEFAULT_TASK_FILE)]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TASKMAKE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Print the declared tasks and exit.
    #[arg(long)]
    pub list: bool,

    /// Resolve the dependency tree of each requested task and print it
    /// without running anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// `EnvFilter` directive for this level.
    pub fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
