// src/errors.rs

//! Crate-wide error types.
//!
//! - [`TaskmakeError`] covers failures that abort an operation outright
//!   (unreadable task file, invalid configuration, unknown task).
//! - [`BuildError`] is the runtime taxonomy of a build. None of these abort the
//!   engine; each one is rendered into the run's output stream via its
//!   `Display` text and, where it is not absorbed, turned into an exit code.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TaskmakeError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Everything that can go wrong while resolving or running a single task.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// The task declares neither a command, a process nor a task reference.
    #[error("Task '{task}' must specify a command, process or task")]
    Configuration { task: String },

    /// An input matches no producer and does not exist on disk.
    #[error("Can't make {}", .path.display())]
    UnresolvedInput { path: PathBuf },

    /// A directory visited during wildcard expansion could not be listed.
    #[error("Warning: Cannot read directory {}: {reason}", .dir.display())]
    DirectoryRead { dir: PathBuf, reason: String },

    /// An explicit `depends_on` entry names no declared task.
    #[error("Warning: Task '{task}' depends on unknown task '{name}'")]
    UnknownDependency { task: String, name: String },

    /// A forwarding action names no declared task.
    #[error("Task '{name}' not found")]
    ForwardTargetMissing { name: String },

    /// A dependency exited nonzero.
    #[error("Dependencies failed for task '{task}'")]
    DependencyFailure { task: String, exit_code: i32 },

    /// The process could not be started.
    #[error("Command error: {reason}")]
    Spawn { reason: String },

    /// The runner is already executing further up the call chain.
    #[error("Circular dependency detected for task '{task}'{}", skip_suffix(.skipped))]
    CircularDependency { task: String, skipped: bool },

    /// Wildcard instantiation kept nesting past the resolution depth limit.
    #[error("Dependency chain too deep while resolving {} for task '{task}'", .path.display())]
    ResolutionTooDeep { task: String, path: PathBuf },
}

fn skip_suffix(skipped: &bool) -> &'static str {
    if *skipped { " (skipping)" } else { "" }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, TaskmakeError>;
