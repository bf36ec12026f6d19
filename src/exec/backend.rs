// src/exec/backend.rs

//! Pluggable process backend.
//!
//! The engine never spawns processes itself; it hands an [`Invocation`] to a
//! [`ProcessBackend`]. Production code uses
//! [`RealProcessBackend`](super::process::RealProcessBackend); tests provide
//! a backend that records invocations and returns scripted exit codes.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use tokio::sync::watch;

use crate::engine::output::OutputSink;
use crate::inventory::BoxFuture;
use crate::task::{Action, TaskSpec};

/// One process to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Task id, for logging.
    pub task: String,
    pub program: String,
    pub args: Vec<String>,
    /// Run `program` and `args` as one command line through the platform
    /// shell instead of executing `program` directly.
    pub shell: bool,
    pub cwd: PathBuf,
    /// Layered over the inherited environment.
    pub env: BTreeMap<String, String>,
}

impl Invocation {
    /// Invocation for a task's `command` or `process` action.
    ///
    /// `None` for forwarding actions and tasks without an action.
    pub fn for_task(task: &TaskSpec) -> Option<Self> {
        let (program, args, shell) = match task.action.as_ref()? {
            Action::Command { command, args } => (command, args, true),
            Action::Process { process, args } => (process, args, false),
            Action::Task { .. } => return None,
        };
        Some(Self {
            task: task.id(),
            program: program.clone(),
            args: args.clone(),
            shell,
            cwd: task.working_dir(),
            env: task.options.env.clone(),
        })
    }

    /// Shell command line: the program followed by its arguments, each
    /// argument containing a space wrapped in double quotes.
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            if arg.contains(' ') {
                line.push('"');
                line.push_str(arg);
                line.push('"');
            } else {
                line.push_str(arg);
            }
        }
        line
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command_line())
    }
}

/// Trait abstracting how task processes are run.
pub trait ProcessBackend: Send + Sync {
    /// Run `invocation` to completion and return its exit code.
    ///
    /// Output lines go to `output`. When `cancel` flips to `true` the process
    /// is killed and the returned code is `-1`. A process that cannot be
    /// started is reported on `output` and yields `1`.
    fn run(
        &self,
        invocation: Invocation,
        output: OutputSink,
        cancel: watch::Receiver<bool>,
    ) -> BoxFuture<'static, i32>;
}
