// src/task.rs

//! Declared build steps.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::pattern::PlaceholderTable;

/// Canonical task name type used throughout the engine.
pub type TaskName = String;

/// What a task does when its body runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Run through the platform shell. Arguments containing spaces are
    /// quoted before being appended to the command line.
    Command {
        command: String,
        #[serde(default)]
        args: Vec<String>,
    },
    /// Execute a program directly, without a shell.
    Process {
        process: String,
        #[serde(default)]
        args: Vec<String>,
    },
    /// Forward to another declared task by name.
    Task { task: TaskName },
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Command { command: program, args } | Action::Process { process: program, args } => {
                write!(f, "{program}")?;
                for arg in args {
                    write!(f, " {arg}")?;
                }
                Ok(())
            }
            Action::Task { task } => write!(f, "{task}"),
        }
    }
}

/// Working directory and environment overrides for the spawned process.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskOptions {
    /// Relative paths are taken from the task's directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,
    /// Layered over the inherited environment.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// One declared build step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub label: String,
    /// Owning scope; qualifies the id so equal labels can coexist.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Directory that relative inputs and outputs are resolved against.
    pub dir: PathBuf,
    /// `None` is a configuration error reported when the task is run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,
    #[serde(default)]
    pub inputs: Vec<String>,
    #[serde(default)]
    pub outputs: Vec<String>,
    #[serde(default)]
    pub depends_on: Vec<TaskName>,
    #[serde(default)]
    pub options: TaskOptions,
    #[serde(default)]
    pub ignore_errors: bool,
}

impl TaskSpec {
    pub fn new(label: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Self {
            label: label.into(),
            scope: None,
            dir: dir.into(),
            action: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
            depends_on: Vec::new(),
            options: TaskOptions::default(),
            ignore_errors: false,
        }
    }

    /// `scope:label`, or just `label` for unscoped tasks.
    pub fn id(&self) -> String {
        match &self.scope {
            Some(scope) => format!("{scope}:{}", self.label),
            None => self.label.clone(),
        }
    }

    /// Directory the task's process is started in.
    pub fn working_dir(&self) -> PathBuf {
        match &self.options.cwd {
            Some(cwd) => crate::paths::resolve(&self.dir, cwd),
            None => self.dir.clone(),
        }
    }

    /// Copy of this task with every `${...}` placeholder in `table`
    /// substituted, in every string field.
    pub fn instantiate(&self, table: &PlaceholderTable) -> Result<TaskSpec> {
        table.apply_to(self)
    }
}
