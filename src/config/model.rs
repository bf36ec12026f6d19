// src/config/model.rs

use std::path::Path;
use std::time::Duration;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::task::{Action, TaskName, TaskOptions, TaskSpec};
use crate::types::CyclePolicy;

/// Task file exactly as deserialized, before validation.
///
/// ```toml
/// [config]
/// inventory_ttl = "5s"
/// on_cycle = "skip"
///
/// [task.compile]
/// command = "cc"
/// args = ["-c", "src/${fileBasenameNoExtension}.c", "-o", "${file}"]
/// inputs = ["src/${fileBasenameNoExtension}.c"]
/// outputs = ["out/*.o"]
///
/// [task.link]
/// command = "cc"
/// args = ["-o", "out/app", "out/main.o"]
/// inputs = ["out/main.o"]
/// outputs = ["out/app"]
/// ```
///
/// Tasks keep their declaration order, which decides which wildcard rule
/// wins when several match the same path.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    /// Keys are table names; they double as labels unless `label` is set.
    #[serde(default)]
    pub task: IndexMap<String, TaskConfig>,
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// How long an inventory snapshot is reused, e.g. `"500ms"`, `"5s"`.
    #[serde(default = "default_inventory_ttl")]
    pub inventory_ttl: String,

    /// `"skip"` (default) or `"fail"`.
    #[serde(default)]
    pub on_cycle: CyclePolicy,
}

fn default_inventory_ttl() -> String {
    "5s".to_string()
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            inventory_ttl: default_inventory_ttl(),
            on_cycle: CyclePolicy::default(),
        }
    }
}

/// `[task.<name>]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TaskConfig {
    /// Display name; defaults to the table key.
    #[serde(default)]
    pub label: Option<String>,

    #[serde(default)]
    pub scope: Option<String>,

    /// Shell command. Exclusive with `process` and `task`.
    #[serde(default)]
    pub command: Option<String>,

    /// Program executed without a shell.
    #[serde(default)]
    pub process: Option<String>,

    /// Name of another task to forward to.
    #[serde(default)]
    pub task: Option<String>,

    #[serde(default)]
    pub args: Vec<String>,

    #[serde(default)]
    pub inputs: Vec<String>,

    #[serde(default)]
    pub outputs: Vec<String>,

    #[serde(default, alias = "dependsOn")]
    pub depends_on: Vec<TaskName>,

    #[serde(default)]
    pub options: TaskOptions,

    #[serde(default, alias = "ignoreErrors")]
    pub ignore_errors: bool,
}

impl TaskConfig {
    /// Label used for this task when declared under `key`.
    pub fn effective_label(&self, key: &str) -> String {
        self.label.clone().unwrap_or_else(|| key.to_string())
    }

    /// `scope:label` or `label`, as [`TaskSpec::id`] would compute it.
    pub fn effective_id(&self, key: &str) -> String {
        let label = self.effective_label(key);
        match &self.scope {
            Some(scope) => format!("{scope}:{label}"),
            None => label,
        }
    }

    /// Number of action kinds set (`command`, `process`, `task`).
    pub fn action_count(&self) -> usize {
        [&self.command, &self.process, &self.task]
            .iter()
            .filter(|a| a.is_some())
            .count()
    }

    /// The single declared action, if any.
    pub fn action(&self) -> Option<Action> {
        if let Some(command) = &self.command {
            Some(Action::Command {
                command: command.clone(),
                args: self.args.clone(),
            })
        } else if let Some(process) = &self.process {
            Some(Action::Process {
                process: process.clone(),
                args: self.args.clone(),
            })
        } else {
            self.task.as_ref().map(|task| Action::Task { task: task.clone() })
        }
    }

    pub fn to_spec(&self, key: &str, root: &Path) -> TaskSpec {
        TaskSpec {
            label: self.effective_label(key),
            scope: self.scope.clone(),
            dir: root.to_path_buf(),
            action: self.action(),
            inputs: self.inputs.clone(),
            outputs: self.outputs.clone(),
            depends_on: self.depends_on.clone(),
            options: self.options.clone(),
            ignore_errors: self.ignore_errors,
        }
    }
}

/// A validated task file.
///
/// Only obtainable through `TryFrom<RawConfigFile>` (see `validate.rs`).
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub task: IndexMap<String, TaskConfig>,
    inventory_ttl: Duration,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        task: IndexMap<String, TaskConfig>,
        inventory_ttl: Duration,
    ) -> Self {
        Self {
            config,
            task,
            inventory_ttl,
        }
    }

    pub fn inventory_ttl(&self) -> Duration {
        self.inventory_ttl
    }

    pub fn on_cycle(&self) -> CyclePolicy {
        self.config.on_cycle
    }

    /// All tasks as engine specs, relative paths anchored at `root`.
    pub fn task_specs(&self, root: &Path) -> Vec<TaskSpec> {
        self.task
            .iter()
            .map(|(key, task)| task.to_spec(key, root))
            .collect()
    }
}

/// Parse durations like `"250ms"`, `"5s"`, `"2m"`, `"1h"`.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;

    let secs_per_unit = match unit_part.trim().to_lowercase().as_str() {
        "ms" => return Ok(Duration::from_millis(value)),
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        unit => {
            return Err(format!(
                "unsupported duration unit '{}'; expected ms, s, m, or h",
                unit
            ));
        }
    };

    value
        .checked_mul(secs_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("duration '{}' is too large", s))
}
