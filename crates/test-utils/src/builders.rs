#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use taskmake::config::{ConfigFile, RawConfigFile, TaskConfig};
use taskmake::engine::{Engine, EngineOptions};
use taskmake::exec::ProcessBackend;
use taskmake::fs::FileSystem;
use taskmake::inventory::StaticTaskProvider;
use taskmake::task::{Action, TaskSpec};
use taskmake::types::CyclePolicy;

/// Builder for `TaskSpec` to simplify test setup.
///
/// Tasks default to living in `.`, which is also the root of
/// `MockFileSystem`.
pub struct TaskSpecBuilder {
    task: TaskSpec,
}

impl TaskSpecBuilder {
    pub fn new(label: &str) -> Self {
        Self {
            task: TaskSpec::new(label, "."),
        }
    }

    pub fn dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.task.dir = dir.into();
        self
    }

    pub fn scope(mut self, scope: &str) -> Self {
        self.task.scope = Some(scope.to_string());
        self
    }

    /// Shell command with arguments.
    pub fn command(mut self, command: &str, args: &[&str]) -> Self {
        self.task.action = Some(Action::Command {
            command: command.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        });
        self
    }

    /// Program run without a shell.
    pub fn process(mut self, process: &str, args: &[&str]) -> Self {
        self.task.action = Some(Action::Process {
            process: process.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        });
        self
    }

    /// Forward to another task by name.
    pub fn forward(mut self, task: &str) -> Self {
        self.task.action = Some(Action::Task {
            task: task.to_string(),
        });
        self
    }

    pub fn input(mut self, pattern: &str) -> Self {
        self.task.inputs.push(pattern.to_string());
        self
    }

    pub fn output(mut self, pattern: &str) -> Self {
        self.task.outputs.push(pattern.to_string());
        self
    }

    pub fn depends_on(mut self, task: &str) -> Self {
        self.task.depends_on.push(task.to_string());
        self
    }

    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.task.options.cwd = Some(cwd.into());
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.task.options.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn ignore_errors(mut self, val: bool) -> Self {
        self.task.ignore_errors = val;
        self
    }

    pub fn build(self) -> TaskSpec {
        self.task
    }
}

/// Builder for `ConfigFile` to simplify validation tests.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn with_task(mut self, name: &str, task: TaskConfig) -> Self {
        self.config.task.insert(name.to_string(), task);
        self
    }

    pub fn inventory_ttl(mut self, ttl: &str) -> Self {
        self.config.config.inventory_ttl = ttl.to_string();
        self
    }

    pub fn on_cycle(mut self, policy: CyclePolicy) -> Self {
        self.config.config.on_cycle = policy;
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn command(cmd: &str) -> Self {
        Self {
            task: TaskConfig {
                command: Some(cmd.to_string()),
                ..TaskConfig::default()
            },
        }
    }

    /// A task with no action at all.
    pub fn empty() -> Self {
        Self {
            task: TaskConfig::default(),
        }
    }

    pub fn process(mut self, process: &str) -> Self {
        self.task.process = Some(process.to_string());
        self
    }

    pub fn forward(mut self, task: &str) -> Self {
        self.task.task = Some(task.to_string());
        self
    }

    pub fn label(mut self, label: &str) -> Self {
        self.task.label = Some(label.to_string());
        self
    }

    pub fn scope(mut self, scope: &str) -> Self {
        self.task.scope = Some(scope.to_string());
        self
    }

    pub fn arg(mut self, arg: &str) -> Self {
        self.task.args.push(arg.to_string());
        self
    }

    pub fn depends_on(mut self, dep: &str) -> Self {
        self.task.depends_on.push(dep.to_string());
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}

/// Engine over a fixed task list, with default options.
pub fn engine_with(
    tasks: Vec<TaskSpec>,
    fs: Arc<dyn FileSystem>,
    backend: Arc<dyn ProcessBackend>,
) -> Engine {
    engine_with_options(tasks, fs, backend, EngineOptions::default())
}

pub fn engine_with_options(
    tasks: Vec<TaskSpec>,
    fs: Arc<dyn FileSystem>,
    backend: Arc<dyn ProcessBackend>,
    options: EngineOptions,
) -> Engine {
    Engine::new(Arc::new(StaticTaskProvider::new(tasks)), fs, backend, options)
}
