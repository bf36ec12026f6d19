// src/inventory/provider.rs

//! Where task declarations come from.
//!
//! The engine never owns the task list; it asks a [`TaskProvider`] through
//! the [`InventoryCache`](super::InventoryCache). The CLI uses
//! [`TomlTaskProvider`]; embedders and tests can use [`StaticTaskProvider`].

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use crate::config::loader::load_and_validate;
use crate::errors::Result;
use crate::task::TaskSpec;

/// Boxed, sendable future returned by the async seams of the engine.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Trait abstracting the host's inventory of declared tasks.
pub trait TaskProvider: Send + Sync {
    /// Fetch every currently declared task, in declaration order.
    fn fetch_tasks(&self) -> BoxFuture<'_, Result<Vec<TaskSpec>>>;
}

/// Provider that re-reads a TOML task file on every fetch.
#[derive(Debug, Clone)]
pub struct TomlTaskProvider {
    path: PathBuf,
}

impl TomlTaskProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TaskProvider for TomlTaskProvider {
    fn fetch_tasks(&self) -> BoxFuture<'_, Result<Vec<TaskSpec>>> {
        Box::pin(async move {
            let cfg = load_and_validate(&self.path)?;
            let root = task_root_dir(&self.path);
            debug!(path = ?self.path, root = ?root, tasks = cfg.task.len(), "loaded task file");
            Ok(cfg.task_specs(&root))
        })
    }
}

/// Figure out the directory relative task paths are resolved against.
///
/// - If the task file path has a non-empty parent (e.g. "build/Taskmake.toml"),
///   that directory is used.
/// - For a bare filename ("Taskmake.toml") we fall back to the current working
///   directory.
pub fn task_root_dir(task_file: &Path) -> PathBuf {
    match task_file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Provider serving an in-memory task list.
#[derive(Debug, Default)]
pub struct StaticTaskProvider {
    tasks: Mutex<Vec<TaskSpec>>,
}

impl StaticTaskProvider {
    pub fn new(tasks: Vec<TaskSpec>) -> Self {
        Self {
            tasks: Mutex::new(tasks),
        }
    }

    /// Swap the served list. Takes effect on the cache's next rebuild.
    pub fn replace(&self, tasks: Vec<TaskSpec>) {
        *self.lock() = tasks;
    }

    fn lock(&self) -> MutexGuard<'_, Vec<TaskSpec>> {
        self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl TaskProvider for StaticTaskProvider {
    fn fetch_tasks(&self) -> BoxFuture<'_, Result<Vec<TaskSpec>>> {
        let tasks = self.lock().clone();
        Box::pin(async move { Ok(tasks) })
    }
}
