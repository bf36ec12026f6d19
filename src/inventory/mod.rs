// src/inventory/mod.rs

//! The set of declared tasks as seen by one resolution pass.
//!
//! - [`provider`] is the seam to wherever tasks are declared.
//! - [`index`] maps output paths back to the tasks that produce them.
//! - [`cache`] keeps a snapshot around for a short time.

pub mod cache;
pub mod index;
pub mod provider;

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use crate::task::TaskSpec;

pub use cache::{DEFAULT_INVENTORY_TTL, InventoryCache};
pub use index::{Producer, ProducerIndex, WildcardProducer};
pub use provider::{BoxFuture, StaticTaskProvider, TaskProvider, TomlTaskProvider};

/// Immutable snapshot of all declared tasks plus the derived producer index.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    tasks: Vec<Arc<TaskSpec>>,
    by_id: HashMap<String, Arc<TaskSpec>>,
    index: ProducerIndex,
}

impl Inventory {
    pub fn new(tasks: Vec<TaskSpec>) -> Self {
        let tasks: Vec<Arc<TaskSpec>> = tasks.into_iter().map(Arc::new).collect();

        let mut by_id = HashMap::with_capacity(tasks.len());
        for task in &tasks {
            if by_id.insert(task.id(), Arc::clone(task)).is_some() {
                warn!(task = %task.id(), "duplicate task id; later declaration wins");
            }
        }

        let index = ProducerIndex::build(&tasks);
        Self { tasks, by_id, index }
    }

    pub fn tasks(&self) -> &[Arc<TaskSpec>] {
        &self.tasks
    }

    pub fn index(&self) -> &ProducerIndex {
        &self.index
    }

    /// Look a task up by id, falling back to the first task with that label.
    pub fn find(&self, name: &str) -> Option<Arc<TaskSpec>> {
        self.by_id
            .get(name)
            .or_else(|| self.tasks.iter().find(|t| t.label == name))
            .cloned()
    }
}
