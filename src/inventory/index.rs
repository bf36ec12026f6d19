// src/inventory/index.rs

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::paths::normalize_str;
use crate::pattern::{CompiledGlob, is_wild};
use crate::task::TaskSpec;

/// A task whose outputs contain a wildcard pattern.
#[derive(Debug, Clone)]
pub struct WildcardProducer {
    pub glob: CompiledGlob,
    pub task: Arc<TaskSpec>,
}

/// Which task produces a given path.
#[derive(Debug, Clone, Copy)]
pub enum Producer<'a> {
    Exact(&'a Arc<TaskSpec>),
    Wildcard(&'a WildcardProducer),
}

/// Output path → producing task, derived from one inventory snapshot.
///
/// Literal outputs go into an exact map (keyed by normalized path). Wildcard
/// outputs become rules, kept in inventory order. Lookups try the exact map
/// first and then the rules, first match winning; overlapping rules are not
/// reported.
#[derive(Debug, Clone, Default)]
pub struct ProducerIndex {
    exact: HashMap<String, Arc<TaskSpec>>,
    wildcard: Vec<WildcardProducer>,
}

impl ProducerIndex {
    pub fn build(tasks: &[Arc<TaskSpec>]) -> Self {
        let mut index = ProducerIndex::default();

        for task in tasks {
            for output in &task.outputs {
                let normalized = normalize_str(output);
                if is_wild(&normalized) {
                    index.wildcard.push(WildcardProducer {
                        glob: CompiledGlob::new(&normalized),
                        task: Arc::clone(task),
                    });
                } else if let Some(previous) = index.exact.insert(normalized.clone(), Arc::clone(task)) {
                    debug!(
                        output = %normalized,
                        previous = %previous.id(),
                        task = %task.id(),
                        "output declared by more than one task; last declaration wins"
                    );
                }
            }
        }

        index
    }

    /// Producer declaring exactly this (normalized) path.
    pub fn exact(&self, path: &str) -> Option<&Arc<TaskSpec>> {
        self.exact.get(path)
    }

    /// First wildcard rule matching this (normalized) path.
    pub fn wildcard(&self, path: &str) -> Option<&WildcardProducer> {
        self.wildcard.iter().find(|rule| rule.glob.matches(path))
    }

    pub fn wildcard_rules(&self) -> &[WildcardProducer] {
        &self.wildcard
    }

    /// Exact producer if any, else the first matching wildcard rule.
    pub fn producer_for(&self, path: &str) -> Option<Producer<'_>> {
        let path = normalize_str(path);
        if let Some(task) = self.exact(&path) {
            return Some(Producer::Exact(task));
        }
        self.wildcard(&path).map(Producer::Wildcard)
    }
}
