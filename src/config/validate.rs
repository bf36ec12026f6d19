// src/config/validate.rs

use std::collections::{HashMap, HashSet};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::warn;

use crate::config::model::{ConfigFile, RawConfigFile, parse_duration};
use crate::errors::{Result, TaskmakeError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::TaskmakeError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        let ttl = parse_duration(&raw.config.inventory_ttl).map_err(|e| {
            TaskmakeError::ConfigError(format!("[config].inventory_ttl: {e}"))
        })?;
        for warning in dependency_warnings(&raw) {
            warn!("{warning}");
        }
        Ok(ConfigFile::new_unchecked(raw.config, raw.task, ttl))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_actions(cfg)?;
    validate_unique_ids(cfg)?;
    Ok(())
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(TaskmakeError::ConfigError(
            "task file must contain at least one [task.<name>] section".to_string(),
        ));
    }
    Ok(())
}

/// A task may name at most one of `command`, `process`, `task`.
///
/// Naming none is allowed here; running such a task reports a configuration
/// error for that task alone.
fn validate_actions(cfg: &RawConfigFile) -> Result<()> {
    for (key, task) in cfg.task.iter() {
        if task.action_count() > 1 {
            return Err(TaskmakeError::ConfigError(format!(
                "task '{}' sets more than one of `command`, `process` and `task`",
                key
            )));
        }
        if task.task.is_some() && !task.args.is_empty() {
            return Err(TaskmakeError::ConfigError(format!(
                "task '{}' forwards to another task and cannot take `args`",
                key
            )));
        }
    }
    Ok(())
}

fn validate_unique_ids(cfg: &RawConfigFile) -> Result<()> {
    let mut seen: HashMap<String, &str> = HashMap::new();
    for (key, task) in cfg.task.iter() {
        let id = task.effective_id(key);
        if let Some(first) = seen.insert(id.clone(), key.as_str()) {
            return Err(TaskmakeError::ConfigError(format!(
                "tasks '{}' and '{}' share the id '{}'",
                first, key, id
            )));
        }
    }
    Ok(())
}

/// Problems with explicit `depends_on` lists that the engine tolerates at run
/// time: names that match no task, and cycles (the runtime guard skips the
/// re-entered task).
pub fn dependency_warnings(cfg: &RawConfigFile) -> Vec<String> {
    let mut warnings = Vec::new();

    // Dependencies may name a task by id or by label.
    let mut by_name: HashMap<String, String> = HashMap::new();
    for (key, task) in cfg.task.iter() {
        by_name
            .entry(task.effective_label(key))
            .or_insert_with(|| task.effective_id(key));
    }
    for (key, task) in cfg.task.iter() {
        let id = task.effective_id(key);
        by_name.insert(id.clone(), id);
    }

    // Edge direction: dependency -> dependent.
    let ids: Vec<String> = cfg
        .task
        .iter()
        .map(|(key, task)| task.effective_id(key))
        .collect();
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
    for id in &ids {
        graph.add_node(id.as_str());
    }

    let mut reported = HashSet::new();
    for ((key, task), id) in cfg.task.iter().zip(&ids) {
        for dep in &task.depends_on {
            match by_name.get(dep) {
                Some(dep_id) => {
                    if let Some(node) = ids.iter().find(|i| *i == dep_id) {
                        graph.add_edge(node.as_str(), id.as_str(), ());
                    }
                }
                None => {
                    if reported.insert((key.clone(), dep.clone())) {
                        warnings.push(format!(
                            "task '{}' depends on unknown task '{}'",
                            key, dep
                        ));
                    }
                }
            }
        }
    }

    if let Err(cycle) = toposort(&graph, None) {
        warnings.push(format!(
            "depends_on cycle involving task '{}'; the re-entered task will be skipped at run time",
            cycle.node_id()
        ));
    }

    warnings
}
