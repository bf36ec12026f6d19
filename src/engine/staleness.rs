// src/engine/staleness.rs

//! Timestamp-based freshness check.
//!
//! A task is fresh when every declared output exists and none is older than
//! the newest input. Anything that cannot be proven fresh (no outputs, a
//! missing file, an unreadable timestamp) means the task runs.

use std::path::PathBuf;
use std::time::SystemTime;

use tracing::{debug, trace};

use crate::errors::BuildError;
use crate::fs::FileSystem;
use crate::paths::resolve;
use crate::pattern::{expand, is_wild};
use crate::task::TaskSpec;

/// Whether a task with these concrete inputs and outputs has to run.
pub fn needs_run(fs: &dyn FileSystem, inputs: &[PathBuf], outputs: &[PathBuf]) -> bool {
    if outputs.is_empty() {
        return true;
    }

    let Some(oldest_output) = extreme_mtime(fs, outputs, Extreme::Min) else {
        return true;
    };
    let Some(newest_input) = extreme_mtime(fs, inputs, Extreme::Max) else {
        return true;
    };

    match newest_input {
        Some(newest) => newest > oldest_output.unwrap_or(SystemTime::UNIX_EPOCH),
        // No inputs at all: nothing can be newer than the outputs.
        None => false,
    }
}

#[derive(Clone, Copy)]
enum Extreme {
    Min,
    Max,
}

/// `None` if any file is missing; `Some(None)` for an empty list.
fn extreme_mtime(fs: &dyn FileSystem, files: &[PathBuf], which: Extreme) -> Option<Option<SystemTime>> {
    let mut acc: Option<SystemTime> = None;
    for file in files {
        let modified = match fs.modified(file) {
            Ok(t) => t,
            Err(e) => {
                trace!(file = ?file, error = %e, "no timestamp; treating as missing");
                return None;
            }
        };
        acc = Some(match (acc, which) {
            (None, _) => modified,
            (Some(cur), Extreme::Min) => cur.min(modified),
            (Some(cur), Extreme::Max) => cur.max(modified),
        });
    }
    Some(acc)
}

/// Outcome of checking one task against the filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assessment {
    pub needs_run: bool,
    pub inputs: Vec<PathBuf>,
    pub outputs: Vec<PathBuf>,
    /// Directory-read problems hit while expanding inputs or outputs.
    pub warnings: Vec<BuildError>,
}

/// Expand a task's inputs and outputs under its directory and check them.
///
/// Literal outputs are taken as declared. A wildcard output is expanded; if it
/// matches nothing the task counts as having a missing output.
pub fn assess(fs: &dyn FileSystem, task: &TaskSpec) -> Assessment {
    let dir = task.dir.as_path();
    let expanded_inputs = expand(fs, &task.inputs, dir);
    let mut warnings = expanded_inputs.warnings;

    let mut outputs = Vec::with_capacity(task.outputs.len());
    let mut unmatched_output = false;
    for output in &task.outputs {
        if is_wild(output) {
            let found = expand(fs, std::slice::from_ref(output), dir);
            warnings.extend(found.warnings);
            if found.files.is_empty() {
                debug!(task = %task.id(), output = %output, "wildcard output matches nothing");
                unmatched_output = true;
            }
            outputs.extend(found.files);
        } else {
            outputs.push(resolve(dir, output));
        }
    }

    let needs_run = unmatched_output || needs_run(fs, &expanded_inputs.files, &outputs);
    debug!(
        task = %task.id(),
        inputs = expanded_inputs.files.len(),
        outputs = outputs.len(),
        needs_run,
        "staleness check"
    );

    Assessment {
        needs_run,
        inputs: expanded_inputs.files,
        outputs,
        warnings,
    }
}
