// src/engine/mod.rs

//! Build engine.
//!
//! A requested task becomes a root runner. Running a runner:
//! - guards against re-entry (cycle detection) through the [`session`],
//! - skips it when its outputs are fresh ([`staleness`]),
//! - resolves and runs its dependencies concurrently ([`resolver`]),
//! - runs its action through the process backend,
//!
//! with everything written to an [`output::OutputSink`]. The async driver
//! is [`executor::Engine`].

pub mod executor;
pub mod output;
pub mod resolver;
pub mod session;
pub mod staleness;

use std::fmt;
use std::time::Duration;

use crate::config::ConfigFile;
use crate::errors::BuildError;
use crate::inventory::DEFAULT_INVENTORY_TTL;
use crate::types::CyclePolicy;

pub use executor::{Engine, RunHandle};
pub use output::OutputSink;
pub use resolver::{AwaitedRunner, MAX_RESOLUTION_DEPTH, Resolution, ResolvedRunner, Resolver};
pub use session::{BlockGuard, Claim, Completion, CompletionGuard, ExecutionSession, RunGuard};
pub use staleness::{Assessment, assess, needs_run};

/// Engine tuning taken from the `[config]` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    pub inventory_ttl: Duration,
    pub on_cycle: CyclePolicy,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            inventory_ttl: DEFAULT_INVENTORY_TTL,
            on_cycle: CyclePolicy::default(),
        }
    }
}

impl From<&ConfigFile> for EngineOptions {
    fn from(cfg: &ConfigFile) -> Self {
        Self {
            inventory_ttl: cfg.inventory_ttl(),
            on_cycle: cfg.on_cycle(),
        }
    }
}

/// One runner in a dry-run plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanNode {
    pub id: String,
    /// Rendered action, `None` for tasks without one.
    pub action: Option<String>,
    /// This runner is already on the path from the root.
    pub cycle: bool,
    pub diagnostics: Vec<BuildError>,
    pub children: Vec<PlanNode>,
}

impl PlanNode {
    /// Ids in the order the tree lists them (pre-order).
    pub fn ids(&self) -> Vec<&str> {
        let mut out = vec![self.id.as_str()];
        for child in &self.children {
            out.extend(child.ids());
        }
        out
    }

    fn render(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let indent = "  ".repeat(depth);
        write!(f, "{indent}{}", self.id)?;
        match (&self.action, self.cycle) {
            (_, true) => write!(f, " (cycle)")?,
            (Some(action), false) => write!(f, ": {action}")?,
            (None, false) => write!(f, ": <no action>")?,
        }
        writeln!(f)?;
        for diagnostic in &self.diagnostics {
            writeln!(f, "{indent}  ! {diagnostic}")?;
        }
        for child in &self.children {
            child.render(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for PlanNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render(f, 0)
    }
}
