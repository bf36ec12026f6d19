// src/engine/resolver.rs

//! Dependency resolution: turn a task's `depends_on` list and literal inputs
//! into the runners that have to execute first.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::errors::BuildError;
use crate::fs::FileSystem;
use crate::inventory::{Inventory, WildcardProducer};
use crate::paths::{normalize_str, resolve};
use crate::pattern::template::{FILE, STEM};
use crate::pattern::{PlaceholderTable, is_wild};
use crate::task::TaskSpec;

use super::session::{Claim, Completion, ExecutionSession};

/// How many producer levels may nest below one requested root.
pub const MAX_RESOLUTION_DEPTH: usize = 32;

/// A concrete unit of work: a task (possibly instantiated from a wildcard
/// rule). Its own dependencies are resolved when it starts executing, after
/// its staleness check.
#[derive(Debug, Clone)]
pub struct ResolvedRunner {
    pub id: String,
    pub spec: Arc<TaskSpec>,
    /// Set for runners instantiated from a wildcard rule; also applied to a
    /// task this runner forwards to.
    pub placeholders: Option<PlaceholderTable>,
    /// Levels below the requested root.
    pub depth: usize,
    /// Present when this runner owns a session claim.
    pub completion: Option<Completion>,
}

impl ResolvedRunner {
    /// Unclaimed runner for a declared task, e.g. a requested root.
    pub fn new(spec: Arc<TaskSpec>) -> Self {
        Self {
            id: spec.id(),
            spec,
            placeholders: None,
            depth: 0,
            completion: None,
        }
    }

    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }
}

/// A dependency another runner already claimed; the dependent waits for it.
#[derive(Debug, Clone)]
pub struct AwaitedRunner {
    pub id: String,
    pub completion: Completion,
}

/// Runners plus the soft failures found along the way.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    /// Claimed here; the dependent starts them.
    pub runners: Vec<ResolvedRunner>,
    /// Claimed elsewhere; the dependent waits for them.
    pub awaited: Vec<AwaitedRunner>,
    pub diagnostics: Vec<BuildError>,
}

impl Resolution {
    pub fn is_empty(&self) -> bool {
        self.runners.is_empty() && self.awaited.is_empty()
    }
}

/// Resolves against one inventory snapshot, claiming runners in `session`.
pub struct Resolver<'a> {
    inventory: &'a Inventory,
    fs: &'a dyn FileSystem,
    session: &'a ExecutionSession,
    runners: Vec<ResolvedRunner>,
    awaited: Vec<AwaitedRunner>,
    diagnostics: Vec<BuildError>,
}

impl<'a> Resolver<'a> {
    pub fn new(inventory: &'a Inventory, fs: &'a dyn FileSystem, session: &'a ExecutionSession) -> Self {
        Self {
            inventory,
            fs,
            session,
            runners: Vec::new(),
            awaited: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Dependency runners of a root `task`.
    ///
    /// 1. Explicit `depends_on` names become runners.
    /// 2. Literal inputs go to their exact producer if there is one, else to
    ///    the first wildcard rule matching them (instantiated for that path),
    ///    else they must already exist on disk.
    /// 3. Wildcard inputs are left to the staleness check.
    ///
    /// Ids already claimed in the session are returned as awaited instead.
    pub fn resolve(self, task: &TaskSpec) -> Resolution {
        self.resolve_at(task, 0)
    }

    /// Like [`resolve`](Self::resolve) for a task `depth` levels below the
    /// root.
    pub fn resolve_at(mut self, task: &TaskSpec, depth: usize) -> Resolution {
        for name in &task.depends_on {
            let Some(dep) = self.inventory.find(name) else {
                self.diagnostics.push(BuildError::UnknownDependency {
                    task: task.id(),
                    name: name.clone(),
                });
                continue;
            };
            debug!(task = %task.id(), dependency = %dep.id(), "explicit dependency");
            self.schedule(ResolvedRunner::new(dep).with_depth(depth + 1));
        }

        for input in &task.inputs {
            if is_wild(input) {
                continue;
            }
            let normalized = normalize_str(input);
            self.resolve_input(task, &normalized, depth);
        }

        Resolution {
            runners: self.runners,
            awaited: self.awaited,
            diagnostics: self.diagnostics,
        }
    }

    fn schedule(&mut self, mut runner: ResolvedRunner) {
        match self.session.claim(&runner.id) {
            Claim::Owner(completion) => {
                runner.completion = Some(completion);
                self.runners.push(runner);
            }
            Claim::Joined(completion) => {
                trace!(runner = %runner.id, "already claimed; waiting for it");
                self.awaited.push(AwaitedRunner {
                    id: runner.id,
                    completion,
                });
            }
        }
    }

    fn resolve_input(&mut self, task: &TaskSpec, normalized: &str, depth: usize) {
        let inventory = self.inventory;
        let index = inventory.index();

        if let Some(producer) = index.exact(normalized) {
            if self.too_deep(task, normalized, depth) {
                return;
            }
            debug!(task = %task.id(), input = %normalized, producer = %producer.id(), "exact producer");
            self.schedule(ResolvedRunner::new(Arc::clone(producer)).with_depth(depth + 1));
            return;
        }

        if let Some(rule) = index.wildcard(normalized) {
            if self.too_deep(task, normalized, depth) {
                return;
            }
            if let Some(runner) = self.instantiate(task, normalized, rule, depth) {
                self.schedule(runner);
            }
            return;
        }

        let on_disk = resolve(&task.dir, normalized);
        if !self.fs.exists(&on_disk) {
            self.diagnostics.push(BuildError::UnresolvedInput { path: on_disk });
        }
    }

    /// Copy of a wildcard producer specialised for one requested path.
    fn instantiate(
        &mut self,
        task: &TaskSpec,
        normalized: &str,
        rule: &WildcardProducer,
        depth: usize,
    ) -> Option<ResolvedRunner> {
        let requested: PathBuf = resolve(&task.dir, normalized);
        let mut table = PlaceholderTable::for_path(&requested);
        if let Some(stem) = rule.glob.stem(normalized) {
            table.insert(STEM, stem);
        }

        let mut template = (*rule.task).clone();
        template.outputs = vec![FILE.to_string()];
        let mut spec = match template.instantiate(&table) {
            Ok(spec) => spec,
            Err(e) => {
                warn!(task = %rule.task.id(), input = %normalized, error = %format!("{e:#}"), "instantiating wildcard producer");
                return None;
            }
        };
        spec.label = format!("{} ({})", spec.label, normalized);

        let id = spec.id();
        debug!(
            task = %task.id(),
            input = %normalized,
            rule = %rule.glob.as_str(),
            producer = %id,
            stem = table.get(STEM).unwrap_or(""),
            "wildcard producer instantiated"
        );

        Some(ResolvedRunner {
            id,
            spec: Arc::new(spec),
            placeholders: Some(table),
            depth: depth + 1,
            completion: None,
        })
    }

    fn too_deep(&mut self, task: &TaskSpec, normalized: &str, depth: usize) -> bool {
        if depth < MAX_RESOLUTION_DEPTH {
            return false;
        }
        self.diagnostics.push(BuildError::ResolutionTooDeep {
            task: task.id(),
            path: PathBuf::from(normalized),
        });
        true
    }
}
