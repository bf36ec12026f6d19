// src/engine/executor.rs

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use crate::errors::{BuildError, Result, TaskmakeError};
use crate::exec::{Invocation, ProcessBackend};
use crate::fs::FileSystem;
use crate::inventory::{BoxFuture, Inventory, InventoryCache, TaskProvider};
use crate::task::{Action, TaskSpec};
use crate::types::CyclePolicy;

use super::output::OutputSink;
use super::resolver::{Resolution, ResolvedRunner, Resolver};
use super::session::ExecutionSession;
use super::staleness::assess;
use super::{EngineOptions, PlanNode};

/// Per-root-run state threaded through every runner of that run.
#[derive(Clone)]
struct RunContext {
    output: OutputSink,
    cancel: watch::Receiver<bool>,
}

struct EngineInner {
    cache: InventoryCache,
    fs: Arc<dyn FileSystem>,
    backend: Arc<dyn ProcessBackend>,
    session: Arc<ExecutionSession>,
    on_cycle: CyclePolicy,
}

/// Resolves requested tasks and runs them with their dependencies.
///
/// Cheap to clone; clones share the inventory cache and the session.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

/// A root run in progress.
///
/// `output` yields text chunks (each ending in `\r\n`) until the run and
/// every process it started are done; `exit` yields the final exit code.
pub struct RunHandle {
    pub output: mpsc::UnboundedReceiver<String>,
    pub exit: JoinHandle<i32>,
    cancel: watch::Sender<bool>,
}

impl RunHandle {
    /// Kill every process of this run. Runners waiting on them see a nonzero
    /// exit code and fail as usual.
    pub fn terminate(&self) {
        info!("terminating run");
        let _ = self.cancel.send(true);
    }

    /// Wait for the exit code, dropping any unread output.
    pub async fn wait(self) -> i32 {
        drop(self.output);
        match self.exit.await {
            Ok(code) => code,
            Err(e) => {
                error!(error = %e, "run task failed");
                1
            }
        }
    }

    /// Drain the whole output stream, then return it with the exit code.
    pub async fn collect(mut self) -> (String, i32) {
        let mut text = String::new();
        while let Some(chunk) = self.output.recv().await {
            text.push_str(&chunk);
        }
        let code = match self.exit.await {
            Ok(code) => code,
            Err(e) => {
                error!(error = %e, "run task failed");
                1
            }
        };
        (text, code)
    }
}

impl Engine {
    pub fn new(
        provider: Arc<dyn TaskProvider>,
        fs: Arc<dyn FileSystem>,
        backend: Arc<dyn ProcessBackend>,
        options: EngineOptions,
    ) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                cache: InventoryCache::new(provider, options.inventory_ttl),
                fs,
                backend,
                session: ExecutionSession::new(),
                on_cycle: options.on_cycle,
            }),
        }
    }

    pub fn session(&self) -> &Arc<ExecutionSession> {
        &self.inner.session
    }

    pub fn cache(&self) -> &InventoryCache {
        &self.inner.cache
    }

    /// Force the next lookup to re-read the task inventory.
    pub fn invalidate(&self) {
        self.inner.cache.invalidate();
    }

    pub async fn inventory(&self) -> Result<Arc<Inventory>> {
        self.inner.cache.get().await
    }

    /// Start running `task` and everything it depends on.
    ///
    /// Fails only if the inventory cannot be loaded or `task` is unknown;
    /// everything after that is reported on the returned output stream.
    pub async fn resolve_and_run(&self, task: &str) -> Result<RunHandle> {
        let inventory = self.inner.cache.get().await?;
        let spec = inventory
            .find(task)
            .ok_or_else(|| TaskmakeError::TaskNotFound(task.to_string()))?;

        let (output, rx) = OutputSink::channel();
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let ctx = RunContext {
            output,
            cancel: cancel_rx,
        };

        let exit = tokio::spawn(self.run(ResolvedRunner::new(spec), ctx));
        Ok(RunHandle {
            output: rx,
            exit,
            cancel: cancel_tx,
        })
    }

    /// Run `task` to completion, writing its output to `output`.
    pub async fn run_task(&self, task: &str, output: OutputSink) -> Result<i32> {
        let inventory = self.inner.cache.get().await?;
        let spec = inventory
            .find(task)
            .ok_or_else(|| TaskmakeError::TaskNotFound(task.to_string()))?;
        let (_cancel_tx, cancel) = watch::channel(false);
        Ok(self
            .run(ResolvedRunner::new(spec), RunContext { output, cancel })
            .await)
    }

    /// Dependency tree `task` would run, without touching the filesystem
    /// beyond existence checks or the shared session.
    pub async fn plan(&self, task: &str) -> Result<PlanNode> {
        let inventory = self.inner.cache.get().await?;
        let spec = inventory
            .find(task)
            .ok_or_else(|| TaskmakeError::TaskNotFound(task.to_string()))?;

        let scratch = ExecutionSession::new();
        let mut ancestors = Vec::new();
        Ok(self.plan_node(
            &inventory,
            &scratch,
            ResolvedRunner::new(spec),
            &mut ancestors,
        ))
    }

    fn plan_node(
        &self,
        inventory: &Inventory,
        session: &ExecutionSession,
        runner: ResolvedRunner,
        ancestors: &mut Vec<String>,
    ) -> PlanNode {
        let action = runner.spec.action.as_ref().map(ToString::to_string);
        if ancestors.contains(&runner.id) {
            return PlanNode {
                id: runner.id,
                action,
                cycle: true,
                diagnostics: Vec::new(),
                children: Vec::new(),
            };
        }

        let resolution = Resolver::new(inventory, self.inner.fs.as_ref(), session)
            .resolve_at(&runner.spec, runner.depth);
        let (children, diagnostics) = (resolution.runners, resolution.diagnostics);

        ancestors.push(runner.id.clone());
        let children = children
            .into_iter()
            .map(|child| self.plan_node(inventory, session, child, ancestors))
            .collect();
        ancestors.pop();

        PlanNode {
            id: runner.id,
            action,
            cycle: false,
            diagnostics,
            children,
        }
    }

    fn run(&self, runner: ResolvedRunner, ctx: RunContext) -> BoxFuture<'static, i32> {
        let engine = self.clone();
        Box::pin(async move {
            let claim = runner.completion.as_ref().map(|c| c.guard());
            let code = engine.run_runner(runner, ctx).await;
            if let Some(claim) = claim {
                claim.finish(code);
            }
            code
        })
    }

    async fn run_runner(&self, runner: ResolvedRunner, ctx: RunContext) -> i32 {
        let id = runner.id.clone();
        let out = &ctx.output;

        let Some(_guard) = self.inner.session.enter(&id) else {
            return self.cycle(&id, out);
        };

        let Some(action) = runner.spec.action.clone() else {
            out.error(&BuildError::Configuration { task: id });
            return 1;
        };

        // Staleness.
        if !runner.spec.inputs.is_empty() {
            let fs = Arc::clone(&self.inner.fs);
            let spec = Arc::clone(&runner.spec);
            match tokio::task::spawn_blocking(move || assess(fs.as_ref(), &spec)).await {
                Ok(assessment) => {
                    for warning in &assessment.warnings {
                        out.error(warning);
                    }
                    if !assessment.needs_run {
                        out.status(&id, format!("Task '{id}' is up to date - skipping"));
                        return 0;
                    }
                }
                Err(e) => warn!(task = %id, error = %e, "staleness check failed; running task"),
            }
        }

        self.run_dependencies_and_body(&runner, action, &ctx).await
    }

    /// Report a re-entered runner or a wait that would deadlock. Returns the
    /// exit code the cycle policy assigns to it.
    fn cycle(&self, id: &str, out: &OutputSink) -> i32 {
        let skipped = self.inner.on_cycle == CyclePolicy::Skip;
        out.error(&BuildError::CircularDependency {
            task: id.to_string(),
            skipped,
        });
        if skipped { 0 } else { 1 }
    }

    async fn run_dependencies_and_body(&self, runner: &ResolvedRunner, action: Action, ctx: &RunContext) -> i32 {
        let id = &runner.id;

        let Some(resolution) = self.resolve(runner, &ctx.output).await else {
            return 1;
        };

        if !resolution.is_empty() {
            let code = self.run_dependencies(id, resolution, ctx).await;
            if code != 0 {
                ctx.output.error(&BuildError::DependencyFailure {
                    task: id.clone(),
                    exit_code: code,
                });
                return code;
            }
        }

        let code = self.run_body(runner, action, ctx).await;
        if runner.spec.ignore_errors && code != 0 {
            debug!(task = %id, exit_code = code, "ignoring failure");
            return 0;
        }
        code
    }

    /// Resolve a runner's dependencies against the current inventory. `None`
    /// if the inventory cannot be loaded.
    async fn resolve(&self, runner: &ResolvedRunner, out: &OutputSink) -> Option<Resolution> {
        let inventory = match self.inner.cache.get().await {
            Ok(inventory) => inventory,
            Err(e) => {
                error!(task = %runner.id, error = %e, "loading task inventory");
                out.line(format!("Error: {e}"));
                return None;
            }
        };
        let resolution = Resolver::new(&inventory, self.inner.fs.as_ref(), &self.inner.session)
            .resolve_at(&runner.spec, runner.depth);
        for diagnostic in &resolution.diagnostics {
            out.error(diagnostic);
        }
        Some(resolution)
    }

    /// Start every claimed dependency at once, join the ones claimed
    /// elsewhere, and wait for all of them. Returns the first nonzero exit
    /// code observed, or 0.
    async fn run_dependencies(&self, id: &str, resolution: Resolution, ctx: &RunContext) -> i32 {
        ctx.output.status(id, format!("Task '{id}': Running dependencies..."));

        let session = &self.inner.session;
        let direct: Vec<String> = resolution.runners.iter().map(|r| r.id.clone()).collect();
        let _blocked = session.block_on(id, &direct);

        let mut first_failure = 0;
        let mut set = JoinSet::new();
        for dep in resolution.runners {
            debug!(task = %id, dependency = %dep.id, "starting dependency");
            set.spawn(self.run(dep, ctx.clone()));
        }
        for awaited in resolution.awaited {
            if !session.try_wait(id, &awaited.id) {
                let code = self.cycle(&awaited.id, &ctx.output);
                if code != 0 && first_failure == 0 {
                    first_failure = code;
                }
                continue;
            }
            debug!(task = %id, dependency = %awaited.id, "waiting for shared dependency");
            set.spawn(async move { awaited.completion.wait().await });
        }

        while let Some(joined) = set.join_next().await {
            let code = match joined {
                Ok(code) => code,
                Err(e) => {
                    error!(task = %id, error = %e, "dependency task panicked");
                    1
                }
            };
            if code != 0 && first_failure == 0 {
                first_failure = code;
            }
        }
        first_failure
    }

    async fn run_body(&self, runner: &ResolvedRunner, action: Action, ctx: &RunContext) -> i32 {
        let id = &runner.id;
        ctx.output
            .status(id, format!("Task '{id}': Executing: {action}"));

        let code = match action {
            Action::Task { task } => self.forward(runner, &task, ctx).await,
            Action::Command { .. } | Action::Process { .. } => match Invocation::for_task(&runner.spec) {
                Some(invocation) => {
                    self.inner
                        .backend
                        .run(invocation, ctx.output.clone(), ctx.cancel.clone())
                        .await
                }
                None => 1,
            },
        };

        ctx.output
            .status(id, format!("Command exited with code {code}"));
        code
    }

    /// Run another declared task in place of this runner's body.
    async fn forward(&self, runner: &ResolvedRunner, name: &str, ctx: &RunContext) -> i32 {
        let inventory = match self.inner.cache.get().await {
            Ok(inventory) => inventory,
            Err(e) => {
                ctx.output.line(format!("Error: {e}"));
                return 1;
            }
        };
        let Some(target) = inventory.find(name) else {
            ctx.output
                .error(&BuildError::ForwardTargetMissing { name: name.to_string() });
            return 1;
        };

        let target = match &runner.placeholders {
            Some(table) => match target.instantiate(table) {
                Ok(spec) => Arc::new(spec),
                Err(e) => {
                    warn!(task = %runner.id, target = %name, error = %format!("{e:#}"), "substituting forwarded task");
                    target
                }
            },
            None => target,
        };

        debug!(task = %runner.id, target = %target.id(), "forwarding");
        self.run(ResolvedRunner::new(target).with_depth(runner.depth + 1), ctx.clone())
            .await
    }
}
