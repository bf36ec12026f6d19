use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use taskmake::engine::OutputSink;
use taskmake::exec::{Invocation, ProcessBackend, TERMINATED_EXIT_CODE};
use taskmake::inventory::BoxFuture;
use tokio::sync::watch;

type Hook = Arc<dyn Fn(&Invocation) + Send + Sync>;

/// A fake process backend that:
/// - records every invocation, in start order
/// - prints `fake: <command line>` to the run's output
/// - runs an optional per-task hook (e.g. to stamp output files on a
///   `MockFileSystem`)
/// - returns a scripted exit code per task id (default 0)
#[derive(Clone, Default)]
pub struct FakeBackend {
    invocations: Arc<Mutex<Vec<Invocation>>>,
    exit_codes: Arc<Mutex<HashMap<String, i32>>>,
    hooks: Arc<Mutex<HashMap<String, Hook>>>,
    delay: Option<Duration>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every invocation take `delay` (cancellable).
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn exit_code(&self, task: &str, code: i32) {
        self.exit_codes.lock().unwrap().insert(task.to_string(), code);
    }

    pub fn on_run(&self, task: &str, hook: impl Fn(&Invocation) + Send + Sync + 'static) {
        self.hooks
            .lock()
            .unwrap()
            .insert(task.to_string(), Arc::new(hook));
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().unwrap().clone()
    }

    /// Task ids of every invocation, in start order.
    pub fn ran(&self) -> Vec<String> {
        self.invocations().into_iter().map(|i| i.task).collect()
    }

    pub fn count(&self, task: &str) -> usize {
        self.invocations().iter().filter(|i| i.task == task).count()
    }
}

impl ProcessBackend for FakeBackend {
    fn run(
        &self,
        invocation: Invocation,
        output: OutputSink,
        mut cancel: watch::Receiver<bool>,
    ) -> BoxFuture<'static, i32> {
        let this = self.clone();

        Box::pin(async move {
            this.invocations.lock().unwrap().push(invocation.clone());
            output.line(format!("fake: {}", invocation.command_line()));

            if let Some(delay) = this.delay {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = async {
                        while !*cancel.borrow_and_update() {
                            if cancel.changed().await.is_err() {
                                std::future::pending::<()>().await;
                            }
                        }
                    } => return TERMINATED_EXIT_CODE,
                }
            }

            let hook = this.hooks.lock().unwrap().get(&invocation.task).cloned();
            if let Some(hook) = hook {
                hook(&invocation);
            }

            this.exit_codes
                .lock()
                .unwrap()
                .get(&invocation.task)
                .copied()
                .unwrap_or(0)
        })
    }
}
