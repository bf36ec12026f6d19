// src/engine/session.rs

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;
use tracing::debug;

/// Exit code of a claimed runner, shared with every dependent that did not
/// get to run it.
#[derive(Debug, Clone)]
pub struct Completion {
    tx: Arc<watch::Sender<Option<i32>>>,
}

impl Completion {
    fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Record the exit code. Only the first call counts.
    pub fn finish(&self, code: i32) {
        self.tx.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(code);
            true
        });
    }

    pub fn code(&self) -> Option<i32> {
        *self.tx.borrow()
    }

    /// Wait until the owning runner has finished.
    pub async fn wait(&self) -> i32 {
        let mut rx = self.tx.subscribe();
        match rx.wait_for(Option::is_some).await {
            Ok(code) => {
                let code = *code;
                code.unwrap_or(1)
            }
            Err(_) => 1,
        }
    }

    /// Guard that fails the completion if the owner is dropped unfinished.
    pub fn guard(&self) -> CompletionGuard {
        CompletionGuard(self.clone())
    }
}

/// Held by the runner that owns a claim while it executes.
#[derive(Debug)]
pub struct CompletionGuard(Completion);

impl CompletionGuard {
    pub fn finish(self, code: i32) {
        self.0.finish(code);
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        self.0.finish(1);
    }
}

/// Outcome of [`ExecutionSession::claim`].
#[derive(Debug, Clone)]
pub enum Claim {
    /// First claim: the caller schedules the runner and finishes `Completion`.
    Owner(Completion),
    /// Someone else already scheduled it; wait on `Completion` instead.
    Joined(Completion),
}

#[derive(Debug, Default)]
struct SessionState {
    running: HashSet<String>,
    claims: HashMap<String, Completion>,
    /// Dependent id -> ids it is currently blocked on.
    blocked_on: HashMap<String, HashSet<String>>,
}

impl SessionState {
    fn reaches(&self, from: &str, to: &str) -> bool {
        let mut stack = vec![from];
        let mut seen = HashSet::new();
        while let Some(id) = stack.pop() {
            if id == to {
                return true;
            }
            if !seen.insert(id) {
                continue;
            }
            if let Some(next) = self.blocked_on.get(id) {
                stack.extend(next.iter().map(String::as_str));
            }
        }
        false
    }
}

/// Process-wide bookkeeping shared by every run of one [`Engine`](super::Engine).
///
/// `running` holds the ids currently between entry and exit of a runner; it
/// is the re-entry guard. `claims` holds the ids some resolution already
/// scheduled, each with its [`Completion`], so a runner is scheduled once and
/// later dependents wait for it. `blocked_on` is the wait-for graph used to
/// refuse a wait that would deadlock. Claims are cleared when `running`
/// drains, so the next independent build starts clean.
#[derive(Debug, Default)]
pub struct ExecutionSession {
    state: Mutex<SessionState>,
}

impl ExecutionSession {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Mark `id` as running. Returns `None` if it already is.
    pub fn enter(self: &Arc<Self>, id: &str) -> Option<RunGuard> {
        if !self.lock().running.insert(id.to_string()) {
            return None;
        }
        Some(RunGuard {
            session: Arc::clone(self),
            id: id.to_string(),
        })
    }

    /// Claim `id` for scheduling.
    pub fn claim(&self, id: &str) -> Claim {
        let mut state = self.lock();
        if let Some(existing) = state.claims.get(id) {
            return Claim::Joined(existing.clone());
        }
        let completion = Completion::new();
        state.claims.insert(id.to_string(), completion.clone());
        Claim::Owner(completion)
    }

    pub fn is_claimed(&self, id: &str) -> bool {
        self.lock().claims.contains_key(id)
    }

    pub fn is_running(&self, id: &str) -> bool {
        self.lock().running.contains(id)
    }

    /// Record that `dependent` runs `dependencies` itself and waits for them.
    /// The edges go away when the returned guard drops.
    pub fn block_on(self: &Arc<Self>, dependent: &str, dependencies: &[String]) -> BlockGuard {
        let mut state = self.lock();
        state
            .blocked_on
            .entry(dependent.to_string())
            .or_default()
            .extend(dependencies.iter().cloned());
        BlockGuard {
            session: Arc::clone(self),
            dependent: dependent.to_string(),
        }
    }

    /// Record that `dependent` waits for the claimed runner `awaited`.
    ///
    /// Returns `false`, recording nothing, if `awaited` is itself (directly or
    /// transitively) blocked on `dependent`.
    pub fn try_wait(&self, dependent: &str, awaited: &str) -> bool {
        let mut state = self.lock();
        if state.reaches(awaited, dependent) {
            return false;
        }
        state
            .blocked_on
            .entry(dependent.to_string())
            .or_default()
            .insert(awaited.to_string());
        true
    }

    /// True when nothing is running, claimed or blocked.
    pub fn is_idle(&self) -> bool {
        let state = self.lock();
        state.running.is_empty() && state.claims.is_empty() && state.blocked_on.is_empty()
    }

    fn leave(&self, id: &str) {
        let mut state = self.lock();
        state.running.remove(id);
        if state.running.is_empty() && !state.claims.is_empty() {
            debug!(cleared = state.claims.len(), "last runner finished; clearing session");
            state.claims.clear();
        }
    }

    fn unblock(&self, dependent: &str) {
        self.lock().blocked_on.remove(dependent);
    }
}

/// Removes its id from the running set when dropped, on every exit path.
#[derive(Debug)]
pub struct RunGuard {
    session: Arc<ExecutionSession>,
    id: String,
}

impl RunGuard {
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.session.leave(&self.id);
    }
}

/// Clears a dependent's wait-for edges when dropped.
#[derive(Debug)]
pub struct BlockGuard {
    session: Arc<ExecutionSession>,
    dependent: String,
}

impl Drop for BlockGuard {
    fn drop(&mut self) {
        self.session.unblock(&self.dependent);
    }
}
