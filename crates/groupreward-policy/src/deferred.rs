//! Cancellable one-shot tasks keyed by actor.
//!
//! Spawn effects have to land after the host finishes initializing the
//! pawn, so they run a short delay after the event. Each pending task is
//! keyed by its [`ActorHandle`]: scheduling again for the same actor
//! aborts the older task, and [`DeferredTasks::cancel_all`] aborts
//! everything on shutdown. Tasks must re-check the actor when they fire;
//! the handle may be stale by then.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::trace;

use crate::host::ActorHandle;

/// Pending one-shot tasks, at most one per actor.
#[derive(Debug)]
pub struct DeferredTasks {
    runtime: Handle,
    pending: Mutex<HashMap<ActorHandle, JoinHandle<()>>>,
}

impl DeferredTasks {
    /// Create a task set that spawns onto `runtime`.
    ///
    /// Scheduling works from any thread, including host threads that are
    /// not part of the runtime.
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Create a task set on the runtime of the calling context.
    ///
    /// Returns `None` outside a tokio runtime.
    pub fn from_current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }

    /// Run `task` after `delay`, replacing any pending task for `actor`.
    pub fn schedule<F>(&self, actor: ActorHandle, delay: Duration, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let join = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            task();
        });

        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        pending.retain(|_, handle| !handle.is_finished());
        if let Some(previous) = pending.insert(actor, join) {
            trace!(slot = actor.slot, "replacing pending deferred task");
            previous.abort();
        }
    }

    /// Abort the pending task for `actor`. Returns whether one was pending.
    pub fn cancel(&self, actor: ActorHandle) -> bool {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        match pending.remove(&actor) {
            Some(handle) => {
                let was_pending = !handle.is_finished();
                handle.abort();
                was_pending
            }
            None => false,
        }
    }

    /// Abort every pending task.
    pub fn cancel_all(&self) {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        for (_, handle) in pending.drain() {
            handle.abort();
        }
    }

    /// Number of tasks that have not fired yet.
    pub fn pending(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|handle| !handle.is_finished())
            .count()
    }
}

impl Drop for DeferredTasks {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
