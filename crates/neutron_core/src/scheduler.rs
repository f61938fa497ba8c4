//! # Task Scheduler
//!
//! "Spawn" in Neutron means: run a task independently of the caller and
//! return immediately. The scheduler is a thin handle on a tokio runtime so
//! every registry spawns onto the runtime the application chose.

use std::future::Future;
use std::pin::Pin;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::error::{NeutronError, NeutronResult};

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Spawns independent tasks onto a tokio runtime.
#[derive(Clone, Debug)]
pub struct Scheduler {
    handle: Handle,
}

impl Scheduler {
    /// Uses the runtime the caller is currently running inside.
    pub fn current() -> NeutronResult<Self> {
        Handle::try_current()
            .map(Self::from_handle)
            .map_err(|_| NeutronError::NoRuntime)
    }

    /// Uses an explicit runtime handle.
    #[must_use]
    pub fn from_handle(handle: Handle) -> Self {
        Self { handle }
    }

    /// Runs `task` independently; the caller never waits for it.
    pub fn spawn<F>(&self, task: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handle.spawn(task)
    }

    /// The underlying runtime handle.
    #[must_use]
    pub fn handle(&self) -> &Handle {
        &self.handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_without_runtime() {
        assert_eq!(Scheduler::current().unwrap_err(), NeutronError::NoRuntime);
    }

    #[tokio::test]
    async fn test_spawn_runs_task() {
        let scheduler = Scheduler::current().unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel();
        scheduler.spawn(async move {
            let _ = tx.send(7);
        });
        assert_eq!(rx.await.unwrap(), 7);
    }
}
