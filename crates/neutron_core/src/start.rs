//! # Start Gate
//!
//! The process-wide start flag. It flips from `false` to `true` exactly once.
//!
//! ```text
//!   declare phase                 │ running phase
//!   ──────────────────────────────┼─────────────────────────────
//!   on_start(task)  -> queued     │ on_start(task) -> spawned now
//!   await_start()   -> parked     │ await_start()  -> returns
//!                  start() ───────┘ (release waiters, spawn queue)
//! ```
//!
//! Async callers park on a `watch` channel; threads outside the runtime park
//! on a condvar. Neither wait has a timeout: a gate that is never started
//! keeps its waiters parked forever.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Condvar, Mutex};
use tokio::sync::watch;

use crate::scheduler::{BoxFuture, Scheduler};

/// The start flag plus everything waiting on it.
pub struct StartGate {
    started: AtomicBool,
    /// Tasks queued by `on_start` before the gate opened.
    queued: Mutex<Vec<BoxFuture<'static, ()>>>,
    signal: watch::Sender<bool>,
    /// Parking spot for blocking waiters.
    parked: Mutex<()>,
    condvar: Condvar,
    scheduler: Scheduler,
}

impl StartGate {
    /// Creates a closed gate.
    #[must_use]
    pub fn new(scheduler: Scheduler) -> Self {
        let (signal, _) = watch::channel(false);
        Self {
            started: AtomicBool::new(false),
            queued: Mutex::new(Vec::new()),
            signal,
            parked: Mutex::new(()),
            condvar: Condvar::new(),
            scheduler,
        }
    }

    /// Returns whether `start` has run.
    #[inline]
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Opens the gate.
    ///
    /// The first call releases every parked waiter and spawns every queued
    /// `on_start` task, each independently. Later calls do nothing.
    /// Returns `true` only for the call that opened the gate.
    pub fn start(&self) -> bool {
        let queued = {
            let mut queued = self.queued.lock();
            if self.started.swap(true, Ordering::AcqRel) {
                return false;
            }
            std::mem::take(&mut *queued)
        };

        self.signal.send_replace(true);
        {
            let _guard = self.parked.lock();
            self.condvar.notify_all();
        }

        tracing::info!("Neutron started ({} queued start tasks)", queued.len());
        for task in queued {
            self.scheduler.spawn(task);
        }
        true
    }

    /// Waits until the gate is open. Returns immediately if it already is.
    pub async fn await_start(&self) {
        if self.is_started() {
            return;
        }
        let mut rx = self.signal.subscribe();
        // The sender lives as long as `self`, so this cannot observe a close.
        let _ = rx.wait_for(|started| *started).await;
    }

    /// Blocks the calling thread until the gate is open.
    ///
    /// Must not be called from a runtime worker that `start` needs to run on.
    pub fn wait_start_blocking(&self) {
        if self.is_started() {
            return;
        }
        let mut guard = self.parked.lock();
        while !self.is_started() {
            self.condvar.wait(&mut guard);
        }
    }

    /// Runs `task` once the gate is open: immediately (spawned) if it already
    /// is, otherwise when `start` runs.
    pub fn on_start<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut queued = self.queued.lock();
        if self.is_started() {
            drop(queued);
            self.scheduler.spawn(task);
        } else {
            queued.push(Box::pin(task));
        }
    }

    /// Number of `on_start` tasks still waiting for the gate.
    #[must_use]
    pub fn queued_len(&self) -> usize {
        self.queued.lock().len()
    }
}

impl std::fmt::Debug for StartGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StartGate")
            .field("started", &self.is_started())
            .field("queued", &self.queued_len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::time::Duration;

    fn gate() -> Arc<StartGate> {
        Arc::new(StartGate::new(Scheduler::current().unwrap()))
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let gate = gate();
        assert!(!gate.is_started());
        assert!(gate.start());
        assert!(!gate.start());
        assert!(gate.is_started());
    }

    #[tokio::test]
    async fn test_await_start_resumes_after_start() {
        let gate = gate();
        let resumed = Arc::new(AtomicUsize::new(0));

        let waiter = {
            let gate = Arc::clone(&gate);
            let resumed = Arc::clone(&resumed);
            tokio::spawn(async move {
                gate.await_start().await;
                resumed.fetch_add(1, Ordering::SeqCst);
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(resumed.load(Ordering::SeqCst), 0);

        gate.start();
        waiter.await.unwrap();
        assert_eq!(resumed.load(Ordering::SeqCst), 1);

        // A second start must not resume anything again.
        gate.start();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(resumed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_await_start_after_start_is_immediate() {
        let gate = gate();
        gate.start();
        tokio::time::timeout(Duration::from_millis(100), gate.await_start())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_on_start_queues_until_start() {
        let gate = gate();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        for i in 0..3 {
            let tx = tx.clone();
            gate.on_start(async move {
                let _ = tx.send(i);
            });
        }
        assert_eq!(gate.queued_len(), 3);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(rx.try_recv().is_err());

        gate.start();
        assert_eq!(gate.queued_len(), 0);

        let mut seen = Vec::new();
        for _ in 0..3 {
            seen.push(rx.recv().await.unwrap());
        }
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_on_start_after_start_runs_now() {
        let gate = gate();
        gate.start();

        let (tx, rx) = tokio::sync::oneshot::channel();
        gate.on_start(async move {
            let _ = tx.send(());
        });
        assert_eq!(gate.queued_len(), 0);
        rx.await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_wait_start_blocking() {
        let gate = gate();
        let thread = {
            let gate = Arc::clone(&gate);
            std::thread::spawn(move || {
                gate.wait_start_blocking();
                gate.is_started()
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        gate.start();
        assert!(thread.join().unwrap());
    }
}
