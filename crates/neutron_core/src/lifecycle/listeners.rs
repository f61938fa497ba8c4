//! Meta-listeners: observers of registration changes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::callback::Callback;

type ListenerFn<A> = dyn Fn(&Callback<A>) + Send + Sync;

/// An ordered set of meta-listeners.
pub(crate) struct ListenerSet<A> {
    next_id: AtomicU64,
    listeners: Mutex<Vec<(u64, Arc<ListenerFn<A>>)>>,
}

impl<A> ListenerSet<A> {
    pub(crate) fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            listeners: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn add<F>(&self, listener: F) -> u64
    where
        F: Fn(&Callback<A>) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.lock().push((id, Arc::new(listener)));
        id
    }

    pub(crate) fn remove(&self, id: u64) {
        self.listeners.lock().retain(|(listener_id, _)| *listener_id != id);
    }

    /// Calls every listener on the current thread, from a snapshot, so a
    /// listener may subscribe, cancel or register without deadlocking.
    pub(crate) fn notify(&self, callback: &Callback<A>) {
        let snapshot: Vec<Arc<ListenerFn<A>>> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in snapshot {
            listener(callback);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners.lock().len()
    }
}

/// Capability to cancel a meta-listener subscription.
///
/// Dropping it keeps the listener subscribed; call [`Subscription::cancel`]
/// to remove it. Cancelling does not interrupt a notification already
/// running.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub(crate) fn new<A: Send + 'static>(set: Weak<ListenerSet<A>>, id: u64) -> Self {
        Self {
            cancel: Some(Box::new(move || {
                if let Some(set) = set.upgrade() {
                    set.remove(id);
                }
            })),
        }
    }

    /// Removes the listener. Later registration changes no longer reach it.
    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}
