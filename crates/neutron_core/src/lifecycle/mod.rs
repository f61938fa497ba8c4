//! # Lifecycle Registry
//!
//! A lifecycle is a named fan-out point: providers register callbacks, and
//! whoever owns the lifecycle fires it with a value every callback receives.
//!
//! ## Execution Models
//!
//! ```text
//! Series:      fire ─> c1 ─(done)─> c2 ─(done)─> c3 ─(done)─> return
//!
//! Concurrent:  fire ─┬─> spawn c1
//!                    ├─> spawn c2        (none awaited)
//!                    ├─> spawn c3
//!                    └─> return
//! ```
//!
//! ## States
//!
//! `Idle` while nothing is registered, `Active` otherwise.
//!
//! ## Mutation During Dispatch
//!
//! `fire` dispatches from a snapshot taken when it starts. Registering or
//! unregistering while a fire is in flight affects the next fire only.
//! Removal keeps survivors in their registration order.
//!
//! ## Catch-up Pattern
//!
//! On-registered listeners run synchronously inside `register`, so they can
//! replay already-known state to the new callback:
//!
//! ```rust,ignore
//! let known = players.clone();
//! on_player_added.on_registered(move |callback| {
//!     for player in known.snapshot() {
//!         scheduler.spawn(callback.call(player));
//!     }
//! });
//! ```

mod callback;
mod listeners;

pub use callback::Callback;
pub use listeners::Subscription;

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::scheduler::Scheduler;
use listeners::ListenerSet;

/// How `fire` fans out to registered callbacks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExecutionModel {
    /// Every callback is spawned independently; `fire` never waits.
    Concurrent,
    /// Callbacks run one at a time in registration order; `fire` waits for each.
    Series,
}

/// Whether a lifecycle has any registrations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// No registrations.
    Idle,
    /// At least one registration.
    Active,
}

/// A callback together with the category it was registered under.
#[derive(Clone, Debug)]
pub struct Registration<A> {
    /// The registered callback.
    pub callback: Callback<A>,
    /// Free-form label, e.g. the name of the registering provider.
    pub category: String,
}

struct LifecycleInner<A> {
    name: String,
    model: ExecutionModel,
    scheduler: Scheduler,
    registrations: Mutex<Vec<Registration<A>>>,
    registered: Arc<ListenerSet<A>>,
    unregistered: Arc<ListenerSet<A>>,
}

/// A named lifecycle. Cloning yields another handle to the same lifecycle.
pub struct Lifecycle<A> {
    inner: Arc<LifecycleInner<A>>,
}

impl<A> Clone for Lifecycle<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: Clone + Send + 'static> Lifecycle<A> {
    /// Creates an idle lifecycle. The execution model is fixed for its lifetime.
    pub fn new(name: impl Into<String>, model: ExecutionModel, scheduler: Scheduler) -> Self {
        Self {
            inner: Arc::new(LifecycleInner {
                name: name.into(),
                model,
                scheduler,
                registrations: Mutex::new(Vec::new()),
                registered: Arc::new(ListenerSet::new()),
                unregistered: Arc::new(ListenerSet::new()),
            }),
        }
    }

    /// The lifecycle's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The execution model chosen at construction.
    #[must_use]
    pub fn execution_model(&self) -> ExecutionModel {
        self.inner.model
    }

    /// Idle or active.
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        if self.is_empty() {
            LifecycleState::Idle
        } else {
            LifecycleState::Active
        }
    }

    /// Number of registrations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.registrations.lock().len()
    }

    /// Returns whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.registrations.lock().is_empty()
    }

    /// Current registrations, in dispatch order.
    #[must_use]
    pub fn registrations(&self) -> Vec<Registration<A>> {
        self.inner.registrations.lock().clone()
    }

    /// Distinct categories, in order of first registration.
    #[must_use]
    pub fn categories(&self) -> Vec<String> {
        let registrations = self.inner.registrations.lock();
        let mut categories: Vec<String> = Vec::new();
        for registration in registrations.iter() {
            if !categories.contains(&registration.category) {
                categories.push(registration.category.clone());
            }
        }
        categories
    }

    /// Callbacks registered under `category`, in dispatch order.
    #[must_use]
    pub fn callbacks_in(&self, category: &str) -> Vec<Callback<A>> {
        self.inner
            .registrations
            .lock()
            .iter()
            .filter(|registration| registration.category == category)
            .map(|registration| registration.callback.clone())
            .collect()
    }

    /// Appends `callback` and notifies on-registered listeners.
    ///
    /// Registering the same callback twice registers it twice.
    pub fn register(&self, callback: Callback<A>, category: impl Into<String>) {
        let category = category.into();
        tracing::debug!("{}: register callback ({})", self.inner.name, category);
        self.inner.registrations.lock().push(Registration {
            callback: callback.clone(),
            category,
        });
        self.inner.registered.notify(&callback);
    }

    /// Removes the first registration of `callback`.
    ///
    /// Returns `false` (and notifies no one) if it was not registered.
    pub fn unregister(&self, callback: &Callback<A>) -> bool {
        let removed = {
            let mut registrations = self.inner.registrations.lock();
            registrations
                .iter()
                .position(|registration| registration.callback.same(callback))
                .map(|index| registrations.remove(index))
        };

        match removed {
            Some(registration) => {
                tracing::debug!(
                    "{}: unregister callback ({})",
                    self.inner.name,
                    registration.category
                );
                self.inner.unregistered.notify(&registration.callback);
                true
            }
            None => false,
        }
    }

    /// Removes every registration, notifying on-unregistered listeners for
    /// each in dispatch order.
    pub fn unregister_all(&self) {
        let removed = std::mem::take(&mut *self.inner.registrations.lock());
        if !removed.is_empty() {
            tracing::debug!("{}: unregister all ({})", self.inner.name, removed.len());
        }
        for registration in &removed {
            self.inner.unregistered.notify(&registration.callback);
        }
    }

    /// Subscribes to registrations. The listener runs synchronously inside
    /// `register`, on the registering thread.
    pub fn on_registered<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Callback<A>) + Send + Sync + 'static,
    {
        let id = self.inner.registered.add(listener);
        Subscription::new(Arc::downgrade(&self.inner.registered), id)
    }

    /// Subscribes to unregistrations.
    pub fn on_unregistered<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Callback<A>) + Send + Sync + 'static,
    {
        let id = self.inner.unregistered.add(listener);
        Subscription::new(Arc::downgrade(&self.inner.unregistered), id)
    }

    /// Number of active on-registered and on-unregistered listeners.
    #[must_use]
    pub fn listener_counts(&self) -> (usize, usize) {
        (self.inner.registered.len(), self.inner.unregistered.len())
    }

    /// Dispatches `args` to every callback registered when the call starts.
    ///
    /// - `Series`: resolves after the last callback finishes. A callback
    ///   that never finishes stalls every later callback and the caller.
    /// - `Concurrent`: spawns each callback and resolves without waiting.
    pub async fn fire(&self, args: A) {
        let snapshot = self.registrations();
        tracing::trace!(
            "{}: fire {:?} to {} callbacks",
            self.inner.name,
            self.inner.model,
            snapshot.len()
        );

        match self.inner.model {
            ExecutionModel::Concurrent => {
                for registration in snapshot {
                    self.inner
                        .scheduler
                        .spawn(registration.callback.call(args.clone()));
                }
            }
            ExecutionModel::Series => {
                for registration in snapshot {
                    registration.callback.call(args.clone()).await;
                }
            }
        }
    }

    /// Runs `fire(args)` as its own task, for callers outside async code.
    pub fn spawn_fire(&self, args: A) -> JoinHandle<()> {
        let lifecycle = self.clone();
        self.inner
            .scheduler
            .spawn(async move { lifecycle.fire(args).await })
    }
}

impl<A> std::fmt::Debug for Lifecycle<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lifecycle")
            .field("name", &self.inner.name)
            .field("model", &self.inner.model)
            .field("registrations", &self.inner.registrations.lock().len())
            .finish()
    }
}
