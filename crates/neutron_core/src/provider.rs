//! # Provider Registry
//!
//! The singleton locator. Each provider type has exactly one instance,
//! constructed eagerly when it is declared and handed out as an `Arc`.
//!
//! ## Rules
//!
//! 1. Declare during start-up only. After `start`, `declare` fails.
//! 2. A factory may `get` any provider declared before it.
//! 3. `get` never blocks and never invents a value.
//!
//! ## Example
//!
//! ```rust,ignore
//! let providers = ProviderRegistry::new(Scheduler::current()?);
//! let data = providers.declare(|_| DataStore::open())?;
//! let shop = providers.declare(|registry| {
//!     ShopService::new(registry.get::<DataStore>().expect("declared above"))
//! })?;
//! providers.start();
//! ```

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{NeutronError, NeutronResult};
use crate::lifecycle::Callback;
use crate::scheduler::Scheduler;
use crate::start::StartGate;

struct ProviderEntry {
    type_name: &'static str,
    instance: Arc<dyn Any + Send + Sync>,
}

/// One instance per provider type, plus the start gate.
pub struct ProviderRegistry {
    providers: RwLock<HashMap<TypeId, ProviderEntry>>,
    /// Declaration order, for diagnostics.
    order: RwLock<Vec<&'static str>>,
    gate: Arc<StartGate>,
}

impl ProviderRegistry {
    /// Creates an empty registry with a closed start gate.
    #[must_use]
    pub fn new(scheduler: Scheduler) -> Self {
        Self::with_gate(Arc::new(StartGate::new(scheduler)))
    }

    /// Creates an empty registry sharing an existing start gate.
    #[must_use]
    pub fn with_gate(gate: Arc<StartGate>) -> Self {
        Self {
            providers: RwLock::new(HashMap::new()),
            order: RwLock::new(Vec::new()),
            gate,
        }
    }

    /// Constructs and stores the provider for `T`.
    ///
    /// `factory` runs on the calling thread, before this returns, and may
    /// block. It receives the registry so it can resolve earlier providers.
    ///
    /// # Errors
    ///
    /// - [`NeutronError::DeclaredAfterStart`] once the gate is open; the
    ///   factory is not run and nothing is stored.
    /// - [`NeutronError::DuplicateProvider`] if `T` is already declared.
    pub fn declare<T, F>(&self, factory: F) -> NeutronResult<Arc<T>>
    where
        T: Send + Sync + 'static,
        F: FnOnce(&Self) -> T,
    {
        let type_name = type_name::<T>();
        self.check_declarable::<T>()?;

        // No lock is held while user code runs.
        let instance = Arc::new(factory(self));

        let mut providers = self.providers.write();
        if self.gate.is_started() {
            tracing::warn!("Provider {} finished constructing after start", type_name);
            return Err(NeutronError::DeclaredAfterStart { type_name });
        }
        if providers.contains_key(&TypeId::of::<T>()) {
            return Err(NeutronError::DuplicateProvider { type_name });
        }
        providers.insert(
            TypeId::of::<T>(),
            ProviderEntry {
                type_name,
                instance: Arc::clone(&instance) as Arc<dyn Any + Send + Sync>,
            },
        );
        self.order.write().push(type_name);
        drop(providers);

        tracing::debug!("Declared provider {}", type_name);
        Ok(instance)
    }

    fn check_declarable<T: 'static>(&self) -> NeutronResult<()> {
        let type_name = type_name::<T>();
        if self.gate.is_started() {
            tracing::warn!("Rejected provider {}: already started", type_name);
            return Err(NeutronError::DeclaredAfterStart { type_name });
        }
        if self.providers.read().contains_key(&TypeId::of::<T>()) {
            return Err(NeutronError::DuplicateProvider { type_name });
        }
        Ok(())
    }

    /// Returns the provider for `T`.
    ///
    /// # Errors
    ///
    /// [`NeutronError::ProviderNotFound`] if `T` was never declared.
    pub fn get<T>(&self) -> NeutronResult<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        let not_found = || NeutronError::ProviderNotFound {
            type_name: type_name::<T>(),
        };
        let instance = self
            .providers
            .read()
            .get(&TypeId::of::<T>())
            .map(|entry| Arc::clone(&entry.instance))
            .ok_or_else(not_found)?;
        instance.downcast::<T>().map_err(|_| not_found())
    }

    /// Returns whether `T` has been declared.
    #[must_use]
    pub fn contains<T: 'static>(&self) -> bool {
        self.providers.read().contains_key(&TypeId::of::<T>())
    }

    /// Number of declared providers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.read().len()
    }

    /// Returns whether no provider has been declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.read().is_empty()
    }

    /// Type names of declared providers, in declaration order.
    #[must_use]
    pub fn declared(&self) -> Vec<&'static str> {
        self.order.read().clone()
    }

    /// Type name of the provider stored for `type_id`, if any.
    #[must_use]
    pub fn type_name_of(&self, type_id: TypeId) -> Option<&'static str> {
        self.providers.read().get(&type_id).map(|entry| entry.type_name)
    }

    /// Builds a lifecycle callback that calls `method` on the provider for `T`.
    ///
    /// The provider is resolved now; firing does not look it up again.
    ///
    /// # Errors
    ///
    /// [`NeutronError::ProviderNotFound`] if `T` was never declared.
    pub fn bind<T, A, F, Fut>(&self, method: F) -> NeutronResult<Callback<A>>
    where
        T: Send + Sync + 'static,
        A: Send + 'static,
        F: Fn(Arc<T>, A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Ok(Callback::bound(self.get::<T>()?, method))
    }

    /// The start gate.
    #[must_use]
    pub fn gate(&self) -> &Arc<StartGate> {
        &self.gate
    }

    /// Opens the start gate. See [`StartGate::start`].
    ///
    /// The gate flips under the provider write lock, so a `declare` racing
    /// this call either lands before it or fails with
    /// [`NeutronError::DeclaredAfterStart`]. Opening the shared gate directly
    /// bypasses that ordering.
    pub fn start(&self) -> bool {
        let _providers = self.providers.write();
        self.gate.start()
    }

    /// Returns whether the start gate is open.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.gate.is_started()
    }

    /// Waits for the start gate. See [`StartGate::await_start`].
    pub async fn await_start(&self) {
        self.gate.await_start().await;
    }

    /// Blocks the calling thread until the start gate opens.
    pub fn wait_start_blocking(&self) {
        self.gate.wait_start_blocking();
    }

    /// Runs `task` once started. See [`StartGate::on_start`].
    pub fn on_start<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.gate.on_start(task);
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.declared())
            .field("gate", &self.gate)
            .finish()
    }
}
