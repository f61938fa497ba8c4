//! # Neutron Application
//!
//! The object a game builds once at boot:
//!
//! ```text
//! NeutronBuilder::new().config(..).build()?
//!     │
//!     ├── provide(..)  x N      declare phase
//!     ├── lifecycle(..) / on_tick().register(..)
//!     │
//!     └── start()               running phase: on_start tasks, tick driver
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use neutron_core::{
    Callback, ExecutionModel, Lifecycle, NeutronError, NeutronResult, ProviderRegistry, Scheduler,
};
use neutron_networking::{generate_seed, LoopbackNetwork, RemoteHost, Remotes};
use neutron_shared::NeutronConfig;
use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::tick::spawn_ticker;

/// Name of the built-in tick lifecycle.
pub const TICK_LIFECYCLE: &str = "OnTick";

/// Builds a [`Neutron`].
#[derive(Debug, Default)]
pub struct NeutronBuilder {
    config: NeutronConfig,
    scheduler: Option<Scheduler>,
}

impl NeutronBuilder {
    /// Default configuration, current runtime.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `config` instead of the defaults.
    #[must_use]
    pub fn config(mut self, config: NeutronConfig) -> Self {
        self.config = config;
        self
    }

    /// Spawns onto `scheduler` instead of the current runtime.
    #[must_use]
    pub fn scheduler(mut self, scheduler: Scheduler) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Creates the application in its declare phase.
    ///
    /// # Errors
    ///
    /// - [`neutron_core::NeutronError::InvalidConfig`] if the configuration
    ///   fails [`NeutronConfig::validate`].
    /// - [`neutron_core::NeutronError::NoRuntime`] if no scheduler was given
    ///   and the caller is not inside a tokio runtime.
    pub fn build(self) -> NeutronResult<Neutron> {
        self.config
            .validate()
            .map_err(|e| NeutronError::InvalidConfig {
                reason: e.to_string(),
            })?;
        let scheduler = match self.scheduler {
            Some(scheduler) => scheduler,
            None => Scheduler::current()?,
        };
        let tick = Lifecycle::new(TICK_LIFECYCLE, ExecutionModel::Concurrent, scheduler.clone());
        Ok(Neutron {
            providers: ProviderRegistry::new(scheduler.clone()),
            config: self.config,
            scheduler,
            tick,
            ticker: Mutex::new(None),
        })
    }
}

/// Providers, lifecycles and remotes for one process.
pub struct Neutron {
    config: NeutronConfig,
    scheduler: Scheduler,
    providers: ProviderRegistry,
    tick: Lifecycle<Duration>,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

impl Neutron {
    /// The configuration this application was built with.
    #[must_use]
    pub fn config(&self) -> &NeutronConfig {
        &self.config
    }

    /// The scheduler every lifecycle spawns onto.
    #[must_use]
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// The provider registry.
    #[must_use]
    pub fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    /// Declares the provider for `T`. See [`ProviderRegistry::declare`].
    ///
    /// # Errors
    ///
    /// Fails after [`Neutron::start`] or if `T` is already provided.
    pub fn provide<T, F>(&self, factory: F) -> NeutronResult<Arc<T>>
    where
        T: Send + Sync + 'static,
        F: FnOnce(&ProviderRegistry) -> T,
    {
        self.providers.declare(factory)
    }

    /// Looks up the provider for `T`.
    ///
    /// # Errors
    ///
    /// [`neutron_core::NeutronError::ProviderNotFound`] if `T` was never
    /// provided.
    pub fn get<T>(&self) -> NeutronResult<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        self.providers.get::<T>()
    }

    /// Binds `method` on the provider for `T` as a lifecycle callback.
    ///
    /// # Errors
    ///
    /// [`neutron_core::NeutronError::ProviderNotFound`] if `T` was never
    /// provided.
    pub fn bind<T, A, F, Fut>(&self, method: F) -> NeutronResult<Callback<A>>
    where
        T: Send + Sync + 'static,
        A: Send + 'static,
        F: Fn(Arc<T>, A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.providers.bind(method)
    }

    /// Creates a lifecycle on this application's scheduler.
    pub fn lifecycle<A>(&self, name: impl Into<String>, model: ExecutionModel) -> Lifecycle<A>
    where
        A: Clone + Send + 'static,
    {
        Lifecycle::new(name, model, self.scheduler.clone())
    }

    /// Fires concurrently at `lifecycle.tick_rate` Hz once started, with the
    /// time since the previous tick.
    #[must_use]
    pub fn on_tick(&self) -> &Lifecycle<Duration> {
        &self.tick
    }

    /// Ends the declare phase. Returns `false` if already started.
    ///
    /// Releases everything waiting on the start gate, runs queued `on_start`
    /// tasks, and starts the tick driver.
    pub fn start(&self) -> bool {
        if !self.providers.start() {
            return false;
        }
        let handle = spawn_ticker(
            &self.scheduler,
            self.tick.clone(),
            self.config.lifecycle.tick_rate,
        );
        *self.ticker.lock() = Some(handle);
        tracing::info!("Neutron started with {} providers", self.providers.len());
        true
    }

    /// Returns whether [`Neutron::start`] has run.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.providers.is_started()
    }

    /// Waits until started. Returns at once if already started.
    pub async fn await_start(&self) {
        self.providers.await_start().await;
    }

    /// Runs `task` once started; immediately if already started.
    pub fn on_start<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.providers.on_start(task);
    }

    /// Server-side remotes over `host`, with a fresh seed.
    #[must_use]
    pub fn server_remotes(&self, host: Arc<dyn RemoteHost>) -> Arc<Remotes> {
        Remotes::server(host, generate_seed(), &self.config.namer)
    }

    /// Client-side remotes over `host`. Waits for the server's seed.
    pub async fn client_remotes(&self, host: Arc<dyn RemoteHost>) -> Arc<Remotes> {
        Remotes::client(host, &self.config.namer).await
    }

    /// An in-process network configured from `[loopback]`.
    #[must_use]
    pub fn loopback(&self) -> LoopbackNetwork {
        LoopbackNetwork::new(self.scheduler.clone(), &self.config.loopback)
    }
}

impl Drop for Neutron {
    fn drop(&mut self) {
        if let Some(ticker) = self.ticker.get_mut().take() {
            ticker.abort();
        }
    }
}

impl std::fmt::Debug for Neutron {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Neutron")
            .field("providers", &self.providers)
            .field("tick", &self.tick)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neutron_shared::{LifecycleConfig, NamerConfig};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, PartialEq)]
    struct Point {
        x: u32,
    }

    fn fast_app() -> Neutron {
        let config = NeutronConfig {
            lifecycle: LifecycleConfig { tick_rate: 200 },
            ..NeutronConfig::default()
        };
        NeutronBuilder::new().config(config).build().unwrap()
    }

    #[test]
    fn test_build_without_runtime_fails() {
        assert_eq!(
            NeutronBuilder::new().build().unwrap_err(),
            NeutronError::NoRuntime
        );
    }

    #[tokio::test]
    async fn test_build_rejects_invalid_config() {
        let config = NeutronConfig {
            namer: NamerConfig {
                min_code_point: 126,
                max_code_point: 33,
                ..NamerConfig::default()
            },
            ..NeutronConfig::default()
        };
        let err = NeutronBuilder::new().config(config).build().unwrap_err();
        assert!(matches!(err, NeutronError::InvalidConfig { .. }));

        let zero_rate = NeutronConfig {
            lifecycle: LifecycleConfig { tick_rate: 0 },
            ..NeutronConfig::default()
        };
        assert!(matches!(
            NeutronBuilder::new().config(zero_rate).build(),
            Err(NeutronError::InvalidConfig { .. })
        ));
    }

    #[tokio::test]
    async fn test_provide_and_get() {
        let app = fast_app();
        let point = app.provide(|_| Point { x: 1 }).unwrap();
        assert_eq!(point.x, 1);
        assert!(Arc::ptr_eq(&point, &app.get::<Point>().unwrap()));
        assert!(matches!(
            app.get::<String>(),
            Err(NeutronError::ProviderNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_start_once_then_reject_declarations() {
        let app = fast_app();
        assert!(app.start());
        assert!(!app.start());
        assert!(app.is_started());
        assert!(matches!(
            app.provide(|_| Point { x: 2 }),
            Err(NeutronError::DeclaredAfterStart { .. })
        ));
        assert!(!app.providers().contains::<Point>());
    }

    #[tokio::test]
    async fn test_tick_fires_after_start_only() {
        let app = fast_app();
        let ticks = Arc::new(AtomicUsize::new(0));
        {
            let ticks = Arc::clone(&ticks);
            app.on_tick().register(
                Callback::from_fn(move |_delta| {
                    ticks.fetch_add(1, Ordering::SeqCst);
                }),
                "test",
            );
        }

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 0);

        app.start();
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(ticks.load(Ordering::SeqCst) > 0);
    }

    #[tokio::test]
    async fn test_drop_stops_ticker() {
        let app = fast_app();
        let ticks = Arc::new(AtomicUsize::new(0));
        {
            let ticks = Arc::clone(&ticks);
            app.on_tick().register(
                Callback::from_fn(move |_delta| {
                    ticks.fetch_add(1, Ordering::SeqCst);
                }),
                "test",
            );
        }
        app.start();
        tokio::time::sleep(Duration::from_millis(30)).await;
        drop(app);
        tokio::time::sleep(Duration::from_millis(10)).await;

        let after_drop = ticks.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), after_drop);
    }

    #[tokio::test]
    async fn test_on_start_runs_after_start() {
        let app = fast_app();
        let (tx, rx) = tokio::sync::oneshot::channel();
        app.on_start(async move {
            let _ = tx.send(());
        });
        app.start();
        rx.await.unwrap();
        app.await_start().await;
    }
}
