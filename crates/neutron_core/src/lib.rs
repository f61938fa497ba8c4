//! # Neutron Core
//!
//! The dependency-injection half of Neutron.
//!
//! ## Architecture
//!
//! ```text
//!  start-up code                       running game
//!  ─────────────                       ────────────
//!  ProviderRegistry::declare ──┐
//!  ProviderRegistry::declare ──┼──> StartGate::start ──> await_start / on_start
//!  Lifecycle::register ────────┘                          Lifecycle::fire
//! ```
//!
//! - **Providers**: one instance per type, constructed eagerly at declaration.
//! - **Start gate**: flips exactly once; declarations are rejected afterwards.
//! - **Lifecycles**: named fan-out of callbacks, in series or concurrently.
//!
//! ## Threading
//!
//! Every registry is guarded by a `parking_lot` lock. No lock is ever held
//! while a user callback runs or across an `.await`, so callbacks may freely
//! register, unregister or fire other lifecycles.
//!
//! ## Example
//!
//! ```rust,ignore
//! use neutron_core::{Callback, ExecutionModel, Lifecycle, ProviderRegistry, Scheduler};
//!
//! let scheduler = Scheduler::current()?;
//! let providers = ProviderRegistry::new(scheduler.clone());
//! let score = providers.declare(|_| ScoreService::default())?;
//!
//! let on_round_end = Lifecycle::new("OnRoundEnd", ExecutionModel::Series, scheduler);
//! on_round_end.register(Callback::bound(score, ScoreService::reset), "score");
//!
//! providers.start();
//! on_round_end.fire(()).await;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod lifecycle;
pub mod provider;
pub mod scheduler;
pub mod start;

pub use error::{NeutronError, NeutronResult};
pub use lifecycle::{
    Callback, ExecutionModel, Lifecycle, LifecycleState, Registration, Subscription,
};
pub use provider::ProviderRegistry;
pub use scheduler::{BoxFuture, Scheduler};
pub use start::StartGate;
