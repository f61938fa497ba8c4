//! # Neutron
//!
//! Dependency injection and named remotes for a client/server game.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                           NEUTRON                            │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌──────────────────┐            ┌────────────────────────┐  │
//! │  │  neutron_core    │            │  neutron_networking    │  │
//! │  │  • Providers     │            │  • Endpoint namer      │  │
//! │  │  • Start gate    │            │  • Seed exchange       │  │
//! │  │  • Lifecycles    │            │  • Remote events/fns   │  │
//! │  └────────┬─────────┘            │  • Loopback host       │  │
//! │           │                      └───────────┬────────────┘  │
//! │           └────────────> Neutron <───────────┘               │
//! │                          • tick lifecycle                    │
//! │                          • config (neutron_shared)           │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! let app = NeutronBuilder::new()
//!     .config(NeutronConfig::from_file("neutron.toml")?)
//!     .build()?;
//!
//! let scores = app.provide(|_| ScoreService::default())?;
//! app.on_tick().register(app.bind(ScoreService::on_tick)?, "scores");
//!
//! app.start();
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod app;
pub mod tick;

// Re-export the halves
pub use neutron_core as core;
pub use neutron_networking as networking;
pub use neutron_shared as shared;

pub use app::{Neutron, NeutronBuilder, TICK_LIFECYCLE};
pub use neutron_core::{Callback, ExecutionModel, Lifecycle, NeutronError, NeutronResult};
pub use neutron_networking::{Direction, EndpointError, EndpointResult, Remotes};
pub use neutron_shared::NeutronConfig;
pub use tick::tick_period;
