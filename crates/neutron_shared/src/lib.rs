//! # Neutron Shared
//!
//! Configuration and constants used by both client and server builds.
//!
//! ## Rule
//!
//! This crate must NEVER depend on an async runtime or a transport.
//! If you need either, put it in `neutron_core` or `neutron_networking`.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod constants;

pub use config::{ConfigError, LifecycleConfig, LoopbackConfig, NamerConfig, NeutronConfig};
pub use constants::{
    DEFAULT_MAX_CODE_POINT, DEFAULT_MIN_CODE_POINT, DEFAULT_NAME_LENGTH, DEFAULT_TICK_RATE,
    SEED_ATTRIBUTE,
};
