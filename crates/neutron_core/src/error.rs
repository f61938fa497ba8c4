//! # Core Error Types
//!
//! All misuse of the provider registry is reported here, synchronously, at
//! the call site that caused it. Nothing is retried.

use thiserror::Error;

/// Errors raised by the provider registry and scheduler.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NeutronError {
    /// A provider was declared after Neutron started.
    #[error("cannot declare provider {type_name}: Neutron has already started")]
    DeclaredAfterStart {
        /// The type that was being declared.
        type_name: &'static str,
    },

    /// A provider was requested but never declared.
    #[error("provider not found: {type_name}")]
    ProviderNotFound {
        /// The type that was requested.
        type_name: &'static str,
    },

    /// The same provider type was declared twice.
    #[error("provider already declared: {type_name}")]
    DuplicateProvider {
        /// The type that was declared again.
        type_name: &'static str,
    },

    /// The configuration handed to the application cannot work.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// What the validator rejected.
        reason: String,
    },

    /// No tokio runtime is available to schedule tasks on.
    #[error("no tokio runtime available; build the scheduler from inside a runtime or pass a handle")]
    NoRuntime,
}

/// Result type for core operations.
pub type NeutronResult<T> = Result<T, NeutronError>;
