//! # Endpoint Error Types
//!
//! Misuse is reported at the call site. Waiting forever is not an error:
//! attaching to an endpoint the server never creates, or invoking a party
//! that never answers, simply never completes.

use thiserror::Error;

use crate::host::Side;
use crate::remote::Direction;

/// Errors raised by endpoint declaration and use.
#[derive(Error, Debug)]
pub enum EndpointError {
    /// An explicit wire name is already in use in this process.
    #[error("wire name already in use: {0}")]
    NameTaken(String),

    /// The operation belongs to the other side (e.g. `fire_server` on the server).
    #[error("endpoint {endpoint} cannot be used this way on the {side} side")]
    WrongSide {
        /// Logical endpoint name.
        endpoint: String,
        /// The side the call was made on.
        side: Side,
    },

    /// The endpoint's direction forbids this send or receive.
    #[error("endpoint {endpoint} is {direction}; operation not allowed")]
    DirectionViolation {
        /// Logical endpoint name.
        endpoint: String,
        /// The endpoint's declared direction.
        direction: Direction,
    },

    /// The host was asked to deliver to a target it cannot reach from here.
    #[error("invalid target for {endpoint}: {reason}")]
    InvalidTarget {
        /// Wire name.
        endpoint: String,
        /// Why the target was rejected.
        reason: &'static str,
    },

    /// A value could not be turned into a payload.
    #[error("failed to encode payload: {0}")]
    Encode(#[source] serde_json::Error),

    /// A payload could not be turned back into a value.
    #[error("failed to decode payload: {0}")]
    Decode(#[source] serde_json::Error),

    /// The remote handler reported a failure.
    #[error("remote handler failed: {0}")]
    Remote(String),

    /// The addressed client is not connected.
    #[error("client disconnected")]
    Disconnected,
}

/// Result type for endpoint operations.
pub type EndpointResult<T> = Result<T, EndpointError>;
