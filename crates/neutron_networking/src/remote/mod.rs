//! # Typed Remotes
//!
//! Pass-through wrappers over host endpoints that add two things: serde
//! typing of payloads, and enforcement of the endpoint's direction and of
//! which side may call what.
//!
//! | operation          | side   | direction needed |
//! |--------------------|--------|------------------|
//! | `fire_server`      | client | client → server  |
//! | `on_server_event`  | server | client → server  |
//! | `fire_client` etc. | server | server → client  |
//! | `on_client_event`  | client | server → client  |
//! | `invoke_server`    | client | client → server  |
//! | `handle_server`    | server | client → server  |
//! | `invoke_client`    | server | server → client  |
//! | `handle_client`    | client | server → client  |

mod event;
mod function;

pub use event::RemoteEvent;
pub use function::RemoteFunction;

use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{EndpointError, EndpointResult};
use crate::host::{Payload, Side};

/// Which way traffic may flow on an endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Only the server sends; clients receive.
    ServerToClient,
    /// Only clients send; the server receives.
    ClientToServer,
    /// Both.
    Bidirectional,
}

impl Direction {
    /// Returns whether `side` may send on this endpoint.
    #[must_use]
    pub fn allows_send_from(self, side: Side) -> bool {
        matches!(
            (self, side),
            (Self::Bidirectional, _)
                | (Self::ServerToClient, Side::Server)
                | (Self::ClientToServer, Side::Client)
        )
    }

    /// Returns whether `side` may receive on this endpoint.
    #[must_use]
    pub fn allows_receive_on(self, side: Side) -> bool {
        let sender = match side {
            Side::Server => Side::Client,
            Side::Client => Side::Server,
        };
        self.allows_send_from(sender)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ServerToClient => f.write_str("server-to-client"),
            Self::ClientToServer => f.write_str("client-to-server"),
            Self::Bidirectional => f.write_str("bidirectional"),
        }
    }
}

/// The (logical name, wire name, direction) triple of a declared endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EndpointInfo {
    /// Call-site fingerprint or explicit name.
    pub name: String,
    /// The name the host knows the endpoint by.
    pub wire_name: String,
    /// Allowed traffic direction.
    pub direction: Direction,
}

impl EndpointInfo {
    /// Fails unless this process is on `required`.
    pub(crate) fn require_side(&self, side: Side, required: Side) -> EndpointResult<()> {
        if side == required {
            Ok(())
        } else {
            Err(EndpointError::WrongSide {
                endpoint: self.name.clone(),
                side,
            })
        }
    }

    /// Fails unless `side` may send.
    pub(crate) fn require_send(&self, side: Side) -> EndpointResult<()> {
        if self.direction.allows_send_from(side) {
            Ok(())
        } else {
            Err(EndpointError::DirectionViolation {
                endpoint: self.name.clone(),
                direction: self.direction,
            })
        }
    }

    /// Fails unless `side` may receive.
    pub(crate) fn require_receive(&self, side: Side) -> EndpointResult<()> {
        if self.direction.allows_receive_on(side) {
            Ok(())
        } else {
            Err(EndpointError::DirectionViolation {
                endpoint: self.name.clone(),
                direction: self.direction,
            })
        }
    }
}

pub(crate) fn encode<T: Serialize>(value: &T) -> EndpointResult<Payload> {
    serde_json::to_value(value).map_err(EndpointError::Encode)
}

pub(crate) fn decode<T: DeserializeOwned>(payload: Payload) -> EndpointResult<T> {
    serde_json::from_value(payload).map_err(EndpointError::Decode)
}
