//! # Host Interface
//!
//! What Neutron needs from the engine's remote primitives, and nothing more:
//!
//! - create an endpoint by name (server) or wait for it by name (client),
//! - send / subscribe on events,
//! - invoke / serve on functions,
//! - one replicated integer attribute for the naming seed.
//!
//! Serialization, delivery guarantees and per-client addressing belong to the
//! host. [`crate::loopback`] is an in-process implementation.

use std::fmt;
use std::sync::Arc;

use neutron_core::BoxFuture;

use crate::error::EndpointResult;

/// The host's native value type.
pub type Payload = serde_json::Value;

/// Identity of a connected client, assigned by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClientId(pub u32);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client#{}", self.0)
    }
}

/// Which end of the connection this process is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    /// The authoritative server.
    Server,
    /// A player's client.
    Client,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Server => f.write_str("server"),
            Self::Client => f.write_str("client"),
        }
    }
}

/// Delivery guarantee requested from the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Delivery {
    /// Delivered, in order.
    Reliable,
    /// May be dropped.
    Unreliable,
}

/// Who sent a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Origin {
    /// The server.
    Server,
    /// A client.
    Client(ClientId),
}

/// Where a message goes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Target {
    /// The server (client side only).
    Server,
    /// One client (server side only).
    Client(ClientId),
    /// Every connected client (server side only).
    AllClients,
    /// Every connected client but one (server side only).
    AllExcept(ClientId),
    /// A list of clients (server side only).
    Clients(Vec<ClientId>),
}

impl Target {
    /// Returns whether `client` is addressed, given it is connected.
    #[must_use]
    pub fn includes(&self, client: ClientId) -> bool {
        match self {
            Self::Server => false,
            Self::Client(id) => *id == client,
            Self::AllClients => true,
            Self::AllExcept(id) => *id != client,
            Self::Clients(ids) => ids.contains(&client),
        }
    }
}

/// Receives event payloads.
pub type EventHandler = Arc<dyn Fn(Origin, Payload) + Send + Sync>;

/// Answers function invocations. `Err` carries a message back to the caller.
pub type InvokeHandler =
    Arc<dyn Fn(Origin, Payload) -> BoxFuture<'static, Result<Payload, String>> + Send + Sync>;

/// Handle to an event subscription.
///
/// Dropping it leaves the handler connected; call [`Connection::disconnect`].
pub struct Connection {
    disconnect: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Connection {
    /// Wraps the host's disconnect action.
    pub fn new<F>(disconnect: F) -> Self
    where
        F: FnOnce() + Send + Sync + 'static,
    {
        Self {
            disconnect: Some(Box::new(disconnect)),
        }
    }

    /// Stops delivery to the handler.
    pub fn disconnect(mut self) {
        if let Some(disconnect) = self.disconnect.take() {
            disconnect();
        }
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("connected", &self.disconnect.is_some())
            .finish()
    }
}

/// A host message channel.
pub trait EventTransport: Send + Sync {
    /// The wire name this endpoint was created under.
    fn wire_name(&self) -> &str;

    /// The delivery guarantee it was created with.
    fn delivery(&self) -> Delivery;

    /// Sends `payload` to `target`. Does not wait for delivery.
    ///
    /// # Errors
    ///
    /// [`crate::EndpointError::InvalidTarget`] if `target` is not reachable
    /// from this side.
    fn send(&self, target: Target, payload: Payload) -> EndpointResult<()>;

    /// Delivers every payload arriving on this side to `handler`.
    fn subscribe(&self, handler: EventHandler) -> Connection;
}

/// A host request/response channel.
pub trait FunctionTransport: Send + Sync {
    /// The wire name this endpoint was created under.
    fn wire_name(&self) -> &str;

    /// Invokes the handler on `target` and waits for its answer.
    ///
    /// There is no timeout. If `target` never answers, neither does this.
    fn invoke(&self, target: Target, payload: Payload) -> BoxFuture<'static, EndpointResult<Payload>>;

    /// Sets the handler for invocations arriving on this side, replacing any
    /// previous one.
    fn serve(&self, handler: InvokeHandler);
}

/// The engine-side object model Neutron names endpoints in.
pub trait RemoteHost: Send + Sync {
    /// Which side this host is.
    fn side(&self) -> Side;

    /// Writes a replicated attribute (server side).
    fn set_attribute(&self, name: &str, value: u64);

    /// Waits for a replicated attribute, then reads it.
    ///
    /// On a client the read clears the local copy: a second read waits for the
    /// server to write again. Waits forever if the attribute is never written.
    fn take_attribute(&self, name: &str) -> BoxFuture<'static, u64>;

    /// Creates a named event endpoint (server side).
    fn create_event(&self, wire_name: &str, delivery: Delivery) -> Arc<dyn EventTransport>;

    /// Waits until the named event endpoint exists, then attaches to it.
    fn attach_event(
        &self,
        wire_name: &str,
        delivery: Delivery,
    ) -> BoxFuture<'static, Arc<dyn EventTransport>>;

    /// Creates a named function endpoint (server side).
    fn create_function(&self, wire_name: &str) -> Arc<dyn FunctionTransport>;

    /// Waits until the named function endpoint exists, then attaches to it.
    fn attach_function(&self, wire_name: &str) -> BoxFuture<'static, Arc<dyn FunctionTransport>>;
}
