//! Typed remote events.

use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{decode, encode, EndpointInfo};
use crate::error::EndpointResult;
use crate::host::{ClientId, Connection, Delivery, EventTransport, Origin, Side, Target};

/// A named, typed message channel.
pub struct RemoteEvent<T> {
    info: EndpointInfo,
    side: Side,
    transport: Arc<dyn EventTransport>,
    _payload: PhantomData<fn(T) -> T>,
}

impl<T> Clone for RemoteEvent<T> {
    fn clone(&self) -> Self {
        Self {
            info: self.info.clone(),
            side: self.side,
            transport: Arc::clone(&self.transport),
            _payload: PhantomData,
        }
    }
}

impl<T> RemoteEvent<T>
where
    T: Serialize + DeserializeOwned + Send + 'static,
{
    pub(crate) fn new(info: EndpointInfo, side: Side, transport: Arc<dyn EventTransport>) -> Self {
        Self {
            info,
            side,
            transport,
            _payload: PhantomData,
        }
    }

    /// Names and direction.
    #[must_use]
    pub fn info(&self) -> &EndpointInfo {
        &self.info
    }

    /// The host's delivery guarantee for this event.
    #[must_use]
    pub fn delivery(&self) -> Delivery {
        self.transport.delivery()
    }

    fn send_from_server(&self, target: Target, value: &T) -> EndpointResult<()> {
        self.info.require_side(self.side, Side::Server)?;
        self.info.require_send(self.side)?;
        self.transport.send(target, encode(value)?)
    }

    /// Sends to the server. Client side only.
    pub fn fire_server(&self, value: &T) -> EndpointResult<()> {
        self.info.require_side(self.side, Side::Client)?;
        self.info.require_send(self.side)?;
        self.transport.send(Target::Server, encode(value)?)
    }

    /// Sends to one client. Server side only.
    pub fn fire_client(&self, client: ClientId, value: &T) -> EndpointResult<()> {
        self.send_from_server(Target::Client(client), value)
    }

    /// Sends to every connected client. Server side only.
    pub fn fire_all(&self, value: &T) -> EndpointResult<()> {
        self.send_from_server(Target::AllClients, value)
    }

    /// Sends to every connected client except `excluded`. Server side only.
    pub fn fire_except(&self, excluded: ClientId, value: &T) -> EndpointResult<()> {
        self.send_from_server(Target::AllExcept(excluded), value)
    }

    /// Sends to each of `clients`. Server side only.
    pub fn fire_clients(&self, clients: &[ClientId], value: &T) -> EndpointResult<()> {
        self.send_from_server(Target::Clients(clients.to_vec()), value)
    }

    /// Handles messages from clients. Server side only.
    ///
    /// Payloads that do not decode as `T` are logged and dropped.
    pub fn on_server_event<F>(&self, handler: F) -> EndpointResult<Connection>
    where
        F: Fn(ClientId, T) + Send + Sync + 'static,
    {
        self.info.require_side(self.side, Side::Server)?;
        self.info.require_receive(self.side)?;
        let name = self.info.name.clone();
        Ok(self.transport.subscribe(Arc::new(move |origin, payload| {
            let Origin::Client(client) = origin else {
                return;
            };
            match decode::<T>(payload) {
                Ok(value) => handler(client, value),
                Err(e) => tracing::warn!("Dropped malformed event on {} from {}: {}", name, client, e),
            }
        })))
    }

    /// Handles messages from the server. Client side only.
    ///
    /// Payloads that do not decode as `T` are logged and dropped.
    pub fn on_client_event<F>(&self, handler: F) -> EndpointResult<Connection>
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        self.info.require_side(self.side, Side::Client)?;
        self.info.require_receive(self.side)?;
        let name = self.info.name.clone();
        Ok(self.transport.subscribe(Arc::new(move |_origin, payload| {
            match decode::<T>(payload) {
                Ok(value) => handler(value),
                Err(e) => tracing::warn!("Dropped malformed event on {}: {}", name, e),
            }
        })))
    }
}

impl<T> std::fmt::Debug for RemoteEvent<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteEvent")
            .field("info", &self.info)
            .field("side", &self.side)
            .finish_non_exhaustive()
    }
}
