//! Per-peer [`RemoteHost`] handles.

use std::sync::Arc;

use neutron_core::BoxFuture;

use super::endpoint::{LoopbackEvent, LoopbackFunction};
use super::{NetworkInner, Peer};
use crate::host::{ClientId, Delivery, EventTransport, FunctionTransport, RemoteHost, Side};

/// The server's or one client's view of a [`super::LoopbackNetwork`].
pub struct LoopbackHost {
    network: Arc<NetworkInner>,
    peer: Peer,
}

impl LoopbackHost {
    pub(crate) fn new(network: Arc<NetworkInner>, peer: Peer) -> Self {
        Self { network, peer }
    }

    /// This client's id, or `None` on the server.
    #[must_use]
    pub fn client_id(&self) -> Option<ClientId> {
        match self.peer {
            Peer::Server => None,
            Peer::Client(client) => Some(client),
        }
    }

    /// Returns whether this host can still send.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.network.is_connected(self.peer)
    }
}

impl RemoteHost for LoopbackHost {
    fn side(&self) -> Side {
        self.peer.side()
    }

    fn set_attribute(&self, name: &str, value: u64) {
        if self.peer != Peer::Server {
            tracing::warn!("Ignoring client write of attribute {}", name);
            return;
        }
        self.network.set_attribute(name, value);
    }

    fn take_attribute(&self, name: &str) -> BoxFuture<'static, u64> {
        let network = Arc::clone(&self.network);
        let peer = self.peer;
        let name = name.to_string();
        Box::pin(async move { network.take_attribute(peer, name).await })
    }

    fn create_event(&self, wire_name: &str, delivery: Delivery) -> Arc<dyn EventTransport> {
        tracing::debug!("Creating event {:?}", wire_name);
        Arc::new(LoopbackEvent {
            channel: self.network.event_channel(wire_name, delivery),
            network: Arc::clone(&self.network),
            peer: self.peer,
        })
    }

    fn attach_event(
        &self,
        wire_name: &str,
        _delivery: Delivery,
    ) -> BoxFuture<'static, Arc<dyn EventTransport>> {
        let network = Arc::clone(&self.network);
        let peer = self.peer;
        let wire_name = wire_name.to_string();
        Box::pin(async move {
            let channel = network.existing_event(wire_name).await;
            Arc::new(LoopbackEvent {
                network,
                channel,
                peer,
            }) as Arc<dyn EventTransport>
        })
    }

    fn create_function(&self, wire_name: &str) -> Arc<dyn FunctionTransport> {
        tracing::debug!("Creating function {:?}", wire_name);
        Arc::new(LoopbackFunction {
            channel: self.network.function_channel(wire_name),
            network: Arc::clone(&self.network),
            peer: self.peer,
        })
    }

    fn attach_function(&self, wire_name: &str) -> BoxFuture<'static, Arc<dyn FunctionTransport>> {
        let network = Arc::clone(&self.network);
        let peer = self.peer;
        let wire_name = wire_name.to_string();
        Box::pin(async move {
            let channel = network.existing_function(wire_name).await;
            Arc::new(LoopbackFunction {
                network,
                channel,
                peer,
            }) as Arc<dyn FunctionTransport>
        })
    }
}

impl std::fmt::Debug for LoopbackHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopbackHost")
            .field("peer", &self.peer)
            .finish_non_exhaustive()
    }
}
