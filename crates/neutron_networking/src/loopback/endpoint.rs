//! Loopback event and function endpoints.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use neutron_core::BoxFuture;
use parking_lot::Mutex;

use super::{NetworkInner, Peer};
use crate::error::EndpointResult;
use crate::host::{
    Connection, Delivery, EventHandler, EventTransport, FunctionTransport, InvokeHandler, Origin,
    Payload, Target,
};

#[derive(Default)]
struct Receiver {
    handlers: Vec<(u64, EventHandler)>,
    /// Arrived before any handler was connected.
    pending: Vec<(Origin, Payload)>,
}

pub(crate) struct EventChannel {
    wire_name: String,
    delivery: Delivery,
    next_id: AtomicU64,
    receivers: Mutex<HashMap<Peer, Receiver>>,
}

impl EventChannel {
    pub(crate) fn new(wire_name: &str, delivery: Delivery) -> Self {
        Self {
            wire_name: wire_name.to_string(),
            delivery,
            next_id: AtomicU64::new(0),
            receivers: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn wire_name(&self) -> &str {
        &self.wire_name
    }

    pub(crate) fn delivery(&self) -> Delivery {
        self.delivery
    }

    /// Hands `payload` to `peer`'s handlers, or holds it until one connects.
    pub(crate) fn dispatch(&self, peer: Peer, origin: Origin, payload: Payload) {
        let handlers: Vec<EventHandler> = {
            let mut receivers = self.receivers.lock();
            let receiver = receivers.entry(peer).or_default();
            if receiver.handlers.is_empty() {
                receiver.pending.push((origin, payload));
                return;
            }
            receiver
                .handlers
                .iter()
                .map(|(_, handler)| Arc::clone(handler))
                .collect()
        };
        for handler in handlers {
            handler(origin, payload.clone());
        }
    }

    fn subscribe(self: &Arc<Self>, peer: Peer, handler: EventHandler) -> Connection {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let pending = {
            let mut receivers = self.receivers.lock();
            let receiver = receivers.entry(peer).or_default();
            receiver.handlers.push((id, Arc::clone(&handler)));
            std::mem::take(&mut receiver.pending)
        };
        for (origin, payload) in pending {
            handler(origin, payload);
        }

        let channel = Arc::downgrade(self);
        Connection::new(move || {
            if let Some(channel) = channel.upgrade() {
                if let Some(receiver) = channel.receivers.lock().get_mut(&peer) {
                    receiver.handlers.retain(|(handler_id, _)| *handler_id != id);
                }
            }
        })
    }

    pub(crate) fn forget(&self, peer: Peer) {
        self.receivers.lock().remove(&peer);
    }
}

pub(crate) struct FunctionChannel {
    wire_name: String,
    handlers: Mutex<HashMap<Peer, InvokeHandler>>,
}

impl FunctionChannel {
    pub(crate) fn new(wire_name: &str) -> Self {
        Self {
            wire_name: wire_name.to_string(),
            handlers: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn wire_name(&self) -> &str {
        &self.wire_name
    }

    pub(crate) fn handler(&self, peer: Peer) -> Option<InvokeHandler> {
        self.handlers.lock().get(&peer).cloned()
    }

    pub(crate) fn forget(&self, peer: Peer) {
        self.handlers.lock().remove(&peer);
    }
}

/// One peer's view of an event channel.
pub(crate) struct LoopbackEvent {
    pub(crate) network: Arc<NetworkInner>,
    pub(crate) channel: Arc<EventChannel>,
    pub(crate) peer: Peer,
}

impl EventTransport for LoopbackEvent {
    fn wire_name(&self) -> &str {
        self.channel.wire_name()
    }

    fn delivery(&self) -> Delivery {
        self.channel.delivery()
    }

    fn send(&self, target: Target, payload: Payload) -> EndpointResult<()> {
        self.network
            .deliver(self.peer, &self.channel, &target, payload)
    }

    fn subscribe(&self, handler: EventHandler) -> Connection {
        self.channel.subscribe(self.peer, handler)
    }
}

/// One peer's view of a function channel.
pub(crate) struct LoopbackFunction {
    pub(crate) network: Arc<NetworkInner>,
    pub(crate) channel: Arc<FunctionChannel>,
    pub(crate) peer: Peer,
}

impl FunctionTransport for LoopbackFunction {
    fn wire_name(&self) -> &str {
        self.channel.wire_name()
    }

    fn invoke(&self, target: Target, payload: Payload) -> BoxFuture<'static, EndpointResult<Payload>> {
        let network = Arc::clone(&self.network);
        let channel = Arc::clone(&self.channel);
        let from = self.peer;
        Box::pin(async move { network.invoke(from, channel, target, payload).await })
    }

    fn serve(&self, handler: InvokeHandler) {
        self.channel.handlers.lock().insert(self.peer, handler);
        tracing::debug!("{:?} serving {}", self.peer, self.channel.wire_name());
        self.network.bump();
    }
}
