//! # Loopback Host
//!
//! One server and any number of clients in a single process, sharing one
//! tokio runtime. Good enough to run the same endpoint declarations on both
//! sides in a test or a demo.
//!
//! ## Delivery
//!
//! ```text
//! sender ── send ──> [inbox of receiver] ── sleep_until(sent + latency) ──> handlers
//! ```
//!
//! Each peer has one inbox drained by one task, so messages to a peer arrive
//! in send order. Unreliable events are dropped with probability
//! `unreliable_loss`, drawn from a generator seeded with `loss_seed`.
//! Events arriving before anyone subscribes on that side are held and
//! handed to the first subscriber.
//!
//! ## Waiting
//!
//! Every state change bumps one revision counter on a `watch` channel.
//! Attribute reads, endpoint attaches and invocations wait on it and never
//! time out.

mod endpoint;
mod host;

pub use host::LoopbackHost;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use neutron_core::Scheduler;
use neutron_shared::LoopbackConfig;
use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;

use crate::error::{EndpointError, EndpointResult};
use crate::host::{ClientId, Delivery, Origin, Payload, Side, Target};
use crate::presence::ClientPresence;
use endpoint::{EventChannel, FunctionChannel};

/// One end of the loopback connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) enum Peer {
    Server,
    Client(ClientId),
}

impl Peer {
    fn side(self) -> Side {
        match self {
            Self::Server => Side::Server,
            Self::Client(_) => Side::Client,
        }
    }

    fn origin(self) -> Origin {
        match self {
            Self::Server => Origin::Server,
            Self::Client(client) => Origin::Client(client),
        }
    }
}

/// An event in flight.
struct Envelope {
    deliver_at: Instant,
    channel: Arc<EventChannel>,
    origin: Origin,
    payload: Payload,
}

struct Attribute {
    value: u64,
    version: u64,
}

#[derive(Default)]
struct NetworkState {
    next_client: u32,
    clients: Vec<ClientId>,
    inboxes: HashMap<Peer, mpsc::UnboundedSender<Envelope>>,
    attributes: HashMap<String, Attribute>,
    /// Attribute version each client last read.
    taken: HashMap<(ClientId, String), u64>,
    events: HashMap<String, Arc<EventChannel>>,
    functions: HashMap<String, Arc<FunctionChannel>>,
}

pub(crate) struct NetworkInner {
    scheduler: Scheduler,
    latency: Duration,
    loss: f64,
    loss_rng: Mutex<ChaCha8Rng>,
    state: Mutex<NetworkState>,
    revision: watch::Sender<u64>,
    presence: ClientPresence,
}

impl NetworkInner {
    fn bump(&self) {
        self.revision.send_modify(|revision| *revision = revision.wrapping_add(1));
    }

    /// Re-runs `probe` after every state change until it yields a value.
    async fn wait_until<T, F>(&self, mut probe: F) -> T
    where
        F: FnMut(&mut NetworkState) -> Option<T> + Send,
        T: Send,
    {
        let mut revision = self.revision.subscribe();
        loop {
            let found = probe(&mut self.state.lock());
            if let Some(found) = found {
                return found;
            }
            // The sender lives as long as `self`.
            let _ = revision.changed().await;
        }
    }

    async fn until_gone(&self, client: ClientId) {
        self.wait_until(|state| (!state.clients.contains(&client)).then_some(()))
            .await;
    }

    fn open_inbox(&self, state: &mut NetworkState, peer: Peer) {
        let (tx, mut rx) = mpsc::unbounded_channel::<Envelope>();
        self.scheduler.spawn(async move {
            while let Some(envelope) = rx.recv().await {
                tokio::time::sleep_until(envelope.deliver_at).await;
                envelope
                    .channel
                    .dispatch(peer, envelope.origin, envelope.payload);
            }
        });
        state.inboxes.insert(peer, tx);
    }

    fn dropped(&self) -> bool {
        self.loss > 0.0 && self.loss_rng.lock().gen::<f64>() < self.loss
    }

    fn is_connected(&self, peer: Peer) -> bool {
        match peer {
            Peer::Server => true,
            Peer::Client(client) => self.state.lock().clients.contains(&client),
        }
    }

    fn set_attribute(&self, name: &str, value: u64) {
        {
            let mut state = self.state.lock();
            let attribute = state
                .attributes
                .entry(name.to_string())
                .or_insert(Attribute { value, version: 0 });
            attribute.value = value;
            attribute.version += 1;
        }
        self.bump();
    }

    async fn take_attribute(&self, peer: Peer, name: String) -> u64 {
        self.wait_until(|state| {
            let (value, version) = state
                .attributes
                .get(&name)
                .map(|attribute| (attribute.value, attribute.version))?;
            match peer {
                Peer::Server => Some(value),
                Peer::Client(client) => {
                    let seen = state.taken.entry((client, name.clone())).or_insert(0);
                    if version > *seen {
                        *seen = version;
                        Some(value)
                    } else {
                        None
                    }
                }
            }
        })
        .await
    }

    fn event_channel(&self, wire_name: &str, delivery: Delivery) -> Arc<EventChannel> {
        let channel = {
            let mut state = self.state.lock();
            Arc::clone(
                state
                    .events
                    .entry(wire_name.to_string())
                    .or_insert_with(|| Arc::new(EventChannel::new(wire_name, delivery))),
            )
        };
        self.bump();
        channel
    }

    async fn existing_event(&self, wire_name: String) -> Arc<EventChannel> {
        self.wait_until(|state| state.events.get(&wire_name).cloned())
            .await
    }

    fn function_channel(&self, wire_name: &str) -> Arc<FunctionChannel> {
        let channel = {
            let mut state = self.state.lock();
            Arc::clone(
                state
                    .functions
                    .entry(wire_name.to_string())
                    .or_insert_with(|| Arc::new(FunctionChannel::new(wire_name))),
            )
        };
        self.bump();
        channel
    }

    async fn existing_function(&self, wire_name: String) -> Arc<FunctionChannel> {
        self.wait_until(|state| state.functions.get(&wire_name).cloned())
            .await
    }

    /// Queues `payload` for every peer `target` addresses.
    fn deliver(
        &self,
        from: Peer,
        channel: &Arc<EventChannel>,
        target: &Target,
        payload: Payload,
    ) -> EndpointResult<()> {
        let invalid = |reason| EndpointError::InvalidTarget {
            endpoint: channel.wire_name().to_string(),
            reason,
        };
        let deliver_at = Instant::now() + self.latency;
        let state = self.state.lock();

        let receivers: Vec<Peer> = match (from, target) {
            (Peer::Client(client), _) if !state.clients.contains(&client) => {
                return Err(EndpointError::Disconnected);
            }
            (Peer::Client(_), Target::Server) => vec![Peer::Server],
            (Peer::Client(_), _) => return Err(invalid("clients can only send to the server")),
            (Peer::Server, Target::Server) => return Err(invalid("the server cannot send to itself")),
            (Peer::Server, target) => state
                .clients
                .iter()
                .filter(|client| target.includes(**client))
                .map(|client| Peer::Client(*client))
                .collect(),
        };

        for receiver in receivers {
            if channel.delivery() == Delivery::Unreliable && self.dropped() {
                tracing::trace!("Dropped unreliable {} to {:?}", channel.wire_name(), receiver);
                continue;
            }
            if let Some(inbox) = state.inboxes.get(&receiver) {
                // A closed inbox means the receiver just left.
                let _ = inbox.send(Envelope {
                    deliver_at,
                    channel: Arc::clone(channel),
                    origin: from.origin(),
                    payload: payload.clone(),
                });
            }
        }
        Ok(())
    }

    /// Runs the handler on `target` and waits for its answer.
    async fn invoke(
        &self,
        from: Peer,
        channel: Arc<FunctionChannel>,
        target: Target,
        payload: Payload,
    ) -> EndpointResult<Payload> {
        let to = match (from, target) {
            (Peer::Client(_), Target::Server) => Peer::Server,
            (Peer::Server, Target::Client(client)) => Peer::Client(client),
            (Peer::Client(_), _) => {
                return Err(EndpointError::InvalidTarget {
                    endpoint: channel.wire_name().to_string(),
                    reason: "clients can only invoke the server",
                })
            }
            (Peer::Server, _) => {
                return Err(EndpointError::InvalidTarget {
                    endpoint: channel.wire_name().to_string(),
                    reason: "the server invokes one client at a time",
                })
            }
        };
        if !self.is_connected(from) {
            return Err(EndpointError::Disconnected);
        }

        let handler = self
            .wait_until(|state| {
                if let Peer::Client(client) = to {
                    if !state.clients.contains(&client) {
                        return Some(None);
                    }
                }
                channel.handler(to).map(Some)
            })
            .await
            .ok_or(EndpointError::Disconnected)?;

        tokio::time::sleep(self.latency).await;
        let (tx, rx) = oneshot::channel();
        let call = handler(from.origin(), payload);
        self.scheduler.spawn(async move {
            let _ = tx.send(call.await);
        });

        let answer = match to {
            Peer::Server => rx.await,
            Peer::Client(client) => tokio::select! {
                answer = rx => answer,
                () = self.until_gone(client) => return Err(EndpointError::Disconnected),
            },
        };
        let answer = answer.map_err(|_| EndpointError::Remote("handler did not answer".to_string()))?;
        tokio::time::sleep(self.latency).await;
        answer.map_err(EndpointError::Remote)
    }
}

/// An in-process network: one server, many clients.
///
/// Cloning yields another handle to the same network.
#[derive(Clone)]
pub struct LoopbackNetwork {
    inner: Arc<NetworkInner>,
}

impl LoopbackNetwork {
    /// Creates a network with no clients.
    #[must_use]
    pub fn new(scheduler: Scheduler, config: &LoopbackConfig) -> Self {
        let (revision, _) = watch::channel(0);
        let inner = Arc::new(NetworkInner {
            presence: ClientPresence::new(&scheduler),
            scheduler,
            latency: Duration::from_millis(config.latency_ms),
            loss: config.unreliable_loss,
            loss_rng: Mutex::new(ChaCha8Rng::seed_from_u64(config.loss_seed)),
            state: Mutex::new(NetworkState::default()),
            revision,
        });
        {
            let mut state = inner.state.lock();
            inner.open_inbox(&mut state, Peer::Server);
        }
        tracing::debug!(
            "Loopback network up (latency {:?}, loss {})",
            inner.latency,
            inner.loss
        );
        Self { inner }
    }

    /// The server's host.
    #[must_use]
    pub fn server_host(&self) -> Arc<LoopbackHost> {
        Arc::new(LoopbackHost::new(Arc::clone(&self.inner), Peer::Server))
    }

    /// Connects a new client and returns its host.
    #[must_use]
    pub fn connect_client(&self) -> Arc<LoopbackHost> {
        let client = {
            let mut state = self.inner.state.lock();
            state.next_client += 1;
            let client = ClientId(state.next_client);
            state.clients.push(client);
            self.inner.open_inbox(&mut state, Peer::Client(client));
            client
        };
        self.inner.bump();
        self.inner.presence.client_joined(client);
        Arc::new(LoopbackHost::new(Arc::clone(&self.inner), Peer::Client(client)))
    }

    /// Disconnects `client`. Returns `false` if it was not connected.
    ///
    /// Pending invocations addressed to it fail with
    /// [`EndpointError::Disconnected`].
    pub fn disconnect(&self, client: ClientId) -> bool {
        let (events, functions) = {
            let mut state = self.inner.state.lock();
            let Some(index) = state.clients.iter().position(|id| *id == client) else {
                return false;
            };
            state.clients.remove(index);
            state.inboxes.remove(&Peer::Client(client));
            state.taken.retain(|(id, _), _| *id != client);
            (
                state.events.values().cloned().collect::<Vec<_>>(),
                state.functions.values().cloned().collect::<Vec<_>>(),
            )
        };
        for channel in events {
            channel.forget(Peer::Client(client));
        }
        for channel in functions {
            channel.forget(Peer::Client(client));
        }
        self.inner.bump();
        self.inner.presence.client_left(client);
        true
    }

    /// Connected clients, in connection order.
    #[must_use]
    pub fn clients(&self) -> Vec<ClientId> {
        self.inner.state.lock().clients.clone()
    }

    /// Joined/left lifecycles for this network's clients.
    #[must_use]
    pub fn presence(&self) -> &ClientPresence {
        &self.inner.presence
    }

    /// Wire names of every event created so far, sorted.
    #[must_use]
    pub fn event_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.state.lock().events.keys().cloned().collect();
        names.sort();
        names
    }

    /// Wire names of every function created so far, sorted.
    #[must_use]
    pub fn function_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.state.lock().functions.keys().cloned().collect();
        names.sort();
        names
    }
}

impl std::fmt::Debug for LoopbackNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("LoopbackNetwork")
            .field("clients", &state.clients)
            .field("events", &state.events.len())
            .field("functions", &state.functions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{EventTransport, RemoteHost};

    fn network(config: &LoopbackConfig) -> LoopbackNetwork {
        LoopbackNetwork::new(Scheduler::current().unwrap(), config)
    }

    #[tokio::test]
    async fn test_client_ids_increase() {
        let network = network(&LoopbackConfig::default());
        let a = network.connect_client();
        let b = network.connect_client();

        assert_eq!(a.client_id(), Some(ClientId(1)));
        assert_eq!(b.client_id(), Some(ClientId(2)));
        assert_eq!(network.clients(), vec![ClientId(1), ClientId(2)]);

        assert!(network.disconnect(ClientId(1)));
        assert!(!network.disconnect(ClientId(1)));
        assert_eq!(network.clients(), vec![ClientId(2)]);
    }

    #[tokio::test]
    async fn test_attribute_read_clears_client_copy() {
        let network = network(&LoopbackConfig::default());
        let server = network.server_host();
        let client = network.connect_client();

        server.set_attribute("Seed", 9);
        assert_eq!(client.take_attribute("Seed").await, 9);

        let second = tokio::spawn(client.take_attribute("Seed"));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!second.is_finished());

        server.set_attribute("Seed", 10);
        assert_eq!(second.await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_server_reads_do_not_clear() {
        let network = network(&LoopbackConfig::default());
        let server = network.server_host();
        server.set_attribute("Seed", 4);
        assert_eq!(server.take_attribute("Seed").await, 4);
        assert_eq!(server.take_attribute("Seed").await, 4);
    }

    #[tokio::test]
    async fn test_full_loss_drops_unreliable_only() {
        let config = LoopbackConfig {
            unreliable_loss: 1.0,
            ..LoopbackConfig::default()
        };
        let network = network(&config);
        let server = network.server_host();
        let client = network.connect_client();

        let (tx, mut rx) = mpsc::unbounded_channel();
        for (name, delivery) in [("lossy", Delivery::Unreliable), ("sure", Delivery::Reliable)] {
            server.create_event(name, delivery);
            let tx = tx.clone();
            client
                .attach_event(name, delivery)
                .await
                .subscribe(Arc::new(move |_, payload| {
                    let _ = tx.send(payload);
                }));
        }

        let lossy = server.create_event("lossy", Delivery::Unreliable);
        let sure = server.create_event("sure", Delivery::Reliable);
        lossy.send(Target::AllClients, Payload::from(1)).unwrap();
        sure.send(Target::AllClients, Payload::from(2)).unwrap();

        assert_eq!(rx.recv().await, Some(Payload::from(2)));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_latency_delays_delivery() {
        let config = LoopbackConfig {
            latency_ms: 50,
            ..LoopbackConfig::default()
        };
        let network = network(&config);
        let server = network.server_host();
        let client = network.connect_client();

        let event = server.create_event("ping", Delivery::Reliable);
        let (tx, mut rx) = mpsc::unbounded_channel();
        event.subscribe(Arc::new(move |origin, _| {
            let _ = tx.send(origin);
        }));

        let started = Instant::now();
        client
            .attach_event("ping", Delivery::Reliable)
            .await
            .send(Target::Server, Payload::Null)
            .unwrap();

        assert_eq!(rx.recv().await, Some(Origin::Client(ClientId(1))));
        assert!(started.elapsed() >= Duration::from_millis(50));
    }
}
