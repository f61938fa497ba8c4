//! # Client Presence
//!
//! Server-side "client joined" and "client left" lifecycles.
//!
//! A callback registered on [`ClientPresence::joined`] after clients are
//! already connected is replayed once per connected client, so every
//! registration sees every client exactly once regardless of timing. A
//! registration racing a join may see that client twice.

use std::sync::Arc;

use neutron_core::{Callback, ExecutionModel, Lifecycle, Scheduler, Subscription};
use parking_lot::Mutex;

use crate::host::ClientId;

/// Joined/left lifecycles with catch-up for late registrations.
pub struct ClientPresence {
    joined: Lifecycle<ClientId>,
    left: Lifecycle<ClientId>,
    connected: Arc<Mutex<Vec<ClientId>>>,
    replay: Option<Subscription>,
}

impl ClientPresence {
    /// Creates presence tracking with no clients.
    #[must_use]
    pub fn new(scheduler: &Scheduler) -> Self {
        let joined = Lifecycle::new("ClientJoined", ExecutionModel::Concurrent, scheduler.clone());
        let left = Lifecycle::new("ClientLeft", ExecutionModel::Concurrent, scheduler.clone());
        let connected = Arc::new(Mutex::new(Vec::new()));

        let replay = {
            let connected = Arc::clone(&connected);
            let scheduler = scheduler.clone();
            joined.on_registered(move |callback: &Callback<ClientId>| {
                let known: Vec<ClientId> = connected.lock().clone();
                for client in known {
                    scheduler.spawn(callback.call(client));
                }
            })
        };

        Self {
            joined,
            left,
            connected,
            replay: Some(replay),
        }
    }

    /// Fires with each client that connects.
    #[must_use]
    pub fn joined(&self) -> &Lifecycle<ClientId> {
        &self.joined
    }

    /// Fires with each client that disconnects.
    #[must_use]
    pub fn left(&self) -> &Lifecycle<ClientId> {
        &self.left
    }

    /// Connected clients, in join order.
    #[must_use]
    pub fn connected(&self) -> Vec<ClientId> {
        self.connected.lock().clone()
    }

    /// Records `client` as connected and fires `joined`.
    pub fn client_joined(&self, client: ClientId) {
        {
            let mut connected = self.connected.lock();
            if connected.contains(&client) {
                return;
            }
            connected.push(client);
        }
        tracing::info!("{} joined", client);
        self.joined.spawn_fire(client);
    }

    /// Records `client` as gone and fires `left`.
    pub fn client_left(&self, client: ClientId) {
        {
            let mut connected = self.connected.lock();
            let Some(index) = connected.iter().position(|id| *id == client) else {
                return;
            };
            connected.remove(index);
        }
        tracing::info!("{} left", client);
        self.left.spawn_fire(client);
    }

    /// Stops replaying connected clients to new `joined` registrations.
    pub fn stop_replay(&mut self) {
        if let Some(replay) = self.replay.take() {
            replay.cancel();
        }
    }
}

impl std::fmt::Debug for ClientPresence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientPresence")
            .field("connected", &self.connected.lock().len())
            .field("replaying", &self.replay.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    fn recorder(seen: &Arc<Mutex<Vec<ClientId>>>) -> Callback<ClientId> {
        let seen = Arc::clone(seen);
        Callback::from_fn(move |client| seen.lock().push(client))
    }

    #[tokio::test]
    async fn test_late_registration_sees_connected_clients() {
        let presence = ClientPresence::new(&Scheduler::current().unwrap());
        presence.client_joined(ClientId(1));
        presence.client_joined(ClientId(2));
        settle().await;

        let seen = Arc::new(Mutex::new(Vec::new()));
        presence.joined().register(recorder(&seen), "late");
        settle().await;

        let mut seen = seen.lock().clone();
        seen.sort();
        assert_eq!(seen, vec![ClientId(1), ClientId(2)]);
    }

    #[tokio::test]
    async fn test_early_registration_sees_joins() {
        let presence = ClientPresence::new(&Scheduler::current().unwrap());
        let seen = Arc::new(Mutex::new(Vec::new()));
        presence.joined().register(recorder(&seen), "early");

        presence.client_joined(ClientId(5));
        presence.client_joined(ClientId(5));
        settle().await;

        assert_eq!(seen.lock().clone(), vec![ClientId(5)]);
    }

    #[tokio::test]
    async fn test_left_fires_once_and_forgets_client() {
        let presence = ClientPresence::new(&Scheduler::current().unwrap());
        let gone = Arc::new(Mutex::new(Vec::new()));
        presence.left().register(recorder(&gone), "test");

        presence.client_joined(ClientId(3));
        presence.client_left(ClientId(3));
        presence.client_left(ClientId(3));
        settle().await;

        assert_eq!(gone.lock().clone(), vec![ClientId(3)]);
        assert!(presence.connected().is_empty());
    }

    #[tokio::test]
    async fn test_stop_replay() {
        let mut presence = ClientPresence::new(&Scheduler::current().unwrap());
        presence.client_joined(ClientId(1));
        presence.stop_replay();
        settle().await;

        let seen = Arc::new(Mutex::new(Vec::new()));
        presence.joined().register(recorder(&seen), "late");
        settle().await;

        assert!(seen.lock().is_empty());
        assert_eq!(presence.joined().listener_counts(), (0, 0));
    }
}
