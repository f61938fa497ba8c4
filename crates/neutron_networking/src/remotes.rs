//! # Endpoint Declaration
//!
//! [`Remotes`] binds a host, a side and a namer. Every remote event or
//! function a game uses is declared through it.
//!
//! ## Keys
//!
//! | declaration          | key                                   |
//! |----------------------|---------------------------------------|
//! | `event(dir)`         | caller location, `file:line:column`   |
//! | `named_event(n, ..)` | `n`, reserved verbatim as wire name   |
//!
//! Fingerprinted declarations must be reached in the same order on server
//! and client. Put them in shared code that both sides run.
//!
//! ## Declaration Is Two-Phase
//!
//! The wire name is assigned when the declaring method is called. The
//! returned future then creates (server, completes at once) or attaches to
//! (client, waits for the server) the host endpoint. Declaring several
//! endpoints and awaiting them later keeps names in call order.

use std::future::Future;
use std::panic::Location;
use std::sync::Arc;

use neutron_shared::NamerConfig;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::EndpointResult;
use crate::host::{Delivery, RemoteHost, Side};
use crate::namer::EndpointNamer;
use crate::remote::{Direction, EndpointInfo, RemoteEvent, RemoteFunction};
use crate::seed::{publish_seed, resolve_seed};

/// What a wire name is derived from.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum EndpointKey {
    /// A declaration site; the namer derives the wire name.
    Fingerprint(String),
    /// An explicit name, used verbatim on the wire.
    Named(String),
}

impl EndpointKey {
    /// The location of the code calling this (through any `#[track_caller]`
    /// frames).
    #[must_use]
    #[track_caller]
    pub fn caller() -> Self {
        let location = Location::caller();
        Self::Fingerprint(format!(
            "{}:{}:{}",
            location.file(),
            location.line(),
            location.column()
        ))
    }

    /// The fingerprint or name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Fingerprint(key) | Self::Named(key) => key,
        }
    }
}

/// The declaration point for remote endpoints on one side.
pub struct Remotes {
    host: Arc<dyn RemoteHost>,
    side: Side,
    namer: Mutex<EndpointNamer>,
    declared: Mutex<Vec<EndpointInfo>>,
}

impl Remotes {
    fn new(host: Arc<dyn RemoteHost>, seed: u64, config: &NamerConfig) -> Self {
        Self {
            side: host.side(),
            host,
            namer: Mutex::new(EndpointNamer::new(seed, config.clone())),
            declared: Mutex::new(Vec::new()),
        }
    }

    /// Server-side remotes. Publishes `seed` for clients before returning.
    #[must_use]
    pub fn server(host: Arc<dyn RemoteHost>, seed: u64, config: &NamerConfig) -> Arc<Self> {
        publish_seed(host.as_ref(), seed);
        tracing::info!("Server remotes ready");
        Arc::new(Self::new(host, seed, config))
    }

    /// Client-side remotes. Waits for the server's seed, with no timeout.
    pub async fn client(host: Arc<dyn RemoteHost>, config: &NamerConfig) -> Arc<Self> {
        let seed = resolve_seed(host.as_ref()).await;
        tracing::info!("Client remotes ready");
        Arc::new(Self::new(host, seed, config))
    }

    /// Which side these remotes declare on.
    #[must_use]
    pub fn side(&self) -> Side {
        self.side
    }

    /// The shared naming seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.namer.lock().seed()
    }

    /// Everything declared so far, in declaration order.
    #[must_use]
    pub fn endpoints(&self) -> Vec<EndpointInfo> {
        self.declared.lock().clone()
    }

    fn assign(&self, key: EndpointKey, direction: Direction) -> EndpointResult<EndpointInfo> {
        let wire_name = {
            let mut namer = self.namer.lock();
            match &key {
                EndpointKey::Fingerprint(fingerprint) => namer.assign(fingerprint),
                EndpointKey::Named(name) => {
                    namer.reserve(name)?;
                    name.clone()
                }
            }
        };
        let info = EndpointInfo {
            name: match key {
                EndpointKey::Fingerprint(key) | EndpointKey::Named(key) => key,
            },
            wire_name,
            direction,
        };
        tracing::debug!("Declared {} as {:?} ({})", info.name, info.wire_name, direction);
        self.declared.lock().push(info.clone());
        Ok(info)
    }

    /// Declares an event under `key`.
    ///
    /// On a client the returned future waits until the server has created
    /// the endpoint. If it never does, the future never completes.
    pub fn declare_event<T>(
        &self,
        key: EndpointKey,
        direction: Direction,
        delivery: Delivery,
    ) -> impl Future<Output = EndpointResult<RemoteEvent<T>>> + Send + 'static
    where
        T: Serialize + DeserializeOwned + Send + 'static,
    {
        let assigned = self.assign(key, direction);
        let host = Arc::clone(&self.host);
        let side = self.side;
        async move {
            let info = assigned?;
            let transport = match side {
                Side::Server => host.create_event(&info.wire_name, delivery),
                Side::Client => host.attach_event(&info.wire_name, delivery).await,
            };
            Ok(RemoteEvent::new(info, side, transport))
        }
    }

    /// Declares a function under `key`. Functions are always reliable.
    pub fn declare_function<Req, Resp>(
        &self,
        key: EndpointKey,
        direction: Direction,
    ) -> impl Future<Output = EndpointResult<RemoteFunction<Req, Resp>>> + Send + 'static
    where
        Req: Serialize + DeserializeOwned + Send + 'static,
        Resp: Serialize + DeserializeOwned + Send + 'static,
    {
        let assigned = self.assign(key, direction);
        let host = Arc::clone(&self.host);
        let side = self.side;
        async move {
            let info = assigned?;
            let transport = match side {
                Side::Server => host.create_function(&info.wire_name),
                Side::Client => host.attach_function(&info.wire_name).await,
            };
            Ok(RemoteFunction::new(info, side, transport))
        }
    }

    /// Declares a reliable event keyed by the caller's location.
    #[track_caller]
    pub fn event<T>(
        &self,
        direction: Direction,
    ) -> impl Future<Output = EndpointResult<RemoteEvent<T>>> + Send + 'static
    where
        T: Serialize + DeserializeOwned + Send + 'static,
    {
        self.declare_event(EndpointKey::caller(), direction, Delivery::Reliable)
    }

    /// Declares an unreliable event keyed by the caller's location.
    #[track_caller]
    pub fn unreliable_event<T>(
        &self,
        direction: Direction,
    ) -> impl Future<Output = EndpointResult<RemoteEvent<T>>> + Send + 'static
    where
        T: Serialize + DeserializeOwned + Send + 'static,
    {
        self.declare_event(EndpointKey::caller(), direction, Delivery::Unreliable)
    }

    /// Declares a reliable event whose wire name is `name`.
    pub fn named_event<T>(
        &self,
        name: &str,
        direction: Direction,
    ) -> impl Future<Output = EndpointResult<RemoteEvent<T>>> + Send + 'static
    where
        T: Serialize + DeserializeOwned + Send + 'static,
    {
        self.declare_event(EndpointKey::Named(name.to_string()), direction, Delivery::Reliable)
    }

    /// Declares an unreliable event whose wire name is `name`.
    pub fn named_unreliable_event<T>(
        &self,
        name: &str,
        direction: Direction,
    ) -> impl Future<Output = EndpointResult<RemoteEvent<T>>> + Send + 'static
    where
        T: Serialize + DeserializeOwned + Send + 'static,
    {
        self.declare_event(EndpointKey::Named(name.to_string()), direction, Delivery::Unreliable)
    }

    /// Declares a function keyed by the caller's location.
    #[track_caller]
    pub fn function<Req, Resp>(
        &self,
        direction: Direction,
    ) -> impl Future<Output = EndpointResult<RemoteFunction<Req, Resp>>> + Send + 'static
    where
        Req: Serialize + DeserializeOwned + Send + 'static,
        Resp: Serialize + DeserializeOwned + Send + 'static,
    {
        self.declare_function(EndpointKey::caller(), direction)
    }

    /// Declares a function whose wire name is `name`.
    pub fn named_function<Req, Resp>(
        &self,
        name: &str,
        direction: Direction,
    ) -> impl Future<Output = EndpointResult<RemoteFunction<Req, Resp>>> + Send + 'static
    where
        Req: Serialize + DeserializeOwned + Send + 'static,
        Resp: Serialize + DeserializeOwned + Send + 'static,
    {
        self.declare_function(EndpointKey::Named(name.to_string()), direction)
    }
}

impl std::fmt::Debug for Remotes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Remotes")
            .field("side", &self.side)
            .field("declared", &self.declared.lock().len())
            .finish_non_exhaustive()
    }
}
