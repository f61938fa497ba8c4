//! # Neutron Networking
//!
//! Named remote events and functions over the host's own transport.
//!
//! ## Architecture
//!
//! ```text
//!  SERVER                                          CLIENT
//!    |                                               |
//!    |-- set_attribute(NeutronSeed, seed) --------->| take_attribute (waits)
//!    |                                               |
//!    | event(dir) at src/remotes.rs:12:5             | event(dir) at src/remotes.rs:12:5
//!    |   name = namer(seed, "src/remotes.rs:12:5")   |   name = namer(seed, "src/remotes.rs:12:5")
//!    |   host.create_event(name)                     |   host.attach_event(name) (waits)
//!    |                                               |
//!    |<============ host transport ==================>|
//! ```
//!
//! Both sides run the same declaration code, so both derive the same wire
//! name. No name ever crosses the wire unless the caller chooses one.
//!
//! ## What This Crate Does NOT Do
//!
//! - Define a wire format. Payloads are `serde_json::Value`s handed to the host.
//! - Retry, time out, or reorder. The host decides delivery.
//!
//! ## Example
//!
//! ```rust,ignore
//! use neutron_networking::{Direction, Remotes};
//!
//! fn chat(remotes: &Remotes) -> impl Future<Output = EndpointResult<RemoteEvent<String>>> {
//!     remotes.event(Direction::Bidirectional)
//! }
//!
//! // server
//! let remotes = Remotes::server(server_host, seed, &config.namer);
//! let chat = chat(&remotes).await?;
//! chat.on_server_event(|client, text| println!("{client}: {text}"))?;
//!
//! // client
//! let remotes = Remotes::client(client_host, &config.namer).await;
//! chat(&remotes).await?.fire_server(&"hello".to_string())?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod host;
pub mod loopback;
pub mod namer;
pub mod presence;
pub mod remote;
pub mod remotes;
pub mod seed;

pub use error::{EndpointError, EndpointResult};
pub use host::{
    ClientId, Connection, Delivery, EventHandler, EventTransport, FunctionTransport,
    InvokeHandler, Origin, Payload, RemoteHost, Side, Target,
};
pub use loopback::{LoopbackHost, LoopbackNetwork};
pub use namer::{checksum, EndpointNamer};
pub use presence::ClientPresence;
pub use remote::{Direction, EndpointInfo, RemoteEvent, RemoteFunction};
pub use remotes::{EndpointKey, Remotes};
pub use seed::{generate_seed, publish_seed, resolve_seed};
