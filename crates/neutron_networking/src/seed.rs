//! # Seed Exchange
//!
//! The only protocol surface Neutron adds: one integer attribute.
//!
//! ```text
//! server: generate_seed() -> publish_seed(host, seed)      (once, at boot)
//! client: resolve_seed(host).await                         (waits, then clears)
//! ```
//!
//! The server must publish before any client declares an endpoint. A client
//! whose server never publishes waits forever.

use neutron_shared::SEED_ATTRIBUTE;

use crate::host::RemoteHost;

/// Picks a fresh seed for this server process from OS entropy.
#[must_use]
pub fn generate_seed() -> u64 {
    rand::random::<u64>()
}

/// Writes the seed where clients will look for it.
pub fn publish_seed(host: &dyn RemoteHost, seed: u64) {
    tracing::info!("Publishing naming seed");
    host.set_attribute(SEED_ATTRIBUTE, seed);
}

/// Waits for the server's seed and reads it.
///
/// On a client this consumes the attribute; resolve once per process and
/// keep the result.
pub async fn resolve_seed(host: &dyn RemoteHost) -> u64 {
    tracing::debug!("Waiting for naming seed");
    let seed = host.take_attribute(SEED_ATTRIBUTE).await;
    tracing::debug!("Naming seed received");
    seed
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generated_seeds_differ() {
        let seeds: HashSet<u64> = (0..16).map(|_| generate_seed()).collect();
        assert!(seeds.len() > 1);
    }
}
