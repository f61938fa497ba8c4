//! # Endpoint Namer
//!
//! Derives short wire names from a shared seed and a declaration fingerprint.
//!
//! ## Derivation
//!
//! ```text
//! checksum = sum of fingerprint bytes
//! rng      = ChaCha8(seed + checksum)
//! base     = name_length code points drawn from [min, max]
//! name     = base, or base0, base1, ... if base is already taken
//! ```
//!
//! Client and server hold the same seed and declare endpoints from the same
//! code in the same order, so they assign the same names. The checksum is
//! deliberately weak: two fingerprints may share one. The suffix, not the
//! checksum, makes names unique.

use std::collections::HashSet;

use neutron_shared::NamerConfig;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::error::{EndpointError, EndpointResult};

/// Byte-sum of `fingerprint`.
#[inline]
#[must_use]
pub fn checksum(fingerprint: &str) -> u64 {
    fingerprint
        .bytes()
        .fold(0u64, |sum, byte| sum.wrapping_add(u64::from(byte)))
}

/// Assigns process-unique wire names.
#[derive(Clone, Debug)]
pub struct EndpointNamer {
    seed: u64,
    config: NamerConfig,
    /// Assignment order.
    assigned: Vec<String>,
    taken: HashSet<String>,
}

impl EndpointNamer {
    /// Creates a namer for `seed`.
    ///
    /// A `config` that fails [`NamerConfig::validate`] is replaced by the
    /// defaults, with a warning.
    #[must_use]
    pub fn new(seed: u64, config: NamerConfig) -> Self {
        let config = match config.validate() {
            Ok(()) => config,
            Err(e) => {
                tracing::warn!("Unusable namer settings, using defaults: {}", e);
                NamerConfig::default()
            }
        };
        Self {
            seed,
            config,
            assigned: Vec::new(),
            taken: HashSet::new(),
        }
    }

    /// The shared seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// The unsuffixed name for `fingerprint`. Pure; reserves nothing.
    #[must_use]
    pub fn base_name(&self, fingerprint: &str) -> String {
        self.base_name_for_checksum(checksum(fingerprint))
    }

    /// The unsuffixed name for a precomputed checksum.
    #[must_use]
    pub fn base_name_for_checksum(&self, checksum: u64) -> String {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed.wrapping_add(checksum));
        (0..self.config.name_length)
            .map(|_| {
                let code = rng.gen_range(self.config.min_code_point..=self.config.max_code_point);
                char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER)
            })
            .collect()
    }

    /// Assigns a unique name for `fingerprint`.
    pub fn assign(&mut self, fingerprint: &str) -> String {
        let base = self.base_name(fingerprint);
        let name = if self.taken.contains(&base) {
            let name = (0u64..)
                .map(|suffix| format!("{base}{suffix}"))
                .find(|candidate| !self.taken.contains(candidate))
                .unwrap_or_default();
            tracing::debug!("Wire name collision for {}, suffixed", fingerprint);
            name
        } else {
            base
        };
        self.insert(name.clone());
        name
    }

    /// Reserves an explicit name verbatim.
    ///
    /// # Errors
    ///
    /// [`EndpointError::NameTaken`] if `name` was already assigned or reserved.
    pub fn reserve(&mut self, name: &str) -> EndpointResult<()> {
        if self.taken.contains(name) {
            return Err(EndpointError::NameTaken(name.to_string()));
        }
        self.insert(name.to_string());
        Ok(())
    }

    fn insert(&mut self, name: String) {
        self.taken.insert(name.clone());
        self.assigned.push(name);
    }

    /// Returns whether `name` is in use.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.taken.contains(name)
    }

    /// Names in assignment order.
    #[must_use]
    pub fn assigned(&self) -> &[String] {
        &self.assigned
    }

    /// Number of names in use.
    #[must_use]
    pub fn len(&self) -> usize {
        self.assigned.len()
    }

    /// Returns whether no name is in use.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assigned.is_empty()
    }
}
