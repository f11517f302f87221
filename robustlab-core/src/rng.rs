//! Deterministic RNG hierarchy.
//!
//! A master seed generates sub-seeds for each `(scope, iteration)` pair.
//! Sub-seeds are derived by BLAKE3 hashing, so parallel Monte Carlo trials get
//! the same stream regardless of thread scheduling.

use rand::rngs::StdRng;
use rand::SeedableRng;

#[derive(Debug, Clone)]
pub struct RngHierarchy {
    master_seed: u64,
}

impl RngHierarchy {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    /// Derive a sub-seed for `(scope, iteration)`.
    ///
    /// Independent of derivation order: asking for `("noise", 3)` before or
    /// after `("crash", 0)` gives the same value.
    pub fn sub_seed(&self, scope: &str, iteration: u64) -> u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.master_seed.to_le_bytes());
        hasher.update(scope.as_bytes());
        hasher.update(&iteration.to_le_bytes());
        let hash = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&hash.as_bytes()[..8]);
        u64::from_le_bytes(bytes)
    }

    /// Seeded `StdRng` for `(scope, iteration)`.
    pub fn rng_for(&self, scope: &str, iteration: u64) -> StdRng {
        StdRng::seed_from_u64(self.sub_seed(scope, iteration))
    }
}
