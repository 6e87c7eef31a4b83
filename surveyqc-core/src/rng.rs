//! Deterministic RNG hierarchy.
//!
//! A master seed yields independent sub-seeds for each `(stream, index)` pair,
//! e.g. `("batch", ratio_step)` or `("bootstrap", response_index)`. Sub-seeds
//! are derived by BLAKE3 hashing rather than by drawing from a shared
//! generator, so results do not depend on evaluation order or thread count.

use rand::rngs::StdRng;
use rand::SeedableRng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
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

    pub fn sub_seed(&self, stream: &str, index: u64) -> u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.master_seed.to_le_bytes());
        hasher.update(stream.as_bytes());
        hasher.update(&index.to_le_bytes());
        let hash = hasher.finalize();
        let mut head = [0u8; 8];
        head.copy_from_slice(&hash.as_bytes()[..8]);
        u64::from_le_bytes(head)
    }

    pub fn rng_for(&self, stream: &str, index: u64) -> StdRng {
        StdRng::seed_from_u64(self.sub_seed(stream, index))
    }

    /// A child hierarchy rooted at a sub-seed.
    pub fn child(&self, stream: &str, index: u64) -> RngHierarchy {
        RngHierarchy::new(self.sub_seed(stream, index))
    }
}
