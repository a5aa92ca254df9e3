//! fixed_set — static, collision-free lookup over a fixed key set.
//!
//! - [`FixedSet`]: two-level (FKS) hashing. Exact membership, worst-case
//!   O(1) lookup, expected O(n) space.
//! - [`OrderedFixedSet`]: order-preserving minimal perfect hash. Maps each
//!   key back to its position in the build sequence, O(1) lookup.
//! - [`ChainedHashTable`]: the dynamic chained table both are built on.
//!
//! Construction is randomized retry-until-success; the randomness is
//! injected (`rand::RngCore`), so builds are reproducible under test.

use thiserror::Error;

mod fixed_set;
mod hash;
mod ordered;
mod table;

pub use fixed_set::FixedSet;
pub use hash::{HashParams, Key, MODULUS};
pub use ordered::OrderedFixedSet;
pub use table::ChainedHashTable;

/// Exact (non-probabilistic) set used to reject duplicate build inputs.
pub(crate) type DedupSet<K> = hashbrown::HashSet<K, ahash::RandomState>;

#[derive(Debug, Error)]
pub enum Error {
    /// Key operation on a [`ChainedHashTable`] that was never initialized.
    #[error("hash table used before init")]
    Uninitialized,
    /// A build input contained the same key twice.
    #[error("duplicate key detected during build")]
    DuplicateKey,
    /// A bounded randomized retry loop hit its cap. Unreachable under a
    /// working RNG; treat as a broken randomness source, not a recoverable
    /// condition.
    #[error("construction did not converge after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },
}
