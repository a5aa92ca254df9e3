use rand::RngCore;

use crate::hash::{HashParams, Key};
use crate::table::ChainedHashTable;
use crate::{DedupSet, Error};

/// Outer-hash draws tried before giving up. A random draw keeps the bucket
/// square sum within `4n` with probability above 1/2 (Markov on its
/// expectation, which is below `2n`), so the cap is unreachable under a
/// working RNG.
const MAX_OUTER_ATTEMPTS: u32 = 64;

/// Static exact-membership set with worst-case O(1) `contains`.
///
/// Two-level scheme: an outer hash partitions the `n` keys into `n`
/// buckets, and every non-empty bucket gets its own collision-free
/// [`ChainedHashTable`] over `bucket_size²` slots. The outer draw is
/// redrawn until `Σ bucket_size² ≤ 4n`, which bounds total space to
/// expected O(n). Immutable once built.
#[derive(Debug, Clone)]
pub struct FixedSet<K> {
    outer: HashParams,
    tables: Vec<Option<ChainedHashTable<K>>>,
    len: usize,
}

impl<K: Key> FixedSet<K> {
    /// Builds the set over `keys`. Keys must be distinct; duplicates are
    /// rejected up front rather than left to spin the retry loops.
    pub fn build<R: RngCore>(keys: &[K], rng: &mut R) -> Result<Self, Error> {
        let mut seen: DedupSet<&K> = DedupSet::default();
        for key in keys {
            if !seen.insert(key) {
                return Err(Error::DuplicateKey);
            }
        }

        let n = keys.len();
        let (outer, assignment) = draw_outer(keys, rng)?;

        let mut grouped: Vec<Vec<K>> = vec![Vec::new(); n];
        for (key, &bucket) in keys.iter().zip(&assignment) {
            grouped[bucket].push(key.clone());
        }

        let mut tables = Vec::with_capacity(n);
        for group in &grouped {
            if group.is_empty() {
                tables.push(None);
            } else {
                let mut table = ChainedHashTable::new();
                table.init_ideal(group, rng)?;
                tables.push(Some(table));
            }
        }

        Ok(Self {
            outer,
            tables,
            len: n,
        })
    }

    /// Exact membership: no false positives, no false negatives.
    pub fn contains(&self, key: &K) -> bool {
        if self.tables.is_empty() {
            return false;
        }
        match &self.tables[self.outer.bucket(key, self.tables.len())] {
            Some(table) => table.contains(key).unwrap_or(false),
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Redraws the outer hash until the accepted draw satisfies
/// `Σ bucket_size² ≤ 4n`; returns it with each key's bucket index.
fn draw_outer<K: Key, R: RngCore>(
    keys: &[K],
    rng: &mut R,
) -> Result<(HashParams, Vec<usize>), Error> {
    let n = keys.len();
    if n == 0 {
        return Ok((HashParams::draw(rng), Vec::new()));
    }

    for _ in 0..MAX_OUTER_ATTEMPTS {
        let params = HashParams::draw(rng);
        let mut sizes = vec![0usize; n];
        let mut assignment = Vec::with_capacity(n);
        for key in keys {
            let bucket = params.bucket(key, n);
            sizes[bucket] += 1;
            assignment.push(bucket);
        }
        let square_sum: usize = sizes.iter().map(|&size| size * size).sum();
        if square_sum <= 4 * n {
            return Ok((params, assignment));
        }
    }
    Err(Error::RetriesExhausted {
        attempts: MAX_OUTER_ATTEMPTS,
    })
}
