use rand::RngCore;

use crate::Error;
use crate::hash::{HashParams, Key};

/// Parameter draws `init_ideal` tries before giving up. Each trial over
/// `k²` buckets is collision-free with probability above 1/2 (birthday
/// bound), so the cap is unreachable under a working RNG.
const MAX_IDEAL_ATTEMPTS: u32 = 64;

/// Dynamic chained hash table: buckets of keys, linear scan per bucket.
///
/// Usable standalone as a plain set, and via [`init_ideal`] as the
/// collision-free inner table of [`FixedSet`](crate::FixedSet). Key
/// operations before [`init`] fail with [`Error::Uninitialized`].
///
/// [`init`]: Self::init
/// [`init_ideal`]: Self::init_ideal
#[derive(Debug, Clone)]
pub struct ChainedHashTable<K> {
    buckets: Vec<Vec<K>>,
    params: Option<HashParams>,
    len: usize,
}

impl<K: Key> ChainedHashTable<K> {
    pub fn new() -> Self {
        Self {
            buckets: Vec::new(),
            params: None,
            len: 0,
        }
    }

    /// Resets the table to `bucket_count` empty buckets (at least one) and
    /// draws fresh hash parameters from `rng`.
    pub fn init<R: RngCore>(&mut self, bucket_count: usize, rng: &mut R) {
        self.params = Some(HashParams::draw(rng));
        self.buckets.clear();
        self.buckets.resize_with(bucket_count.max(1), Vec::new);
        self.len = 0;
    }

    fn bucket_index(&self, key: &K) -> Result<usize, Error> {
        let params = self.params.ok_or(Error::Uninitialized)?;
        Ok(params.bucket(key, self.buckets.len()))
    }

    /// Inserts `key` unless it is already present.
    pub fn insert(&mut self, key: K) -> Result<(), Error> {
        let index = self.bucket_index(&key)?;
        let bucket = &mut self.buckets[index];
        if !bucket.contains(&key) {
            bucket.push(key);
            self.len += 1;
        }
        Ok(())
    }

    pub fn contains(&self, key: &K) -> Result<bool, Error> {
        Ok(self.buckets[self.bucket_index(key)?].contains(key))
    }

    /// Removes `key`; a no-op if it is absent.
    pub fn erase(&mut self, key: &K) -> Result<(), Error> {
        let index = self.bucket_index(key)?;
        let bucket = &mut self.buckets[index];
        if let Some(position) = bucket.iter().position(|k| k == key) {
            bucket.swap_remove(position);
            self.len -= 1;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Rebuilds the table over `keys.len()²` buckets, redrawing parameters
    /// until every key of `keys` lands in its own, previously empty bucket.
    ///
    /// `keys` must be distinct. A trial aborts on the first collision, so
    /// each costs O(keys.len()) and the expected total is O(keys.len()).
    pub fn init_ideal<R: RngCore>(&mut self, keys: &[K], rng: &mut R) -> Result<(), Error> {
        let bucket_count = keys.len() * keys.len();
        for _ in 0..MAX_IDEAL_ATTEMPTS {
            self.init(bucket_count, rng);
            let mut clean = true;
            for key in keys {
                let index = self.bucket_index(key)?;
                if !self.buckets[index].is_empty() {
                    clean = false;
                    break;
                }
                self.buckets[index].push(key.clone());
                self.len += 1;
            }
            if clean {
                return Ok(());
            }
        }
        Err(Error::RetriesExhausted {
            attempts: MAX_IDEAL_ATTEMPTS,
        })
    }
}

impl<K: Key> Default for ChainedHashTable<K> {
    fn default() -> Self {
        Self::new()
    }
}
