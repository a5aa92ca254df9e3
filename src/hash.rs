use rand::RngCore;
use xxhash_rust::xxh3::xxh3_64;

/// Modulus of the multiplicative family: the Mersenne prime 2⁶¹ − 1.
///
/// Must exceed the 64-bit `raw_hash` range divided out per draw: with a
/// smaller prime, two keys whose raw hashes are congruent mod the prime
/// would collide under every draw and stall the retry loops.
pub const MODULUS: u64 = (1u64 << 61) - 1;

/// Content hash feeding the multiplicative family.
///
/// `raw_hash` must be a pure function of the key's value: equal keys give
/// equal words, across runs and processes. All randomness lives in
/// [`HashParams`], never here.
pub trait Key: Clone + Eq + core::hash::Hash {
    fn raw_hash(&self) -> u64;
}

macro_rules! impl_key_unsigned {
    ($($t:ty),*) => {$(
        impl Key for $t {
            #[inline]
            fn raw_hash(&self) -> u64 {
                *self as u64
            }
        }
    )*};
}

macro_rules! impl_key_signed {
    ($($t:ty => $u:ty),*) => {$(
        impl Key for $t {
            /// Bias-shifted by the type minimum so negative values map to
            /// non-negative words and value order is preserved.
            #[inline]
            fn raw_hash(&self) -> u64 {
                self.wrapping_sub(<$t>::MIN) as $u as u64
            }
        }
    )*};
}

impl_key_unsigned!(u8, u16, u32, u64, usize);
impl_key_signed!(i8 => u8, i16 => u16, i32 => u32, i64 => u64, isize => usize);

impl Key for Vec<u8> {
    #[inline]
    fn raw_hash(&self) -> u64 {
        xxh3_64(self)
    }
}

impl Key for String {
    #[inline]
    fn raw_hash(&self) -> u64 {
        xxh3_64(self.as_bytes())
    }
}

/// One draw of the multiplicative hash family: `h(k) = (a·raw(k) + b) mod P`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashParams {
    a: u64,
    b: u64,
}

impl HashParams {
    /// Fresh coefficients from `rng`, both in `[0, MODULUS)`.
    pub fn draw<R: RngCore>(rng: &mut R) -> Self {
        Self {
            a: rng.next_u64() % MODULUS,
            b: rng.next_u64() % MODULUS,
        }
    }

    /// Hash value in `[0, MODULUS)`.
    #[inline]
    pub fn eval<K: Key>(&self, key: &K) -> u64 {
        let product = self.a as u128 * key.raw_hash() as u128 + self.b as u128;
        (product % MODULUS as u128) as u64
    }

    /// Bucket index for a table with `buckets` slots (`buckets > 0`).
    #[inline]
    pub fn bucket<K: Key>(&self, key: &K, buckets: usize) -> usize {
        (self.eval(key) % buckets as u64) as usize
    }
}
