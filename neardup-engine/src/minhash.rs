//! MinHash signature generation.
//!
//! Universal hashing: h_i(x) = (a_i * x + b_i) mod p with p = 2^61 - 1.
//! The coefficients are drawn from a SplitMix64 stream seeded by the
//! configured MinHash seed, so two processes with the same (k, seed) always
//! produce the same hash family.

use neardup_core::config::MinHashConfig;
use neardup_core::types::Signature;

use crate::shingle::ShingleSet;

/// Mersenne prime 2^61 - 1.
pub const MERSENNE_PRIME: u64 = (1u64 << 61) - 1;

/// Reduce a 128-bit value modulo 2^61 - 1 without division.
#[inline]
fn mod_mersenne(x: u128) -> u64 {
    let p = MERSENNE_PRIME as u128;
    let mut r = (x & p) + (x >> 61);
    r = (r & p) + (r >> 61);
    if r >= p {
        r -= p;
    }
    r as u64
}

/// SplitMix64 step.
#[inline]
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// A seeded family of k hash functions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinHasher {
    seed: u64,
    a: Vec<u64>,
    b: Vec<u64>,
}

impl MinHasher {
    pub fn new(num_perm: usize, seed: u64) -> Self {
        let mut state = seed;
        let mut a = Vec::with_capacity(num_perm);
        let mut b = Vec::with_capacity(num_perm);
        for _ in 0..num_perm {
            // a must be non-zero mod p
            a.push(splitmix64(&mut state) % (MERSENNE_PRIME - 1) + 1);
            b.push(splitmix64(&mut state) % MERSENNE_PRIME);
        }
        Self { seed, a, b }
    }

    pub fn from_config(config: &MinHashConfig) -> Self {
        Self::new(config.effective_num_perm(), config.effective_seed())
    }

    pub fn num_perm(&self) -> usize {
        self.a.len()
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Signature of a shingle set. An empty set gives the degenerate
    /// signature.
    pub fn signature(&self, shingles: &ShingleSet) -> Signature {
        self.signature_of_hashes(shingles.iter())
    }

    /// Signature over raw 64-bit element hashes.
    pub fn signature_of_hashes(&self, hashes: impl IntoIterator<Item = u64>) -> Signature {
        let mut values = vec![Signature::EMPTY_SLOT; self.num_perm()];
        for x in hashes {
            let x = x as u128;
            for (slot, (&a, &b)) in values.iter_mut().zip(self.a.iter().zip(self.b.iter())) {
                let h = mod_mersenne(a as u128 * x + b as u128);
                if h < *slot {
                    *slot = h;
                }
            }
        }
        Signature::new(values)
    }
}
