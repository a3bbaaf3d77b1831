//! MinHash signature value type.
//!
//! Generation lives in the engine; this type is shared so that persistence
//! adapters can store and return signatures without depending on it.

use serde::{Deserialize, Serialize};

/// Ordered sequence of k per-hash-function minimums.
///
/// A signature of an empty shingle set holds `EMPTY_SLOT` everywhere and is
/// called degenerate: it estimates similarity 0.0 against everything,
/// itself included.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Signature {
    values: Vec<u64>,
}

impl Signature {
    /// Slot value for "no shingle seen". Real hash values are reduced modulo
    /// a 61-bit prime and never reach it.
    pub const EMPTY_SLOT: u64 = u64::MAX;

    pub fn new(values: Vec<u64>) -> Self {
        Self { values }
    }

    /// The signature of an empty shingle set.
    pub fn degenerate(num_perm: usize) -> Self {
        Self {
            values: vec![Self::EMPTY_SLOT; num_perm],
        }
    }

    pub fn values(&self) -> &[u64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// True when every slot is `EMPTY_SLOT`.
    pub fn is_degenerate(&self) -> bool {
        self.values.iter().all(|&v| v == Self::EMPTY_SLOT)
    }

    /// Number of positions where both signatures agree.
    /// Returns `None` when the lengths differ.
    pub fn matching_positions(&self, other: &Signature) -> Option<usize> {
        if self.values.len() != other.values.len() {
            return None;
        }
        Some(
            self.values
                .iter()
                .zip(other.values.iter())
                .filter(|(a, b)| a == b)
                .count(),
        )
    }

    /// Estimated Jaccard similarity: matching positions / k.
    ///
    /// Returns `None` when the lengths differ. Degenerate or zero-length
    /// signatures estimate 0.0.
    pub fn estimate_jaccard(&self, other: &Signature) -> Option<f64> {
        let matching = self.matching_positions(other)?;
        if self.values.is_empty() || self.is_degenerate() || other.is_degenerate() {
            return Some(0.0);
        }
        Some(matching as f64 / self.values.len() as f64)
    }

    /// Little-endian byte encoding used by the SQLite adapter.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.values.len() * 8);
        for v in &self.values {
            out.extend_from_slice(&v.to_le_bytes());
        }
        out
    }

    /// Inverse of `to_bytes`. Returns `None` if the length is not a multiple of 8.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() % 8 != 0 {
            return None;
        }
        let values = bytes
            .chunks_exact(8)
            .map(|chunk| {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(chunk);
                u64::from_le_bytes(buf)
            })
            .collect();
        Some(Self { values })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_comparison_matches_everywhere() {
        let sig = Signature::new(vec![3, 1, 4, 1, 5]);
        assert_eq!(sig.matching_positions(&sig), Some(5));
        assert_eq!(sig.estimate_jaccard(&sig), Some(1.0));
    }

    #[test]
    fn degenerate_never_similar() {
        let empty = Signature::degenerate(4);
        assert!(empty.is_degenerate());
        assert_eq!(empty.estimate_jaccard(&empty), Some(0.0));
    }

    #[test]
    fn length_mismatch_is_none() {
        let a = Signature::new(vec![1, 2, 3]);
        let b = Signature::new(vec![1, 2]);
        assert_eq!(a.estimate_jaccard(&b), None);
    }

    #[test]
    fn byte_encoding_survives() {
        let sig = Signature::new(vec![0, 42, u64::MAX, (1 << 61) - 2]);
        assert_eq!(Signature::from_bytes(&sig.to_bytes()), Some(sig));
        assert_eq!(Signature::from_bytes(&[1, 2, 3]), None);
    }
}
