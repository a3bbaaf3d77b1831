//! Index manifest: the configuration a persisted index was built with.

use serde::{Deserialize, Serialize};

use crate::errors::SignatureError;

/// Every setting that changes a signature or a bucket key.
///
/// Stored once per index. A later build or query must present an identical
/// manifest, otherwise signatures from the two runs are not comparable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub shingle_width: usize,
    pub shingle_seed: u64,
    pub lowercase: bool,
    pub strip_punctuation: bool,
    pub num_perm: usize,
    pub minhash_seed: u64,
    pub bands: usize,
    pub rows: usize,
}

impl IndexManifest {
    /// Check that `configured` can be compared against an index built with `self`.
    pub fn check_compatible(&self, configured: &IndexManifest) -> Result<(), SignatureError> {
        self.check_signatures_compatible(configured)?;
        drift(&[
            ("lsh.bands", self.bands.to_string(), configured.bands.to_string()),
            ("lsh.rows", self.rows.to_string(), configured.rows.to_string()),
        ])
    }

    /// Like `check_compatible` but ignoring the band split: signatures agree,
    /// so a reader can still look up buckets with the stored (bands, rows).
    pub fn check_signatures_compatible(
        &self,
        configured: &IndexManifest,
    ) -> Result<(), SignatureError> {
        if self.num_perm != configured.num_perm {
            return Err(SignatureError::LengthMismatch {
                doc_id: "<index manifest>".to_string(),
                expected: configured.num_perm,
                actual: self.num_perm,
            });
        }

        drift(&[
            ("shingle.width", self.shingle_width.to_string(), configured.shingle_width.to_string()),
            ("shingle.seed", self.shingle_seed.to_string(), configured.shingle_seed.to_string()),
            ("shingle.lowercase", self.lowercase.to_string(), configured.lowercase.to_string()),
            (
                "shingle.strip_punctuation",
                self.strip_punctuation.to_string(),
                configured.strip_punctuation.to_string(),
            ),
            ("minhash.seed", self.minhash_seed.to_string(), configured.minhash_seed.to_string()),
        ])
    }
}

/// First (field, stored, configured) triple whose values differ.
fn drift(fields: &[(&str, String, String)]) -> Result<(), SignatureError> {
    match fields.iter().find(|(_, stored, current)| stored != current) {
        Some((field, stored, current)) => Err(SignatureError::ConfigDrift {
            field: field.to_string(),
            stored: stored.clone(),
            configured: current.clone(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest() -> IndexManifest {
        IndexManifest {
            shingle_width: 3,
            shingle_seed: 0,
            lowercase: true,
            strip_punctuation: true,
            num_perm: 128,
            minhash_seed: 1,
            bands: 16,
            rows: 8,
        }
    }

    #[test]
    fn identical_manifests_are_compatible() {
        assert!(manifest().check_compatible(&manifest()).is_ok());
    }

    #[test]
    fn num_perm_change_is_length_mismatch() {
        let mut other = manifest();
        other.num_perm = 64;
        other.bands = 8;
        let err = manifest().check_compatible(&other).unwrap_err();
        assert!(matches!(err, SignatureError::LengthMismatch { expected: 64, actual: 128, .. }));
    }

    #[test]
    fn band_split_only_matters_for_full_compatibility() {
        let mut other = manifest();
        other.bands = 32;
        other.rows = 4;
        assert!(manifest().check_signatures_compatible(&other).is_ok());
        let err = manifest().check_compatible(&other).unwrap_err();
        assert!(matches!(err, SignatureError::ConfigDrift { ref field, .. } if field == "lsh.bands"));
    }

    #[test]
    fn seed_change_is_drift() {
        let mut other = manifest();
        other.minhash_seed = 7;
        let err = manifest().check_compatible(&other).unwrap_err();
        match err {
            SignatureError::ConfigDrift { field, stored, configured } => {
                assert_eq!(field, "minhash.seed");
                assert_eq!(stored, "1");
                assert_eq!(configured, "7");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
