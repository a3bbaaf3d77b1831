//! Banding index over a `PersistenceAdapter`.
//!
//! A signature of length k = b * r is cut into b bands of r rows. Each band
//! is hashed to a bucket key; two documents become candidates when they
//! land in the same bucket of the same band.

use std::collections::BTreeSet;

use neardup_core::errors::{PipelineError, SignatureError};
use neardup_core::traits::PersistenceAdapter;
use neardup_core::types::collections::BandKeys;
use neardup_core::types::Signature;
use xxhash_rust::xxh3::xxh3_64;

use super::params::LshParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BandingIndex {
    params: LshParams,
}

impl BandingIndex {
    pub fn new(params: LshParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> LshParams {
        self.params
    }

    /// One bucket key per band: xxh3 of the band's values as little-endian
    /// bytes.
    pub fn bucket_keys(
        &self,
        doc_id: &str,
        signature: &Signature,
    ) -> Result<BandKeys, SignatureError> {
        self.check_length(doc_id, signature)?;
        let rows = self.params.rows;
        let mut buf = Vec::with_capacity(rows * 8);
        Ok(signature
            .values()
            .chunks_exact(rows)
            .map(|band| {
                buf.clear();
                for v in band {
                    buf.extend_from_slice(&v.to_le_bytes());
                }
                xxh3_64(&buf)
            })
            .collect())
    }

    /// Persist the signature and its bucket memberships.
    ///
    /// Degenerate signatures are stored but never banded: every empty
    /// document would otherwise share every bucket.
    pub fn insert(
        &self,
        store: &dyn PersistenceAdapter,
        doc_id: &str,
        signature: &Signature,
    ) -> Result<(), PipelineError> {
        if signature.is_degenerate() {
            self.check_length(doc_id, signature)?;
            store.put_signature(doc_id, signature)?;
            return Ok(());
        }
        let keys = self.bucket_keys(doc_id, signature)?;
        store.index_document(doc_id, signature, &keys)?;
        Ok(())
    }

    /// Every document sharing at least one bucket with `signature`, sorted,
    /// without `doc_id` itself.
    pub fn query(
        &self,
        store: &dyn PersistenceAdapter,
        doc_id: &str,
        signature: &Signature,
    ) -> Result<Vec<String>, PipelineError> {
        if signature.is_degenerate() {
            self.check_length(doc_id, signature)?;
            return Ok(Vec::new());
        }
        let keys = self.bucket_keys(doc_id, signature)?;
        let mut found = BTreeSet::new();
        for (band, key) in keys.iter().enumerate() {
            for member in store.get_bucket_members(band as u32, *key)? {
                if member != doc_id {
                    found.insert(member);
                }
            }
        }
        Ok(found.into_iter().collect())
    }

    fn check_length(&self, doc_id: &str, signature: &Signature) -> Result<(), SignatureError> {
        if signature.len() != self.params.num_perm() {
            return Err(SignatureError::LengthMismatch {
                doc_id: doc_id.to_string(),
                expected: self.params.num_perm(),
                actual: signature.len(),
            });
        }
        Ok(())
    }
}
