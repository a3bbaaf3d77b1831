//! Candidate verification: the only place banding false positives are
//! filtered out.

use neardup_core::config::VerifyMode;
use neardup_core::errors::{PipelineError, SignatureError};
use neardup_core::types::{DocHandle, DocInterner, Signature};
use rayon::prelude::*;
use serde::Serialize;

use crate::shingle::ShingleSet;

/// Two documents that shared at least one bucket. `left` precedes `right`
/// in ingestion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CandidatePair {
    pub left: DocHandle,
    pub right: DocHandle,
}

impl CandidatePair {
    /// Order the two handles; `None` for a self-pair.
    pub fn new(a: DocHandle, b: DocHandle) -> Option<Self> {
        match a.index().cmp(&b.index()) {
            std::cmp::Ordering::Less => Some(Self { left: a, right: b }),
            std::cmp::Ordering::Greater => Some(Self { left: b, right: a }),
            std::cmp::Ordering::Equal => None,
        }
    }
}

/// A candidate pair whose similarity reached the threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VerifiedEdge {
    pub left: DocHandle,
    pub right: DocHandle,
    pub similarity: f64,
}

/// What the verifier knows about one side of a pair.
#[derive(Debug, Clone, Copy)]
pub struct VerifyInput<'a> {
    pub signature: &'a Signature,
    /// Present only for documents ingested in this run.
    pub shingles: Option<&'a ShingleSet>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateVerifier {
    threshold: f64,
    mode: VerifyMode,
}

impl CandidateVerifier {
    pub fn new(threshold: f64, mode: VerifyMode) -> Self {
        Self { threshold, mode }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn mode(&self) -> VerifyMode {
        self.mode
    }

    /// Similarity of one pair. Exact mode uses true Jaccard when both
    /// shingle sets are at hand and falls back to the estimate otherwise.
    /// `None` means the signature lengths differ.
    pub fn similarity(&self, left: VerifyInput<'_>, right: VerifyInput<'_>) -> Option<f64> {
        if let (VerifyMode::Exact, Some(a), Some(b)) = (self.mode, left.shingles, right.shingles) {
            return Some(a.jaccard(b));
        }
        left.signature.estimate_jaccard(right.signature)
    }

    /// Verify every pair in parallel, keeping those at or above the
    /// threshold. Output order follows `pairs`.
    ///
    /// `lookup` maps a handle to its inputs and must cover every handle in
    /// `pairs`.
    pub fn verify<'a, F>(
        &self,
        pairs: &[CandidatePair],
        interner: &DocInterner,
        lookup: F,
    ) -> Result<Vec<VerifiedEdge>, PipelineError>
    where
        F: Fn(DocHandle) -> Option<VerifyInput<'a>> + Sync,
    {
        // resolve ids only on the error path, after the parallel section
        let checked: Result<Vec<Option<VerifiedEdge>>, VerifyFailure> = pairs
            .par_iter()
            .map(|pair| {
                let left = lookup(pair.left).ok_or(VerifyFailure::Missing(pair.left))?;
                let right = lookup(pair.right).ok_or(VerifyFailure::Missing(pair.right))?;
                let similarity =
                    self.similarity(left, right)
                        .ok_or(VerifyFailure::LengthMismatch {
                            handle: pair.right,
                            expected: left.signature.len(),
                            actual: right.signature.len(),
                        })?;
                Ok((similarity >= self.threshold).then_some(VerifiedEdge {
                    left: pair.left,
                    right: pair.right,
                    similarity,
                }))
            })
            .collect();

        match checked {
            Ok(edges) => Ok(edges.into_iter().flatten().collect()),
            Err(failure) => Err(failure.into_error(interner)),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum VerifyFailure {
    Missing(DocHandle),
    LengthMismatch {
        handle: DocHandle,
        expected: usize,
        actual: usize,
    },
}

impl VerifyFailure {
    fn into_error(self, interner: &DocInterner) -> PipelineError {
        match self {
            Self::Missing(handle) => PipelineError::Worker {
                message: format!("no signature held for candidate {}", interner.resolve(handle)),
            },
            Self::LengthMismatch {
                handle,
                expected,
                actual,
            } => SignatureError::LengthMismatch {
                doc_id: interner.resolve(handle).to_string(),
                expected,
                actual,
            }
            .into(),
        }
    }
}

/// One pair found by the exhaustive baseline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExactMatch {
    pub left: String,
    pub right: String,
    pub similarity: f64,
}

/// Exact Jaccard over every pair, O(n²). For small corpora and for
/// measuring what banding misses.
pub fn exact_pairwise(docs: &[(String, ShingleSet)], threshold: f64) -> Vec<ExactMatch> {
    let n = docs.len();
    (0..n)
        .into_par_iter()
        .flat_map_iter(|i| {
            ((i + 1)..n).filter_map(move |j| {
                let similarity = docs[i].1.jaccard(&docs[j].1);
                (similarity >= threshold).then(|| ExactMatch {
                    left: docs[i].0.clone(),
                    right: docs[j].0.clone(),
                    similarity,
                })
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::minhash::MinHasher;
    use crate::shingle::Shingler;

    #[test]
    fn candidate_pair_orders_by_ingestion() {
        let mut interner = DocInterner::new();
        let a = interner.intern("a");
        let b = interner.intern("b");
        assert_eq!(CandidatePair::new(b, a), CandidatePair::new(a, b));
        assert_eq!(CandidatePair::new(a, a), None);
    }

    #[test]
    fn threshold_is_inclusive() {
        let left = Signature::new(vec![1, 2, 3, 4]);
        let right = Signature::new(vec![1, 2, 3, 9]);
        let mut interner = DocInterner::new();
        let a = interner.intern("a");
        let b = interner.intern("b");
        let pair = CandidatePair::new(a, b).unwrap();

        let lookup = |h: DocHandle| {
            Some(VerifyInput {
                signature: if h == a { &left } else { &right },
                shingles: None,
            })
        };

        let at = CandidateVerifier::new(0.75, VerifyMode::Estimated);
        assert_eq!(at.verify(&[pair], &interner, lookup).unwrap().len(), 1);
        let above = CandidateVerifier::new(0.76, VerifyMode::Estimated);
        assert!(above.verify(&[pair], &interner, lookup).unwrap().is_empty());
    }

    #[test]
    fn length_mismatch_is_fatal() {
        let left = Signature::new(vec![1, 2, 3, 4]);
        let right = Signature::new(vec![1, 2]);
        let mut interner = DocInterner::new();
        let a = interner.intern("a");
        let b = interner.intern("b");
        let pair = CandidatePair::new(a, b).unwrap();
        let err = CandidateVerifier::new(0.5, VerifyMode::Estimated)
            .verify(&[pair], &interner, |h| {
                Some(VerifyInput {
                    signature: if h == a { &left } else { &right },
                    shingles: None,
                })
            })
            .unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn exact_mode_uses_shingles_when_present() {
        let shingler = Shingler::new(1, 0);
        let sa = shingler.shingle("a b c");
        let sb = shingler.shingle("a b d");
        let hasher = MinHasher::new(8, 1);
        let sig_a = hasher.signature(&sa);
        let sig_b = hasher.signature(&sb);

        let exact = CandidateVerifier::new(0.5, VerifyMode::Exact);
        let sim = exact
            .similarity(
                VerifyInput { signature: &sig_a, shingles: Some(&sa) },
                VerifyInput { signature: &sig_b, shingles: Some(&sb) },
            )
            .unwrap();
        assert!((sim - 0.5).abs() < 1e-12);

        // one side without shingles falls back to the estimate
        let fallback = exact
            .similarity(
                VerifyInput { signature: &sig_a, shingles: Some(&sa) },
                VerifyInput { signature: &sig_b, shingles: None },
            )
            .unwrap();
        assert_eq!(fallback, sig_a.estimate_jaccard(&sig_b).unwrap());
    }

    #[test]
    fn exact_pairwise_finds_only_similar_pairs() {
        let shingler = Shingler::new(2, 0);
        let docs = vec![
            ("d1".to_string(), shingler.shingle("the cat sat on the mat")),
            ("d2".to_string(), shingler.shingle("the cat sat on the mat")),
            ("d3".to_string(), shingler.shingle("completely different words here")),
        ];
        let found = exact_pairwise(&docs, 0.75);
        assert_eq!(found.len(), 1);
        assert_eq!((found[0].left.as_str(), found[0].right.as_str()), ("d1", "d2"));
        assert_eq!(found[0].similarity, 1.0);
    }
}
