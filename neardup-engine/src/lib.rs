//! neardup-engine: near-duplicate detection over shingled text.
//!
//! Documents are shingled, reduced to MinHash signatures, banded into an
//! LSH index held by a `PersistenceAdapter`, verified pairwise, and merged
//! into duplicate clusters. `DedupPipeline` runs the whole sequence in
//! build or query mode.

pub mod cluster;
pub mod lsh;
pub mod minhash;
pub mod pipeline;
pub mod shingle;
pub mod verify;

pub use cluster::{ClusterAssignment, ClusterReport, DuplicateCluster, DuplicateClusterer, UnionFind};
pub use lsh::{BandingIndex, LshParams};
pub use minhash::MinHasher;
pub use pipeline::summary::{RunSummary, SkippedDocument};
pub use pipeline::{DedupOutcome, DedupPipeline, SimilarPair};
pub use shingle::{ShingleSet, Shingler};
pub use verify::{exact_pairwise, CandidatePair, CandidateVerifier, ExactMatch, VerifiedEdge};
