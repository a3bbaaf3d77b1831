//! Re-exports of performance-oriented collection types.

pub use rustc_hash::{FxHashMap, FxHashSet};
pub use smallvec::SmallVec;
pub use std::collections::BTreeMap;

/// SmallVec sized for per-document band keys (usually <= 32 bands).
pub type BandKeys = SmallVec<[u64; 32]>;
