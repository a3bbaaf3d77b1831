//! Data model shared across the workspace.
//! Documents, signatures, the index manifest, and interned document handles.

pub mod collections;
pub mod document;
pub mod identifiers;
pub mod manifest;
pub mod signature;

pub use collections::{FxHashMap, FxHashSet};
pub use document::{Document, RunMode, Stage};
pub use identifiers::{DocHandle, DocInterner};
pub use manifest::IndexManifest;
pub use signature::Signature;
