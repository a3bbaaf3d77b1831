//! Spur-based document handles.
//!
//! Document ids are arbitrary strings; the clusterer wants dense integers.
//! `DocInterner` hands out one `DocHandle` per distinct id, in first-seen
//! order, so `handle.index()` doubles as the ingestion rank.

use lasso::{Key, Rodeo, Spur};
use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub Spur);

        impl $name {
            /// Dense zero-based index, usable as an arena slot.
            pub fn index(self) -> usize {
                self.0.into_usize()
            }

            /// Rebuild a handle from an arena slot.
            pub fn from_index(index: usize) -> Option<Self> {
                Spur::try_from_usize(index).map(Self)
            }
        }
    };
}

define_id!(
    /// Interned document identifier.
    DocHandle
);

/// Single-threaded interner for document ids.
///
/// Owned by the sequential ingest stage; workers only ever see handles.
#[derive(Debug, Default)]
pub struct DocInterner {
    rodeo: Rodeo,
}

impl DocInterner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern `id`, returning the existing handle if it was seen before.
    pub fn intern(&mut self, id: &str) -> DocHandle {
        DocHandle(self.rodeo.get_or_intern(id))
    }

    /// Look up a previously interned id.
    pub fn get(&self, id: &str) -> Option<DocHandle> {
        self.rodeo.get(id).map(DocHandle)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.rodeo.contains(id)
    }

    /// Resolve a handle back to its id.
    pub fn resolve(&self, handle: DocHandle) -> &str {
        self.rodeo.resolve(&handle.0)
    }

    pub fn len(&self) -> usize {
        self.rodeo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rodeo.is_empty()
    }
}
