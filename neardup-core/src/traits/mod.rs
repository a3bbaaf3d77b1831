//! Seams between the engine and its collaborators.

pub mod persistence;

pub use persistence::PersistenceAdapter;
