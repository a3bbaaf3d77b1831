//! neardup-core: shared foundation for the neardup workspace.
//!
//! Types, the persistence adapter trait, errors, configuration, events and
//! tracing setup. Every other crate in the workspace depends on this one.

pub mod config;
pub mod errors;
pub mod events;
pub mod tracing;
pub mod traits;
pub mod types;
