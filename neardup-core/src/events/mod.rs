//! Run lifecycle events.
//! Handlers observe a run without being able to change its outcome.

pub mod dispatcher;
pub mod handler;
pub mod types;

pub use dispatcher::EventDispatcher;
pub use handler::NeardupEventHandler;
pub use types::*;
