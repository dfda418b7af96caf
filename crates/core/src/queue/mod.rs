//! Durable FIFO queue of deferred backend mutations.

mod model;
mod service;

pub use model::*;
pub use service::*;
