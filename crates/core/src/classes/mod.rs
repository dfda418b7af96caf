//! Class selection: local persistence, backend push, and retry.

mod model;
mod service;

pub use model::*;
pub use service::*;
