//! Session/state reconciler and session domain models.

mod model;
mod service;

pub use model::*;
pub use service::*;
