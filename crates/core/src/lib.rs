//! StudyPath offline-first sync core.
//!
//! Local persistence, a pending-operation queue for actions performed while
//! offline, session/state reconciliation against the backend, and
//! screen-time session tracking. The UI layer consumes these services
//! through [`context::ServiceContext`]; the REST backend and the durable
//! store are injected behind the [`backend::BackendClient`] and
//! [`store::KeyValueStore`] traits.

pub mod backend;
pub mod classes;
pub mod context;
pub mod errors;
pub mod events;
pub mod progress;
pub mod queue;
pub mod session;
pub mod store;
pub mod sync;
pub mod utils;
pub mod wellbeing;

pub use context::ServiceContext;
pub use errors::{Error, Result};

#[cfg(test)]
pub(crate) mod test_support;
