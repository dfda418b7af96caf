//! Background sync engine and scheduler helpers.

mod engine;
mod scheduler;

pub use engine::*;
pub use scheduler::*;
