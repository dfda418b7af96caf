//! Screen-time session tracking and daily wellbeing records.

mod model;
mod tracker;

pub use model::*;
pub use tracker::*;
