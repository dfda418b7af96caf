//! REST client for the StudyPath backend API.
//!
//! Implements the [`studypath_core::backend::BackendClient`] trait over
//! reqwest; the sync core never talks HTTP directly.

mod client;
mod error;

pub use client::ApiClient;
pub use error::{ApiError, ApiRetryClass};
