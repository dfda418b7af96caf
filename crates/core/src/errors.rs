//! Error types shared across the StudyPath sync core.

use thiserror::Error;

/// Result type alias for sync-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the sync core and its collaborators.
#[derive(Debug, Error)]
pub enum Error {
    /// Local key-value storage failure. Callers treat this as "no data yet"
    /// on the read path; it never crashes a cold start.
    #[error("storage error: {0}")]
    Storage(String),

    /// Transport-level failure (offline, DNS, connect timeout).
    #[error("network error: {0}")]
    Network(String),

    /// Error response from the backend API.
    #[error("api error ({status}): {message}")]
    Api { status: u16, message: String },

    /// JSON serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid input or state on the client side.
    #[error("validation error: {0}")]
    Validation(String),
}

impl Error {
    /// Create a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// Create an API error from status and message.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// HTTP status if this is an API error.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Expired or invalid credentials. This is the one condition that forces
    /// an unprompted transition to the logged-out state.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Api { status: 401 | 403, .. })
    }

    /// Failures treated like being offline: the local mutation stands and
    /// only synchronization is deferred.
    pub fn is_offline_like(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Api { status, .. } => matches!(status, 408 | 429 | 500..=599),
            _ => false,
        }
    }
}
