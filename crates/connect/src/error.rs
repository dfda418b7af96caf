//! Error types for the backend API client.

use thiserror::Error;

/// Result type alias for API client internals.
pub type Result<T> = std::result::Result<T, ApiError>;

/// Retry policy class for API failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiRetryClass {
    Retryable,
    Permanent,
    ReauthRequired,
}

/// Errors raised while talking to the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error response from the backend
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Invalid request (malformed token, etc.)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    /// Create an API error from status and message.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create an invalid request error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// HTTP status if this is an API error.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Classify error for retry policy.
    pub fn retry_class(&self) -> ApiRetryClass {
        match self {
            Self::Api { status, .. } => match *status {
                401 | 403 => ApiRetryClass::ReauthRequired,
                408 | 409 | 423 | 425 | 429 => ApiRetryClass::Retryable,
                500..=599 => ApiRetryClass::Retryable,
                _ => ApiRetryClass::Permanent,
            },
            Self::Http(_) => ApiRetryClass::Retryable,
            Self::Json(_) => ApiRetryClass::Permanent,
            Self::InvalidRequest(_) => ApiRetryClass::Permanent,
        }
    }
}

/// Map into the core error taxonomy: transport failures become network
/// errors (offline-like), API responses keep their status so the core can
/// classify 401s.
impl From<ApiError> for studypath_core::Error {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Http(inner) => studypath_core::Error::network(inner.to_string()),
            ApiError::Json(inner) => studypath_core::Error::Serialization(inner),
            ApiError::Api { status, message } => studypath_core::Error::api(status, message),
            ApiError::InvalidRequest(message) => studypath_core::Error::validation(message),
        }
    }
}
