//! Error types for the store backend client.

use thiserror::Error;

/// Result type alias for API client operations.
pub type ApiResult<T> = Result<T, ApiClientError>;

/// Errors returned by [`PosApiClient`](crate::PosApiClient).
#[derive(Debug, Error)]
pub enum ApiClientError {
    /// The backend answered 404 for a product lookup.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Any other non-success status.
    #[error("Backend returned HTTP {status}")]
    Status { status: u16, body: String },

    /// Connection, TLS or timeout failure.
    #[error("Request failed: {0}")]
    Transport(String),

    /// The body was not the JSON shape we expected.
    #[error("Invalid response from backend: {0}")]
    InvalidResponse(String),

    /// The configured base URL cannot be used.
    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),
}

impl From<reqwest::Error> for ApiClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiClientError::InvalidResponse(err.to_string())
        } else {
            ApiClientError::Transport(err.to_string())
        }
    }
}

impl From<url::ParseError> for ApiClientError {
    fn from(err: url::ParseError) -> Self {
        ApiClientError::InvalidUrl(err.to_string())
    }
}

impl ApiClientError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiClientError::ProductNotFound(_))
    }

    /// Returns true if the same request may succeed later.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiClientError::Transport(_) => true,
            ApiClientError::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
