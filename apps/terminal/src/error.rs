//! # Terminal Error Type
//!
//! Unified error type returned by every terminal command.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in the Terminal                           │
//! │                                                                         │
//! │  REPL line ──► Command function ──► Result<T, ApiError>                 │
//! │                      │                                                  │
//! │                      ├── CoreError / ValidationError ──┐                │
//! │                      ├── ScanError ────────────────────┤                │
//! │                      ├── ApiClientError ───────────────┼──► ApiError    │
//! │                      └── ConfigError ──────────────────┘       │        │
//! │                                                                 ▼        │
//! │                                          "[NotFound] Product not found" │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use scanpos_api::ApiClientError;
use scanpos_core::{CoreError, ValidationError};
use scanpos_scan::ScanError;
use serde::Serialize;

use crate::state::ConfigError;

/// Error returned from terminal commands.
///
/// Serializes as:
/// ```json
/// { "code": "NOT_FOUND", "message": "Product not found: 4902505130267" }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable category
    pub code: ErrorCode,

    /// Message shown to the cashier
    pub message: String,
}

/// Error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Product lookup returned nothing
    NotFound,

    /// Input validation failed
    ValidationError,

    /// Purchase list rule violated
    CartError,

    /// Camera access refused
    PermissionDenied,

    /// Camera or decoder failure
    ScannerError,

    /// The store backend failed or could not be reached
    BackendError,

    /// Configuration could not be loaded or saved
    ConfigError,

    Internal,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(e) => ApiError::from(e),
            CoreError::ItemNotInCart(code) => ApiError::not_found("Purchase list item", &code),
            CoreError::QuantityOutOfRange { max: 0, code, .. } => {
                ApiError::new(ErrorCode::CartError, format!("{} is out of stock", code))
            }
            other => ApiError::new(ErrorCode::CartError, other.to_string()),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl From<ScanError> for ApiError {
    fn from(err: ScanError) -> Self {
        match &err {
            ScanError::Validation(e) => ApiError::validation(e.to_string()),
            ScanError::InvalidConfig(_) => ApiError::new(ErrorCode::ConfigError, err.user_message()),
            _ if err.is_permission_error() => {
                ApiError::new(ErrorCode::PermissionDenied, err.user_message())
            }
            _ => ApiError::new(ErrorCode::ScannerError, err.user_message()),
        }
    }
}

impl From<ApiClientError> for ApiError {
    fn from(err: ApiClientError) -> Self {
        match err {
            ApiClientError::ProductNotFound(code) => ApiError::not_found("Product", &code),
            ApiClientError::Status { status, body } => {
                tracing::error!(status, body = %body, "Backend request failed");
                ApiError::new(
                    ErrorCode::BackendError,
                    format!("The store server returned an error (HTTP {})", status),
                )
            }
            ApiClientError::Transport(e) => {
                tracing::error!("Backend unreachable: {}", e);
                ApiError::new(ErrorCode::BackendError, "Could not reach the store server")
            }
            ApiClientError::InvalidResponse(e) => {
                tracing::error!("Unexpected backend response: {}", e);
                ApiError::new(
                    ErrorCode::BackendError,
                    "The store server sent data in an unexpected format",
                )
            }
            ApiClientError::InvalidUrl(e) => ApiError::new(ErrorCode::ConfigError, e),
        }
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::new(ErrorCode::ConfigError, err.to_string())
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;
    use scanpos_scan::DeviceFailure;

    #[test]
    fn test_out_of_stock_message() {
        let err = ApiError::from(CoreError::QuantityOutOfRange {
            code: "4902505130267".into(),
            requested: 1,
            max: 0,
        });
        assert_eq!(err.code, ErrorCode::CartError);
        assert_eq!(err.message, "4902505130267 is out of stock");
    }

    #[test]
    fn test_scan_error_categories() {
        assert_eq!(
            ApiError::from(ScanError::PermissionDenied).code,
            ErrorCode::PermissionDenied
        );
        let err = ApiError::from(ScanError::DeviceUnavailable {
            kind: DeviceFailure::NotFound,
            message: "none".into(),
        });
        assert_eq!(err.code, ErrorCode::ScannerError);
        assert!(err.message.contains("No camera"));
    }

    #[test]
    fn test_backend_errors_hide_details() {
        let err = ApiError::from(ApiClientError::Status {
            status: 500,
            body: "stack trace".into(),
        });
        assert_eq!(err.code, ErrorCode::BackendError);
        assert!(!err.message.contains("stack trace"));

        let err = ApiError::from(ApiClientError::ProductNotFound("123".into()));
        assert_eq!(err.code, ErrorCode::NotFound);
        assert_eq!(err.message, "Product not found: 123");
    }

    #[test]
    fn test_serialized_shape() {
        let err = ApiError::validation("code is required");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "VALIDATION_ERROR");
        assert_eq!(json["message"], "code is required");
    }
}
