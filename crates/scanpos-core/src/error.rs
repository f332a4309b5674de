//! # Error Types
//!
//! Domain-specific error types for scanpos-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  scanpos-core errors (this file)                                       │
//! │  ├── CoreError        - Cart / purchase rule violations                │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  scanpos-scan errors (separate crate)                                  │
//! │  └── ScanError        - Permission, device, playback failures          │
//! │                                                                         │
//! │  scanpos-api errors (separate crate)                                   │
//! │  └── ApiClientError   - HTTP failures, 404 product lookups             │
//! │                                                                         │
//! │  Terminal errors (in app)                                              │
//! │  └── ApiError         - What the cashier sees                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations raised by the purchase list.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The product code is not present in the purchase list.
    #[error("Product {0} is not in the purchase list")]
    ItemNotInCart(String),

    /// The requested quantity falls outside `1..=max`.
    ///
    /// `max` is the product's stock when known, otherwise
    /// [`MAX_ITEM_QUANTITY`](crate::MAX_ITEM_QUANTITY).
    #[error("Quantity for {code} must be between 1 and {max}, got {requested}")]
    QuantityOutOfRange {
        code: String,
        requested: i64,
        max: i64,
    },

    /// Purchase list has reached its maximum number of distinct products.
    #[error("Purchase list cannot have more than {max} products")]
    CartTooLarge { max: usize },

    /// Checkout was attempted with nothing in the list.
    #[error("Purchase list is empty")]
    EmptyCart,

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is missing or empty after trimming.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Invalid format.
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

/// Convenience type alias for Results with ValidationError.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::QuantityOutOfRange {
            code: "4902505130267".to_string(),
            requested: 12,
            max: 10,
        };
        assert_eq!(
            err.to_string(),
            "Quantity for 4902505130267 must be between 1 and 10, got 12"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "code".to_string(),
        };
        assert_eq!(err.to_string(), "code is required");

        let err = ValidationError::TooLong {
            field: "employee_code".to_string(),
            max: 10,
        };
        assert_eq!(err.to_string(), "employee_code must be at most 10 characters");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "code".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
