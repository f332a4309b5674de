//! # Validation Module
//!
//! Input checks applied before a value reaches the scanner callback, the
//! purchase list or the product API.
//!
//! ## Where Each Check Runs
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Points                                  │
//! │                                                                         │
//! │  Manual code entry ──► normalize_manual_code ──► scanner callback      │
//! │                        (trim, non-empty)                                │
//! │                                                                         │
//! │  Quantity edits ─────► validate_quantity ──────► purchase list         │
//! │                        (1..=limit)                                      │
//! │                                                                         │
//! │  Checkout ───────────► normalize_employee_code ► POST /purchase        │
//! │                        (optional, <= 10 chars)                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Manual codes are deliberately loose: no length or format rule beyond
//! "non-empty after trimming". Camera reads carry their own length floor in
//! the confirmer.

use crate::error::{ValidationError, ValidationResult};
use crate::MAX_EMPLOYEE_CODE_LEN;

// =============================================================================
// Code Validators
// =============================================================================

/// Trims a hand-typed code and rejects it if nothing is left.
///
/// ```rust
/// use scanpos_core::validation::normalize_manual_code;
///
/// assert_eq!(normalize_manual_code("  1234567890001\n").unwrap(), "1234567890001");
/// assert!(normalize_manual_code("   ").is_err());
/// ```
pub fn normalize_manual_code(input: &str) -> ValidationResult<String> {
    let code = input.trim();
    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "code".to_string(),
        });
    }
    Ok(code.to_string())
}

/// Returns true if the string looks like a retail barcode (EAN-8 to EAN-13,
/// UPC-A, ITF-14 digits only).
pub fn is_retail_barcode(code: &str) -> bool {
    (8..=14).contains(&code.len()) && code.chars().all(|c| c.is_ascii_digit())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity against `1..=limit`.
pub fn validate_quantity(quantity: i64, limit: i64) -> ValidationResult<()> {
    if !(1..=limit).contains(&quantity) {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: limit,
        });
    }
    Ok(())
}

// =============================================================================
// Checkout Validators
// =============================================================================

/// Trims an employee code; an empty code is allowed and sent as `""`.
pub fn normalize_employee_code(input: &str) -> ValidationResult<String> {
    let code = input.trim();
    if code.chars().count() > MAX_EMPLOYEE_CODE_LEN {
        return Err(ValidationError::TooLong {
            field: "employee_code".to_string(),
            max: MAX_EMPLOYEE_CODE_LEN,
        });
    }
    if code.chars().any(char::is_control) {
        return Err(ValidationError::InvalidFormat {
            field: "employee_code".to_string(),
            reason: "contains control characters".to_string(),
        });
    }
    Ok(code.to_string())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_code_is_trimmed() {
        assert_eq!(normalize_manual_code(" abc ").unwrap(), "abc");
        // No length rule on manual input.
        assert_eq!(normalize_manual_code("7").unwrap(), "7");
    }

    #[test]
    fn test_manual_code_rejects_blank() {
        assert_eq!(
            normalize_manual_code("\t \n"),
            Err(ValidationError::Required {
                field: "code".to_string()
            })
        );
        assert!(normalize_manual_code("").is_err());
    }

    #[test]
    fn test_retail_barcode_shapes() {
        assert!(is_retail_barcode("4902505130267"));
        assert!(is_retail_barcode("49025051"));
        assert!(!is_retail_barcode("1234567"));
        assert!(!is_retail_barcode("49O2505130267"));
        assert!(!is_retail_barcode("https://example.com/p/1"));
    }

    #[test]
    fn test_quantity_bounds() {
        assert!(validate_quantity(1, 5).is_ok());
        assert!(validate_quantity(5, 5).is_ok());
        assert!(validate_quantity(0, 5).is_err());
        assert!(validate_quantity(6, 5).is_err());
        assert!(validate_quantity(-1, 999).is_err());
    }

    #[test]
    fn test_employee_code() {
        assert_eq!(normalize_employee_code("").unwrap(), "");
        assert_eq!(normalize_employee_code(" E0012 ").unwrap(), "E0012");
        assert!(normalize_employee_code("12345678901").is_err());
        assert!(normalize_employee_code("E0\u{7}1").is_err());
    }
}
