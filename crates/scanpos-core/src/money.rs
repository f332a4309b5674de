//! # Money Module
//!
//! Provides the `Yen` type for the amounts the product API exchanges.
//!
//! The yen has no minor unit, so every amount is a whole `i64`. Display
//! follows the receipt convention: `¥` prefix and thousands separators.
//!
//! ## Usage
//! ```rust
//! use scanpos_core::money::Yen;
//!
//! let price = Yen::new(1280);
//! let line = price * 3;
//! assert_eq!(line.to_string(), "¥3,840");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul};

// =============================================================================
// Yen Type
// =============================================================================

/// A whole-yen amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Yen(i64);

impl Yen {
    #[inline]
    pub const fn new(amount: i64) -> Self {
        Yen(amount)
    }

    #[inline]
    pub const fn zero() -> Self {
        Yen(0)
    }

    #[inline]
    pub const fn amount(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Formats with thousands separators and a caller-chosen symbol.
    pub fn format_with(&self, symbol: &str) -> String {
        let digits = self.0.unsigned_abs().to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }
        if self.0 < 0 {
            format!("-{}{}", symbol, grouped)
        } else {
            format!("{}{}", symbol, grouped)
        }
    }
}

impl fmt::Display for Yen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_with("¥"))
    }
}

// =============================================================================
// Arithmetic
// =============================================================================

impl Add for Yen {
    type Output = Yen;

    fn add(self, rhs: Yen) -> Yen {
        Yen(self.0 + rhs.0)
    }
}

impl AddAssign for Yen {
    fn add_assign(&mut self, rhs: Yen) {
        self.0 += rhs.0;
    }
}

impl Mul<i64> for Yen {
    type Output = Yen;

    fn mul(self, qty: i64) -> Yen {
        Yen(self.0 * qty)
    }
}

impl Sum for Yen {
    fn sum<I: Iterator<Item = Yen>>(iter: I) -> Yen {
        iter.fold(Yen::zero(), Add::add)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_groups_thousands() {
        assert_eq!(Yen::new(0).to_string(), "¥0");
        assert_eq!(Yen::new(980).to_string(), "¥980");
        assert_eq!(Yen::new(1000).to_string(), "¥1,000");
        assert_eq!(Yen::new(1234567).to_string(), "¥1,234,567");
        assert_eq!(Yen::new(-4500).to_string(), "-¥4,500");
    }

    #[test]
    fn test_custom_symbol() {
        assert_eq!(Yen::new(12000).format_with("JPY "), "JPY 12,000");
    }

    #[test]
    fn test_arithmetic() {
        let total: Yen = [Yen::new(120) * 2, Yen::new(980)].into_iter().sum();
        assert_eq!(total, Yen::new(1220));

        let mut running = Yen::zero();
        running += Yen::new(5);
        assert_eq!(running.amount(), 5);
    }

    #[test]
    fn test_serializes_as_plain_number() {
        assert_eq!(serde_json::to_string(&Yen::new(1500)).unwrap(), "1500");
    }
}
