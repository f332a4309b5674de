//! # Domain Types
//!
//! Types shared by the scanner, the product API client and the terminal.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  Scanner side                       Checkout side (wire format)        │
//! │  ────────────                       ──────────────────────────         │
//! │  ┌─────────────────────┐            ┌─────────────────────┐            │
//! │  │ CameraPermission-   │            │ Product             │            │
//! │  │ State               │            │  PRD_ID, CODE, NAME │            │
//! │  │  granted / denied / │            │  PRICE, STOCK       │            │
//! │  │  prompt / unknown   │            └─────────────────────┘            │
//! │  └─────────────────────┘            ┌─────────────────────┐            │
//! │  ┌─────────────────────┐            │ PurchaseRequest     │            │
//! │  │ Symbology           │            │  employee_code      │            │
//! │  │  QR, EAN-13, ...    │            │  items[]            │            │
//! │  └─────────────────────┘            └─────────────────────┘            │
//! │  ┌─────────────────────┐            ┌─────────────────────┐            │
//! │  │ DetectionCandidate  │            │ PurchaseResult      │            │
//! │  │  text + format      │            │  transaction_id ... │            │
//! │  └─────────────────────┘            └─────────────────────┘            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The product API speaks upper-case field names (`PRD_ID`, `CODE`, ...);
//! serde renames keep the Rust side in snake_case.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::MAX_ITEM_QUANTITY;

// =============================================================================
// Camera Permission State
// =============================================================================

/// Camera permission as last observed from the platform.
///
/// ## Transitions
/// ```text
///   Unknown ──query──► Prompt ──attempt──► Granted
///      │                  │
///      └──────query───────┴────attempt───► Denied
/// ```
/// Once a real acquisition attempt resolves, the state only moves toward
/// `Granted` or `Denied`. It may be re-queried at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraPermissionState {
    Granted,
    Denied,
    Prompt,
    /// The platform has no permission query API, or nothing was asked yet.
    #[default]
    Unknown,
}

impl CameraPermissionState {
    /// Returns true if a real acquisition attempt has settled the state.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Granted | Self::Denied)
    }
}

impl std::fmt::Display for CameraPermissionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Granted => write!(f, "granted"),
            Self::Denied => write!(f, "denied"),
            Self::Prompt => write!(f, "prompt"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

// =============================================================================
// Symbology
// =============================================================================

/// A barcode or 2D code encoding standard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Symbology {
    Qr,
    Ean13,
    Ean8,
    Code128,
    Code39,
    Itf,
    Codabar,
    UpcA,
    UpcE,
}

impl Symbology {
    /// Every symbology the scanner knows about, in display order.
    pub const ALL: [Symbology; 9] = [
        Symbology::Qr,
        Symbology::Ean13,
        Symbology::Ean8,
        Symbology::Code128,
        Symbology::Code39,
        Symbology::Itf,
        Symbology::Codabar,
        Symbology::UpcA,
        Symbology::UpcE,
    ];

    /// Returns true for two-dimensional (matrix) codes.
    pub fn is_matrix(&self) -> bool {
        matches!(self, Symbology::Qr)
    }
}

impl std::fmt::Display for Symbology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Symbology::Qr => "QR",
            Symbology::Ean13 => "EAN-13",
            Symbology::Ean8 => "EAN-8",
            Symbology::Code128 => "Code128",
            Symbology::Code39 => "Code39",
            Symbology::Itf => "ITF",
            Symbology::Codabar => "Codabar",
            Symbology::UpcA => "UPC-A",
            Symbology::UpcE => "UPC-E",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for Symbology {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "qr" | "qrcode" => Ok(Symbology::Qr),
            "ean13" | "jan" | "jan13" => Ok(Symbology::Ean13),
            "ean8" | "jan8" => Ok(Symbology::Ean8),
            "code128" => Ok(Symbology::Code128),
            "code39" => Ok(Symbology::Code39),
            "itf" => Ok(Symbology::Itf),
            "codabar" => Ok(Symbology::Codabar),
            "upca" => Ok(Symbology::UpcA),
            "upce" => Ok(Symbology::UpcE),
            _ => Err(ValidationError::InvalidFormat {
                field: "symbology".to_string(),
                reason: format!("unknown symbology '{}'", s),
            }),
        }
    }
}

// =============================================================================
// Detection Candidate
// =============================================================================

/// One decoded value, as produced by a single decode attempt.
///
/// Candidates are transient: the confirmer compares them and drops them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionCandidate {
    pub text: String,
    pub format: Symbology,
}

impl DetectionCandidate {
    pub fn new(text: impl Into<String>, format: Symbology) -> Self {
        DetectionCandidate {
            text: text.into(),
            format,
        }
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product as returned by `GET /product/{code}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Backend row id, absent on some records.
    #[serde(rename = "PRD_ID", default)]
    pub prd_id: Option<i64>,

    /// The scannable product code (JAN/EAN or internal code).
    #[serde(rename = "CODE")]
    pub code: String,

    #[serde(rename = "NAME")]
    pub name: String,

    /// Unit price in yen.
    #[serde(rename = "PRICE")]
    pub price: i64,

    /// Units on hand. Missing means the backend did not report it.
    #[serde(rename = "STOCK", default)]
    pub stock: Option<i64>,
}

impl Product {
    /// Returns true when the product can be added to a purchase list.
    pub fn is_in_stock(&self) -> bool {
        self.stock.unwrap_or(0) > 0
    }

    /// Upper bound for a line quantity of this product.
    ///
    /// The stock figure when positive, otherwise [`MAX_ITEM_QUANTITY`].
    pub fn quantity_limit(&self) -> i64 {
        match self.stock {
            Some(stock) if stock > 0 => stock,
            _ => MAX_ITEM_QUANTITY,
        }
    }
}

// =============================================================================
// Purchase
// =============================================================================

/// One line of a purchase submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseLine {
    pub product_code: String,
    pub quantity: i64,
    /// Unit price in yen, frozen when the product was added.
    pub unit_price: i64,
}

/// Body of `POST /purchase`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseRequest {
    /// May be empty when the register is not signed in.
    pub employee_code: String,
    pub items: Vec<PurchaseLine>,
}

/// Response of `POST /purchase`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseResult {
    pub transaction_id: String,
    /// Total charged, in yen.
    pub total_amount: i64,
    /// Server-side timestamp, passed through as sent.
    pub timestamp: String,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_wire_names() {
        let json = r#"{"PRD_ID": 7, "CODE": "4902505130267", "NAME": "Pen", "PRICE": 120, "STOCK": 4}"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.prd_id, Some(7));
        assert_eq!(product.code, "4902505130267");
        assert_eq!(product.price, 120);
        assert_eq!(product.quantity_limit(), 4);

        let back = serde_json::to_value(&product).unwrap();
        assert_eq!(back["CODE"], "4902505130267");
        assert_eq!(back["STOCK"], 4);
    }

    #[test]
    fn test_product_without_stock() {
        let json = r#"{"CODE": "X1", "NAME": "Loose item", "PRICE": 50}"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.prd_id, None);
        assert!(!product.is_in_stock());
        assert_eq!(product.quantity_limit(), MAX_ITEM_QUANTITY);
    }

    #[test]
    fn test_symbology_parse_and_display() {
        assert_eq!("EAN-13".parse::<Symbology>().unwrap(), Symbology::Ean13);
        assert_eq!("jan".parse::<Symbology>().unwrap(), Symbology::Ean13);
        assert_eq!("qr_code".parse::<Symbology>().unwrap(), Symbology::Qr);
        assert_eq!("upc-e".parse::<Symbology>().unwrap(), Symbology::UpcE);
        assert!("pdf417".parse::<Symbology>().is_err());

        for s in Symbology::ALL {
            assert_eq!(s.to_string().parse::<Symbology>().unwrap(), s);
        }
    }

    #[test]
    fn test_permission_state_settled() {
        assert!(CameraPermissionState::Granted.is_settled());
        assert!(CameraPermissionState::Denied.is_settled());
        assert!(!CameraPermissionState::Prompt.is_settled());
        assert!(!CameraPermissionState::default().is_settled());
    }

    #[test]
    fn test_purchase_request_shape() {
        let req = PurchaseRequest {
            employee_code: "E001".to_string(),
            items: vec![PurchaseLine {
                product_code: "4902505130267".to_string(),
                quantity: 2,
                unit_price: 120,
            }],
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["employee_code"], "E001");
        assert_eq!(value["items"][0]["product_code"], "4902505130267");
        assert_eq!(value["items"][0]["unit_price"], 120);
    }
}
