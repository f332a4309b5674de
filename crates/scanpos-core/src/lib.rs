//! # scanpos-core: Pure Logic for the Scanning POS Client
//!
//! This crate holds every rule of the scanner and checkout flow that can be
//! expressed without touching a camera, a clock or the network.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        ScanPOS Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  apps/terminal (REPL + commands)                │   │
//! │  │     scan ──► lookup ──► add to cart ──► purchase                │   │
//! │  └──────────────┬──────────────────────────────┬───────────────────┘   │
//! │                 │                              │                        │
//! │  ┌──────────────▼───────────────┐  ┌───────────▼───────────────────┐   │
//! │  │   scanpos-scan               │  │   scanpos-api                 │   │
//! │  │   camera lifecycle, decode   │  │   GET /product, POST /purchase│   │
//! │  │   loop, session controller   │  │                               │   │
//! │  └──────────────┬───────────────┘  └───────────┬───────────────────┘   │
//! │                 │                              │                        │
//! │  ┌──────────────▼──────────────────────────────▼───────────────────┐   │
//! │  │               ★ scanpos-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │  confirm  │  │  cadence  │  │   cart    │  │ validation│  │   │
//! │  │   │ debounce  │  │ adaptive  │  │ purchase  │  │  manual   │  │   │
//! │  │   │  policy   │  │ interval  │  │   list    │  │   codes   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO CAMERA • NO NETWORK • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain and wire types (Product, Symbology, DetectionCandidate, ...)
//! - [`confirm`] - Detection confirmer (consecutive-match debounce)
//! - [`cadence`] - Adaptive decode interval state
//! - [`cart`] - Purchase list arithmetic
//! - [`money`] - Integer yen amounts and display formatting
//! - [`validation`] - Input validation (manual codes, quantities, employee codes)
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use scanpos_core::confirm::{ConfirmPolicy, DetectionConfirmer, Observation};
//!
//! let mut confirmer = DetectionConfirmer::new(ConfirmPolicy::default());
//! assert!(matches!(confirmer.observe("4902505130267"), Observation::Pending { count: 1, .. }));
//! assert!(matches!(confirmer.observe("4902505130267"), Observation::Confirmed(_)));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cadence;
pub mod cart;
pub mod confirm;
pub mod error;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cadence::{CadencePolicy, DecodeCadence};
pub use cart::{Cart, CartItem, CartTotals};
pub use confirm::{ConfirmPolicy, DetectionConfirmer, Observation};
pub use error::{CoreError, CoreResult, ValidationError, ValidationResult};
pub use money::Yen;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct products allowed in a single purchase list.
pub const MAX_CART_ITEMS: usize = 100;

/// Quantity ceiling used when a product reports no stock figure.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Maximum length of an employee code accepted by the purchase endpoint.
pub const MAX_EMPLOYEE_CODE_LEN: usize = 10;

/// Code offered to cashiers for trying the flow without a physical label.
pub const SAMPLE_PRODUCT_CODE: &str = "1234567890001";
