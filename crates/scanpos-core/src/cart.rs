//! # Purchase List
//!
//! The cashier's running list of products, keyed by product code.
//!
//! ## Operations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Purchase List Operations                             │
//! │                                                                         │
//! │  Cashier action           Method                  State change          │
//! │  ──────────────           ──────                  ────────────          │
//! │                                                                         │
//! │  Add scanned product ────► add_item() ──────────► push, or merge qty   │
//! │                                                     when CODE matches  │
//! │  Change quantity ────────► update_quantity() ───► items[i].qty = n     │
//! │                                                                         │
//! │  Remove line ────────────► remove_item() ───────► items.remove(i)      │
//! │                                                                         │
//! │  Checkout ───────────────► to_purchase_request() ► POST /purchase body │
//! │                                                                         │
//! │  Checkout succeeded ─────► clear() ─────────────► items.clear()        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants
//! - Items are unique by product code.
//! - Every quantity is within `1..=product.quantity_limit()`.
//! - At most [`MAX_CART_ITEMS`] distinct products.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::Yen;
use crate::types::{Product, PurchaseLine, PurchaseRequest};
use crate::MAX_CART_ITEMS;

// =============================================================================
// Cart Item
// =============================================================================

/// A product line in the purchase list.
///
/// The product is a snapshot taken when the line was added, so the unit
/// price stays frozen even if the backend changes it meanwhile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    pub product: Product,
    pub quantity: i64,
    pub added_at: DateTime<Utc>,
}

impl CartItem {
    pub fn code(&self) -> &str {
        &self.product.code
    }

    pub fn unit_price(&self) -> Yen {
        Yen::new(self.product.price)
    }

    /// Unit price × quantity.
    pub fn line_total(&self) -> Yen {
        self.unit_price() * self.quantity
    }

    /// Returns true when the quantity cannot be increased further.
    pub fn at_limit(&self) -> bool {
        self.quantity >= self.product.quantity_limit()
    }
}

// =============================================================================
// Cart
// =============================================================================

/// The purchase list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cart {
    pub items: Vec<CartItem>,

    /// When the list was created or last cleared.
    pub created_at: DateTime<Utc>,
}

impl Default for Cart {
    fn default() -> Self {
        Cart::new()
    }
}

impl Cart {
    pub fn new() -> Self {
        Cart {
            items: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Adds a product, merging into the existing line when the code matches.
    ///
    /// ## Errors
    /// - `QuantityOutOfRange` if the product is out of stock, or the
    ///   resulting quantity leaves `1..=limit`
    /// - `CartTooLarge` if a new line would exceed [`MAX_CART_ITEMS`]
    pub fn add_item(&mut self, product: &Product, quantity: i64) -> CoreResult<()> {
        let limit = product.quantity_limit();

        if !product.is_in_stock() {
            return Err(CoreError::QuantityOutOfRange {
                code: product.code.clone(),
                requested: quantity,
                max: 0,
            });
        }

        if let Some(item) = self.items.iter_mut().find(|i| i.product.code == product.code) {
            let merged = item.quantity.checked_add(quantity);
            return match merged {
                Some(new_qty) if quantity >= 1 && new_qty <= limit => {
                    item.quantity = new_qty;
                    Ok(())
                }
                // Saturate so an overflowing merge still reports a number.
                _ => Err(CoreError::QuantityOutOfRange {
                    code: product.code.clone(),
                    requested: merged.unwrap_or(i64::MAX),
                    max: limit,
                }),
            };
        }

        if !(1..=limit).contains(&quantity) {
            return Err(CoreError::QuantityOutOfRange {
                code: product.code.clone(),
                requested: quantity,
                max: limit,
            });
        }

        if self.items.len() >= MAX_CART_ITEMS {
            return Err(CoreError::CartTooLarge {
                max: MAX_CART_ITEMS,
            });
        }

        self.items.push(CartItem {
            product: product.clone(),
            quantity,
            added_at: Utc::now(),
        });
        Ok(())
    }

    /// Sets the quantity of an existing line.
    ///
    /// Out-of-range quantities are rejected and leave the line untouched.
    pub fn update_quantity(&mut self, code: &str, quantity: i64) -> CoreResult<()> {
        let item = self
            .items
            .iter_mut()
            .find(|i| i.product.code == code)
            .ok_or_else(|| CoreError::ItemNotInCart(code.to_string()))?;

        let limit = item.product.quantity_limit();
        if !(1..=limit).contains(&quantity) {
            return Err(CoreError::QuantityOutOfRange {
                code: code.to_string(),
                requested: quantity,
                max: limit,
            });
        }

        item.quantity = quantity;
        Ok(())
    }

    /// Removes a line by product code.
    pub fn remove_item(&mut self, code: &str) -> CoreResult<CartItem> {
        let index = self
            .items
            .iter()
            .position(|i| i.product.code == code)
            .ok_or_else(|| CoreError::ItemNotInCart(code.to_string()))?;
        Ok(self.items.remove(index))
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.created_at = Utc::now();
    }

    pub fn get(&self, code: &str) -> Option<&CartItem> {
        self.items.iter().find(|i| i.product.code == code)
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// Sum of price × quantity over every line.
    pub fn total_amount(&self) -> Yen {
        self.items.iter().map(CartItem::line_total).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn totals(&self) -> CartTotals {
        CartTotals {
            item_count: self.item_count(),
            total_quantity: self.total_quantity(),
            total_amount: self.total_amount(),
        }
    }

    /// Builds the `POST /purchase` body.
    ///
    /// Returns `EmptyCart` when there is nothing to submit.
    pub fn to_purchase_request(&self, employee_code: &str) -> CoreResult<PurchaseRequest> {
        if self.is_empty() {
            return Err(CoreError::EmptyCart);
        }
        Ok(PurchaseRequest {
            employee_code: employee_code.to_string(),
            items: self
                .items
                .iter()
                .map(|i| PurchaseLine {
                    product_code: i.product.code.clone(),
                    quantity: i.quantity,
                    unit_price: i.product.price,
                })
                .collect(),
        })
    }
}

/// Totals summary for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartTotals {
    pub item_count: usize,
    pub total_quantity: i64,
    pub total_amount: Yen,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MAX_ITEM_QUANTITY;

    fn product(code: &str, price: i64, stock: Option<i64>) -> Product {
        Product {
            prd_id: Some(1),
            code: code.to_string(),
            name: format!("Item {}", code),
            price,
            stock,
        }
    }

    #[test]
    fn test_add_merges_by_code() {
        let mut cart = Cart::new();
        let pen = product("4902505130267", 120, Some(10));

        cart.add_item(&pen, 2).unwrap();
        cart.add_item(&pen, 3).unwrap();

        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.get("4902505130267").unwrap().quantity, 5);
        assert_eq!(cart.total_amount(), Yen::new(600));
    }

    #[test]
    fn test_add_respects_stock() {
        let mut cart = Cart::new();
        let pen = product("4902505130267", 120, Some(3));

        cart.add_item(&pen, 2).unwrap();
        let err = cart.add_item(&pen, 2).unwrap_err();
        assert!(matches!(
            err,
            CoreError::QuantityOutOfRange {
                requested: 4,
                max: 3,
                ..
            }
        ));
        assert_eq!(cart.get("4902505130267").unwrap().quantity, 2);
    }

    #[test]
    fn test_merge_overflow_is_out_of_range() {
        let mut cart = Cart::new();
        let bulk = product("A1", 1, Some(i64::MAX));

        cart.add_item(&bulk, i64::MAX - 1).unwrap();
        let err = cart.add_item(&bulk, 5).unwrap_err();
        assert!(matches!(
            err,
            CoreError::QuantityOutOfRange {
                requested: i64::MAX,
                max: i64::MAX,
                ..
            }
        ));
        assert_eq!(cart.get("A1").unwrap().quantity, i64::MAX - 1);
    }

    #[test]
    fn test_out_of_stock_cannot_be_added() {
        let mut cart = Cart::new();
        assert!(cart.add_item(&product("A1", 100, Some(0)), 1).is_err());
        assert!(cart.add_item(&product("A2", 100, None), 1).is_err());
        assert!(cart.is_empty());
    }

    #[test]
    fn test_update_quantity_bounds() {
        let mut cart = Cart::new();
        cart.add_item(&product("A1", 100, Some(5)), 1).unwrap();

        cart.update_quantity("A1", 5).unwrap();
        assert_eq!(cart.total_quantity(), 5);

        assert!(cart.update_quantity("A1", 0).is_err());
        assert!(cart.update_quantity("A1", 6).is_err());
        assert_eq!(cart.total_quantity(), 5);

        assert!(matches!(
            cart.update_quantity("missing", 1),
            Err(CoreError::ItemNotInCart(_))
        ));
    }

    #[test]
    fn test_remove_and_totals() {
        let mut cart = Cart::new();
        cart.add_item(&product("A1", 100, Some(5)), 2).unwrap();
        cart.add_item(&product("B2", 1250, Some(MAX_ITEM_QUANTITY)), 1).unwrap();

        let totals = cart.totals();
        assert_eq!(totals.item_count, 2);
        assert_eq!(totals.total_quantity, 3);
        assert_eq!(totals.total_amount, Yen::new(1450));

        let removed = cart.remove_item("A1").unwrap();
        assert_eq!(removed.quantity, 2);
        assert_eq!(cart.total_amount(), Yen::new(1250));
        assert!(cart.remove_item("A1").is_err());
    }

    #[test]
    fn test_purchase_request() {
        let mut cart = Cart::new();
        assert!(matches!(
            cart.to_purchase_request("E1"),
            Err(CoreError::EmptyCart)
        ));

        cart.add_item(&product("A1", 100, Some(5)), 2).unwrap();
        let req = cart.to_purchase_request("E1").unwrap();
        assert_eq!(req.employee_code, "E1");
        assert_eq!(req.items.len(), 1);
        assert_eq!(req.items[0].unit_price, 100);
        assert_eq!(req.items[0].quantity, 2);
    }

    #[test]
    fn test_item_at_limit() {
        let mut cart = Cart::new();
        cart.add_item(&product("A1", 100, Some(2)), 2).unwrap();
        assert!(cart.get("A1").unwrap().at_limit());
    }
}
