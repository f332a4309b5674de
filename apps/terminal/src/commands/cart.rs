//! # Cart Commands
//!
//! ```text
//!  ┌──────────┐  lookup   ┌──────────┐   add    ┌──────────┐ purchase ┌──────────┐
//!  │  Empty   │──────────►│ Pending  │─────────►│ In List  │─────────►│  Empty   │
//!  │          │           │ product  │          │          │          │          │
//!  └──────────┘           └──────────┘          └──────────┘          └──────────┘
//!                                                 │  qty / remove
//!                                                 │  clear ──────────► Empty
//! ```

use scanpos_core::validation::validate_quantity;
use scanpos_core::{Cart, CartItem, CartTotals};
use serde::Serialize;
use tracing::debug;

use crate::error::ApiError;
use crate::state::{CartState, LookupState};

/// Cart contents with totals.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub items: Vec<CartItem>,
    pub totals: CartTotals,
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        CartView {
            items: cart.items.clone(),
            totals: cart.totals(),
        }
    }
}

pub fn get_cart(cart: &CartState) -> CartView {
    cart.with_cart(|c| CartView::from(c))
}

/// Adds the pending product with `quantity` (default 1).
///
/// Existing lines for the same code are merged. The pending product and
/// scanned code are cleared on success.
pub fn add_pending_to_cart(
    cart: &CartState,
    lookup: &LookupState,
    quantity: Option<i64>,
) -> Result<CartView, ApiError> {
    let quantity = quantity.unwrap_or(1);
    debug!(quantity, "add_pending_to_cart command");

    let product = lookup
        .pending()
        .ok_or_else(|| ApiError::validation("No product to add. Scan or enter a code first."))?;
    if product.is_in_stock() {
        validate_quantity(quantity, product.quantity_limit())?;
    }

    let view = cart.with_cart_mut(|c| {
        c.add_item(&product, quantity)?;
        Ok::<CartView, ApiError>(CartView::from(&*c))
    })?;
    lookup.clear();
    Ok(view)
}

pub fn update_cart_item(cart: &CartState, code: &str, quantity: i64) -> Result<CartView, ApiError> {
    debug!(code = %code, quantity, "update_cart_item command");
    cart.with_cart_mut(|c| {
        c.update_quantity(code, quantity)?;
        Ok(CartView::from(&*c))
    })
}

pub fn remove_from_cart(cart: &CartState, code: &str) -> Result<CartView, ApiError> {
    debug!(code = %code, "remove_from_cart command");
    cart.with_cart_mut(|c| {
        c.remove_item(code)?;
        Ok(CartView::from(&*c))
    })
}

pub fn clear_cart(cart: &CartState) -> CartView {
    debug!("clear_cart command");
    cart.with_cart_mut(|c| {
        c.clear();
        CartView::from(&*c)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use scanpos_core::{Product, Yen};

    fn pen(stock: Option<i64>) -> Product {
        Product {
            prd_id: Some(1),
            code: "4902505130267".into(),
            name: "Ballpoint pen".into(),
            price: 120,
            stock,
        }
    }

    fn pending(product: Product) -> LookupState {
        let lookup = LookupState::new();
        lookup.begin(&product.code);
        lookup.resolve(&product.code.clone(), product);
        lookup
    }

    #[test]
    fn test_add_without_pending_product() {
        let err = add_pending_to_cart(&CartState::new(), &LookupState::new(), None).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[test]
    fn test_add_merges_and_clears_pending() {
        let cart = CartState::new();

        let lookup = pending(pen(Some(10)));
        add_pending_to_cart(&cart, &lookup, Some(2)).unwrap();
        assert!(lookup.pending().is_none());
        assert!(lookup.snapshot().scanned_code.is_none());

        let lookup = pending(pen(Some(10)));
        let view = add_pending_to_cart(&cart, &lookup, None).unwrap();
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.totals.total_quantity, 3);
        assert_eq!(view.totals.total_amount, Yen::new(360));
    }

    #[test]
    fn test_add_rejects_quantity_over_stock() {
        let cart = CartState::new();
        let lookup = pending(pen(Some(2)));

        let err = add_pending_to_cart(&cart, &lookup, Some(3)).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert!(lookup.pending().is_some());
        assert!(get_cart(&cart).items.is_empty());
    }

    #[test]
    fn test_add_out_of_stock() {
        let lookup = pending(pen(Some(0)));
        let err = add_pending_to_cart(&CartState::new(), &lookup, None).unwrap_err();
        assert_eq!(err.code, ErrorCode::CartError);
        assert!(err.message.contains("out of stock"));
    }

    #[test]
    fn test_update_remove_clear() {
        let cart = CartState::new();
        add_pending_to_cart(&cart, &pending(pen(Some(10))), Some(1)).unwrap();

        let view = update_cart_item(&cart, "4902505130267", 5).unwrap();
        assert_eq!(view.totals.total_amount, Yen::new(600));

        let err = update_cart_item(&cart, "4902505130267", 11).unwrap_err();
        assert_eq!(err.code, ErrorCode::CartError);

        let err = remove_from_cart(&cart, "missing").unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);

        let view = remove_from_cart(&cart, "4902505130267").unwrap();
        assert!(view.items.is_empty());

        add_pending_to_cart(&cart, &pending(pen(Some(10))), Some(1)).unwrap();
        assert!(clear_cart(&cart).items.is_empty());
    }
}
