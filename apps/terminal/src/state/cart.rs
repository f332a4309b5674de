//! # Cart State
//!
//! Shared purchase list. Commands lock it briefly for each operation.
//!
//! ```text
//!  Cashier               Command                 Cart change
//!  ───────               ───────                 ───────────
//!  add [QTY] ──────────► add_pending_to_cart ──► merge by code
//!  qty CODE N ─────────► update_cart_item ─────► items[i].quantity = n
//!  remove CODE ────────► remove_from_cart ─────► items.remove(i)
//!  clear / purchase ───► clear_cart ───────────► items.clear()
//! ```

use std::sync::{Arc, Mutex, MutexGuard};

use scanpos_core::Cart;

/// Purchase list behind a mutex.
#[derive(Debug, Clone, Default)]
pub struct CartState {
    cart: Arc<Mutex<Cart>>,
}

impl CartState {
    pub fn new() -> Self {
        CartState::default()
    }

    fn lock(&self) -> MutexGuard<'_, Cart> {
        self.cart.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Runs `f` with read access to the cart.
    pub fn with_cart<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Cart) -> R,
    {
        f(&self.lock())
    }

    /// Runs `f` with write access to the cart.
    pub fn with_cart_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut Cart) -> R,
    {
        f(&mut self.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scanpos_core::Product;

    #[test]
    fn test_clones_share_one_cart() {
        let state = CartState::new();
        let other = state.clone();
        let product = Product {
            prd_id: None,
            code: "4902505130267".into(),
            name: "Pen".into(),
            price: 120,
            stock: Some(5),
        };

        other.with_cart_mut(|c| c.add_item(&product, 2)).unwrap();
        assert_eq!(state.with_cart(|c| c.total_quantity()), 2);
    }

    #[test]
    fn test_survives_poisoned_lock() {
        let state = CartState::new();
        let poisoner = state.clone();
        let _ = std::thread::spawn(move || {
            poisoner.with_cart_mut(|_| panic!("boom"));
        })
        .join();

        assert!(state.with_cart(|c| c.is_empty()));
    }
}
