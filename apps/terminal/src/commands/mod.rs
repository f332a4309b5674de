//! # Commands Module
//!
//! Everything the cashier can do, as plain async functions over the state
//! types. The REPL parses a line and calls one of these; tests call them
//! directly.
//!
//! ```text
//! commands/
//! ├── mod.rs       ◄─── You are here (exports)
//! ├── scan.rs      ◄─── Start/stop scanning, manual codes, permission
//! ├── product.rs   ◄─── Product lookup for a detected code
//! ├── cart.rs      ◄─── Purchase list manipulation
//! └── purchase.rs  ◄─── Checkout
//! ```
//!
//! Each command declares only the state it needs:
//! ```rust,ignore
//! fn get_cart(cart: &CartState) -> CartView
//! async fn lookup_product(api: &PosApiClient, lookup: &LookupState, code: &str)
//! fn add_pending_to_cart(cart: &CartState, lookup: &LookupState, quantity: Option<i64>)
//! ```

pub mod cart;
pub mod product;
pub mod purchase;
pub mod scan;
