//! The most recent scanned code and the product it resolved to.
//!
//! A new code replaces both fields. The product stays pending until it is
//! added to the purchase list or the list is checked out.

use std::sync::{Arc, Mutex, MutexGuard};

use scanpos_core::Product;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lookup {
    pub scanned_code: Option<String>,
    pub pending: Option<Product>,
}

#[derive(Debug, Clone, Default)]
pub struct LookupState {
    inner: Arc<Mutex<Lookup>>,
}

impl LookupState {
    pub fn new() -> Self {
        LookupState::default()
    }

    fn lock(&self) -> MutexGuard<'_, Lookup> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn snapshot(&self) -> Lookup {
        self.lock().clone()
    }

    /// Records a freshly detected code and drops any earlier product.
    pub fn begin(&self, code: &str) {
        let mut lookup = self.lock();
        lookup.scanned_code = Some(code.to_string());
        lookup.pending = None;
    }

    /// Stores the product for `code`, unless a newer code arrived meanwhile.
    ///
    /// Returns false when the result is stale.
    pub fn resolve(&self, code: &str, product: Product) -> bool {
        let mut lookup = self.lock();
        if lookup.scanned_code.as_deref() != Some(code) {
            return false;
        }
        lookup.pending = Some(product);
        true
    }

    pub fn pending(&self) -> Option<Product> {
        self.lock().pending.clone()
    }

    pub fn clear(&self) {
        *self.lock() = Lookup::default();
    }
}
