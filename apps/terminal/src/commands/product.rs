//! Product lookup for a detected or typed code.

use scanpos_api::PosApiClient;
use scanpos_core::Product;
use tracing::{debug, info};

use crate::error::ApiError;
use crate::state::LookupState;

/// Records `code` as the scanned code and fetches its product.
///
/// Returns `Ok(None)` when a newer code was scanned while this request was
/// in flight; the newer lookup owns the pending slot.
pub async fn lookup_product(
    api: &PosApiClient,
    lookup: &LookupState,
    code: &str,
) -> Result<Option<Product>, ApiError> {
    debug!(code = %code, "lookup_product command");
    lookup.begin(code);

    let product = api.get_product(code).await?;
    if !lookup.resolve(code, product.clone()) {
        debug!(code = %code, "Discarding stale product lookup");
        return Ok(None);
    }

    info!(code = %code, name = %product.name, price = product.price, "Product found");
    Ok(Some(product))
}
