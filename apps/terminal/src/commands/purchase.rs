//! Checkout.

use scanpos_api::PosApiClient;
use scanpos_core::validation::normalize_employee_code;
use scanpos_core::PurchaseResult;
use tracing::{debug, info};

use crate::error::ApiError;
use crate::state::{CartState, LookupState};

/// Submits the purchase list.
///
/// An empty list is rejected before any request is made. On success the
/// list, the scanned code and the pending product are cleared; on failure
/// everything is kept so the cashier can retry.
pub async fn submit_purchase(
    api: &PosApiClient,
    cart: &CartState,
    lookup: &LookupState,
    employee_code: &str,
) -> Result<PurchaseResult, ApiError> {
    debug!("submit_purchase command");
    let employee_code = normalize_employee_code(employee_code)?;
    let request = cart.with_cart(|c| c.to_purchase_request(&employee_code))?;

    let result = api.purchase(&request).await?;

    cart.with_cart_mut(|c| c.clear());
    lookup.clear();
    info!(transaction_id = %result.transaction_id, "Purchase list cleared after checkout");
    Ok(result)
}
