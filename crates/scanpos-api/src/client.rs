//! # Store Backend Client
//!
//! ```text
//! lookup(code) ──► GET {base}/product/{code}
//!                    200 + JSON object  → Product
//!                    200 + anything else → InvalidResponse
//!                    404                → ProductNotFound
//!                    other              → Status { status, body }
//!
//! purchase(req) ─► POST {base}/purchase (JSON)
//!                    200                → PurchaseResult
//!                    other              → Status { status, body }
//! ```
//!
//! Product codes are placed in a single path segment, so codes containing
//! `/` or `?` are percent-encoded rather than changing the route.

use reqwest::{Client, Response, StatusCode};
use scanpos_core::{Product, PurchaseRequest, PurchaseResult};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::ApiSettings;
use crate::error::{ApiClientError, ApiResult};

/// HTTP client for product lookup and purchase submission.
#[derive(Debug, Clone)]
pub struct PosApiClient {
    http: Client,
    base_url: Url,
}

impl PosApiClient {
    /// Builds a client from validated settings.
    pub fn new(settings: &ApiSettings) -> ApiResult<Self> {
        settings.validate()?;
        let base_url = settings.parsed_base_url()?;
        let http = Client::builder()
            .timeout(settings.timeout())
            .build()
            .map_err(|e| ApiClientError::Transport(e.to_string()))?;

        debug!(base_url = %base_url, "Created store API client");
        Ok(PosApiClient { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Joins path segments onto the base URL, encoding each one.
    fn endpoint(&self, segments: &[&str]) -> ApiResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiClientError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Looks up a product by its scanned or typed code.
    pub async fn get_product(&self, code: &str) -> ApiResult<Product> {
        let url = self.endpoint(&["product", code])?;
        debug!(code = %code, url = %url, "Looking up product");

        let response = self.http.get(url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            info!(code = %code, "Product not found");
            return Err(ApiClientError::ProductNotFound(code.to_string()));
        }
        let response = Self::check_status(response).await?;

        let body = response.bytes().await?;
        let value: serde_json::Value = serde_json::from_slice(&body)
            .map_err(|e| ApiClientError::InvalidResponse(e.to_string()))?;
        if !value.is_object() {
            warn!(code = %code, "Product response was not a JSON object");
            return Err(ApiClientError::InvalidResponse(
                "expected a product object".into(),
            ));
        }
        Self::from_value(value)
    }

    /// Submits a purchase list.
    pub async fn purchase(&self, request: &PurchaseRequest) -> ApiResult<PurchaseResult> {
        let url = self.endpoint(&["purchase"])?;
        info!(
            lines = request.items.len(),
            employee = %request.employee_code,
            "Submitting purchase"
        );

        let response = self.http.post(url).json(request).send().await?;
        let response = Self::check_status(response).await?;

        let body = response.bytes().await?;
        let result: PurchaseResult = serde_json::from_slice(&body)
            .map_err(|e| ApiClientError::InvalidResponse(e.to_string()))?;
        info!(
            transaction_id = %result.transaction_id,
            total = result.total_amount,
            "Purchase recorded"
        );
        Ok(result)
    }

    async fn check_status(response: Response) -> ApiResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        warn!(status = status.as_u16(), body = %body, "Backend returned an error");
        Err(ApiClientError::Status {
            status: status.as_u16(),
            body,
        })
    }

    fn from_value<T: DeserializeOwned>(value: serde_json::Value) -> ApiResult<T> {
        serde_json::from_value(value).map_err(|e| ApiClientError::InvalidResponse(e.to_string()))
    }
}
