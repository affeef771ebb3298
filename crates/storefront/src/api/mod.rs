//! Client for the Neon Merch backend REST API.
//!
//! # Endpoints
//!
//! ```text
//! GET  /products         - All products
//! GET  /products/{slug}  - One product, 404 if unknown
//! POST /checkout         - Create an order: {"items": [{"product_id", "quantity"}]}
//! ```
//!
//! The backend is the source of truth for products and stock. Nothing is
//! retried here; callers decide how to degrade.

pub mod types;

use std::sync::Arc;

use neon_merch_core::{CheckoutRequest, IdempotencyKey, Product};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use crate::config::ApiConfig;

pub use types::{CheckoutResponse, ErrorBody};

/// Header carrying the purchase attempt's idempotency key.
pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";

/// Errors that can occur when calling the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport failure (connection refused, timeout, TLS, ...).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not the expected JSON.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Endpoint URL could not be built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The requested resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Non-success status with an optional `detail` message.
    #[error("Backend returned {status}{}", .detail.as_ref().map(|d| format!(": {d}")).unwrap_or_default())]
    Status { status: u16, detail: Option<String> },
}

impl ApiError {
    /// Whether the failure may go away on a later attempt.
    ///
    /// Not-found and client-side (4xx) rejections are terminal.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Http(_) | Self::Parse(_) => true,
            Self::Status { status, .. } => *status >= 500,
            Self::InvalidUrl(_) | Self::NotFound(_) => false,
        }
    }

    /// The backend's human-readable `detail`, if it sent one.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Status { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }
}

/// Client for the backend REST API.
///
/// Cheaply cloneable; clones share one connection pool.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<BackendClientInner>,
}

struct BackendClientInner {
    client: reqwest::Client,
    base_url: Url,
}

impl BackendClient {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            inner: Arc::new(BackendClientInner {
                client: builder.build()?,
                base_url: config.base_url.clone(),
            }),
        })
    }

    /// The configured base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Build an endpoint URL from path segments, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Decode a JSON body, logging a truncated copy on failure.
    fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
        serde_json::from_str(body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse backend response"
            );
            ApiError::Parse(e)
        })
    }

    // =========================================================================
    // Product Methods
    // =========================================================================

    /// Fetch every product.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body is not a product list.
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Vec<Product>, ApiError> {
        let url = self.endpoint(&["products"])?;
        let response = self.inner.client.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::warn!(status = %status, "Product list request failed");
            return Err(ApiError::Status {
                status: status.as_u16(),
                detail: ErrorBody::parse(&body).message(),
            });
        }

        let products: Vec<Product> = Self::decode(&body)?;
        debug!(count = products.len(), "Fetched product list");
        Ok(products)
    }

    /// Fetch one product by slug.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` on 404, or another error if the request
    /// fails.
    #[instrument(skip(self), fields(slug = %slug))]
    pub async fn get_product(&self, slug: &str) -> Result<Product, ApiError> {
        let url = self.endpoint(&["products", slug])?;
        let response = self.inner.client.get(url).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(format!("Product not found: {slug}")));
        }

        let body = response.text().await?;
        if !status.is_success() {
            tracing::warn!(status = %status, "Product request failed");
            return Err(ApiError::Status {
                status: status.as_u16(),
                detail: ErrorBody::parse(&body).message(),
            });
        }

        Self::decode(&body)
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    /// Submit a checkout request.
    ///
    /// This is the only mutating call and it is never retried.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Status` with the backend's `detail` on a non-2xx
    /// response, or a transport/parse error.
    #[instrument(skip(self, request), fields(items = request.items.len(), idempotency_key = %key))]
    pub async fn checkout(
        &self,
        request: &CheckoutRequest,
        key: IdempotencyKey,
    ) -> Result<CheckoutResponse, ApiError> {
        let url = self.endpoint(&["checkout"])?;
        let response = self
            .inner
            .client
            .post(url)
            .header(IDEMPOTENCY_KEY_HEADER, key.to_string())
            .json(request)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let detail = ErrorBody::parse(&body).message();
            tracing::warn!(status = %status, detail = ?detail, "Checkout rejected");
            return Err(ApiError::Status {
                status: status.as_u16(),
                detail,
            });
        }

        Self::decode(&body)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(base: &str) -> BackendClient {
        BackendClient::new(&ApiConfig {
            base_url: Url::parse(base).unwrap(),
            timeout: None,
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint_appends_to_base_path() {
        let client = client("http://localhost:8000/api/");
        assert_eq!(
            client.endpoint(&["products"]).unwrap().as_str(),
            "http://localhost:8000/api/products"
        );
    }

    #[test]
    fn test_endpoint_escapes_slug() {
        let client = client("http://localhost:8000/");
        assert_eq!(
            client.endpoint(&["products", "a b/c"]).unwrap().as_str(),
            "http://localhost:8000/products/a%20b%2Fc"
        );
    }

    #[test]
    fn test_error_display() {
        let err = ApiError::Status {
            status: 400,
            detail: Some("Out of stock".to_string()),
        };
        assert_eq!(err.to_string(), "Backend returned 400: Out of stock");

        let err = ApiError::Status {
            status: 502,
            detail: None,
        };
        assert_eq!(err.to_string(), "Backend returned 502");
    }

    #[test]
    fn test_transient_classification() {
        assert!(
            ApiError::Status {
                status: 503,
                detail: None
            }
            .is_transient()
        );
        assert!(
            !ApiError::Status {
                status: 400,
                detail: None
            }
            .is_transient()
        );
        assert!(!ApiError::NotFound("x".to_string()).is_transient());
    }

    #[test]
    fn test_detail_only_for_status_errors() {
        let err = ApiError::Status {
            status: 400,
            detail: Some("Estoque insuficiente".to_string()),
        };
        assert_eq!(err.detail(), Some("Estoque insuficiente"));
        assert_eq!(ApiError::NotFound("x".to_string()).detail(), None);
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_transient_http_error() {
        // Port 9 (discard) is not expected to have an HTTP listener.
        let client = client("http://127.0.0.1:9/");
        let err = client.list_products().await.unwrap_err();
        assert!(matches!(err, ApiError::Http(_)));
        assert!(err.is_transient());
    }
}
