//! Wire types for backend responses that are not domain types.

use neon_merch_core::OrderId;
use serde::Deserialize;

/// Successful `POST /checkout` body.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutResponse {
    /// ID of the created order.
    pub order_id: OrderId,
    /// Backend status label (e.g. "success").
    #[serde(default)]
    pub status: Option<String>,
    /// Human-readable message from the backend.
    #[serde(default)]
    pub message: Option<String>,
}

/// Error body returned with non-2xx statuses.
///
/// `detail` is usually a string, but request validation failures carry a
/// list of field errors instead.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}

impl ErrorBody {
    /// Parse an error body, tolerating non-JSON responses.
    #[must_use]
    pub fn parse(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_default()
    }

    /// The `detail` message if it is a non-empty string.
    #[must_use]
    pub fn message(&self) -> Option<String> {
        match &self.detail {
            Some(serde_json::Value::String(detail)) if !detail.trim().is_empty() => {
                Some(detail.clone())
            }
            _ => None,
        }
    }
}
