//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Product listing
//!
//! # Products
//! GET  /products               - Redirect to /
//! GET  /products/grid          - Product grid fragment (HTMX retry target)
//! GET  /products/{slug}        - Product detail
//! POST /products/{slug}/buy    - Buy now (purchase panel fragment)
//!
//! # Cart (HTMX fragments)
//! GET  /cart                   - Cart page
//! POST /cart/add               - Add to cart (count badge, triggers cart-updated)
//! POST /cart/remove            - Remove item (cart_items fragment)
//! POST /cart/clear             - Empty the cart (cart_items fragment)
//! POST /cart/checkout          - Check out the whole cart (cart_items fragment)
//! GET  /cart/count             - Cart count badge (fragment)
//! ```

pub mod cart;
pub mod products;

use axum::{
    Router,
    response::Redirect,
    routing::{get, post},
};
use serde_json::{Map, Value};

use crate::state::AppState;

/// HTMX event fired whenever the cart contents change.
pub const CART_UPDATED_EVENT: &str = "cart-updated";

/// HTMX event fired when an order is confirmed.
pub const ORDER_CONFIRMED_EVENT: &str = "order-confirmed";

/// Notification kind, mapped to a CSS modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
    Info,
}

impl ToastKind {
    /// CSS class suffix.
    #[must_use]
    pub const fn css_class(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Info => "info",
        }
    }
}

/// A transient notification rendered alongside an HTMX fragment.
#[derive(Debug, Clone)]
pub struct Toast {
    pub kind: ToastKind,
    pub message: String,
}

impl Toast {
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: ToastKind::Success,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: ToastKind::Error,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: ToastKind::Info,
            message: message.into(),
        }
    }
}

/// Build an `HX-Trigger` header value carrying events with details.
#[must_use]
pub fn hx_trigger(events: &[(&str, Value)]) -> String {
    let map: Map<String, Value> = events
        .iter()
        .map(|(name, detail)| ((*name).to_string(), detail.clone()))
        .collect();
    Value::Object(map).to_string()
}

/// Placeholder image for products without one.
#[must_use]
pub fn placeholder_image_url(slug: &str, size: u32) -> String {
    format!(
        "https://via.placeholder.com/{size}?text={}",
        urlencoding::encode(slug)
    )
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(|| async { Redirect::permanent("/") }))
        .route("/grid", get(products::grid))
        .route("/{slug}", get(products::show))
        .route("/{slug}/buy", post(products::buy))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
        .route("/checkout", post(cart::checkout))
        .route("/count", get(cart::count))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .nest("/products", product_routes())
        .nest("/cart", cart_routes())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_placeholder_encodes_slug() {
        assert_eq!(
            placeholder_image_url("neon cap", 400),
            "https://via.placeholder.com/400?text=neon%20cap"
        );
    }

    #[test]
    fn test_hx_trigger_json() {
        let header = hx_trigger(&[(ORDER_CONFIRMED_EVENT, json!({"orderId": 42}))]);
        let parsed: Value = serde_json::from_str(&header).unwrap();
        assert_eq!(parsed["order-confirmed"]["orderId"], 42);
    }
}
