//! Cart route handlers.
//!
//! Cart operations use HTMX for dynamic updates without full page reloads.
//! The cart itself lives in the visitor's session (see [`VisitorCart`]).

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{AppendHeaders, IntoResponse, Response},
};
use neon_merch_core::{Cart, CheckoutRequest, IdempotencyKey, Locale, ProductId, PurchaseState};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use super::{
    CART_UPDATED_EVENT, ORDER_CONFIRMED_EVENT, Toast, hx_trigger, placeholder_image_url,
};
use crate::catalog::ProductLookup;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::middleware::VisitorCart;
use crate::services::confirmation_message;
use crate::state::AppState;

/// Cart item display data for templates.
#[derive(Clone)]
pub struct CartItemView {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub price: String,
    pub image_url: String,
}

/// Cart display data for templates.
#[derive(Clone)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub subtotal: String,
    pub item_count: usize,
}

impl CartView {
    /// Prepare a cart for display.
    #[must_use]
    pub fn new(cart: &Cart, locale: Locale) -> Self {
        Self {
            items: cart
                .iter()
                .map(|item| {
                    let product = item.product();
                    CartItemView {
                        id: product.id.as_i64(),
                        slug: product.slug.clone(),
                        title: product.title.clone(),
                        price: product.price().display(locale),
                        image_url: product
                            .image_url
                            .clone()
                            .filter(|url| !url.trim().is_empty())
                            .unwrap_or_else(|| placeholder_image_url(&product.slug, 100)),
                    }
                })
                .collect(),
            subtotal: cart.subtotal().display(locale),
            item_count: cart.len(),
        }
    }
}

/// Add/remove form data.
#[derive(Debug, Deserialize)]
pub struct CartItemForm {
    pub product_id: ProductId,
}

/// Checkout form data.
#[derive(Debug, Deserialize)]
pub struct CheckoutForm {
    pub idempotency_key: IdempotencyKey,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub cart: CartView,
    pub idempotency_key: IdempotencyKey,
    pub toast: Option<Toast>,
}

/// Cart items fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_items.html")]
pub struct CartItemsTemplate {
    pub cart: CartView,
    pub idempotency_key: IdempotencyKey,
    pub toast: Option<Toast>,
}

/// Cart count badge fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: usize,
}

fn cart_items(
    state: &AppState,
    cart: &Cart,
    idempotency_key: IdempotencyKey,
    toast: Option<Toast>,
) -> CartItemsTemplate {
    CartItemsTemplate {
        cart: CartView::new(cart, state.config().locale),
        idempotency_key,
        toast,
    }
}

/// Display cart page.
#[instrument(skip(state, cart))]
pub async fn show(
    State(state): State<AppState>,
    VisitorCart(cart): VisitorCart,
) -> impl IntoResponse {
    CartShowTemplate {
        cart: CartView::new(cart.cart(), state.config().locale),
        idempotency_key: IdempotencyKey::new(),
        toast: None,
    }
}

/// Add item to cart (HTMX).
///
/// Adding a product already in the cart changes nothing. Returns the count
/// badge and triggers `cart-updated`.
#[instrument(skip(state, cart))]
pub async fn add(
    State(state): State<AppState>,
    VisitorCart(mut cart): VisitorCart,
    Form(form): Form<CartItemForm>,
) -> Result<Response> {
    let product = match state.catalog().find_by_id(form.product_id).await {
        ProductLookup::Found(product) => product,
        ProductLookup::NotFound => {
            return Err(AppError::NotFound(format!("product {}", form.product_id)));
        }
        ProductLookup::TransientError => {
            return Err(AppError::Unavailable(format!("product {}", form.product_id)));
        }
    };

    if cart.add(product).await {
        let product_id = form.product_id.to_string();
        add_breadcrumb(
            "cart",
            "Added product",
            Some(&[("product_id", product_id.as_str())][..]),
        );
    }

    Ok((
        AppendHeaders([("HX-Trigger", CART_UPDATED_EVENT)]),
        CartCountTemplate { count: cart.len() },
    )
        .into_response())
}

/// Remove item from cart (HTMX).
#[instrument(skip(state, cart))]
pub async fn remove(
    State(state): State<AppState>,
    VisitorCart(mut cart): VisitorCart,
    Form(form): Form<CartItemForm>,
) -> impl IntoResponse {
    cart.remove(form.product_id).await;
    (
        AppendHeaders([("HX-Trigger", CART_UPDATED_EVENT)]),
        cart_items(&state, cart.cart(), IdempotencyKey::new(), None),
    )
}

/// Empty the cart (HTMX).
#[instrument(skip(state, cart))]
pub async fn clear(
    State(state): State<AppState>,
    VisitorCart(mut cart): VisitorCart,
) -> impl IntoResponse {
    cart.clear().await;
    (
        AppendHeaders([("HX-Trigger", CART_UPDATED_EVENT)]),
        cart_items(&state, cart.cart(), IdempotencyKey::new(), None),
    )
}

/// Get cart count badge (HTMX).
#[instrument(skip(cart))]
pub async fn count(VisitorCart(cart): VisitorCart) -> impl IntoResponse {
    CartCountTemplate { count: cart.len() }
}

/// Check out every item in the cart (HTMX).
///
/// A confirmed order empties the cart. A replayed confirmation leaves the
/// cart alone, since those items were already ordered and cleared. A failed
/// one leaves it untouched and keeps the idempotency key for a manual retry.
#[instrument(skip(state, cart, form), fields(idempotency_key = %form.idempotency_key))]
pub async fn checkout(
    State(state): State<AppState>,
    VisitorCart(mut cart): VisitorCart,
    Form(form): Form<CheckoutForm>,
) -> Result<Response> {
    let key = form.idempotency_key;
    let request = CheckoutRequest::from_cart(cart.cart());
    add_breadcrumb("checkout", "Cart checkout", None);

    let attempt = match state.checkout().submit(key, &request).await {
        Ok(attempt) => attempt,
        Err(e) => {
            return Ok(
                cart_items(&state, cart.cart(), key, Some(Toast::info(e.to_string())))
                    .into_response(),
            );
        }
    };

    let response = match attempt.state() {
        // Already ordered and cleared; the cart now holds only what was
        // added since.
        PurchaseState::Confirmed(order_id) if attempt.is_replay() => {
            let events = [(ORDER_CONFIRMED_EVENT, json!({ "orderId": order_id }))];
            (
                AppendHeaders([("HX-Trigger", hx_trigger(&events))]),
                cart_items(
                    &state,
                    cart.cart(),
                    IdempotencyKey::new(),
                    Some(Toast::success(confirmation_message(*order_id))),
                ),
            )
                .into_response()
        }
        PurchaseState::Confirmed(order_id) => {
            for item in cart.cart().iter() {
                state.catalog().invalidate(&item.product().slug).await;
            }
            cart.clear().await;

            let events: [(&str, Value); 2] = [
                (ORDER_CONFIRMED_EVENT, json!({ "orderId": order_id })),
                (CART_UPDATED_EVENT, Value::Null),
            ];
            (
                AppendHeaders([("HX-Trigger", hx_trigger(&events))]),
                cart_items(
                    &state,
                    cart.cart(),
                    IdempotencyKey::new(),
                    Some(Toast::success(confirmation_message(*order_id))),
                ),
            )
                .into_response()
        }
        PurchaseState::Failed(message) => cart_items(
            &state,
            cart.cart(),
            attempt.key(),
            Some(Toast::error(message.clone())),
        )
        .into_response(),
        PurchaseState::Idle | PurchaseState::Submitting => {
            return Err(AppError::Internal(
                "purchase attempt did not settle".to_string(),
            ));
        }
    };

    Ok(response)
}
