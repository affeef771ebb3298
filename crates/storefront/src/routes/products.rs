//! Product route handlers.
//!
//! The listing is served from the catalog snapshot; the detail page resolves
//! its product through [`Catalog::lookup`](crate::catalog::Catalog::lookup)
//! and keeps "no such product" apart from "backend unreachable".

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{AppendHeaders, IntoResponse, Response},
};
use neon_merch_core::{CheckoutRequest, IdempotencyKey, Locale, Product, PurchaseState};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use super::{ORDER_CONFIRMED_EVENT, Toast, hx_trigger, placeholder_image_url};
use crate::catalog::ProductLookup;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::services::confirmation_message;
use crate::state::AppState;

/// Product display data for templates.
#[derive(Clone)]
pub struct ProductView {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub price: String,
    pub image_url: String,
    pub stock: i64,
    pub available: bool,
}

impl ProductView {
    /// Prepare a product for display.
    #[must_use]
    pub fn new(product: &Product, locale: Locale, image_size: u32) -> Self {
        Self {
            id: product.id.as_i64(),
            slug: product.slug.clone(),
            title: product.title.clone(),
            description: product.description.clone(),
            price: product.price().display(locale),
            image_url: product
                .image_url
                .clone()
                .filter(|url| !url.trim().is_empty())
                .unwrap_or_else(|| placeholder_image_url(&product.slug, image_size)),
            stock: product.stock,
            available: product.is_available(),
        }
    }
}

/// Buy-now form data.
#[derive(Debug, Deserialize)]
pub struct BuyForm {
    pub idempotency_key: IdempotencyKey,
}

/// Product listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub products: Vec<ProductView>,
}

/// Product grid fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/product_grid.html")]
pub struct ProductGridTemplate {
    pub products: Vec<ProductView>,
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub product: ProductView,
    pub idempotency_key: IdempotencyKey,
    pub toast: Option<Toast>,
}

/// Purchase panel fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/purchase_panel.html")]
pub struct PurchasePanelTemplate {
    pub product: ProductView,
    pub idempotency_key: IdempotencyKey,
    pub toast: Option<Toast>,
}

/// Unknown product page.
#[derive(Template, WebTemplate)]
#[template(path = "products/not_found.html")]
pub struct ProductNotFoundTemplate {
    pub slug: String,
}

/// Backend unreachable page.
#[derive(Template, WebTemplate)]
#[template(path = "products/unavailable.html")]
pub struct ProductUnavailableTemplate {
    pub slug: String,
}

/// Image size on listing cards.
const CARD_IMAGE_SIZE: u32 = 400;

/// Image size on the detail page.
const DETAIL_IMAGE_SIZE: u32 = 600;

async fn listing(state: &AppState) -> Vec<ProductView> {
    let locale = state.config().locale;
    state
        .catalog()
        .products_or_fetch()
        .await
        .iter()
        .map(|p| ProductView::new(p, locale, CARD_IMAGE_SIZE))
        .collect()
}

/// Display product listing page.
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> impl IntoResponse {
    ProductsIndexTemplate {
        products: listing(&state).await,
    }
}

/// Product grid fragment (for HTMX retry).
#[instrument(skip(state))]
pub async fn grid(State(state): State<AppState>) -> impl IntoResponse {
    ProductGridTemplate {
        products: listing(&state).await,
    }
}

/// Display product detail page.
#[instrument(skip(state))]
pub async fn show(State(state): State<AppState>, Path(slug): Path<String>) -> Response {
    match state.catalog().lookup(&slug).await {
        ProductLookup::Found(product) => ProductShowTemplate {
            product: ProductView::new(&product, state.config().locale, DETAIL_IMAGE_SIZE),
            idempotency_key: IdempotencyKey::new(),
            toast: None,
        }
        .into_response(),
        ProductLookup::NotFound => {
            (StatusCode::NOT_FOUND, ProductNotFoundTemplate { slug }).into_response()
        }
        ProductLookup::TransientError => (
            StatusCode::SERVICE_UNAVAILABLE,
            ProductUnavailableTemplate { slug },
        )
            .into_response(),
    }
}

/// Buy one unit of a product now (HTMX).
///
/// Returns the purchase panel with a notification. On success the panel
/// carries a fresh idempotency key and `order-confirmed` is triggered; on
/// failure the key is kept so a manual retry is the same attempt.
#[instrument(skip(state, form), fields(idempotency_key = %form.idempotency_key))]
pub async fn buy(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Form(form): Form<BuyForm>,
) -> Result<Response> {
    let product = match state.catalog().lookup(&slug).await {
        ProductLookup::Found(product) => product,
        ProductLookup::NotFound => return Err(AppError::NotFound(slug)),
        ProductLookup::TransientError => return Err(AppError::Unavailable(slug)),
    };

    let product_id = product.id.to_string();
    add_breadcrumb(
        "checkout",
        "Buy now",
        Some(&[("product_id", product_id.as_str())][..]),
    );

    let key = form.idempotency_key;
    let locale = state.config().locale;
    let attempt = match state
        .checkout()
        .submit(key, &CheckoutRequest::single(product.id))
        .await
    {
        Ok(attempt) => attempt,
        Err(e) => {
            return Ok(PurchasePanelTemplate {
                product: ProductView::new(&product, locale, DETAIL_IMAGE_SIZE),
                idempotency_key: key,
                toast: Some(Toast::info(e.to_string())),
            }
            .into_response());
        }
    };

    let response = match attempt.state() {
        PurchaseState::Confirmed(order_id) => {
            if !attempt.is_replay() {
                state.catalog().invalidate(&slug).await;
            }
            let fresh = match state.catalog().lookup(&slug).await {
                ProductLookup::Found(fresh) => fresh,
                ProductLookup::NotFound | ProductLookup::TransientError => product,
            };
            (
                AppendHeaders([(
                    "HX-Trigger",
                    hx_trigger(&[(ORDER_CONFIRMED_EVENT, json!({ "orderId": order_id }))]),
                )]),
                PurchasePanelTemplate {
                    product: ProductView::new(&fresh, locale, DETAIL_IMAGE_SIZE),
                    idempotency_key: IdempotencyKey::new(),
                    toast: Some(Toast::success(confirmation_message(*order_id))),
                },
            )
                .into_response()
        }
        PurchaseState::Failed(message) => PurchasePanelTemplate {
            product: ProductView::new(&product, locale, DETAIL_IMAGE_SIZE),
            idempotency_key: attempt.key(),
            toast: Some(Toast::error(message.clone())),
        }
        .into_response(),
        PurchaseState::Idle | PurchaseState::Submitting => {
            return Err(AppError::Internal(
                "purchase attempt did not settle".to_string(),
            ));
        }
    };

    Ok(response)
}
