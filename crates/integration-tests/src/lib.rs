//! Integration tests for the Neon Merch storefront.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p neon-merch-integration-tests
//! ```
//!
//! Nothing external is needed: each test starts a [`FakeBackend`] and a real
//! storefront listener on ephemeral ports and drives it with a cookie-keeping
//! `reqwest` client, like a browser would.

#![allow(clippy::missing_panics_doc, clippy::expect_used)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use neon_merch_core::{Product, ProductId};
use neon_merch_storefront::{app, config::StorefrontConfig, state::AppState};
use reqwest::Client;
use serde_json::{Value, json};

/// A backend URL nothing listens on.
pub const UNREACHABLE_BACKEND: &str = "http://127.0.0.1:9";

/// How the fake backend answers `POST /checkout`.
#[derive(Debug, Clone)]
pub enum CheckoutReply {
    /// 200 with sequential order IDs starting at the given one.
    Confirm { next_order_id: i64 },
    /// The given status with the given JSON body.
    Reject { status: u16, body: Value },
}

/// One `POST /checkout` the fake backend received.
#[derive(Debug, Clone)]
pub struct RecordedCheckout {
    pub idempotency_key: Option<String>,
    pub body: Value,
}

#[derive(Debug)]
struct FakeState {
    products: Vec<Product>,
    reply: CheckoutReply,
    delay: Duration,
    checkouts: Vec<RecordedCheckout>,
}

/// In-process stand-in for the backend REST API.
#[derive(Clone)]
pub struct FakeBackend {
    state: Arc<Mutex<FakeState>>,
    addr: SocketAddr,
}

impl FakeBackend {
    /// Start a backend serving `products` that confirms orders from #42.
    pub async fn start(products: Vec<Product>) -> Self {
        let state = Arc::new(Mutex::new(FakeState {
            products,
            reply: CheckoutReply::Confirm { next_order_id: 42 },
            delay: Duration::ZERO,
            checkouts: Vec::new(),
        }));

        let router = Router::new()
            .route("/products", get(list_products))
            .route("/products/{slug}", get(get_product))
            .route("/checkout", post(checkout))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake backend");
        let addr = listener.local_addr().expect("fake backend address");
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("fake backend");
        });

        Self { state, addr }
    }

    /// Base URL to configure the storefront with.
    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Answer future checkouts with `reply`.
    pub fn set_reply(&self, reply: CheckoutReply) {
        self.lock().reply = reply;
    }

    /// Delay every checkout answer.
    pub fn set_delay(&self, delay: Duration) {
        self.lock().delay = delay;
    }

    /// Every checkout received so far.
    #[must_use]
    pub fn checkouts(&self) -> Vec<RecordedCheckout> {
        self.lock().checkouts.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

type Shared = Arc<Mutex<FakeState>>;

fn lock(state: &Shared) -> std::sync::MutexGuard<'_, FakeState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn list_products(State(state): State<Shared>) -> Json<Vec<Product>> {
    Json(lock(&state).products.clone())
}

async fn get_product(State(state): State<Shared>, Path(slug): Path<String>) -> Response {
    let product = lock(&state).products.iter().find(|p| p.slug == slug).cloned();
    match product {
        Some(product) => Json(product).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "detail": "Produto não encontrado" })),
        )
            .into_response(),
    }
}

async fn checkout(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let delay = {
        let mut fake = lock(&state);
        fake.checkouts.push(RecordedCheckout {
            idempotency_key: headers
                .get("idempotency-key")
                .and_then(|v| v.to_str().ok())
                .map(String::from),
            body,
        });
        fake.delay
    };

    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    let mut fake = lock(&state);
    match &mut fake.reply {
        CheckoutReply::Confirm { next_order_id } => {
            let order_id = *next_order_id;
            *next_order_id += 1;
            Json(json!({
                "status": "success",
                "order_id": order_id,
                "message": "Compra realizada!"
            }))
            .into_response()
        }
        CheckoutReply::Reject { status, body } => (
            StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_REQUEST),
            Json(body.clone()),
        )
            .into_response(),
    }
}

/// A product with sensible defaults.
#[must_use]
pub fn product(id: i64, slug: &str, price_cents: i64, stock: i64) -> Product {
    Product {
        id: ProductId::new(id),
        slug: slug.to_string(),
        title: slug.replace('-', " ").to_uppercase(),
        description: format!("{slug} description"),
        price_cents,
        stock,
        image_url: None,
    }
}

/// The default catalog: an in-stock cap and a sold-out hoodie.
#[must_use]
pub fn catalog() -> Vec<Product> {
    vec![
        product(1, "neon-cap", 1999, 3),
        product(2, "glow-hoodie", 15990, 0),
    ]
}

/// A running storefront plus a browser-like client.
pub struct TestStorefront {
    pub base_url: String,
    pub client: Client,
    pub state: AppState,
}

impl TestStorefront {
    /// Start a storefront against `api_url` with a primed catalog.
    pub async fn start(api_url: &str) -> Self {
        let api_url = api_url.to_string();
        let config = StorefrontConfig::from_lookup(|key| match key {
            "NEON_API_URL" => Some(api_url.clone()),
            "NEON_API_TIMEOUT_SECONDS" => Some("5".to_string()),
            _ => None,
        })
        .expect("test config");

        let state = AppState::new(config).expect("app state");
        // An unreachable backend is a valid scenario; the listing copes.
        let _ = state.catalog().refresh().await;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind storefront");
        let addr = listener.local_addr().expect("storefront address");
        let router = app(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("storefront");
        });

        Self {
            base_url: format!("http://{addr}"),
            client: new_client(),
            state,
        }
    }

    /// Absolute URL for `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// GET `path` and return status plus body.
    pub async fn get(&self, path: &str) -> (StatusCode, String) {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("GET request");
        let status = StatusCode::from_u16(response.status().as_u16()).expect("status");
        (status, response.text().await.expect("body"))
    }

    /// POST a form to `path`.
    pub async fn post(&self, path: &str, form: &[(&str, &str)]) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .header("HX-Request", "true")
            .form(form)
            .send()
            .await
            .expect("POST request")
    }

    /// Current cart badge count.
    pub async fn cart_count(&self) -> String {
        let (_, body) = self.get("/cart/count").await;
        extract_between(&body, "hx-swap=\"outerHTML\">", "</span>")
            .expect("cart count in badge")
            .trim()
            .to_string()
    }

    /// Idempotency key rendered in the page at `path`.
    pub async fn idempotency_key(&self, path: &str) -> String {
        let (_, body) = self.get(path).await;
        idempotency_key_in(&body).expect("idempotency key in page")
    }
}

/// A client that keeps cookies between requests, like a browser.
#[must_use]
pub fn new_client() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}

/// Find the `idempotency_key` hidden input value in an HTML fragment.
#[must_use]
pub fn idempotency_key_in(html: &str) -> Option<String> {
    extract_between(html, "name=\"idempotency_key\" value=\"", "\"").map(String::from)
}

/// Text between the first `start` and the following `end`.
#[must_use]
pub fn extract_between<'a>(haystack: &'a str, start: &str, end: &str) -> Option<&'a str> {
    let from = haystack.find(start)? + start.len();
    let rest = haystack.get(from..)?;
    let to = rest.find(end)?;
    rest.get(..to)
}
