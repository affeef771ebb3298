//! Integration tests for buy-now and whole-cart checkout.

#![allow(clippy::expect_used)]

use std::time::Duration;

use neon_merch_integration_tests::{
    CheckoutReply, FakeBackend, TestStorefront, UNREACHABLE_BACKEND, catalog, idempotency_key_in,
};
use reqwest::StatusCode;
use serde_json::json;
use tokio::task::JoinSet;

// ============================================================================
// Buy now
// ============================================================================

#[tokio::test]
async fn test_buy_now_confirms_order() {
    let backend = FakeBackend::start(catalog()).await;
    let storefront = TestStorefront::start(&backend.url()).await;
    let key = storefront.idempotency_key("/products/neon-cap").await;

    let response = storefront
        .post("/products/neon-cap/buy", &[("idempotency_key", &key)])
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let trigger = response
        .headers()
        .get("hx-trigger")
        .expect("HX-Trigger")
        .to_str()
        .expect("ascii header")
        .to_string();
    assert!(trigger.contains("order-confirmed"));
    assert!(trigger.contains("42"));

    let fragment = response.text().await.expect("body");
    assert!(fragment.contains("Pedido #42 confirmado! Enviamos um email."));
    // A confirmed attempt hands out a fresh key for the next purchase
    let next_key = idempotency_key_in(&fragment).expect("key in panel");
    assert_ne!(next_key, key);

    let checkouts = backend.checkouts();
    assert_eq!(checkouts.len(), 1);
    assert_eq!(checkouts[0].idempotency_key.as_deref(), Some(key.as_str()));
    assert_eq!(
        checkouts[0].body,
        json!({ "items": [{ "product_id": 1, "quantity": 1 }] })
    );
}

#[tokio::test]
async fn test_buy_now_does_not_touch_cart() {
    let backend = FakeBackend::start(catalog()).await;
    let storefront = TestStorefront::start(&backend.url()).await;
    storefront.post("/cart/add", &[("product_id", "2")]).await;

    let key = storefront.idempotency_key("/products/neon-cap").await;
    storefront
        .post("/products/neon-cap/buy", &[("idempotency_key", &key)])
        .await;

    assert_eq!(storefront.cart_count().await, "1");
}

#[tokio::test]
async fn test_buy_now_rejection_shows_backend_detail() {
    let backend = FakeBackend::start(catalog()).await;
    backend.set_reply(CheckoutReply::Reject {
        status: 400,
        body: json!({ "detail": "Out of stock" }),
    });
    let storefront = TestStorefront::start(&backend.url()).await;
    storefront.post("/cart/add", &[("product_id", "1")]).await;
    let key = storefront.idempotency_key("/products/neon-cap").await;

    let response = storefront
        .post("/products/neon-cap/buy", &[("idempotency_key", &key)])
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get("hx-trigger").is_none());

    let fragment = response.text().await.expect("body");
    assert!(fragment.contains("Out of stock"));
    // Failed attempts keep their key so a retry is the same attempt
    assert_eq!(idempotency_key_in(&fragment).as_deref(), Some(key.as_str()));
    assert_eq!(storefront.cart_count().await, "1");
}

#[tokio::test]
async fn test_buy_now_without_string_detail_uses_fallback() {
    let backend = FakeBackend::start(catalog()).await;
    backend.set_reply(CheckoutReply::Reject {
        status: 422,
        body: json!({ "detail": [{ "loc": ["body"], "msg": "field required" }] }),
    });
    let storefront = TestStorefront::start(&backend.url()).await;
    let key = storefront.idempotency_key("/products/neon-cap").await;

    let fragment = storefront
        .post("/products/neon-cap/buy", &[("idempotency_key", &key)])
        .await
        .text()
        .await
        .expect("body");
    assert!(fragment.contains("Erro ao processar compra"));
}

#[tokio::test]
async fn test_buy_now_unreachable_backend() {
    let storefront = TestStorefront::start(UNREACHABLE_BACKEND).await;

    let response = storefront
        .post(
            "/products/neon-cap/buy",
            &[("idempotency_key", "6f1c2b1e-8d1f-4a56-9a3e-2f0b9d8c7a65")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_replayed_confirmed_attempt_is_not_resubmitted() {
    let backend = FakeBackend::start(catalog()).await;
    let storefront = TestStorefront::start(&backend.url()).await;
    let key = storefront.idempotency_key("/products/neon-cap").await;

    for _ in 0..2 {
        let fragment = storefront
            .post("/products/neon-cap/buy", &[("idempotency_key", &key)])
            .await
            .text()
            .await
            .expect("body");
        assert!(fragment.contains("Pedido #42"));
    }

    assert_eq!(backend.checkouts().len(), 1);
}

#[tokio::test]
async fn test_concurrent_duplicate_submission_is_rejected() {
    let backend = FakeBackend::start(catalog()).await;
    backend.set_delay(Duration::from_millis(300));
    let storefront = TestStorefront::start(&backend.url()).await;
    let key = storefront.idempotency_key("/products/neon-cap").await;

    let form = [("idempotency_key", key.as_str())];
    let (first, second) = tokio::join!(
        storefront.post("/products/neon-cap/buy", &form),
        storefront.post("/products/neon-cap/buy", &form),
    );
    let bodies = [
        first.text().await.expect("body"),
        second.text().await.expect("body"),
    ];

    assert_eq!(backend.checkouts().len(), 1);
    assert_eq!(
        bodies.iter().filter(|b| b.contains("Pedido #42")).count(),
        1
    );
    assert_eq!(
        bodies
            .iter()
            .filter(|b| b.contains("ainda está sendo processado"))
            .count(),
        1
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_same_key_burst_places_one_order() {
    let backend = FakeBackend::start(catalog()).await;
    let storefront = TestStorefront::start(&backend.url()).await;
    let key = storefront.idempotency_key("/products/neon-cap").await;

    let mut submissions = JoinSet::new();
    for _ in 0..16 {
        let client = storefront.client.clone();
        let url = storefront.url("/products/neon-cap/buy");
        let key = key.clone();
        submissions.spawn(async move {
            client
                .post(url)
                .header("HX-Request", "true")
                .form(&[("idempotency_key", key)])
                .send()
                .await
                .expect("POST buy")
                .text()
                .await
                .expect("body")
        });
    }
    while let Some(body) = submissions.join_next().await {
        let body = body.expect("buy task");
        assert!(
            body.contains("Pedido #42") || body.contains("ainda está sendo processado"),
            "unexpected fragment: {body}"
        );
    }

    assert_eq!(backend.checkouts().len(), 1);
}

// ============================================================================
// Whole-cart checkout
// ============================================================================

#[tokio::test]
async fn test_cart_checkout_confirms_and_clears_cart() {
    let backend = FakeBackend::start(catalog()).await;
    let storefront = TestStorefront::start(&backend.url()).await;
    storefront.post("/cart/add", &[("product_id", "1")]).await;
    storefront.post("/cart/add", &[("product_id", "2")]).await;
    let key = storefront.idempotency_key("/cart").await;

    let response = storefront
        .post("/cart/checkout", &[("idempotency_key", &key)])
        .await;
    let trigger = response
        .headers()
        .get("hx-trigger")
        .expect("HX-Trigger")
        .to_str()
        .expect("ascii header")
        .to_string();
    assert!(trigger.contains("order-confirmed"));
    assert!(trigger.contains("cart-updated"));

    let fragment = response.text().await.expect("body");
    assert!(fragment.contains("Pedido #42 confirmado!"));
    assert!(fragment.contains("Seu carrinho está vazio"));
    assert_eq!(storefront.cart_count().await, "0");

    assert_eq!(
        backend.checkouts()[0].body,
        json!({ "items": [
            { "product_id": 1, "quantity": 1 },
            { "product_id": 2, "quantity": 1 }
        ] })
    );
}

#[tokio::test]
async fn test_cart_checkout_failure_keeps_cart() {
    let backend = FakeBackend::start(catalog()).await;
    backend.set_reply(CheckoutReply::Reject {
        status: 400,
        body: json!({ "detail": "Out of stock" }),
    });
    let storefront = TestStorefront::start(&backend.url()).await;
    storefront.post("/cart/add", &[("product_id", "1")]).await;
    let key = storefront.idempotency_key("/cart").await;

    let fragment = storefront
        .post("/cart/checkout", &[("idempotency_key", &key)])
        .await
        .text()
        .await
        .expect("body");
    assert!(fragment.contains("Out of stock"));
    assert!(fragment.contains("NEON CAP"));
    assert_eq!(storefront.cart_count().await, "1");
}

#[tokio::test]
async fn test_empty_cart_checkout_never_reaches_backend() {
    let backend = FakeBackend::start(catalog()).await;
    let storefront = TestStorefront::start(&backend.url()).await;

    let response = storefront
        .post(
            "/cart/checkout",
            &[("idempotency_key", "6f1c2b1e-8d1f-4a56-9a3e-2f0b9d8c7a65")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(backend.checkouts().is_empty());
}

#[tokio::test]
async fn test_replayed_cart_checkout_keeps_items_added_since() {
    let backend = FakeBackend::start(catalog()).await;
    let storefront = TestStorefront::start(&backend.url()).await;
    storefront.post("/cart/add", &[("product_id", "1")]).await;
    let key = storefront.idempotency_key("/cart").await;

    storefront
        .post("/cart/checkout", &[("idempotency_key", &key)])
        .await;
    assert_eq!(storefront.cart_count().await, "0");

    storefront.post("/cart/add", &[("product_id", "2")]).await;
    let response = storefront
        .post("/cart/checkout", &[("idempotency_key", &key)])
        .await;
    let trigger = response
        .headers()
        .get("hx-trigger")
        .expect("HX-Trigger")
        .to_str()
        .expect("ascii header")
        .to_string();
    assert!(trigger.contains("order-confirmed"));
    assert!(!trigger.contains("cart-updated"));

    let fragment = response.text().await.expect("body");
    assert!(fragment.contains("Pedido #42 confirmado!"));
    assert!(fragment.contains("GLOW HOODIE"));
    assert_eq!(storefront.cart_count().await, "1");
    assert_eq!(backend.checkouts().len(), 1);
}
