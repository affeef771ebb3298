//! Integration tests for the product listing and detail pages.

#![allow(clippy::expect_used)]

use neon_merch_integration_tests::{FakeBackend, TestStorefront, UNREACHABLE_BACKEND, catalog};
use reqwest::StatusCode;

// ============================================================================
// Listing
// ============================================================================

#[tokio::test]
async fn test_listing_shows_products_with_formatted_prices() {
    let backend = FakeBackend::start(catalog()).await;
    let storefront = TestStorefront::start(&backend.url()).await;

    let (status, body) = storefront.get("/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("NEON CAP"));
    assert!(body.contains("R$ 19,99"));
    assert!(body.contains("R$ 159,90"));
    assert!(body.contains("https://via.placeholder.com/400?text=neon-cap"));
    assert!(body.contains("hx-post=\"/cart/add\""));
}

#[tokio::test]
async fn test_listing_degrades_to_empty_state_when_backend_unreachable() {
    let storefront = TestStorefront::start(UNREACHABLE_BACKEND).await;

    let (status, body) = storefront.get("/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Sistemas offline"));
    assert!(body.contains("hx-get=\"/products/grid\""));

    let (status, fragment) = storefront.get("/products/grid").await;
    assert_eq!(status, StatusCode::OK);
    assert!(fragment.contains("Tentar novamente"));
    assert!(!fragment.contains("<html"));
}

#[tokio::test]
async fn test_products_path_redirects_to_listing() {
    let backend = FakeBackend::start(catalog()).await;
    let storefront = TestStorefront::start(&backend.url()).await;

    let (status, body) = storefront.get("/products").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("NEON CAP"));
}

// ============================================================================
// Detail
// ============================================================================

#[tokio::test]
async fn test_detail_shows_stock_and_enabled_purchase() {
    let backend = FakeBackend::start(catalog()).await;
    let storefront = TestStorefront::start(&backend.url()).await;

    let (status, body) = storefront.get("/products/neon-cap").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Em estoque (3)"));
    assert!(body.contains("COMPRAR AGORA"));
    assert!(body.contains("neon-cap description"));
}

#[tokio::test]
async fn test_detail_sold_out_disables_purchase() {
    let backend = FakeBackend::start(catalog()).await;
    let storefront = TestStorefront::start(&backend.url()).await;

    let (status, body) = storefront.get("/products/glow-hoodie").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Esgotado"));
    assert!(body.contains("INDISPONÍVEL"));
    assert!(!body.contains("COMPRAR AGORA"));
}

#[tokio::test]
async fn test_detail_missing_slug_is_not_found() {
    let backend = FakeBackend::start(catalog()).await;
    let storefront = TestStorefront::start(&backend.url()).await;

    let (status, body) = storefront.get("/products/does-not-exist").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("Produto não encontrado"));
}

#[tokio::test]
async fn test_detail_unreachable_backend_is_unavailable_not_missing() {
    let storefront = TestStorefront::start(UNREACHABLE_BACKEND).await;

    let (status, body) = storefront.get("/products/neon-cap").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body.contains("Tentar novamente"));
    assert!(body.contains("href=\"/products/neon-cap\""));
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_readiness_tracks_catalog_refresh() {
    let backend = FakeBackend::start(catalog()).await;
    let healthy = TestStorefront::start(&backend.url()).await;
    assert_eq!(healthy.get("/health/ready").await.0, StatusCode::OK);

    let offline = TestStorefront::start(UNREACHABLE_BACKEND).await;
    assert_eq!(offline.get("/health").await.0, StatusCode::OK);
    assert_eq!(
        offline.get("/health/ready").await.0,
        StatusCode::SERVICE_UNAVAILABLE
    );
}

#[tokio::test]
async fn test_responses_carry_request_id_and_csp() {
    let backend = FakeBackend::start(catalog()).await;
    let storefront = TestStorefront::start(&backend.url()).await;

    let response = storefront
        .client
        .get(storefront.url("/"))
        .header("x-request-id", "test-req-1")
        .send()
        .await
        .expect("GET /");

    let headers = response.headers();
    assert_eq!(headers.get("x-request-id").expect("request id"), "test-req-1");
    assert!(headers.contains_key("content-security-policy"));
}
