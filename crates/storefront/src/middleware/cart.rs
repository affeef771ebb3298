//! Cart extractor.
//!
//! Hands each handler its visitor's [`SessionCart`], already rehydrated from
//! the session. Requests that reach a handler without a session (the layer
//! is missing, or the store failed) get an in-memory cart instead of an
//! error.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use crate::cart::{SessionCart, SessionStorage};

/// The visitor's cart store.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(VisitorCart(mut cart): VisitorCart) -> impl IntoResponse {
///     cart.remove(product_id).await;
///     format!("{} items", cart.len())
/// }
/// ```
pub struct VisitorCart(pub SessionCart);

impl<S> FromRequestParts<S> for VisitorCart
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let store = match parts.extensions.get::<Session>() {
            Some(session) => SessionCart::open(SessionStorage::new(session.clone())).await,
            None => {
                tracing::warn!("No session on request, cart will not persist");
                SessionCart::in_memory()
            }
        };

        Ok(Self(store))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;

    #[tokio::test]
    async fn test_missing_session_yields_in_memory_cart() {
        let (mut parts, ()) = Request::builder().uri("/cart").body(()).unwrap().into_parts();
        let VisitorCart(store) = VisitorCart::from_request_parts(&mut parts, &()).await.unwrap();
        assert!(store.is_empty());
        assert!(!store.is_persistent());
    }
}
