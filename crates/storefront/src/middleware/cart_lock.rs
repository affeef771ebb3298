//! Per-visitor serialization of cart writes.
//!
//! The session layer loads the visitor's record before the handler runs and
//! writes it back after the response is built. Two cart writes from the same
//! visitor running side by side would each load the same record and the
//! later write-back would drop the earlier change. This middleware sits
//! outside the session layer and holds a per-visitor lock across the whole
//! load, mutate and write-back sequence.
//!
//! Visitors are keyed by their session cookie. A request without one has
//! no session to race on yet and is not locked.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::{Method, header::COOKIE},
    middleware::Next,
    response::Response,
};
use moka::future::Cache;
use tokio::sync::Mutex;
use tower_sessions::cookie::Cookie;
use tracing::debug;

use super::SESSION_COOKIE_NAME;
use crate::state::AppState;

/// Locks for visitors idle longer than this are forgotten.
const LOCK_IDLE_TTL: Duration = Duration::from_secs(30 * 60);

/// One lock per active visitor session.
#[derive(Clone)]
pub struct VisitorLocks {
    locks: Cache<String, Arc<Mutex<()>>>,
}

impl Default for VisitorLocks {
    fn default() -> Self {
        Self::new()
    }
}

impl VisitorLocks {
    /// Create an empty lock table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            locks: Cache::builder()
                .max_capacity(100_000)
                .time_to_idle(LOCK_IDLE_TTL)
                .build(),
        }
    }

    /// The lock for `session_id`, created on first use.
    pub async fn lock_for(&self, session_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .get_with_by_ref(session_id, async { Arc::new(Mutex::new(())) })
            .await
    }
}

/// Whether `request` can change the visitor's cart.
fn writes_cart(request: &Request) -> bool {
    request.method() == Method::POST && request.uri().path().starts_with("/cart/")
}

/// The visitor's session cookie value, if the browser sent one.
fn session_cookie(request: &Request) -> Option<String> {
    request
        .headers()
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == SESSION_COOKIE_NAME)
        .map(|cookie| cookie.value().to_string())
}

/// Middleware serializing cart writes per visitor.
pub async fn cart_lock_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(session_id) = writes_cart(&request)
        .then(|| session_cookie(&request))
        .flatten()
    else {
        return next.run(request).await;
    };

    let lock = state.visitor_locks().lock_for(&session_id).await;
    let _guard = lock.lock().await;
    debug!(path = %request.uri().path(), "Holding visitor cart lock");
    next.run(request).await
}
