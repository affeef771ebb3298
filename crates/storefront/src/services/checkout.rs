//! Checkout submission.
//!
//! Wraps the single `POST /checkout` call with the purchase-attempt rules:
//!
//! - every attempt carries an [`IdempotencyKey`] sent to the backend;
//! - a key already being submitted is rejected without a second call;
//! - a key already confirmed returns its original order without a call;
//! - a failed attempt may be resubmitted with the same key.
//!
//! Nothing is retried automatically.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use moka::future::Cache;
use neon_merch_core::{CheckoutOutcome, CheckoutRequest, IdempotencyKey, OrderId, PurchaseAttempt};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::api::{ApiError, BackendClient};

/// Shown when the backend gives no usable reason for a failure.
pub const FALLBACK_FAILURE_MESSAGE: &str = "Erro ao processar compra";

/// How long a confirmed key is remembered.
const CONFIRMED_TTL: Duration = Duration::from_secs(10 * 60);

/// Confirmation text shown to the visitor.
#[must_use]
pub fn confirmation_message(order_id: OrderId) -> String {
    format!("Pedido #{order_id} confirmado! Enviamos um email.")
}

/// Visitor-facing text for a failed submission.
#[must_use]
pub fn failure_message(error: &ApiError) -> String {
    error
        .detail()
        .map_or_else(|| FALLBACK_FAILURE_MESSAGE.to_string(), String::from)
}

/// Reasons a submission was not sent at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutError {
    /// The same attempt is still waiting on the backend.
    #[error("Seu pedido ainda está sendo processado")]
    InFlight,

    /// There is nothing to buy.
    #[error("Seu carrinho está vazio")]
    EmptyCart,
}

/// Submits checkouts and tracks purchase attempts across requests.
#[derive(Clone)]
pub struct CheckoutService {
    inner: Arc<CheckoutServiceInner>,
}

struct CheckoutServiceInner {
    client: BackendClient,
    in_flight: InFlight,
    confirmed: Cache<IdempotencyKey, OrderId>,
}

impl CheckoutService {
    /// Create a checkout service over `client`.
    #[must_use]
    pub fn new(client: BackendClient) -> Self {
        let confirmed = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(CONFIRMED_TTL)
            .build();

        Self {
            inner: Arc::new(CheckoutServiceInner {
                client,
                in_flight: InFlight::default(),
                confirmed,
            }),
        }
    }

    /// Whether an attempt with `key` is currently being submitted.
    #[must_use]
    pub fn is_in_flight(&self, key: IdempotencyKey) -> bool {
        self.inner.in_flight.contains(key)
    }

    /// Order previously confirmed for `key`, if remembered.
    pub async fn confirmed_order(&self, key: IdempotencyKey) -> Option<OrderId> {
        self.inner.confirmed.get(&key).await
    }

    /// Submit `request` as the attempt identified by `key`.
    ///
    /// The returned attempt is `Confirmed` or `Failed`, never `Submitting`.
    /// Backend failures are part of the attempt, not errors. A key already
    /// confirmed yields a replayed attempt and no backend call.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::InFlight` if the same key is being submitted
    /// by another request, or `CheckoutError::EmptyCart` for an empty request.
    #[instrument(skip(self, request), fields(idempotency_key = %key, items = request.items.len()))]
    pub async fn submit(
        &self,
        key: IdempotencyKey,
        request: &CheckoutRequest,
    ) -> Result<PurchaseAttempt, CheckoutError> {
        if request.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        if let Some(order_id) = self.confirmed_order(key).await {
            debug!(order_id = %order_id, "Replayed confirmed attempt");
            return Ok(PurchaseAttempt::replayed(key, order_id));
        }

        let Some(_guard) = self.inner.in_flight.try_acquire(key) else {
            warn!("Duplicate submission while in flight");
            return Err(CheckoutError::InFlight);
        };

        // A submission holding the key may have confirmed and released it
        // since the lookup above.
        if let Some(order_id) = self.confirmed_order(key).await {
            debug!(order_id = %order_id, "Replayed attempt confirmed meanwhile");
            return Ok(PurchaseAttempt::replayed(key, order_id));
        }

        let outcome = match self.inner.client.checkout(request, key).await {
            Ok(response) => {
                self.inner.confirmed.insert(key, response.order_id).await;
                info!(order_id = %response.order_id, "Order confirmed");
                CheckoutOutcome::Confirmed {
                    order_id: response.order_id,
                }
            }
            Err(e) => {
                warn!(error = %e, transient = e.is_transient(), "Checkout failed");
                CheckoutOutcome::Failed {
                    message: failure_message(&e),
                }
            }
        };

        let mut attempt = PurchaseAttempt::new(key);
        settle(&mut attempt, &outcome);
        Ok(attempt)
    }
}

/// Drive a fresh attempt through `Submitting` to the given outcome.
fn settle(attempt: &mut PurchaseAttempt, outcome: &CheckoutOutcome) {
    if let Err(e) = attempt.begin().and_then(|()| attempt.finish(outcome)) {
        warn!(error = %e, "Unexpected purchase state transition");
    }
}

// =============================================================================
// In-flight registry
// =============================================================================

/// Keys currently being submitted.
#[derive(Clone, Default)]
struct InFlight(Arc<Mutex<HashSet<IdempotencyKey>>>);

impl InFlight {
    fn try_acquire(&self, key: IdempotencyKey) -> Option<InFlightGuard> {
        let inserted = self
            .0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key);
        inserted.then(|| InFlightGuard {
            registry: self.clone(),
            key,
        })
    }

    fn contains(&self, key: IdempotencyKey) -> bool {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&key)
    }
}

/// Releases its key when dropped, including when the request is cancelled.
struct InFlightGuard {
    registry: InFlight,
    key: IdempotencyKey,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.registry
            .0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}
