//! Checkout request/response types and the per-attempt purchase state machine.
//!
//! ```text
//! Idle ──begin──▶ Submitting ──finish──▶ Confirmed(order_id)
//!                            └─finish──▶ Failed(message)
//! ```
//!
//! A failed attempt may be retried by the visitor; retrying re-enters
//! `Submitting` with the same idempotency key.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::cart::Cart;
use super::id::{OrderId, ProductId};

/// One line of a checkout request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutItem {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Body of `POST /checkout`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub items: Vec<CheckoutItem>,
}

impl CheckoutRequest {
    /// A "buy now" request: one product, quantity 1.
    #[must_use]
    pub fn single(product_id: ProductId) -> Self {
        Self {
            items: vec![CheckoutItem {
                product_id,
                quantity: 1,
            }],
        }
    }

    /// One line per cart entry, quantity 1 each, in cart order.
    #[must_use]
    pub fn from_cart(cart: &Cart) -> Self {
        Self {
            items: cart
                .iter()
                .map(|item| CheckoutItem {
                    product_id: item.id(),
                    quantity: 1,
                })
                .collect(),
        }
    }

    /// Whether the request has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Interpreted result of a checkout submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutOutcome {
    /// The backend created an order.
    Confirmed { order_id: OrderId },
    /// The submission failed; `message` is safe to show to the visitor.
    Failed { message: String },
}

/// Client-generated key identifying one purchase attempt.
///
/// Sent to the backend as the `Idempotency-Key` header so a resubmitted
/// attempt cannot create a second order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotencyKey(Uuid);

impl IdempotencyKey {
    /// Mint a fresh random key.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for IdempotencyKey {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for IdempotencyKey {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// State of a single purchase attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PurchaseState {
    #[default]
    Idle,
    Submitting,
    Confirmed(OrderId),
    Failed(String),
}

/// Invalid purchase state transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PurchaseStateError {
    #[error("purchase is already being submitted")]
    AlreadySubmitting,

    #[error("purchase was already confirmed as order {0}")]
    AlreadyConfirmed(OrderId),

    #[error("purchase is not being submitted")]
    NotSubmitting,
}

/// A purchase attempt: an idempotency key plus its state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseAttempt {
    key: IdempotencyKey,
    state: PurchaseState,
    replayed: bool,
}

impl PurchaseAttempt {
    /// Start tracking an attempt in the `Idle` state.
    #[must_use]
    pub fn new(key: IdempotencyKey) -> Self {
        Self {
            key,
            state: PurchaseState::Idle,
            replayed: false,
        }
    }

    /// An attempt already confirmed by an earlier submission of `key`.
    ///
    /// No new order is placed for it.
    #[must_use]
    pub const fn replayed(key: IdempotencyKey, order_id: OrderId) -> Self {
        Self {
            key,
            state: PurchaseState::Confirmed(order_id),
            replayed: true,
        }
    }

    /// The attempt's idempotency key.
    #[must_use]
    pub const fn key(&self) -> IdempotencyKey {
        self.key
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> &PurchaseState {
        &self.state
    }

    /// Whether the confirmation came from an earlier submission.
    #[must_use]
    pub const fn is_replay(&self) -> bool {
        self.replayed
    }

    /// Whether a submission is in flight.
    #[must_use]
    pub const fn is_submitting(&self) -> bool {
        matches!(self.state, PurchaseState::Submitting)
    }

    /// Move to `Submitting`.
    ///
    /// # Errors
    ///
    /// Fails if a submission is already in flight or the attempt was confirmed.
    pub fn begin(&mut self) -> Result<(), PurchaseStateError> {
        match &self.state {
            PurchaseState::Submitting => Err(PurchaseStateError::AlreadySubmitting),
            PurchaseState::Confirmed(order_id) => {
                Err(PurchaseStateError::AlreadyConfirmed(*order_id))
            }
            PurchaseState::Idle | PurchaseState::Failed(_) => {
                self.state = PurchaseState::Submitting;
                Ok(())
            }
        }
    }

    /// Record the outcome of the in-flight submission.
    ///
    /// # Errors
    ///
    /// Fails if no submission is in flight.
    pub fn finish(&mut self, outcome: &CheckoutOutcome) -> Result<(), PurchaseStateError> {
        if !self.is_submitting() {
            return Err(PurchaseStateError::NotSubmitting);
        }
        self.state = match outcome {
            CheckoutOutcome::Confirmed { order_id } => PurchaseState::Confirmed(*order_id),
            CheckoutOutcome::Failed { message } => PurchaseState::Failed(message.clone()),
        };
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::product::Product;

    fn product(id: i64) -> Product {
        Product {
            id: ProductId::new(id),
            slug: format!("p{id}"),
            title: format!("P{id}"),
            description: String::new(),
            price_cents: 100,
            stock: 1,
            image_url: None,
        }
    }

    #[test]
    fn test_single_request_wire_format() {
        let request = CheckoutRequest::single(ProductId::new(7));
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "items": [{ "product_id": 7, "quantity": 1 }] })
        );
    }

    #[test]
    fn test_from_cart_keeps_cart_order() {
        let cart: Cart = [product(3), product(1)].into_iter().collect();
        let request = CheckoutRequest::from_cart(&cart);
        let ids: Vec<i64> = request
            .items
            .iter()
            .map(|item| item.product_id.as_i64())
            .collect();
        assert_eq!(ids, vec![3, 1]);
        assert!(request.items.iter().all(|item| item.quantity == 1));
        assert!(CheckoutRequest::from_cart(&Cart::new()).is_empty());
    }

    #[test]
    fn test_attempt_confirmed_path() {
        let mut attempt = PurchaseAttempt::new(IdempotencyKey::new());
        attempt.begin().unwrap();
        assert!(attempt.is_submitting());
        attempt
            .finish(&CheckoutOutcome::Confirmed {
                order_id: OrderId::new(42),
            })
            .unwrap();
        assert_eq!(attempt.state(), &PurchaseState::Confirmed(OrderId::new(42)));
        assert_eq!(
            attempt.begin(),
            Err(PurchaseStateError::AlreadyConfirmed(OrderId::new(42)))
        );
    }

    #[test]
    fn test_replayed_attempt_is_confirmed_without_submitting() {
        let key = IdempotencyKey::new();
        let mut attempt = PurchaseAttempt::replayed(key, OrderId::new(42));
        assert!(attempt.is_replay());
        assert_eq!(attempt.key(), key);
        assert_eq!(attempt.state(), &PurchaseState::Confirmed(OrderId::new(42)));
        assert_eq!(
            attempt.begin(),
            Err(PurchaseStateError::AlreadyConfirmed(OrderId::new(42)))
        );
        assert!(!PurchaseAttempt::new(key).is_replay());
    }

    #[test]
    fn test_attempt_rejects_double_begin() {
        let mut attempt = PurchaseAttempt::new(IdempotencyKey::new());
        attempt.begin().unwrap();
        assert_eq!(attempt.begin(), Err(PurchaseStateError::AlreadySubmitting));
    }

    #[test]
    fn test_attempt_failed_can_retry() {
        let mut attempt = PurchaseAttempt::new(IdempotencyKey::new());
        attempt.begin().unwrap();
        attempt
            .finish(&CheckoutOutcome::Failed {
                message: "Out of stock".to_string(),
            })
            .unwrap();
        assert!(!attempt.is_submitting());
        assert!(attempt.begin().is_ok());
    }

    #[test]
    fn test_finish_without_begin_fails() {
        let mut attempt = PurchaseAttempt::new(IdempotencyKey::new());
        let outcome = CheckoutOutcome::Failed {
            message: String::new(),
        };
        assert_eq!(
            attempt.finish(&outcome),
            Err(PurchaseStateError::NotSubmitting)
        );
    }

    #[test]
    fn test_idempotency_key_parse_round_trip() {
        let key = IdempotencyKey::new();
        let parsed: IdempotencyKey = key.to_string().parse().unwrap();
        assert_eq!(parsed, key);
        assert!("nope".parse::<IdempotencyKey>().is_err());
    }
}
