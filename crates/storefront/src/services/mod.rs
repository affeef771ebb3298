//! Business logic services for storefront.
//!
//! # Services
//!
//! - `checkout` - Purchase submission with idempotency and duplicate guarding

pub mod checkout;

pub use checkout::{
    CheckoutError, CheckoutService, FALLBACK_FAILURE_MESSAGE, confirmation_message,
    failure_message,
};
