//! Core types for Neon Merch.
//!
//! This module provides type-safe wrappers for the storefront's domain concepts.

pub mod cart;
pub mod checkout;
pub mod id;
pub mod price;
pub mod product;

pub use cart::{CART_STORAGE_VERSION, Cart, CartError, CartItem};
pub use checkout::{
    CheckoutItem, CheckoutOutcome, CheckoutRequest, IdempotencyKey, PurchaseAttempt,
    PurchaseState, PurchaseStateError,
};
pub use id::*;
pub use price::{Locale, LocaleError, Price};
pub use product::Product;
