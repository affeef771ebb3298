//! Product records as served by the backend API.

use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::price::Price;

/// A product from the catalog.
///
/// Immutable from the storefront's perspective. Field names follow the
/// backend's JSON (`price_cents`, `image_url`) so the same type is used for
/// API responses and for the persisted cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Backend primary key.
    pub id: ProductId,
    /// URL-safe unique identifier used in product paths.
    pub slug: String,
    /// Display title.
    pub title: String,
    /// Long-form description.
    #[serde(default)]
    pub description: String,
    /// Price in minor currency units.
    pub price_cents: i64,
    /// Units available. Zero or negative means sold out.
    #[serde(default)]
    pub stock: i64,
    /// Optional image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Product {
    /// Unit price.
    #[must_use]
    pub const fn price(&self) -> Price {
        Price::from_minor_units(self.price_cents)
    }

    /// Whether the product can currently be purchased.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        self.stock > 0
    }
}
