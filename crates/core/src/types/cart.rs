//! The visitor cart.
//!
//! A cart is an ordered list of product snapshots with at most one entry per
//! product ID. Insertion order is preserved. The persisted form is a small
//! versioned JSON envelope:
//!
//! ```text
//! {"state":{"items":[<Product>, ...]},"version":0}
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::id::ProductId;
use super::price::Price;
use super::product::Product;

/// Version written into the persisted cart envelope.
pub const CART_STORAGE_VERSION: u32 = 0;

/// Errors decoding a persisted cart.
#[derive(Debug, Error)]
pub enum CartError {
    /// The stored value is not a valid cart envelope.
    #[error("malformed cart data: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The stored value was written by an incompatible version.
    #[error("unsupported cart version {found} (expected {expected})", expected = CART_STORAGE_VERSION)]
    UnsupportedVersion { found: u32 },
}

/// A product held in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartItem(Product);

impl CartItem {
    /// The product snapshot taken when it was added.
    #[must_use]
    pub const fn product(&self) -> &Product {
        &self.0
    }

    /// Product ID of this entry.
    #[must_use]
    pub const fn id(&self) -> ProductId {
        self.0.id
    }

    /// Unit price of this entry.
    #[must_use]
    pub const fn price(&self) -> Price {
        self.0.price()
    }
}

impl From<Product> for CartItem {
    fn from(product: Product) -> Self {
        Self(product)
    }
}

/// Ordered, duplicate-free collection of cart items.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cart {
    items: Vec<CartItem>,
}

#[derive(Serialize, Deserialize)]
struct PersistedCart {
    state: PersistedState,
    version: u32,
}

#[derive(Serialize, Deserialize)]
struct PersistedState {
    items: Vec<CartItem>,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Add a product. Returns `false` if an entry with the same ID exists.
    pub fn add(&mut self, product: Product) -> bool {
        if self.contains(product.id) {
            return false;
        }
        self.items.push(CartItem(product));
        true
    }

    /// Remove the entry for `id`. Returns `false` if there was none.
    pub fn remove(&mut self, id: ProductId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id() != id);
        self.items.len() != before
    }

    /// Remove every entry. Returns `false` if the cart was already empty.
    pub fn clear(&mut self) -> bool {
        let changed = !self.items.is_empty();
        self.items.clear();
        changed
    }

    /// Whether an entry for `id` exists.
    #[must_use]
    pub fn contains(&self, id: ProductId) -> bool {
        self.items.iter().any(|item| item.id() == id)
    }

    /// Entries in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Iterate over entries in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, CartItem> {
        self.items.iter()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the cart has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of unit prices (each entry counts once).
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.items.iter().map(CartItem::price).sum()
    }

    /// Serialize into the persisted envelope.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_persisted(&self) -> Result<String, CartError> {
        let envelope = PersistedCart {
            state: PersistedState {
                items: self.items.clone(),
            },
            version: CART_STORAGE_VERSION,
        };
        Ok(serde_json::to_string(&envelope)?)
    }

    /// Rebuild a cart from its persisted envelope.
    ///
    /// Duplicate IDs in stored data keep their first occurrence.
    ///
    /// # Errors
    ///
    /// Returns an error if the data is malformed or has an unknown version.
    pub fn from_persisted(data: &str) -> Result<Self, CartError> {
        let envelope: PersistedCart = serde_json::from_str(data)?;
        if envelope.version != CART_STORAGE_VERSION {
            return Err(CartError::UnsupportedVersion {
                found: envelope.version,
            });
        }
        Ok(envelope
            .state
            .items
            .into_iter()
            .map(|item| item.0)
            .collect())
    }
}

impl FromIterator<Product> for Cart {
    fn from_iter<I: IntoIterator<Item = Product>>(iter: I) -> Self {
        let mut cart = Self::new();
        for product in iter {
            cart.add(product);
        }
        cart
    }
}

impl<'a> IntoIterator for &'a Cart {
    type Item = &'a CartItem;
    type IntoIter = std::slice::Iter<'a, CartItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product(id: i64, slug: &str, price_cents: i64) -> Product {
        Product {
            id: ProductId::new(id),
            slug: slug.to_string(),
            title: slug.to_uppercase(),
            description: String::new(),
            price_cents,
            stock: 5,
            image_url: None,
        }
    }

    #[test]
    fn test_add_same_id_twice_is_noop() {
        let mut cart = Cart::new();
        assert!(cart.add(product(1, "cap", 1999)));
        assert!(!cart.add(product(1, "cap", 1999)));
        assert_eq!(cart.len(), 1);
    }

    #[test]
    fn test_duplicate_add_keeps_first_snapshot() {
        let mut cart = Cart::new();
        cart.add(product(1, "cap", 1999));
        cart.add(product(1, "cap-renamed", 500));
        assert_eq!(cart.items()[0].product().slug, "cap");
        assert_eq!(cart.subtotal().minor_units(), 1999);
    }

    #[test]
    fn test_remove_missing_id_is_noop() {
        let mut cart = Cart::new();
        cart.add(product(1, "cap", 1999));
        assert!(!cart.remove(ProductId::new(99)));
        assert_eq!(cart.len(), 1);
    }

    #[test]
    fn test_remove_preserves_order_of_rest() {
        let mut cart: Cart = [product(1, "a", 1), product(2, "b", 2), product(3, "c", 3)]
            .into_iter()
            .collect();
        assert!(cart.remove(ProductId::new(2)));
        let ids: Vec<i64> = cart.iter().map(|item| item.id().as_i64()).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_clear_reports_change() {
        let mut cart = Cart::new();
        assert!(!cart.clear());
        cart.add(product(1, "cap", 1999));
        assert!(cart.clear());
        assert!(cart.is_empty());
    }

    #[test]
    fn test_persisted_round_trip_preserves_order() {
        let cart: Cart = [product(3, "c", 300), product(1, "a", 100), product(2, "b", 200)]
            .into_iter()
            .collect();
        let stored = cart.to_persisted().unwrap();
        let restored = Cart::from_persisted(&stored).unwrap();
        assert_eq!(restored, cart);
    }

    #[test]
    fn test_persisted_envelope_shape() {
        let cart: Cart = std::iter::once(product(1, "cap", 1999)).collect();
        let value: serde_json::Value =
            serde_json::from_str(&cart.to_persisted().unwrap()).unwrap();
        assert_eq!(value["version"], 0);
        assert_eq!(value["state"]["items"][0]["slug"], "cap");
        assert_eq!(value["state"]["items"][0]["price_cents"], 1999);
    }

    #[test]
    fn test_from_persisted_drops_duplicates() {
        let data = r#"{"state":{"items":[
            {"id":1,"slug":"a","title":"A","price_cents":1},
            {"id":1,"slug":"a2","title":"A2","price_cents":2},
            {"id":2,"slug":"b","title":"B","price_cents":3}
        ]},"version":0}"#;
        let cart = Cart::from_persisted(data).unwrap();
        assert_eq!(cart.len(), 2);
        assert_eq!(cart.items()[0].product().slug, "a");
    }

    #[test]
    fn test_from_persisted_rejects_unknown_version() {
        let data = r#"{"state":{"items":[]},"version":3}"#;
        assert!(matches!(
            Cart::from_persisted(data),
            Err(CartError::UnsupportedVersion { found: 3 })
        ));
    }

    #[test]
    fn test_from_persisted_rejects_garbage() {
        assert!(matches!(
            Cart::from_persisted("not json"),
            Err(CartError::Malformed(_))
        ));
    }
}
