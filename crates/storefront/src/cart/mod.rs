//! The cart store.
//!
//! Wraps a [`Cart`] and writes it to visitor-local storage after every
//! change, under the fixed key [`CART_STORAGE_KEY`]. Loading is deferred:
//! a new store starts empty and only reads storage when
//! [`CartStore::rehydrate`] is called.
//!
//! Storage failures are never surfaced. The first failing load or save
//! detaches the store from its storage and it keeps working in memory.

pub mod storage;

use neon_merch_core::{Cart, CartItem, Price, Product, ProductId};
use tracing::{debug, warn};

pub use storage::{CartStorage, MemoryStorage, SessionStorage, StorageError};

/// Storage key holding the serialized cart.
pub const CART_STORAGE_KEY: &str = "neon-merch-cart";

/// Cart state plus its persistence.
#[derive(Debug)]
pub struct CartStore<S> {
    cart: Cart,
    storage: Option<S>,
    hydrated: bool,
}

/// Cart store persisted in the visitor's session.
pub type SessionCart = CartStore<SessionStorage>;

impl<S: CartStorage> CartStore<S> {
    /// Create an empty, not-yet-hydrated store over `storage`.
    #[must_use]
    pub const fn new(storage: S) -> Self {
        Self {
            cart: Cart::new(),
            storage: Some(storage),
            hydrated: false,
        }
    }

    /// Create a store with no storage at all.
    #[must_use]
    pub const fn in_memory() -> Self {
        Self {
            cart: Cart::new(),
            storage: None,
            hydrated: true,
        }
    }

    /// Create a store over `storage` and rehydrate it immediately.
    pub async fn open(storage: S) -> Self {
        let mut store = Self::new(storage);
        store.rehydrate().await;
        store
    }

    /// Load the persisted cart, replacing the in-memory one.
    ///
    /// Malformed or incompatible data yields an empty cart; unavailable
    /// storage detaches the store.
    pub async fn rehydrate(&mut self) -> &Cart {
        if let Some(storage) = &self.storage {
            match storage.load(CART_STORAGE_KEY).await {
                Ok(Some(data)) => match Cart::from_persisted(&data) {
                    Ok(cart) => {
                        debug!(items = cart.len(), "Cart rehydrated");
                        self.cart = cart;
                    }
                    Err(e) => {
                        warn!(error = %e, "Discarding unreadable persisted cart");
                        self.cart = Cart::new();
                    }
                },
                Ok(None) => self.cart = Cart::new(),
                Err(e) => self.detach(&e),
            }
        }
        self.hydrated = true;
        &self.cart
    }

    /// Whether [`CartStore::rehydrate`] has run.
    #[must_use]
    pub const fn is_hydrated(&self) -> bool {
        self.hydrated
    }

    /// Whether changes are still being persisted.
    #[must_use]
    pub const fn is_persistent(&self) -> bool {
        self.storage.is_some()
    }

    /// Current cart.
    #[must_use]
    pub const fn cart(&self) -> &Cart {
        &self.cart
    }

    /// Entries in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        self.cart.items()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cart.len()
    }

    /// Whether the cart is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cart.is_empty()
    }

    /// Whether an entry for `id` exists.
    #[must_use]
    pub fn contains(&self, id: ProductId) -> bool {
        self.cart.contains(id)
    }

    /// Sum of item prices.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.cart.subtotal()
    }

    /// Add a product unless one with the same ID is already present.
    ///
    /// Returns whether the cart changed.
    pub async fn add(&mut self, product: Product) -> bool {
        let changed = self.cart.add(product);
        if changed {
            self.persist().await;
        }
        changed
    }

    /// Remove the entry for `id` if present.
    ///
    /// Returns whether the cart changed.
    pub async fn remove(&mut self, id: ProductId) -> bool {
        let changed = self.cart.remove(id);
        if changed {
            self.persist().await;
        }
        changed
    }

    /// Empty the cart.
    pub async fn clear(&mut self) {
        if self.cart.clear() {
            self.persist().await;
        }
    }

    async fn persist(&mut self) {
        let Some(storage) = &self.storage else {
            return;
        };

        let data = match self.cart.to_persisted() {
            Ok(data) => data,
            Err(e) => {
                warn!(error = %e, "Failed to serialize cart");
                return;
            }
        };

        if let Err(e) = storage.save(CART_STORAGE_KEY, data).await {
            self.detach(&e);
        }
    }

    fn detach(&mut self, error: &StorageError) {
        warn!(error = %error, "Cart storage unavailable, continuing in memory");
        self.storage = None;
    }
}
