//! Product catalog with stale-while-revalidate semantics.
//!
//! The listing page is served from an in-memory snapshot of `GET /products`
//! that a background task refreshes on a fixed interval. A failed refresh
//! keeps the previous (stale) snapshot. Individual products resolved by slug
//! are cached with `moka` for one revalidation interval.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use moka::future::Cache;
use neon_merch_core::{Product, ProductId};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, instrument};

use crate::api::{ApiError, BackendClient};

/// Result of resolving a product by slug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProductLookup {
    /// The product exists.
    Found(Product),
    /// The backend says no such product exists. Terminal.
    NotFound,
    /// The backend could not be reached or answered unexpectedly.
    TransientError,
}

/// Point-in-time view of the product list.
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    /// Products in backend order.
    pub products: Vec<Product>,
    /// When the last successful refresh completed.
    pub refreshed_at: Option<DateTime<Utc>>,
    /// Error message of the most recent refresh, if it failed.
    pub last_error: Option<String>,
}

/// Shared product catalog.
#[derive(Clone)]
pub struct Catalog {
    inner: Arc<CatalogInner>,
}

struct CatalogInner {
    client: BackendClient,
    snapshot: RwLock<CatalogSnapshot>,
    by_slug: Cache<String, Product>,
}

impl Catalog {
    /// Create an empty catalog. Call [`Catalog::refresh`] or
    /// [`Catalog::spawn_revalidation`] to populate it.
    #[must_use]
    pub fn new(client: BackendClient, revalidate_interval: Duration) -> Self {
        let by_slug = Cache::builder()
            .max_capacity(1000)
            .time_to_live(revalidate_interval)
            .build();

        Self {
            inner: Arc::new(CatalogInner {
                client,
                snapshot: RwLock::new(CatalogSnapshot::default()),
                by_slug,
            }),
        }
    }

    /// Current snapshot, possibly stale or empty.
    pub async fn snapshot(&self) -> CatalogSnapshot {
        self.inner.snapshot.read().await.clone()
    }

    /// Products from the current snapshot.
    pub async fn products(&self) -> Vec<Product> {
        self.inner.snapshot.read().await.products.clone()
    }

    /// Products from the snapshot, fetching directly once if it is empty.
    ///
    /// Never fails: an unreachable backend yields an empty list.
    pub async fn products_or_fetch(&self) -> Vec<Product> {
        let products = self.products().await;
        if !products.is_empty() {
            return products;
        }

        debug!("Catalog snapshot empty, fetching directly");
        match self.refresh().await {
            Ok(_) => self.products().await,
            Err(e) => {
                tracing::warn!(error = %e, "Fallback product fetch failed");
                Vec::new()
            }
        }
    }

    /// Fetch the product list and replace the snapshot.
    ///
    /// On failure the previous snapshot is kept and the error recorded.
    ///
    /// # Errors
    ///
    /// Returns the backend error if the fetch fails.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<usize, ApiError> {
        match self.inner.client.list_products().await {
            Ok(products) => {
                let count = products.len();
                for product in &products {
                    self.inner
                        .by_slug
                        .insert(product.slug.clone(), product.clone())
                        .await;
                }
                let mut snapshot = self.inner.snapshot.write().await;
                snapshot.products = products;
                snapshot.refreshed_at = Some(Utc::now());
                snapshot.last_error = None;
                debug!(count, "Catalog refreshed");
                Ok(count)
            }
            Err(e) => {
                self.inner.snapshot.write().await.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Whether the most recent refresh succeeded.
    pub async fn is_healthy(&self) -> bool {
        let snapshot = self.inner.snapshot.read().await;
        snapshot.refreshed_at.is_some() && snapshot.last_error.is_none()
    }

    /// Find a product by ID, in the snapshot first and then the backend.
    ///
    /// An ID missing from a successfully fetched list is `NotFound`; a failed
    /// fetch is `TransientError`.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn find_by_id(&self, id: ProductId) -> ProductLookup {
        let find = |products: &[Product]| products.iter().find(|p| p.id == id).cloned();

        if let Some(product) = find(&self.inner.snapshot.read().await.products) {
            return ProductLookup::Found(product);
        }

        match self.inner.client.list_products().await {
            Ok(products) => find(&products).map_or(ProductLookup::NotFound, ProductLookup::Found),
            Err(e) => {
                tracing::warn!(error = %e, "Product lookup by id failed");
                ProductLookup::TransientError
            }
        }
    }

    /// Resolve a product by slug.
    ///
    /// Tries the detail endpoint first. If that fails for any reason other
    /// than not-found, falls back to the snapshot and then the list
    /// endpoint.
    #[instrument(skip(self), fields(slug = %slug))]
    pub async fn lookup(&self, slug: &str) -> ProductLookup {
        if let Some(product) = self.inner.by_slug.get(slug).await {
            debug!("Cache hit for product");
            return ProductLookup::Found(product);
        }

        match self.inner.client.get_product(slug).await {
            Ok(product) => {
                self.inner
                    .by_slug
                    .insert(slug.to_string(), product.clone())
                    .await;
                return ProductLookup::Found(product);
            }
            Err(ApiError::NotFound(_)) => return ProductLookup::NotFound,
            Err(e) => {
                tracing::warn!(error = %e, "Product detail fetch failed, trying catalog");
            }
        }

        let find = |products: &[Product]| products.iter().find(|p| p.slug == slug).cloned();

        if let Some(product) = find(&self.inner.snapshot.read().await.products) {
            return ProductLookup::Found(product);
        }

        match self.inner.client.list_products().await {
            Ok(products) => find(&products).map_or(ProductLookup::NotFound, ProductLookup::Found),
            Err(e) => {
                tracing::warn!(error = %e, "Catalog fallback failed");
                ProductLookup::TransientError
            }
        }
    }

    /// Drop the cached detail entry for `slug` so the next view refetches it.
    pub async fn invalidate(&self, slug: &str) {
        self.inner.by_slug.invalidate(slug).await;
    }

    /// Spawn the background revalidation loop.
    ///
    /// The first refresh happens immediately. The task runs until aborted
    /// or the runtime shuts down.
    #[must_use]
    pub fn spawn_revalidation(&self, interval: Duration) -> JoinHandle<()> {
        let catalog = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = catalog.refresh().await {
                    tracing::warn!(error = %e, "Catalog revalidation failed, serving stale data");
                }
            }
        })
    }
}
