//! Application state shared across handlers.

use std::sync::Arc;

use crate::api::{ApiError, BackendClient};
use crate::catalog::Catalog;
use crate::config::StorefrontConfig;
use crate::middleware::VisitorLocks;
use crate::services::CheckoutService;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the catalog, the checkout service and the per-visitor cart locks.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    catalog: Catalog,
    checkout: CheckoutService,
    visitor_locks: VisitorLocks,
}

impl AppState {
    /// Create a new application state.
    ///
    /// The catalog starts empty; call [`Catalog::spawn_revalidation`] to
    /// populate it.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend HTTP client cannot be built.
    pub fn new(config: StorefrontConfig) -> Result<Self, ApiError> {
        let client = BackendClient::new(&config.api)?;
        let catalog = Catalog::new(client.clone(), config.revalidate_interval);
        let checkout = CheckoutService::new(client);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                catalog,
                checkout,
                visitor_locks: VisitorLocks::new(),
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the product catalog.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    /// Get a reference to the checkout service.
    #[must_use]
    pub fn checkout(&self) -> &CheckoutService {
        &self.inner.checkout
    }

    /// Get a reference to the per-visitor cart locks.
    #[must_use]
    pub fn visitor_locks(&self) -> &VisitorLocks {
        &self.inner.visitor_locks
    }
}
