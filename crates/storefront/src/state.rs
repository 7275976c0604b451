//! Application state shared across handlers.

use std::sync::Arc;

use orchard_core::StoreSettings;

use crate::db::{PgStore, Store};
use crate::services::{
    CartService, CheckoutService, CommissionService, Notifier, OrderService, PaymentService,
};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and holds one instance of each
/// service, all sharing the same store.
pub struct AppState<S: Store = PgStore> {
    inner: Arc<AppStateInner<S>>,
}

impl<S: Store> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct AppStateInner<S: Store> {
    store: Arc<S>,
    cart: CartService<S>,
    checkout: CheckoutService<S>,
    payments: PaymentService<S>,
    commissions: CommissionService<S>,
    orders: OrderService<S>,
    secure_cookies: bool,
}

impl<S: Store> AppState<S> {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `store` - Persistence backend
    /// * `settings` - Store settings, loaded once at start-up
    /// * `notifier` - Where order and stock notifications go
    /// * `secure_cookies` - Mark shopper cookies `Secure` (HTTPS deployments)
    #[must_use]
    pub fn new(
        store: S,
        settings: StoreSettings,
        notifier: Arc<dyn Notifier>,
        secure_cookies: bool,
    ) -> Self {
        let store = Arc::new(store);

        Self {
            inner: Arc::new(AppStateInner {
                cart: CartService::new(Arc::clone(&store)),
                checkout: CheckoutService::new(
                    Arc::clone(&store),
                    settings.clone(),
                    Arc::clone(&notifier),
                ),
                payments: PaymentService::new(Arc::clone(&store), settings, notifier),
                commissions: CommissionService::new(Arc::clone(&store)),
                orders: OrderService::new(Arc::clone(&store)),
                store,
                secure_cookies,
            }),
        }
    }

    /// Get a reference to the store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.inner.store
    }

    #[must_use]
    pub fn cart(&self) -> &CartService<S> {
        &self.inner.cart
    }

    #[must_use]
    pub fn checkout(&self) -> &CheckoutService<S> {
        &self.inner.checkout
    }

    #[must_use]
    pub fn payments(&self) -> &PaymentService<S> {
        &self.inner.payments
    }

    #[must_use]
    pub fn commissions(&self) -> &CommissionService<S> {
        &self.inner.commissions
    }

    #[must_use]
    pub fn orders(&self) -> &OrderService<S> {
        &self.inner.orders
    }

    /// Whether shopper cookies carry the `Secure` attribute.
    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.inner.secure_cookies
    }
}
