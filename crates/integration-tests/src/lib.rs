//! Integration tests for Orchard.
//!
//! These tests drive the storefront services end to end over the in-memory
//! store, which serializes transactions the same way row locks serialize
//! them in `PostgreSQL`. The `postgres_concurrency` tests repeat the races
//! against a real database and are skipped unless `DATABASE_URL` is set.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p orchard-integration-tests
//! DATABASE_URL=postgres://localhost/postgres cargo test -p orchard-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `checkout_flow` - Worked pricing examples, discount precedence, frozen items
//! - `concurrency` - Stock and coupon limits under concurrent checkouts
//! - `payments` - Confirmation, commissions, cancellation
//! - `notifications` - Stock alerts and order emails
//! - `postgres_concurrency` - The same limits, plus double submits, on `PostgreSQL`

pub mod postgres;

use std::sync::{Arc, Mutex, PoisonError};

use rust_decimal::Decimal;

use orchard_core::cart::CartOwner;
use orchard_core::pricing::Coupon;
use orchard_core::{
    CouponId, DiscountType, OrderStatus, PaymentMethod, ProductId, ShippingAddress, StoreSettings,
    UserRole,
};
use orchard_storefront::db::MemoryStore;
use orchard_storefront::models::CurrentUser;
use orchard_storefront::services::{ItemSummary, Notifier, PlaceOrderRequest};
use orchard_storefront::state::AppState;

/// A notification as the services sent it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    AdminNewOrder { order_number: String },
    OrderPlaced { email: String, order_number: String },
    LowStock { product: String, stock: i32 },
    OutOfStock { product: String },
    StatusChanged { email: String, status: OrderStatus },
}

/// Notifier that remembers every call.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Sent>>,
}

impl RecordingNotifier {
    fn record(&self, sent: Sent) {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(sent);
    }

    /// Everything sent so far, oldest first.
    pub fn sent(&self) -> Vec<Sent> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify_admin_new_order(&self, order_number: &str, _total: Decimal, _customer_name: &str) {
        self.record(Sent::AdminNewOrder {
            order_number: order_number.to_owned(),
        });
    }

    fn notify_customer_order_placed(
        &self,
        email: &str,
        order_number: &str,
        _total: Decimal,
        _method: PaymentMethod,
        _items: &[ItemSummary],
    ) {
        self.record(Sent::OrderPlaced {
            email: email.to_owned(),
            order_number: order_number.to_owned(),
        });
    }

    fn notify_admin_low_stock(&self, product_name: &str, new_stock: i32) {
        self.record(Sent::LowStock {
            product: product_name.to_owned(),
            stock: new_stock,
        });
    }

    fn notify_admin_out_of_stock(&self, product_name: &str) {
        self.record(Sent::OutOfStock {
            product: product_name.to_owned(),
        });
    }

    fn notify_customer_status_changed(&self, email: &str, _order_number: &str, status: OrderStatus) {
        self.record(Sent::StatusChanged {
            email: email.to_owned(),
            status,
        });
    }
}

/// A storefront wired over a fresh in-memory store.
pub struct Shop {
    pub store: MemoryStore,
    pub state: AppState<MemoryStore>,
    pub notifier: Arc<RecordingNotifier>,
}

impl Shop {
    #[must_use]
    pub fn new(settings: StoreSettings) -> Self {
        let store = MemoryStore::new();
        let notifier = Arc::new(RecordingNotifier::default());
        let state = AppState::new(store.clone(), settings, Arc::clone(&notifier) as _, false);
        Self {
            store,
            state,
            notifier,
        }
    }

    /// Register a customer and return their session identity.
    pub async fn customer(&self, email: &str) -> CurrentUser {
        self.user(email, UserRole::Customer).await
    }

    /// Register an admin and return their session identity.
    pub async fn admin(&self) -> CurrentUser {
        self.user("admin@orchard.test", UserRole::Admin).await
    }

    async fn user(&self, email: &str, role: UserRole) -> CurrentUser {
        let name = email.split('@').next().unwrap_or(email).to_owned();
        let id = self.store.seed(|s| s.add_customer(email, &name)).await;
        CurrentUser {
            id,
            email: email.to_owned(),
            name,
            role,
        }
    }

    /// Put `quantity` of `product` in the customer's cart.
    ///
    /// # Panics
    ///
    /// Panics if the cart rejects the item.
    pub async fn fill_cart(&self, customer: &CurrentUser, product: ProductId, quantity: i32) {
        self.state
            .cart()
            .add_item(&CartOwner::User(customer.id), product, None, quantity)
            .await
            .unwrap_or_else(|e| panic!("could not add to cart: {e}"));
    }
}

/// Settings used by the worked examples: 8% tax, $5 flat shipping.
#[must_use]
pub fn example_settings() -> StoreSettings {
    StoreSettings {
        tax_rate: Decimal::from(8),
        shipping_flat_rate: Decimal::from(5),
        ..StoreSettings::default()
    }
}

#[must_use]
pub fn address() -> ShippingAddress {
    ShippingAddress {
        full_name: "Sam Rivera".to_owned(),
        line1: "1 Orchard Way".to_owned(),
        line2: None,
        city: "Portland".to_owned(),
        state: "OR".to_owned(),
        postal_code: "97201".to_owned(),
        country: "US".to_owned(),
        phone: None,
    }
}

/// A Venmo order to the default address.
#[must_use]
pub fn order_request(code: Option<&str>) -> PlaceOrderRequest {
    PlaceOrderRequest {
        shipping_address: address(),
        payment_method: "VENMO".to_owned(),
        discount_code: code.map(str::to_owned),
    }
}

/// An active percentage coupon with no date or minimum constraints.
#[must_use]
pub fn percent_coupon(code: &str, percent: i64, max_uses: Option<i32>) -> Coupon {
    Coupon {
        id: CouponId::new(0),
        code: code.to_owned(),
        discount_type: DiscountType::Percentage,
        discount_value: Decimal::from(percent),
        starts_at: None,
        expires_at: None,
        min_order_amount: None,
        max_uses,
        used_count: 0,
        active: true,
    }
}
