//! Persistence for the storefront.
//!
//! # Unit of work
//!
//! Every service operation runs inside one [`StoreTx`] obtained from
//! [`Store::begin`]. Nothing a transaction writes is visible to others until
//! [`StoreTx::commit`]; dropping the transaction or calling
//! [`StoreTx::rollback`] discards it.
//!
//! Two implementations exist:
//!
//! - [`PgStore`] - `PostgreSQL` via sqlx. Stock, coupon, payment and
//!   commission rows are locked with `SELECT ... FOR UPDATE` before they are
//!   checked, and stock and coupon updates are additionally guarded in SQL.
//! - [`MemoryStore`] - in-process state behind a Tokio mutex. Transactions
//!   are serialized and work on a private copy, which gives the same
//!   all-or-nothing visibility. Used by tests and local demos.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p orchard-cli -- migrate
//! ```

pub mod memory;
pub mod postgres;
pub mod settings;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use orchard_core::cart::CartOwner;
use orchard_core::pricing::Coupon;
use orchard_core::{
    AddressId, AffiliateId, CartId, CartItemId, CommissionId, CommissionStatus, CouponId,
    OrderId, OrderStatus, PaymentId, PaymentMethod, ProductId, ShippingAddress, UserId,
    VariantId,
};

use crate::models::{
    Affiliate, Cart, CartItem, CartLine, Commission, Customer, NewCommission, NewOrder, Order,
    OrderItem, Payment, Product, StockTarget, Variant,
};

pub use memory::{FailPoint, MemoryStore};
pub use postgres::PgStore;
pub use settings::{PgSettings, SettingsProvider, StaticSettings, load_store_settings};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate commission).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Source of transactions.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    type Tx: StoreTx;

    /// Start a unit of work.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if no transaction could be opened.
    async fn begin(&self) -> Result<Self::Tx, RepositoryError>;

    /// Cheap liveness probe for readiness checks.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store is unreachable.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// Operations available inside one transaction.
///
/// Methods named `lock_*` take a row lock (Postgres `FOR UPDATE`) held until
/// the transaction ends. Mutating methods never commit on their own.
#[async_trait]
pub trait StoreTx: Send + Sized {
    // -------------------------------------------------------------------------
    // Carts
    // -------------------------------------------------------------------------

    async fn find_cart(&mut self, owner: &CartOwner) -> Result<Option<Cart>, RepositoryError>;

    /// The cart of `owner`, locked so concurrent placements of it serialize.
    async fn lock_cart(&mut self, owner: &CartOwner) -> Result<Option<Cart>, RepositoryError>;

    async fn create_cart(&mut self, owner: &CartOwner) -> Result<Cart, RepositoryError>;

    async fn delete_cart(&mut self, cart_id: CartId) -> Result<(), RepositoryError>;

    async fn cart_items(&mut self, cart_id: CartId) -> Result<Vec<CartItem>, RepositoryError>;

    /// The line for `(product, variant)` in a cart, if any.
    async fn find_cart_item(
        &mut self,
        cart_id: CartId,
        product_id: ProductId,
        variant_id: Option<VariantId>,
    ) -> Result<Option<CartItem>, RepositoryError>;

    async fn insert_cart_item(
        &mut self,
        cart_id: CartId,
        product_id: ProductId,
        variant_id: Option<VariantId>,
        quantity: i32,
    ) -> Result<CartItem, RepositoryError>;

    async fn set_cart_item_quantity(
        &mut self,
        item_id: CartItemId,
        quantity: i32,
    ) -> Result<(), RepositoryError>;

    async fn delete_cart_item(&mut self, item_id: CartItemId) -> Result<(), RepositoryError>;

    /// Remove every item from a cart, keeping the cart itself.
    async fn clear_cart(&mut self, cart_id: CartId) -> Result<(), RepositoryError>;

    /// Cart items joined with current catalog price, name and stock.
    async fn cart_lines(&mut self, cart_id: CartId) -> Result<Vec<CartLine>, RepositoryError>;

    // -------------------------------------------------------------------------
    // Catalog
    // -------------------------------------------------------------------------

    async fn get_product(&mut self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    async fn get_variant(&mut self, id: VariantId) -> Result<Option<Variant>, RepositoryError>;

    /// Lock a stock counter and return its current value.
    async fn lock_stock(&mut self, target: StockTarget) -> Result<Option<i32>, RepositoryError>;

    /// Subtract `quantity` from a stock counter. Returns `false`, changing
    /// nothing, if the counter would go negative.
    async fn decrement_stock(
        &mut self,
        target: StockTarget,
        quantity: i32,
    ) -> Result<bool, RepositoryError>;

    /// Every non-null category commission override attached to any of
    /// `product_ids`.
    async fn category_commission_rates(
        &mut self,
        product_ids: &[ProductId],
    ) -> Result<Vec<Decimal>, RepositoryError>;

    // -------------------------------------------------------------------------
    // Discounts
    // -------------------------------------------------------------------------

    /// Coupon by uppercased code, locked for the rest of the transaction.
    async fn lock_coupon_by_code(&mut self, code: &str)
    -> Result<Option<Coupon>, RepositoryError>;

    /// Count one use of a coupon. Returns `false`, changing nothing, if the
    /// coupon is already at its cap.
    async fn increment_coupon_usage(&mut self, id: CouponId) -> Result<bool, RepositoryError>;

    /// Approved affiliate by uppercased referral code.
    async fn find_approved_affiliate_by_code(
        &mut self,
        code: &str,
    ) -> Result<Option<Affiliate>, RepositoryError>;

    async fn get_affiliate(&mut self, id: AffiliateId)
    -> Result<Option<Affiliate>, RepositoryError>;

    // -------------------------------------------------------------------------
    // Orders
    // -------------------------------------------------------------------------

    async fn get_customer(&mut self, id: UserId) -> Result<Option<Customer>, RepositoryError>;

    async fn insert_address(
        &mut self,
        user_id: UserId,
        address: &ShippingAddress,
    ) -> Result<AddressId, RepositoryError>;

    /// Insert an order (status `AWAITING_PAYMENT`) and its items.
    async fn insert_order(&mut self, order: &NewOrder) -> Result<Order, RepositoryError>;

    async fn get_order(&mut self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    async fn lock_order(&mut self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    async fn order_items(&mut self, id: OrderId) -> Result<Vec<OrderItem>, RepositoryError>;

    /// A user's orders, newest first.
    async fn orders_for_user(&mut self, user_id: UserId) -> Result<Vec<Order>, RepositoryError>;

    async fn set_order_status(
        &mut self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<(), RepositoryError>;

    // -------------------------------------------------------------------------
    // Payments
    // -------------------------------------------------------------------------

    /// Insert the `PENDING` payment of an order.
    async fn insert_payment(
        &mut self,
        order_id: OrderId,
        method: PaymentMethod,
        amount: Decimal,
    ) -> Result<Payment, RepositoryError>;

    async fn payment_for_order(
        &mut self,
        order_id: OrderId,
    ) -> Result<Option<Payment>, RepositoryError>;

    async fn lock_payment_for_order(
        &mut self,
        order_id: OrderId,
    ) -> Result<Option<Payment>, RepositoryError>;

    /// `PENDING -> SUBMITTED` with the customer's transaction reference.
    async fn mark_payment_submitted(
        &mut self,
        id: PaymentId,
        transaction_ref: &str,
    ) -> Result<(), RepositoryError>;

    /// Any state `-> CONFIRMED`, recording who confirmed and when.
    async fn mark_payment_confirmed(
        &mut self,
        id: PaymentId,
        confirmed_by: UserId,
        confirmed_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;

    // -------------------------------------------------------------------------
    // Commissions
    // -------------------------------------------------------------------------

    /// Insert a `PENDING` commission.
    ///
    /// Returns `RepositoryError::Conflict` if one already exists for the same
    /// `(affiliate, order, type)`.
    async fn insert_commission(
        &mut self,
        commission: &NewCommission,
    ) -> Result<Commission, RepositoryError>;

    async fn commissions_for_order(
        &mut self,
        order_id: OrderId,
    ) -> Result<Vec<Commission>, RepositoryError>;

    async fn lock_commission(
        &mut self,
        id: CommissionId,
    ) -> Result<Option<Commission>, RepositoryError>;

    async fn set_commission_status(
        &mut self,
        id: CommissionId,
        status: CommissionStatus,
    ) -> Result<(), RepositoryError>;

    // -------------------------------------------------------------------------
    // Transaction control
    // -------------------------------------------------------------------------

    /// Publish every write made in this transaction.
    async fn commit(self) -> Result<(), RepositoryError>;

    /// Discard every write made in this transaction.
    async fn rollback(self) -> Result<(), RepositoryError>;
}
