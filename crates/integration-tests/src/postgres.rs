//! A storefront over a throwaway `PostgreSQL` database.
//!
//! `DATABASE_URL` names a server the tests may create databases on. Each
//! [`PgShop`] migrates a database of its own and drops it on [`PgShop::close`].

use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use uuid::Uuid;

use orchard_core::cart::CartOwner;
use orchard_core::{ProductId, StoreSettings, UserId, UserRole};
use orchard_storefront::db::PgStore;
use orchard_storefront::models::CurrentUser;
use orchard_storefront::services::LogNotifier;
use orchard_storefront::state::AppState;

/// A storefront wired over its own migrated database.
pub struct PgShop {
    pub pool: PgPool,
    pub state: AppState<PgStore>,
    server: PgPool,
    database: String,
}

impl PgShop {
    /// Create and migrate a fresh database, or `None` without `DATABASE_URL`.
    ///
    /// # Panics
    ///
    /// Panics if the server is unreachable or the migrations fail.
    pub async fn connect() -> Option<Self> {
        let url = std::env::var("DATABASE_URL").ok()?;
        let options = PgConnectOptions::from_str(&url)
            .unwrap_or_else(|e| panic!("invalid DATABASE_URL: {e}"));

        let server = PgPoolOptions::new()
            .max_connections(1)
            .connect_with(options.clone())
            .await
            .unwrap_or_else(|e| panic!("could not reach the database server: {e}"));

        let database = format!("orchard_test_{}", Uuid::new_v4().simple());
        sqlx::query(&format!(r#"CREATE DATABASE "{database}""#))
            .execute(&server)
            .await
            .unwrap_or_else(|e| panic!("could not create {database}: {e}"));

        let pool = PgPoolOptions::new()
            .max_connections(16)
            .connect_with(options.database(&database))
            .await
            .unwrap_or_else(|e| panic!("could not connect to {database}: {e}"));
        sqlx::migrate!("../storefront/migrations")
            .run(&pool)
            .await
            .unwrap_or_else(|e| panic!("could not migrate {database}: {e}"));

        let state = AppState::new(
            PgStore::new(pool.clone()),
            StoreSettings::default(),
            Arc::new(LogNotifier),
            false,
        );
        Some(Self {
            pool,
            state,
            server,
            database,
        })
    }

    /// Close every connection and drop the database.
    pub async fn close(self) {
        self.pool.close().await;
        let dropped = sqlx::query(&format!(r#"DROP DATABASE IF EXISTS "{}""#, self.database))
            .execute(&self.server)
            .await;
        if let Err(e) = dropped {
            tracing::warn!(database = %self.database, error = %e, "Could not drop test database");
        }
    }

    /// Register a customer and return their session identity.
    ///
    /// # Panics
    ///
    /// Panics if the insert fails.
    pub async fn customer(&self, email: &str) -> CurrentUser {
        let name = email.split('@').next().unwrap_or(email).to_owned();
        let id: i32 =
            sqlx::query_scalar("INSERT INTO users (email, name) VALUES ($1, $2) RETURNING id")
                .bind(email)
                .bind(&name)
                .fetch_one(&self.pool)
                .await
                .unwrap_or_else(|e| panic!("could not add customer: {e}"));
        CurrentUser {
            id: UserId::new(id),
            email: email.to_owned(),
            name,
            role: UserRole::Customer,
        }
    }

    /// Add an active product without variants.
    ///
    /// # Panics
    ///
    /// Panics if the insert fails.
    pub async fn product(&self, name: &str, price: Decimal, stock: i32) -> ProductId {
        let id: i32 = sqlx::query_scalar(
            "INSERT INTO products (name, price, stock) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(name)
        .bind(price)
        .bind(stock)
        .fetch_one(&self.pool)
        .await
        .unwrap_or_else(|e| panic!("could not add product: {e}"));
        ProductId::new(id)
    }

    /// Add an active percentage coupon with no date or minimum constraints.
    ///
    /// # Panics
    ///
    /// Panics if the insert fails.
    pub async fn percent_coupon(&self, code: &str, percent: i64, max_uses: Option<i32>) {
        sqlx::query(
            "INSERT INTO coupons (code, discount_type, discount_value, max_uses) \
             VALUES ($1, 'PERCENTAGE', $2, $3)",
        )
        .bind(code)
        .bind(Decimal::from(percent))
        .bind(max_uses)
        .execute(&self.pool)
        .await
        .unwrap_or_else(|e| panic!("could not add coupon: {e}"));
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

    /// # Panics
    ///
    /// Panics if the query fails.
    pub async fn stock(&self, product: ProductId) -> i32 {
        sqlx::query_scalar("SELECT stock FROM products WHERE id = $1")
            .bind(product.as_i32())
            .fetch_one(&self.pool)
            .await
            .unwrap_or_else(|e| panic!("could not read stock: {e}"))
    }

    /// Rows in `orders` and `payments`.
    ///
    /// # Panics
    ///
    /// Panics if the query fails.
    pub async fn orders_and_payments(&self) -> (i64, i64) {
        sqlx::query_as(
            "SELECT (SELECT COUNT(*) FROM orders), (SELECT COUNT(*) FROM payments)",
        )
        .fetch_one(&self.pool)
        .await
        .unwrap_or_else(|e| panic!("could not count orders: {e}"))
    }

    /// # Panics
    ///
    /// Panics if the coupon is missing.
    pub async fn coupon_uses(&self, code: &str) -> i32 {
        sqlx::query_scalar("SELECT used_count FROM coupons WHERE code = $1")
            .bind(code)
            .fetch_one(&self.pool)
            .await
            .unwrap_or_else(|e| panic!("could not read coupon: {e}"))
    }
}
