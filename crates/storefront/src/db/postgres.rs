//! `PostgreSQL` implementation of the store.
//!
//! Queries are built at runtime with `query_as`; rows that don't map one to
//! one onto a model go through a private `*Row` struct.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, Transaction};

use orchard_core::cart::CartOwner;
use orchard_core::pricing::Coupon;
use orchard_core::{
    AddressId, AffiliateId, CartId, CartItemId, CommissionId, CommissionStatus, CouponId,
    DiscountType, OrderId, OrderStatus, PaymentId, PaymentMethod, ProductId, ShippingAddress,
    UserId, VariantId,
};

use super::{RepositoryError, Store, StoreTx};
use crate::models::{
    Affiliate, Cart, CartItem, CartLine, Commission, Customer, NewCommission, NewOrder, Order,
    OrderItem, Payment, Product, StockTarget, Variant,
};

/// Store backed by a `PostgreSQL` pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    type Tx = PgTx;

    async fn begin(&self) -> Result<PgTx, RepositoryError> {
        Ok(PgTx {
            tx: self.pool.begin().await?,
        })
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// One open `PostgreSQL` transaction. Rolls back when dropped uncommitted.
pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

// =============================================================================
// Row types
// =============================================================================

#[derive(FromRow)]
struct CartRow {
    id: CartId,
    user_id: Option<UserId>,
    guest_token: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CartRow> for Cart {
    type Error = RepositoryError;

    fn try_from(row: CartRow) -> Result<Self, Self::Error> {
        let owner = match (row.user_id, row.guest_token) {
            (Some(user_id), None) => CartOwner::User(user_id),
            (None, Some(token)) => CartOwner::Guest(token),
            _ => {
                return Err(RepositoryError::DataCorruption(format!(
                    "cart {} must have exactly one owner",
                    row.id
                )));
            }
        };
        Ok(Self {
            id: row.id,
            owner,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct CouponRow {
    id: CouponId,
    code: String,
    discount_type: DiscountType,
    discount_value: Decimal,
    starts_at: Option<DateTime<Utc>>,
    expires_at: Option<DateTime<Utc>>,
    min_order_amount: Option<Decimal>,
    max_uses: Option<i32>,
    used_count: i32,
    active: bool,
}

impl From<CouponRow> for Coupon {
    fn from(row: CouponRow) -> Self {
        Self {
            id: row.id,
            code: row.code,
            discount_type: row.discount_type,
            discount_value: row.discount_value,
            starts_at: row.starts_at,
            expires_at: row.expires_at,
            min_order_amount: row.min_order_amount,
            max_uses: row.max_uses,
            used_count: row.used_count,
            active: row.active,
        }
    }
}

#[derive(FromRow)]
struct OrderRow {
    id: OrderId,
    order_number: String,
    user_id: UserId,
    status: OrderStatus,
    subtotal: Decimal,
    discount_amount: Decimal,
    tax: Decimal,
    shipping_cost: Decimal,
    total: Decimal,
    affiliate_id: Option<AffiliateId>,
    coupon_id: Option<CouponId>,
    applied_code: Option<String>,
    address_id: AddressId,
    shipping_address: Json<ShippingAddress>,
    payment_method: PaymentMethod,
    admin_notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: row.id,
            order_number: row.order_number,
            user_id: row.user_id,
            status: row.status,
            subtotal: row.subtotal,
            discount_amount: row.discount_amount,
            tax: row.tax,
            shipping_cost: row.shipping_cost,
            total: row.total,
            affiliate_id: row.affiliate_id,
            coupon_id: row.coupon_id,
            applied_code: row.applied_code,
            address_id: row.address_id,
            shipping_address: row.shipping_address.0,
            payment_method: row.payment_method,
            admin_notes: row.admin_notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl PgTx {
    /// The cart of `owner`, with `lock` appended to the query.
    async fn select_cart(
        &mut self,
        owner: &CartOwner,
        lock: &str,
    ) -> Result<Option<Cart>, RepositoryError> {
        let column = match owner {
            CartOwner::User(_) => "user_id",
            CartOwner::Guest(_) => "guest_token",
        };
        let sql = format!(
            "SELECT id, user_id, guest_token, created_at, updated_at \
             FROM carts WHERE {column} = $1 {lock}"
        );

        let query = sqlx::query_as::<_, CartRow>(&sql);
        let query = match owner {
            CartOwner::User(id) => query.bind(*id),
            CartOwner::Guest(token) => query.bind(token.as_str()),
        };
        let row = query.fetch_optional(&mut *self.tx).await?;

        row.map(Cart::try_from).transpose()
    }
}

/// Map a unique violation to `Conflict`, anything else to `Database`.
fn conflict_on_unique(e: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("{what} already exists"));
    }
    RepositoryError::Database(e)
}

// =============================================================================
// Transaction operations
// =============================================================================

#[async_trait]
impl StoreTx for PgTx {
    async fn find_cart(&mut self, owner: &CartOwner) -> Result<Option<Cart>, RepositoryError> {
        self.select_cart(owner, "").await
    }

    async fn lock_cart(&mut self, owner: &CartOwner) -> Result<Option<Cart>, RepositoryError> {
        self.select_cart(owner, "FOR UPDATE").await
    }

    async fn create_cart(&mut self, owner: &CartOwner) -> Result<Cart, RepositoryError> {
        let (user_id, guest_token) = match owner {
            CartOwner::User(id) => (Some(*id), None),
            CartOwner::Guest(token) => (None, Some(token.as_str())),
        };

        let row = sqlx::query_as::<_, CartRow>(
            r"
            INSERT INTO carts (user_id, guest_token)
            VALUES ($1, $2)
            RETURNING id, user_id, guest_token, created_at, updated_at
            ",
        )
        .bind(user_id)
        .bind(guest_token)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| conflict_on_unique(e, "cart"))?;

        Cart::try_from(row)
    }

    async fn delete_cart(&mut self, cart_id: CartId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM carts WHERE id = $1")
            .bind(cart_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn cart_items(&mut self, cart_id: CartId) -> Result<Vec<CartItem>, RepositoryError> {
        let items = sqlx::query_as::<_, CartItem>(
            r"
            SELECT id, cart_id, product_id, variant_id, quantity
            FROM cart_items
            WHERE cart_id = $1
            ORDER BY id
            ",
        )
        .bind(cart_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(items)
    }

    async fn find_cart_item(
        &mut self,
        cart_id: CartId,
        product_id: ProductId,
        variant_id: Option<VariantId>,
    ) -> Result<Option<CartItem>, RepositoryError> {
        let item = sqlx::query_as::<_, CartItem>(
            r"
            SELECT id, cart_id, product_id, variant_id, quantity
            FROM cart_items
            WHERE cart_id = $1 AND product_id = $2 AND variant_id IS NOT DISTINCT FROM $3
            ",
        )
        .bind(cart_id)
        .bind(product_id)
        .bind(variant_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(item)
    }

    async fn insert_cart_item(
        &mut self,
        cart_id: CartId,
        product_id: ProductId,
        variant_id: Option<VariantId>,
        quantity: i32,
    ) -> Result<CartItem, RepositoryError> {
        let item = sqlx::query_as::<_, CartItem>(
            r"
            INSERT INTO cart_items (cart_id, product_id, variant_id, quantity)
            VALUES ($1, $2, $3, $4)
            RETURNING id, cart_id, product_id, variant_id, quantity
            ",
        )
        .bind(cart_id)
        .bind(product_id)
        .bind(variant_id)
        .bind(quantity)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| conflict_on_unique(e, "cart line"))?;

        sqlx::query("UPDATE carts SET updated_at = NOW() WHERE id = $1")
            .bind(cart_id)
            .execute(&mut *self.tx)
            .await?;

        Ok(item)
    }

    async fn set_cart_item_quantity(
        &mut self,
        item_id: CartItemId,
        quantity: i32,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE cart_items SET quantity = $2 WHERE id = $1")
            .bind(item_id)
            .bind(quantity)
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn delete_cart_item(&mut self, item_id: CartItemId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM cart_items WHERE id = $1")
            .bind(item_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn clear_cart(&mut self, cart_id: CartId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM cart_items WHERE cart_id = $1")
            .bind(cart_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn cart_lines(&mut self, cart_id: CartId) -> Result<Vec<CartLine>, RepositoryError> {
        let lines = sqlx::query_as::<_, CartLine>(
            r"
            SELECT ci.id AS item_id,
                   ci.product_id,
                   ci.variant_id,
                   p.name AS product_name,
                   v.name AS variant_name,
                   COALESCE(v.sku, p.sku) AS sku,
                   COALESCE(v.price, p.price) AS unit_price,
                   ci.quantity,
                   COALESCE(v.stock, p.stock) AS stock,
                   p.active,
                   p.has_variants
            FROM cart_items ci
            JOIN products p ON p.id = ci.product_id
            LEFT JOIN product_variants v ON v.id = ci.variant_id
            WHERE ci.cart_id = $1
            ORDER BY ci.id
            ",
        )
        .bind(cart_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(lines)
    }

    async fn get_product(&mut self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(
            r"
            SELECT id, name, sku, price, stock, has_variants, active
            FROM products
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(product)
    }

    async fn get_variant(&mut self, id: VariantId) -> Result<Option<Variant>, RepositoryError> {
        let variant = sqlx::query_as::<_, Variant>(
            r"
            SELECT id, product_id, name, sku, price, stock
            FROM product_variants
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(variant)
    }

    async fn lock_stock(&mut self, target: StockTarget) -> Result<Option<i32>, RepositoryError> {
        let stock = match target {
            StockTarget::Product(id) => {
                sqlx::query_scalar::<_, i32>("SELECT stock FROM products WHERE id = $1 FOR UPDATE")
                    .bind(id)
                    .fetch_optional(&mut *self.tx)
                    .await?
            }
            StockTarget::Variant(id) => {
                sqlx::query_scalar::<_, i32>(
                    "SELECT stock FROM product_variants WHERE id = $1 FOR UPDATE",
                )
                .bind(id)
                .fetch_optional(&mut *self.tx)
                .await?
            }
        };
        Ok(stock)
    }

    async fn decrement_stock(
        &mut self,
        target: StockTarget,
        quantity: i32,
    ) -> Result<bool, RepositoryError> {
        let result = match target {
            StockTarget::Product(id) => {
                sqlx::query(
                    r"
                    UPDATE products
                    SET stock = stock - $2, updated_at = NOW()
                    WHERE id = $1 AND stock >= $2
                    ",
                )
                .bind(id)
                .bind(quantity)
                .execute(&mut *self.tx)
                .await?
            }
            StockTarget::Variant(id) => {
                sqlx::query(
                    r"
                    UPDATE product_variants
                    SET stock = stock - $2
                    WHERE id = $1 AND stock >= $2
                    ",
                )
                .bind(id)
                .bind(quantity)
                .execute(&mut *self.tx)
                .await?
            }
        };
        Ok(result.rows_affected() == 1)
    }

    async fn category_commission_rates(
        &mut self,
        product_ids: &[ProductId],
    ) -> Result<Vec<Decimal>, RepositoryError> {
        let ids: Vec<i32> = product_ids.iter().map(ProductId::as_i32).collect();

        let rates = sqlx::query_scalar::<_, Decimal>(
            r"
            SELECT c.commission_rate
            FROM product_categories pc
            JOIN categories c ON c.id = pc.category_id
            WHERE pc.product_id = ANY($1) AND c.commission_rate IS NOT NULL
            ",
        )
        .bind(ids)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(rates)
    }

    async fn lock_coupon_by_code(
        &mut self,
        code: &str,
    ) -> Result<Option<Coupon>, RepositoryError> {
        let row = sqlx::query_as::<_, CouponRow>(
            r"
            SELECT id, code, discount_type, discount_value, starts_at, expires_at,
                   min_order_amount, max_uses, used_count, active
            FROM coupons
            WHERE code = $1
            FOR UPDATE
            ",
        )
        .bind(code)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(row.map(Coupon::from))
    }

    async fn increment_coupon_usage(&mut self, id: CouponId) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE coupons
            SET used_count = used_count + 1
            WHERE id = $1 AND (max_uses IS NULL OR used_count < max_uses)
            ",
        )
        .bind(id)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn find_approved_affiliate_by_code(
        &mut self,
        code: &str,
    ) -> Result<Option<Affiliate>, RepositoryError> {
        let affiliate = sqlx::query_as::<_, Affiliate>(
            r"
            SELECT id, user_id, code, commission_rate, status, parent_id
            FROM affiliates
            WHERE code = $1 AND status = 'APPROVED'
            ",
        )
        .bind(code)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(affiliate)
    }

    async fn get_affiliate(
        &mut self,
        id: AffiliateId,
    ) -> Result<Option<Affiliate>, RepositoryError> {
        let affiliate = sqlx::query_as::<_, Affiliate>(
            r"
            SELECT id, user_id, code, commission_rate, status, parent_id
            FROM affiliates
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(affiliate)
    }

    async fn get_customer(&mut self, id: UserId) -> Result<Option<Customer>, RepositoryError> {
        let customer =
            sqlx::query_as::<_, Customer>("SELECT id, email, name FROM users WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut *self.tx)
                .await?;
        Ok(customer)
    }

    async fn insert_address(
        &mut self,
        user_id: UserId,
        address: &ShippingAddress,
    ) -> Result<AddressId, RepositoryError> {
        let id = sqlx::query_scalar::<_, AddressId>(
            r"
            INSERT INTO addresses
                (user_id, full_name, line1, line2, city, state, postal_code, country, phone)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            ",
        )
        .bind(user_id)
        .bind(&address.full_name)
        .bind(&address.line1)
        .bind(address.line2.as_deref())
        .bind(&address.city)
        .bind(&address.state)
        .bind(&address.postal_code)
        .bind(&address.country)
        .bind(address.phone.as_deref())
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(id)
    }

    async fn insert_order(&mut self, order: &NewOrder) -> Result<Order, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(
            r"
            INSERT INTO orders
                (order_number, user_id, subtotal, discount_amount, tax, shipping_cost, total,
                 affiliate_id, coupon_id, applied_code, address_id, shipping_address,
                 payment_method)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING id, order_number, user_id, status, subtotal, discount_amount, tax,
                      shipping_cost, total, affiliate_id, coupon_id, applied_code, address_id,
                      shipping_address, payment_method, admin_notes, created_at, updated_at
            ",
        )
        .bind(&order.order_number)
        .bind(order.user_id)
        .bind(order.totals.subtotal)
        .bind(order.totals.discount)
        .bind(order.totals.tax)
        .bind(order.totals.shipping)
        .bind(order.totals.total)
        .bind(order.affiliate_id)
        .bind(order.coupon_id)
        .bind(order.applied_code.as_deref())
        .bind(order.address_id)
        .bind(Json(&order.shipping_address))
        .bind(order.payment_method)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| conflict_on_unique(e, "order number"))?;

        for item in &order.items {
            sqlx::query(
                r"
                INSERT INTO order_items
                    (order_id, product_id, variant_id, product_name, variant_name, sku,
                     unit_price, quantity, line_total)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                ",
            )
            .bind(row.id)
            .bind(item.product_id)
            .bind(item.variant_id)
            .bind(&item.product_name)
            .bind(item.variant_name.as_deref())
            .bind(item.sku.as_deref())
            .bind(item.unit_price)
            .bind(item.quantity)
            .bind(item.line_total)
            .execute(&mut *self.tx)
            .await?;
        }

        Ok(Order::from(row))
    }

    async fn get_order(&mut self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, order_number, user_id, status, subtotal, discount_amount, tax,
                   shipping_cost, total, affiliate_id, coupon_id, applied_code, address_id,
                   shipping_address, payment_method, admin_notes, created_at, updated_at
            FROM orders
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(row.map(Order::from))
    }

    async fn lock_order(&mut self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let locked =
            sqlx::query_scalar::<_, OrderId>("SELECT id FROM orders WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *self.tx)
                .await?;

        match locked {
            Some(id) => self.get_order(id).await,
            None => Ok(None),
        }
    }

    async fn order_items(&mut self, id: OrderId) -> Result<Vec<OrderItem>, RepositoryError> {
        let items = sqlx::query_as::<_, OrderItem>(
            r"
            SELECT id, order_id, product_id, variant_id, product_name, variant_name, sku,
                   unit_price, quantity, line_total
            FROM order_items
            WHERE order_id = $1
            ORDER BY id
            ",
        )
        .bind(id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(items)
    }

    async fn orders_for_user(&mut self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(
            r"
            SELECT id, order_number, user_id, status, subtotal, discount_amount, tax,
                   shipping_cost, total, affiliate_id, coupon_id, applied_code, address_id,
                   shipping_address, payment_method, admin_notes, created_at, updated_at
            FROM orders
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            ",
        )
        .bind(user_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(rows.into_iter().map(Order::from).collect())
    }

    async fn set_order_status(
        &mut self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(status)
                .execute(&mut *self.tx)
                .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn insert_payment(
        &mut self,
        order_id: OrderId,
        method: PaymentMethod,
        amount: Decimal,
    ) -> Result<Payment, RepositoryError> {
        let payment = sqlx::query_as::<_, Payment>(
            r"
            INSERT INTO payments (order_id, method, amount)
            VALUES ($1, $2, $3)
            RETURNING id, order_id, method, status, amount, transaction_ref, confirmed_by,
                      confirmed_at, created_at, updated_at
            ",
        )
        .bind(order_id)
        .bind(method)
        .bind(amount)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| conflict_on_unique(e, "payment"))?;
        Ok(payment)
    }

    async fn payment_for_order(
        &mut self,
        order_id: OrderId,
    ) -> Result<Option<Payment>, RepositoryError> {
        let payment = sqlx::query_as::<_, Payment>(
            r"
            SELECT id, order_id, method, status, amount, transaction_ref, confirmed_by,
                   confirmed_at, created_at, updated_at
            FROM payments
            WHERE order_id = $1
            ",
        )
        .bind(order_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(payment)
    }

    async fn lock_payment_for_order(
        &mut self,
        order_id: OrderId,
    ) -> Result<Option<Payment>, RepositoryError> {
        let payment = sqlx::query_as::<_, Payment>(
            r"
            SELECT id, order_id, method, status, amount, transaction_ref, confirmed_by,
                   confirmed_at, created_at, updated_at
            FROM payments
            WHERE order_id = $1
            FOR UPDATE
            ",
        )
        .bind(order_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(payment)
    }

    async fn mark_payment_submitted(
        &mut self,
        id: PaymentId,
        transaction_ref: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE payments
            SET status = 'SUBMITTED', transaction_ref = $2, updated_at = NOW()
            WHERE id = $1 AND status = 'PENDING'
            ",
        )
        .bind(id)
        .bind(transaction_ref)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::Conflict(
                "payment is no longer pending".to_owned(),
            ));
        }
        Ok(())
    }

    async fn mark_payment_confirmed(
        &mut self,
        id: PaymentId,
        confirmed_by: UserId,
        confirmed_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE payments
            SET status = 'CONFIRMED', confirmed_by = $2, confirmed_at = $3, updated_at = NOW()
            WHERE id = $1 AND status <> 'CONFIRMED'
            ",
        )
        .bind(id)
        .bind(confirmed_by)
        .bind(confirmed_at)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::Conflict(
                "payment is already confirmed".to_owned(),
            ));
        }
        Ok(())
    }

    async fn insert_commission(
        &mut self,
        commission: &NewCommission,
    ) -> Result<Commission, RepositoryError> {
        let row = sqlx::query_as::<_, Commission>(
            r"
            INSERT INTO affiliate_commissions
                (affiliate_id, order_id, amount, rate, commission_type)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, affiliate_id, order_id, amount, rate, commission_type, status,
                      created_at, updated_at
            ",
        )
        .bind(commission.affiliate_id)
        .bind(commission.order_id)
        .bind(commission.amount)
        .bind(commission.rate)
        .bind(commission.commission_type)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| conflict_on_unique(e, "commission"))?;
        Ok(row)
    }

    async fn commissions_for_order(
        &mut self,
        order_id: OrderId,
    ) -> Result<Vec<Commission>, RepositoryError> {
        let rows = sqlx::query_as::<_, Commission>(
            r"
            SELECT id, affiliate_id, order_id, amount, rate, commission_type, status,
                   created_at, updated_at
            FROM affiliate_commissions
            WHERE order_id = $1
            ORDER BY id
            ",
        )
        .bind(order_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(rows)
    }

    async fn lock_commission(
        &mut self,
        id: CommissionId,
    ) -> Result<Option<Commission>, RepositoryError> {
        let row = sqlx::query_as::<_, Commission>(
            r"
            SELECT id, affiliate_id, order_id, amount, rate, commission_type, status,
                   created_at, updated_at
            FROM affiliate_commissions
            WHERE id = $1
            FOR UPDATE
            ",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(row)
    }

    async fn set_commission_status(
        &mut self,
        id: CommissionId,
        status: CommissionStatus,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE affiliate_commissions SET status = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(status)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn commit(self) -> Result<(), RepositoryError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<(), RepositoryError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
