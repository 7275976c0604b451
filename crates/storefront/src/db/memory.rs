//! In-memory implementation of the store.
//!
//! All state sits behind one Tokio mutex. [`MemoryStore::begin`] takes the
//! lock for the life of the transaction and hands out a private copy of the
//! state; `commit` writes the copy back. Transactions are therefore fully
//! serialized, and an uncommitted transaction leaves no trace.
//!
//! The seeding and inspection helpers on [`MemoryState`] exist for tests and
//! local demos.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};

use orchard_core::cart::CartOwner;
use orchard_core::pricing::Coupon;
use orchard_core::{
    AddressId, AffiliateId, AffiliateStatus, CartId, CartItemId, CategoryId, CommissionId,
    CommissionStatus, CouponId, OrderId, OrderItemId, OrderStatus, PaymentId, PaymentMethod,
    PaymentStatus, ProductId, ShippingAddress, UserId, VariantId,
};

use super::{RepositoryError, Store, StoreTx};
use crate::models::{
    Affiliate, Cart, CartItem, CartLine, Commission, Customer, NewCommission, NewOrder, Order,
    OrderItem, Payment, Product, StockTarget, Variant,
};

/// Write a transaction can be made to fail at, for rollback tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    InsertOrder,
    InsertPayment,
    IncrementCouponUsage,
    DecrementStock,
    ClearCart,
    InsertCommission,
}

/// Store holding everything in process memory.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mutate committed state directly, outside any transaction.
    pub async fn seed<R>(&self, f: impl FnOnce(&mut MemoryState) -> R) -> R {
        let mut state = self.state.lock().await;
        f(&mut state)
    }

    /// Read committed state.
    pub async fn inspect<R>(&self, f: impl FnOnce(&MemoryState) -> R) -> R {
        let state = self.state.lock().await;
        f(&state)
    }
}

#[async_trait]
impl Store for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> Result<MemoryTx, RepositoryError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();
        Ok(MemoryTx { guard, working })
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

/// Committed data plus id allocation.
#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    next_id: i32,
    fail_at: Option<FailPoint>,
    customers: BTreeMap<UserId, Customer>,
    products: BTreeMap<ProductId, Product>,
    variants: BTreeMap<VariantId, Variant>,
    categories: BTreeMap<CategoryId, Option<Decimal>>,
    product_categories: BTreeSet<(ProductId, CategoryId)>,
    carts: BTreeMap<CartId, Cart>,
    cart_items: BTreeMap<CartItemId, CartItem>,
    coupons: BTreeMap<CouponId, Coupon>,
    affiliates: BTreeMap<AffiliateId, Affiliate>,
    addresses: BTreeMap<AddressId, (UserId, ShippingAddress)>,
    orders: BTreeMap<OrderId, Order>,
    order_items: BTreeMap<OrderItemId, OrderItem>,
    payments: BTreeMap<PaymentId, Payment>,
    commissions: BTreeMap<CommissionId, Commission>,
}

impl MemoryState {
    fn allocate(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn check(&self, point: FailPoint) -> Result<(), RepositoryError> {
        if self.fail_at == Some(point) {
            return Err(RepositoryError::Database(sqlx::Error::Protocol(format!(
                "injected failure at {point:?}"
            ))));
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Seeding
    // -------------------------------------------------------------------------

    /// Make every later transaction fail at `point`; `None` clears it.
    pub const fn fail_at(&mut self, point: Option<FailPoint>) {
        self.fail_at = point;
    }

    pub fn add_customer(&mut self, email: &str, name: &str) -> UserId {
        let id = UserId::new(self.allocate());
        self.customers.insert(
            id,
            Customer {
                id,
                email: email.to_owned(),
                name: name.to_owned(),
            },
        );
        id
    }

    /// Add an active product without variants.
    pub fn add_product(&mut self, name: &str, price: Decimal, stock: i32) -> ProductId {
        let id = ProductId::new(self.allocate());
        self.products.insert(
            id,
            Product {
                id,
                name: name.to_owned(),
                sku: Some(format!("SKU-{id}")),
                price,
                stock,
                has_variants: false,
                active: true,
            },
        );
        id
    }

    /// Add a variant and mark its product as having variants.
    pub fn add_variant(
        &mut self,
        product_id: ProductId,
        name: &str,
        price: Decimal,
        stock: i32,
    ) -> VariantId {
        let id = VariantId::new(self.allocate());
        if let Some(product) = self.products.get_mut(&product_id) {
            product.has_variants = true;
        }
        self.variants.insert(
            id,
            Variant {
                id,
                product_id,
                name: name.to_owned(),
                sku: Some(format!("SKU-{product_id}-{id}")),
                price,
                stock,
            },
        );
        id
    }

    pub fn add_category(&mut self, commission_rate: Option<Decimal>) -> CategoryId {
        let id = CategoryId::new(self.allocate());
        self.categories.insert(id, commission_rate);
        id
    }

    pub fn assign_category(&mut self, product_id: ProductId, category_id: CategoryId) {
        self.product_categories.insert((product_id, category_id));
    }

    /// Store a coupon under a fresh id, uppercasing its code.
    pub fn add_coupon(&mut self, mut coupon: Coupon) -> CouponId {
        let id = CouponId::new(self.allocate());
        coupon.id = id;
        coupon.code = coupon.code.to_uppercase();
        self.coupons.insert(id, coupon);
        id
    }

    pub fn add_affiliate(
        &mut self,
        user_id: UserId,
        code: &str,
        commission_rate: Option<Decimal>,
        status: AffiliateStatus,
        parent_id: Option<AffiliateId>,
    ) -> AffiliateId {
        let id = AffiliateId::new(self.allocate());
        self.affiliates.insert(
            id,
            Affiliate {
                id,
                user_id,
                code: code.to_uppercase(),
                commission_rate,
                status,
                parent_id,
            },
        );
        id
    }

    pub fn set_affiliate_status(&mut self, id: AffiliateId, status: AffiliateStatus) {
        if let Some(affiliate) = self.affiliates.get_mut(&id) {
            affiliate.status = status;
        }
    }

    pub fn set_product_active(&mut self, id: ProductId, active: bool) {
        if let Some(product) = self.products.get_mut(&id) {
            product.active = active;
        }
    }

    pub fn set_product_price(&mut self, id: ProductId, price: Decimal) {
        if let Some(product) = self.products.get_mut(&id) {
            product.price = price;
        }
    }

    /// Delete a product the way the schema does: variants and cart lines go
    /// with it, order items keep their copy but lose the reference.
    pub fn delete_product(&mut self, id: ProductId) {
        self.products.remove(&id);
        self.variants.retain(|_, v| v.product_id != id);
        self.cart_items.retain(|_, item| item.product_id != id);
        self.product_categories.retain(|(product, _)| *product != id);
        for item in self.order_items.values_mut() {
            if item.product_id == Some(id) {
                item.product_id = None;
                item.variant_id = None;
            }
        }
    }

    // -------------------------------------------------------------------------
    // Inspection
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn product(&self, id: ProductId) -> Option<&Product> {
        self.products.get(&id)
    }

    #[must_use]
    pub fn variant(&self, id: VariantId) -> Option<&Variant> {
        self.variants.get(&id)
    }

    #[must_use]
    pub fn coupon(&self, id: CouponId) -> Option<&Coupon> {
        self.coupons.get(&id)
    }

    #[must_use]
    pub fn cart(&self, owner: &CartOwner) -> Option<&Cart> {
        self.carts.values().find(|cart| &cart.owner == owner)
    }

    /// Items in the cart of `owner`, empty if there is no such cart.
    #[must_use]
    pub fn items_in_cart(&self, owner: &CartOwner) -> Vec<&CartItem> {
        self.cart(owner).map_or_else(Vec::new, |cart| {
            self.cart_items
                .values()
                .filter(|item| item.cart_id == cart.id)
                .collect()
        })
    }

    pub fn orders(&self) -> impl Iterator<Item = &Order> {
        self.orders.values()
    }

    #[must_use]
    pub fn order(&self, id: OrderId) -> Option<&Order> {
        self.orders.get(&id)
    }

    #[must_use]
    pub fn items_of_order(&self, id: OrderId) -> Vec<&OrderItem> {
        self.order_items
            .values()
            .filter(|item| item.order_id == id)
            .collect()
    }

    #[must_use]
    pub fn payment_of_order(&self, id: OrderId) -> Option<&Payment> {
        self.payments.values().find(|payment| payment.order_id == id)
    }

    pub fn payments(&self) -> impl Iterator<Item = &Payment> {
        self.payments.values()
    }

    pub fn commissions(&self) -> impl Iterator<Item = &Commission> {
        self.commissions.values()
    }

    #[must_use]
    pub fn address_count(&self) -> usize {
        self.addresses.len()
    }

    fn stock_mut(&mut self, target: StockTarget) -> Option<&mut i32> {
        match target {
            StockTarget::Product(id) => self.products.get_mut(&id).map(|p| &mut p.stock),
            StockTarget::Variant(id) => self.variants.get_mut(&id).map(|v| &mut v.stock),
        }
    }
}

/// One serialized transaction over a working copy of the state.
pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn find_cart(&mut self, owner: &CartOwner) -> Result<Option<Cart>, RepositoryError> {
        Ok(self.working.cart(owner).cloned())
    }

    async fn lock_cart(&mut self, owner: &CartOwner) -> Result<Option<Cart>, RepositoryError> {
        self.find_cart(owner).await
    }

    async fn create_cart(&mut self, owner: &CartOwner) -> Result<Cart, RepositoryError> {
        if self.working.cart(owner).is_some() {
            return Err(RepositoryError::Conflict("cart already exists".to_owned()));
        }
        let now = Utc::now();
        let cart = Cart {
            id: CartId::new(self.working.allocate()),
            owner: owner.clone(),
            created_at: now,
            updated_at: now,
        };
        self.working.carts.insert(cart.id, cart.clone());
        Ok(cart)
    }

    async fn delete_cart(&mut self, cart_id: CartId) -> Result<(), RepositoryError> {
        self.working.carts.remove(&cart_id);
        self.working
            .cart_items
            .retain(|_, item| item.cart_id != cart_id);
        Ok(())
    }

    async fn cart_items(&mut self, cart_id: CartId) -> Result<Vec<CartItem>, RepositoryError> {
        Ok(self
            .working
            .cart_items
            .values()
            .filter(|item| item.cart_id == cart_id)
            .cloned()
            .collect())
    }

    async fn find_cart_item(
        &mut self,
        cart_id: CartId,
        product_id: ProductId,
        variant_id: Option<VariantId>,
    ) -> Result<Option<CartItem>, RepositoryError> {
        Ok(self
            .working
            .cart_items
            .values()
            .find(|item| {
                item.cart_id == cart_id
                    && item.product_id == product_id
                    && item.variant_id == variant_id
            })
            .cloned())
    }

    async fn insert_cart_item(
        &mut self,
        cart_id: CartId,
        product_id: ProductId,
        variant_id: Option<VariantId>,
        quantity: i32,
    ) -> Result<CartItem, RepositoryError> {
        if self
            .find_cart_item(cart_id, product_id, variant_id)
            .await?
            .is_some()
        {
            return Err(RepositoryError::Conflict("cart line already exists".to_owned()));
        }
        let item = CartItem {
            id: CartItemId::new(self.working.allocate()),
            cart_id,
            product_id,
            variant_id,
            quantity,
        };
        self.working.cart_items.insert(item.id, item.clone());
        if let Some(cart) = self.working.carts.get_mut(&cart_id) {
            cart.updated_at = Utc::now();
        }
        Ok(item)
    }

    async fn set_cart_item_quantity(
        &mut self,
        item_id: CartItemId,
        quantity: i32,
    ) -> Result<(), RepositoryError> {
        let item = self
            .working
            .cart_items
            .get_mut(&item_id)
            .ok_or(RepositoryError::NotFound)?;
        item.quantity = quantity;
        Ok(())
    }

    async fn delete_cart_item(&mut self, item_id: CartItemId) -> Result<(), RepositoryError> {
        self.working.cart_items.remove(&item_id);
        Ok(())
    }

    async fn clear_cart(&mut self, cart_id: CartId) -> Result<(), RepositoryError> {
        self.working.check(FailPoint::ClearCart)?;
        self.working
            .cart_items
            .retain(|_, item| item.cart_id != cart_id);
        Ok(())
    }

    async fn cart_lines(&mut self, cart_id: CartId) -> Result<Vec<CartLine>, RepositoryError> {
        let state = &self.working;
        let lines = state
            .cart_items
            .values()
            .filter(|item| item.cart_id == cart_id)
            .filter_map(|item| {
                let product = state.products.get(&item.product_id)?;
                let variant = item.variant_id.and_then(|id| state.variants.get(&id));
                Some(CartLine {
                    item_id: item.id,
                    product_id: item.product_id,
                    variant_id: item.variant_id,
                    product_name: product.name.clone(),
                    variant_name: variant.map(|v| v.name.clone()),
                    sku: variant
                        .and_then(|v| v.sku.clone())
                        .or_else(|| product.sku.clone()),
                    unit_price: variant.map_or(product.price, |v| v.price),
                    quantity: item.quantity,
                    stock: variant.map_or(product.stock, |v| v.stock),
                    active: product.active,
                    has_variants: product.has_variants,
                })
            })
            .collect();
        Ok(lines)
    }

    async fn get_product(&mut self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.working.products.get(&id).cloned())
    }

    async fn get_variant(&mut self, id: VariantId) -> Result<Option<Variant>, RepositoryError> {
        Ok(self.working.variants.get(&id).cloned())
    }

    async fn lock_stock(&mut self, target: StockTarget) -> Result<Option<i32>, RepositoryError> {
        Ok(self.working.stock_mut(target).map(|stock| *stock))
    }

    async fn decrement_stock(
        &mut self,
        target: StockTarget,
        quantity: i32,
    ) -> Result<bool, RepositoryError> {
        self.working.check(FailPoint::DecrementStock)?;
        match self.working.stock_mut(target) {
            Some(stock) if *stock >= quantity => {
                *stock -= quantity;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn category_commission_rates(
        &mut self,
        product_ids: &[ProductId],
    ) -> Result<Vec<Decimal>, RepositoryError> {
        let state = &self.working;
        Ok(state
            .product_categories
            .iter()
            .filter(|(product, _)| product_ids.contains(product))
            .filter_map(|(_, category)| state.categories.get(category).copied().flatten())
            .collect())
    }

    async fn lock_coupon_by_code(
        &mut self,
        code: &str,
    ) -> Result<Option<Coupon>, RepositoryError> {
        Ok(self
            .working
            .coupons
            .values()
            .find(|coupon| coupon.code == code)
            .cloned())
    }

    async fn increment_coupon_usage(&mut self, id: CouponId) -> Result<bool, RepositoryError> {
        self.working.check(FailPoint::IncrementCouponUsage)?;
        match self.working.coupons.get_mut(&id) {
            Some(coupon) if !coupon.is_exhausted() => {
                coupon.used_count += 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn find_approved_affiliate_by_code(
        &mut self,
        code: &str,
    ) -> Result<Option<Affiliate>, RepositoryError> {
        Ok(self
            .working
            .affiliates
            .values()
            .find(|affiliate| affiliate.code == code && affiliate.is_approved())
            .cloned())
    }

    async fn get_affiliate(
        &mut self,
        id: AffiliateId,
    ) -> Result<Option<Affiliate>, RepositoryError> {
        Ok(self.working.affiliates.get(&id).cloned())
    }

    async fn get_customer(&mut self, id: UserId) -> Result<Option<Customer>, RepositoryError> {
        Ok(self.working.customers.get(&id).cloned())
    }

    async fn insert_address(
        &mut self,
        user_id: UserId,
        address: &ShippingAddress,
    ) -> Result<AddressId, RepositoryError> {
        let id = AddressId::new(self.working.allocate());
        self.working
            .addresses
            .insert(id, (user_id, address.clone()));
        Ok(id)
    }

    async fn insert_order(&mut self, new: &NewOrder) -> Result<Order, RepositoryError> {
        self.working.check(FailPoint::InsertOrder)?;
        if self
            .working
            .orders
            .values()
            .any(|order| order.order_number == new.order_number)
        {
            return Err(RepositoryError::Conflict(
                "order number already exists".to_owned(),
            ));
        }

        let now = Utc::now();
        let order = Order {
            id: OrderId::new(self.working.allocate()),
            order_number: new.order_number.clone(),
            user_id: new.user_id,
            status: OrderStatus::AwaitingPayment,
            subtotal: new.totals.subtotal,
            discount_amount: new.totals.discount,
            tax: new.totals.tax,
            shipping_cost: new.totals.shipping,
            total: new.totals.total,
            affiliate_id: new.affiliate_id,
            coupon_id: new.coupon_id,
            applied_code: new.applied_code.clone(),
            address_id: new.address_id,
            shipping_address: new.shipping_address.clone(),
            payment_method: new.payment_method,
            admin_notes: None,
            created_at: now,
            updated_at: now,
        };
        self.working.orders.insert(order.id, order.clone());

        for item in &new.items {
            let id = OrderItemId::new(self.working.allocate());
            self.working.order_items.insert(
                id,
                OrderItem {
                    id,
                    order_id: order.id,
                    product_id: Some(item.product_id),
                    variant_id: item.variant_id,
                    product_name: item.product_name.clone(),
                    variant_name: item.variant_name.clone(),
                    sku: item.sku.clone(),
                    unit_price: item.unit_price,
                    quantity: item.quantity,
                    line_total: item.line_total,
                },
            );
        }

        Ok(order)
    }

    async fn get_order(&mut self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self.working.orders.get(&id).cloned())
    }

    async fn lock_order(&mut self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        self.get_order(id).await
    }

    async fn order_items(&mut self, id: OrderId) -> Result<Vec<OrderItem>, RepositoryError> {
        Ok(self
            .working
            .items_of_order(id)
            .into_iter()
            .cloned()
            .collect())
    }

    async fn orders_for_user(&mut self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let mut orders: Vec<Order> = self
            .working
            .orders
            .values()
            .filter(|order| order.user_id == user_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(orders)
    }

    async fn set_order_status(
        &mut self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<(), RepositoryError> {
        let order = self
            .working
            .orders
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;
        order.status = status;
        order.updated_at = Utc::now();
        Ok(())
    }

    async fn insert_payment(
        &mut self,
        order_id: OrderId,
        method: PaymentMethod,
        amount: Decimal,
    ) -> Result<Payment, RepositoryError> {
        self.working.check(FailPoint::InsertPayment)?;
        if self.working.payment_of_order(order_id).is_some() {
            return Err(RepositoryError::Conflict("payment already exists".to_owned()));
        }
        let now = Utc::now();
        let payment = Payment {
            id: PaymentId::new(self.working.allocate()),
            order_id,
            method,
            status: PaymentStatus::Pending,
            amount,
            transaction_ref: None,
            confirmed_by: None,
            confirmed_at: None,
            created_at: now,
            updated_at: now,
        };
        self.working.payments.insert(payment.id, payment.clone());
        Ok(payment)
    }

    async fn payment_for_order(
        &mut self,
        order_id: OrderId,
    ) -> Result<Option<Payment>, RepositoryError> {
        Ok(self.working.payment_of_order(order_id).cloned())
    }

    async fn lock_payment_for_order(
        &mut self,
        order_id: OrderId,
    ) -> Result<Option<Payment>, RepositoryError> {
        self.payment_for_order(order_id).await
    }

    async fn mark_payment_submitted(
        &mut self,
        id: PaymentId,
        transaction_ref: &str,
    ) -> Result<(), RepositoryError> {
        let payment = self
            .working
            .payments
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;
        if payment.status != PaymentStatus::Pending {
            return Err(RepositoryError::Conflict(
                "payment is no longer pending".to_owned(),
            ));
        }
        payment.status = PaymentStatus::Submitted;
        payment.transaction_ref = Some(transaction_ref.to_owned());
        payment.updated_at = Utc::now();
        Ok(())
    }

    async fn mark_payment_confirmed(
        &mut self,
        id: PaymentId,
        confirmed_by: UserId,
        confirmed_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let payment = self
            .working
            .payments
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;
        if payment.status == PaymentStatus::Confirmed {
            return Err(RepositoryError::Conflict(
                "payment is already confirmed".to_owned(),
            ));
        }
        payment.status = PaymentStatus::Confirmed;
        payment.confirmed_by = Some(confirmed_by);
        payment.confirmed_at = Some(confirmed_at);
        payment.updated_at = confirmed_at;
        Ok(())
    }

    async fn insert_commission(
        &mut self,
        new: &NewCommission,
    ) -> Result<Commission, RepositoryError> {
        self.working.check(FailPoint::InsertCommission)?;
        if self.working.commissions.values().any(|c| {
            c.affiliate_id == new.affiliate_id
                && c.order_id == new.order_id
                && c.commission_type == new.commission_type
        }) {
            return Err(RepositoryError::Conflict(
                "commission already exists".to_owned(),
            ));
        }
        let now = Utc::now();
        let commission = Commission {
            id: CommissionId::new(self.working.allocate()),
            affiliate_id: new.affiliate_id,
            order_id: new.order_id,
            amount: new.amount,
            rate: new.rate,
            commission_type: new.commission_type,
            status: CommissionStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        self.working
            .commissions
            .insert(commission.id, commission.clone());
        Ok(commission)
    }

    async fn commissions_for_order(
        &mut self,
        order_id: OrderId,
    ) -> Result<Vec<Commission>, RepositoryError> {
        Ok(self
            .working
            .commissions
            .values()
            .filter(|c| c.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn lock_commission(
        &mut self,
        id: CommissionId,
    ) -> Result<Option<Commission>, RepositoryError> {
        Ok(self.working.commissions.get(&id).cloned())
    }

    async fn set_commission_status(
        &mut self,
        id: CommissionId,
        status: CommissionStatus,
    ) -> Result<(), RepositoryError> {
        let commission = self
            .working
            .commissions
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;
        commission.status = status;
        commission.updated_at = Utc::now();
        Ok(())
    }

    async fn commit(self) -> Result<(), RepositoryError> {
        let Self { mut guard, working } = self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self) -> Result<(), RepositoryError> {
        Ok(())
    }
}
