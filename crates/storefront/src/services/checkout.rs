//! Checkout: code validation, quotes, and order placement.
//!
//! An empty cart is refused before placement starts. Placement itself runs
//! as one store transaction that first locks the cart, so two submissions of
//! the same cart serialize and the second finds it empty:
//!
//! 1. price the cart from the live catalog,
//! 2. resolve the discount, re-validating any coupon,
//! 3. compute tax, shipping and total,
//! 4. lock and check stock for every line,
//! 5. insert the address snapshot, the order with its items, and a pending
//!    payment,
//! 6. count the coupon use,
//! 7. decrement stock,
//! 8. clear the cart,
//! 9. commit.
//!
//! Any failure before commit leaves nothing behind. Notifications and stock
//! alerts go out only after commit.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::seq::IndexedRandom;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use orchard_core::cart::CartOwner;
use orchard_core::pricing::totals::subtotal;
use orchard_core::pricing::{
    CodeRejection, CouponRejection, CouponUnavailable, DiscountCodes, DiscountSource, OrderTotals,
    normalize_code,
};
use orchard_core::{AddressError, PaymentMethod, ShippingAddress, StoreSettings};

use super::discounts::FoundDiscounts;
use super::notifications::{ItemSummary, Notifier};
use crate::db::{RepositoryError, Store, StoreTx};
use crate::models::{CartLine, CurrentUser, NewOrder, NewOrderItem, Order, Payment, StockTarget};

const ORDER_SUFFIX_LEN: usize = 6;
const ORDER_SUFFIX_CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Errors that can occur during checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Shipping address is missing required fields.
    #[error("invalid shipping address: {0}")]
    InvalidAddress(#[from] AddressError),

    /// Payment method is not one we accept.
    #[error("unsupported payment method: {0}")]
    UnsupportedPaymentMethod(String),

    /// Nothing to check out.
    #[error("your cart is empty")]
    EmptyCart,

    /// No code was supplied to validate.
    #[error("enter a discount or referral code")]
    MissingCode,

    /// Code typed at the discount field was refused.
    #[error(transparent)]
    InvalidCode(#[from] CodeRejection),

    /// Entered coupon stopped being valid before the order was placed.
    #[error(transparent)]
    CouponUnavailable(#[from] CouponUnavailable),

    /// A cart line is no longer for sale.
    #[error("{0} is no longer available")]
    ProductUnavailable(String),

    /// A cart line asks for more than is in stock.
    #[error("not enough stock for {product}: {available} available")]
    InsufficientStock { product: String, available: i32 },

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// What a shopper submits to place an order.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    #[serde(default)]
    pub discount_code: Option<String>,
}

/// A freshly placed order and its pending payment.
#[derive(Debug, Clone, Serialize)]
pub struct PlacedOrder {
    pub order: Order,
    pub payment: Payment,
    pub discount_source: DiscountSource,
}

/// Totals the shopper would pay right now.
#[derive(Debug, Clone, Serialize)]
pub struct Quote {
    pub lines: Vec<CartLine>,
    pub totals: OrderTotals,
    pub applied_code: Option<String>,
    pub discount_source: DiscountSource,
}

/// A code accepted at the discount field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AcceptedCode {
    pub code: String,
    pub source: DiscountSource,
}

/// What a successful placement hands back for commit and notification.
struct Placement {
    order: Order,
    payment: Payment,
    discount_source: DiscountSource,
    lines: Vec<CartLine>,
    claims: BTreeMap<StockTarget, StockClaim>,
}

/// Stock claimed by one cart line during placement.
struct StockClaim {
    name: String,
    quantity: i32,
    before: i32,
}

/// Checkout service.
pub struct CheckoutService<S: Store> {
    store: Arc<S>,
    settings: StoreSettings,
    notifier: Arc<dyn Notifier>,
}

impl<S: Store> Clone for CheckoutService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            settings: self.settings.clone(),
            notifier: Arc::clone(&self.notifier),
        }
    }
}

impl<S: Store> CheckoutService<S> {
    #[must_use]
    pub fn new(store: Arc<S>, settings: StoreSettings, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store,
            settings,
            notifier,
        }
    }

    #[must_use]
    pub const fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    /// Check a code the shopper just typed against their current cart.
    ///
    /// A shopper without a cart is checked against a zero subtotal.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::MissingCode` for a blank code.
    /// Returns `CheckoutError::InvalidCode` if the code is neither an eligible
    /// coupon nor an approved referral code.
    #[instrument(skip(self))]
    pub async fn validate_code(
        &self,
        owner: Option<&CartOwner>,
        code: &str,
    ) -> Result<AcceptedCode, CheckoutError> {
        let code = normalize_code(Some(code)).ok_or(CheckoutError::MissingCode)?;
        let codes = DiscountCodes::new(Some(&code), None);

        let mut tx = self.store.begin().await?;
        let cart = match owner {
            Some(owner) => tx.find_cart(owner).await?,
            None => None,
        };
        let cart_subtotal = match cart {
            Some(cart) => price(&tx.cart_lines(cart.id).await?),
            None => Decimal::ZERO,
        };
        let found = FoundDiscounts::load(&mut tx, &codes).await?;
        tx.rollback().await?;

        let source = found.check_entered(&code, cart_subtotal, Utc::now())?;
        Ok(AcceptedCode { code, source })
    }

    /// Price the cart of `owner` with the given codes, changing nothing.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::EmptyCart` if there is nothing in the cart.
    /// Returns `CheckoutError::CouponUnavailable` if an entered coupon no
    /// longer applies.
    #[instrument(skip(self, codes), fields(owner = %owner))]
    pub async fn quote(
        &self,
        owner: &CartOwner,
        codes: &DiscountCodes,
    ) -> Result<Quote, CheckoutError> {
        let mut tx = self.store.begin().await?;

        let lines = match tx.find_cart(owner).await? {
            Some(cart) => tx.cart_lines(cart.id).await?,
            None => Vec::new(),
        };
        if lines.is_empty() {
            tx.rollback().await?;
            return Err(CheckoutError::EmptyCart);
        }

        let subtotal = price(&lines);
        let found = FoundDiscounts::load(&mut tx, codes).await?;
        tx.rollback().await?;

        let discount = found.resolve(
            subtotal,
            codes,
            self.settings.affiliate_discount_rate,
            Utc::now(),
        )?;
        let totals = OrderTotals::compute(subtotal, discount.amount, &self.settings);

        Ok(Quote {
            lines,
            totals,
            applied_code: discount.applied_code,
            discount_source: discount.source,
        })
    }

    /// Turn the cart of `owner` into an order for `customer`.
    ///
    /// `referral_code` is the code from the referral cookie, if any.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::InvalidAddress` or
    /// `CheckoutError::UnsupportedPaymentMethod` before touching the store.
    /// Returns `CheckoutError::EmptyCart` if the cart has no lines.
    /// Returns `CheckoutError::CouponUnavailable`,
    /// `CheckoutError::ProductUnavailable` or `CheckoutError::InsufficientStock`
    /// when a business rule fails; nothing is written in that case.
    /// Returns `CheckoutError::Repository` if the store fails.
    #[instrument(
        skip(self, customer, request, referral_code),
        fields(user_id = %customer.id, owner = %owner)
    )]
    pub async fn place_order(
        &self,
        customer: &CurrentUser,
        owner: &CartOwner,
        request: PlaceOrderRequest,
        referral_code: Option<&str>,
    ) -> Result<PlacedOrder, CheckoutError> {
        request.shipping_address.validate()?;
        let address = request.shipping_address.normalized();
        let method: PaymentMethod = request
            .payment_method
            .parse()
            .map_err(|_| CheckoutError::UnsupportedPaymentMethod(request.payment_method.clone()))?;
        let codes = DiscountCodes::new(request.discount_code.as_deref(), referral_code);
        if self.has_nothing_to_place(owner).await? {
            return Err(CheckoutError::EmptyCart);
        }
        let now = Utc::now();

        let mut tx = self.store.begin().await?;
        let placement = match self
            .place_within(&mut tx, customer, owner, address, method, &codes, now)
            .await
        {
            Ok(placement) => placement,
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    tracing::warn!(error = %rollback, "Rollback after failed placement failed");
                }
                return Err(e);
            }
        };
        tx.commit().await?;

        let Placement {
            order,
            payment,
            discount_source,
            lines,
            claims,
        } = placement;

        tracing::info!(
            order_number = %order.order_number,
            total = %order.total,
            source = ?discount_source,
            "Order placed"
        );

        self.notify_placed(customer, &order, &lines);
        self.alert_stock(claims.values());

        Ok(PlacedOrder {
            order,
            payment,
            discount_source,
        })
    }

    /// Whether `owner` has no cart lines, read before placement begins.
    async fn has_nothing_to_place(&self, owner: &CartOwner) -> Result<bool, CheckoutError> {
        let mut tx = self.store.begin().await?;
        let empty = match tx.find_cart(owner).await? {
            Some(cart) => tx.cart_items(cart.id).await?.is_empty(),
            None => true,
        };
        tx.rollback().await?;
        Ok(empty)
    }

    /// Steps 1-8 inside `tx`. The caller commits or rolls back.
    #[allow(clippy::too_many_arguments)]
    async fn place_within(
        &self,
        tx: &mut S::Tx,
        customer: &CurrentUser,
        owner: &CartOwner,
        address: ShippingAddress,
        method: PaymentMethod,
        codes: &DiscountCodes,
        now: DateTime<Utc>,
    ) -> Result<Placement, CheckoutError> {
        // Holding the cart lock means a concurrent placement of the same cart
        // either finished (and cleared it) or has not started.
        let cart = tx.lock_cart(owner).await?.ok_or(CheckoutError::EmptyCart)?;
        let lines = tx.cart_lines(cart.id).await?;
        if lines.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        if let Some(line) = lines
            .iter()
            .find(|line| !line.active || line.needs_variant())
        {
            return Err(CheckoutError::ProductUnavailable(line.display_name()));
        }

        // Steps 1-3: price, discount, totals.
        let subtotal = price(&lines);
        let found = FoundDiscounts::load(tx, codes).await?;
        let discount = found.resolve(
            subtotal,
            codes,
            self.settings.affiliate_discount_rate,
            now,
        )?;
        let totals = OrderTotals::compute(subtotal, discount.amount, &self.settings);

        // Step 4: lock stock rows in a fixed order, then check.
        let mut claims: BTreeMap<StockTarget, StockClaim> = BTreeMap::new();
        for line in &lines {
            let claim = claims
                .entry(line.stock_target())
                .or_insert_with(|| StockClaim {
                    name: line.display_name(),
                    quantity: 0,
                    before: 0,
                });
            claim.quantity += line.quantity;
        }
        for (target, claim) in &mut claims {
            let stock = tx
                .lock_stock(*target)
                .await?
                .ok_or_else(|| CheckoutError::ProductUnavailable(claim.name.clone()))?;
            if stock < claim.quantity {
                tracing::info!(
                    product = %claim.name,
                    stock,
                    requested = claim.quantity,
                    "Insufficient stock"
                );
                return Err(CheckoutError::InsufficientStock {
                    product: claim.name.clone(),
                    available: stock,
                });
            }
            claim.before = stock;
        }

        // Step 5: address snapshot, order, payment.
        let address_id = tx.insert_address(customer.id, &address).await?;
        let new_order = NewOrder {
            order_number: generate_order_number(now),
            user_id: customer.id,
            totals,
            affiliate_id: discount.affiliate_id,
            coupon_id: discount.coupon_id,
            applied_code: discount.applied_code.clone(),
            address_id,
            shipping_address: address,
            payment_method: method,
            items: lines.iter().map(frozen_item).collect(),
        };
        let order = tx.insert_order(&new_order).await?;
        let payment = tx.insert_payment(order.id, method, totals.total).await?;

        // Step 6: coupon usage.
        if let Some(coupon_id) = discount.coupon_id
            && !tx.increment_coupon_usage(coupon_id).await?
        {
            return Err(CheckoutError::CouponUnavailable(CouponUnavailable {
                code: discount.applied_code.unwrap_or_default(),
                reason: CouponRejection::UsageLimitReached,
            }));
        }

        // Step 7: stock.
        for (target, claim) in &claims {
            if !tx.decrement_stock(*target, claim.quantity).await? {
                return Err(CheckoutError::InsufficientStock {
                    product: claim.name.clone(),
                    available: claim.before,
                });
            }
        }

        // Step 8.
        tx.clear_cart(cart.id).await?;

        Ok(Placement {
            order,
            payment,
            discount_source: discount.source,
            lines,
            claims,
        })
    }

    fn notify_placed(&self, customer: &CurrentUser, order: &Order, lines: &[CartLine]) {
        let items: Vec<ItemSummary> = lines
            .iter()
            .map(|line| ItemSummary {
                name: line.display_name(),
                quantity: line.quantity,
                line_total: line.line_total(),
            })
            .collect();

        self.notifier
            .notify_admin_new_order(&order.order_number, order.total, &customer.name);
        self.notifier.notify_customer_order_placed(
            &customer.email,
            &order.order_number,
            order.total,
            order.payment_method,
            &items,
        );
    }

    fn alert_stock<'a>(&self, claims: impl Iterator<Item = &'a StockClaim>) {
        for claim in claims {
            let remaining = claim.before - claim.quantity;
            if remaining <= 0 {
                self.notifier.notify_admin_out_of_stock(&claim.name);
            } else if remaining <= self.settings.low_stock_threshold {
                self.notifier.notify_admin_low_stock(&claim.name, remaining);
            }
        }
    }
}

fn price(lines: &[CartLine]) -> Decimal {
    subtotal(lines.iter().map(|line| (line.unit_price, line.quantity)))
}

fn frozen_item(line: &CartLine) -> NewOrderItem {
    NewOrderItem {
        product_id: line.product_id,
        variant_id: line.variant_id,
        product_name: line.product_name.clone(),
        variant_name: line.variant_name.clone(),
        sku: line.sku.clone(),
        unit_price: line.unit_price,
        quantity: line.quantity,
        line_total: line.line_total(),
    }
}

/// `ORD-YYYYMMDD-XXXXXX` with a random suffix.
fn generate_order_number(now: DateTime<Utc>) -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..ORDER_SUFFIX_LEN)
        .filter_map(|_| ORDER_SUFFIX_CHARSET.choose(&mut rng))
        .map(|&b| char::from(b))
        .collect();
    format!("ORD-{}-{suffix}", now.format("%Y%m%d"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use orchard_core::pricing::Coupon;
    use orchard_core::{AffiliateStatus, CouponId, DiscountType, UserRole};

    use super::*;
    use crate::db::{FailPoint, MemoryStore};
    use crate::services::notifications::LogNotifier;

    fn settings() -> StoreSettings {
        StoreSettings {
            tax_rate: Decimal::from(8),
            shipping_flat_rate: Decimal::from(5),
            ..StoreSettings::default()
        }
    }

    fn address() -> ShippingAddress {
        ShippingAddress {
            full_name: "Sam Rivera".to_string(),
            line1: "1 Orchard Way".to_string(),
            line2: None,
            city: "Portland".to_string(),
            state: "OR".to_string(),
            postal_code: "97201".to_string(),
            country: "US".to_string(),
            phone: None,
        }
    }

    fn request(code: Option<&str>) -> PlaceOrderRequest {
        PlaceOrderRequest {
            shipping_address: address(),
            payment_method: "venmo".to_string(),
            discount_code: code.map(str::to_string),
        }
    }

    fn coupon(code: &str, max_uses: Option<i32>) -> Coupon {
        Coupon {
            id: CouponId::new(0),
            code: code.to_string(),
            discount_type: DiscountType::Percentage,
            discount_value: Decimal::from(20),
            starts_at: None,
            expires_at: None,
            min_order_amount: None,
            max_uses,
            used_count: 0,
            active: true,
        }
    }

    struct Fixture {
        store: MemoryStore,
        service: CheckoutService<MemoryStore>,
        customer: CurrentUser,
        owner: CartOwner,
    }

    async fn fixture(
        price: Decimal,
        stock: i32,
        quantity: i32,
    ) -> (Fixture, orchard_core::ProductId) {
        let store = MemoryStore::new();
        let (user, product) = store
            .seed(|s| {
                let user = s.add_customer("sam@example.com", "Sam Rivera");
                let product = s.add_product("Lamp", price, stock);
                (user, product)
            })
            .await;

        let mut tx = store.begin().await.unwrap();
        let owner = CartOwner::User(user);
        let cart = tx.create_cart(&owner).await.unwrap();
        tx.insert_cart_item(cart.id, product, None, quantity)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let service = CheckoutService::new(
            Arc::new(store.clone()),
            settings(),
            Arc::new(LogNotifier),
        );
        let customer = CurrentUser {
            id: user,
            email: "sam@example.com".to_string(),
            name: "Sam Rivera".to_string(),
            role: UserRole::Customer,
        };
        (
            Fixture {
                store,
                service,
                customer,
                owner,
            },
            product,
        )
    }

    #[test]
    fn test_order_number_format() {
        let now = Utc.with_ymd_and_hms(2026, 3, 9, 12, 0, 0).unwrap();
        let number = generate_order_number(now);

        assert!(number.starts_with("ORD-20260309-"));
        let suffix = number.trim_start_matches("ORD-20260309-");
        assert_eq!(suffix.len(), 6);
        assert!(suffix.bytes().all(|b| ORDER_SUFFIX_CHARSET.contains(&b)));
    }

    #[tokio::test]
    async fn test_coupon_example_totals() {
        let (f, product) = fixture(Decimal::from(100), 10, 1).await;
        f.store.seed(|s| s.add_coupon(coupon("SAVE20", None))).await;

        let placed = f
            .service
            .place_order(&f.customer, &f.owner, request(Some("save20")), None)
            .await
            .unwrap();

        assert_eq!(placed.order.discount_amount, Decimal::new(2000, 2));
        assert_eq!(placed.order.tax, Decimal::new(640, 2));
        assert_eq!(placed.order.total, Decimal::new(9140, 2));
        assert_eq!(placed.order.applied_code.as_deref(), Some("SAVE20"));
        assert_eq!(placed.payment.amount, placed.order.total);

        let (stock, items, used) = f
            .store
            .inspect(|s| {
                (
                    s.product(product).unwrap().stock,
                    s.items_in_cart(&f.owner).len(),
                    s.coupon(placed.order.coupon_id.unwrap()).unwrap().used_count,
                )
            })
            .await;
        assert_eq!(stock, 9);
        assert_eq!(items, 0);
        assert_eq!(used, 1);
    }

    #[tokio::test]
    async fn test_affiliate_cookie_discount() {
        let (f, _) = fixture(Decimal::from(50), 10, 1).await;
        let affiliate = f
            .store
            .seed(|s| {
                let user = s.add_customer("aff@example.com", "Aff");
                s.add_affiliate(
                    user,
                    "FRIEND",
                    Some(Decimal::from(12)),
                    AffiliateStatus::Approved,
                    None,
                )
            })
            .await;

        let placed = f
            .service
            .place_order(&f.customer, &f.owner, request(None), Some("friend"))
            .await
            .unwrap();

        assert_eq!(placed.order.discount_amount, Decimal::from(5));
        assert_eq!(placed.order.affiliate_id, Some(affiliate));
        assert_eq!(placed.discount_source, DiscountSource::Affiliate);
    }

    #[tokio::test]
    async fn test_insufficient_stock_names_product_and_writes_nothing() {
        let (f, product) = fixture(Decimal::from(10), 2, 3).await;

        let err = f
            .service
            .place_order(&f.customer, &f.owner, request(None), None)
            .await
            .unwrap_err();

        match err {
            CheckoutError::InsufficientStock { product, available } => {
                assert_eq!(product, "Lamp");
                assert_eq!(available, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let (orders, stock, items) = f
            .store
            .inspect(|s| {
                (
                    s.orders().count(),
                    s.product(product).unwrap().stock,
                    s.items_in_cart(&f.owner).len(),
                )
            })
            .await;
        assert_eq!(orders, 0);
        assert_eq!(stock, 2);
        assert_eq!(items, 1);
    }

    #[tokio::test]
    async fn test_validation_runs_before_store() {
        let (f, _) = fixture(Decimal::from(10), 5, 1).await;

        let mut bad_method = request(None);
        bad_method.payment_method = "paypal".to_string();
        let err = f
            .service
            .place_order(&f.customer, &f.owner, bad_method, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::UnsupportedPaymentMethod(_)));

        let mut bad_address = request(None);
        bad_address.shipping_address.city = "  ".to_string();
        let err = f
            .service
            .place_order(&f.customer, &f.owner, bad_address, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::InvalidAddress(_)));
    }

    #[tokio::test]
    async fn test_second_submission_finds_empty_cart() {
        let (f, _) = fixture(Decimal::from(10), 5, 1).await;

        f.service
            .place_order(&f.customer, &f.owner, request(None), None)
            .await
            .unwrap();
        let err = f
            .service
            .place_order(&f.customer, &f.owner, request(None), None)
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::EmptyCart));
        assert_eq!(f.store.inspect(|s| s.orders().count()).await, 1);
    }

    #[tokio::test]
    async fn test_empty_cart_is_refused_before_discount_lookup() {
        let (f, _) = fixture(Decimal::from(10), 5, 1).await;
        let guest = CartOwner::Guest("no-cart-yet".to_string());

        let err = f
            .service
            .place_order(&f.customer, &guest, request(Some("NOPE")), None)
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::EmptyCart));
        f.store
            .inspect(|s| {
                assert_eq!(s.orders().count(), 0);
                assert_eq!(s.address_count(), 0);
            })
            .await;
    }

    #[tokio::test]
    async fn test_concurrent_submissions_of_one_cart_place_one_order() {
        let (f, product) = fixture(Decimal::from(10), 5, 1).await;
        let other = f.service.clone();

        let (first, second) = tokio::join!(
            f.service
                .place_order(&f.customer, &f.owner, request(None), None),
            other.place_order(&f.customer, &f.owner, request(None), None),
        );

        let results = [first, second];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(
            results
                .iter()
                .any(|r| matches!(r, Err(CheckoutError::EmptyCart)))
        );
        f.store
            .inspect(|s| {
                assert_eq!(s.orders().count(), 1);
                assert_eq!(s.product(product).unwrap().stock, 4);
            })
            .await;
    }

    #[tokio::test]
    async fn test_line_without_variant_is_refused_once_product_has_variants() {
        let (f, product) = fixture(Decimal::from(10), 5, 1).await;
        f.store
            .seed(|s| {
                s.add_variant(product, "Large", Decimal::from(14), 5);
            })
            .await;

        let err = f
            .service
            .place_order(&f.customer, &f.owner, request(None), None)
            .await
            .unwrap_err();

        match err {
            CheckoutError::ProductUnavailable(name) => assert_eq!(name, "Lamp"),
            other => panic!("unexpected error: {other:?}"),
        }
        f.store
            .inspect(|s| {
                assert_eq!(s.orders().count(), 0);
                assert_eq!(s.product(product).unwrap().stock, 5);
                assert_eq!(s.items_in_cart(&f.owner).len(), 1);
            })
            .await;
    }

    #[tokio::test]
    async fn test_failure_after_inserts_rolls_back_everything() {
        let (f, product) = fixture(Decimal::from(10), 5, 2).await;
        f.store.seed(|s| s.add_coupon(coupon("SAVE20", None))).await;
        f.store
            .seed(|s| s.fail_at(Some(FailPoint::ClearCart)))
            .await;

        let err = f
            .service
            .place_order(&f.customer, &f.owner, request(Some("SAVE20")), None)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Repository(_)));

        f.store
            .inspect(|s| {
                assert_eq!(s.orders().count(), 0);
                assert_eq!(s.payments().count(), 0);
                assert_eq!(s.address_count(), 0);
                assert_eq!(s.product(product).unwrap().stock, 5);
                assert_eq!(s.items_in_cart(&f.owner).len(), 1);
            })
            .await;
    }

    #[tokio::test]
    async fn test_entered_expired_coupon_fails_placement() {
        let (f, _) = fixture(Decimal::from(10), 5, 1).await;
        let mut expired = coupon("OLD", None);
        expired.expires_at = Some(Utc::now() - chrono::Duration::days(1));
        f.store.seed(|s| s.add_coupon(expired)).await;

        let err = f
            .service
            .place_order(&f.customer, &f.owner, request(Some("old")), None)
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::CouponUnavailable(_)));
    }

    #[tokio::test]
    async fn test_unknown_code_gives_no_discount() {
        let (f, _) = fixture(Decimal::from(10), 5, 1).await;

        let placed = f
            .service
            .place_order(&f.customer, &f.owner, request(Some("nope")), None)
            .await
            .unwrap();

        assert_eq!(placed.order.discount_amount, Decimal::ZERO);
        assert_eq!(placed.order.applied_code, None);
    }

    #[tokio::test]
    async fn test_validate_code() {
        let (f, _) = fixture(Decimal::from(10), 5, 1).await;
        f.store.seed(|s| s.add_coupon(coupon("SAVE20", None))).await;

        let accepted = f
            .service
            .validate_code(Some(&f.owner), " save20 ")
            .await
            .unwrap();
        assert_eq!(accepted.code, "SAVE20");
        assert_eq!(accepted.source, DiscountSource::Coupon);

        let err = f
            .service
            .validate_code(Some(&f.owner), "bogus")
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::InvalidCode(_)));

        let err = f.service.validate_code(Some(&f.owner), "   ").await.unwrap_err();
        assert!(matches!(err, CheckoutError::MissingCode));
    }

    #[tokio::test]
    async fn test_quote_changes_nothing() {
        let (f, product) = fixture(Decimal::from(100), 10, 1).await;
        f.store.seed(|s| s.add_coupon(coupon("SAVE20", Some(1)))).await;

        let quote = f
            .service
            .quote(&f.owner, &DiscountCodes::new(Some("SAVE20"), None))
            .await
            .unwrap();

        assert_eq!(quote.totals.total, Decimal::new(9140, 2));
        f.store
            .inspect(|s| {
                assert_eq!(s.product(product).unwrap().stock, 10);
                assert_eq!(s.items_in_cart(&f.owner).len(), 1);
                assert_eq!(s.orders().count(), 0);
            })
            .await;
    }
}
