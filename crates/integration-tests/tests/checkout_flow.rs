//! End-to-end checkout: worked pricing examples, discount precedence, and
//! order items frozen at placement.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use rust_decimal::Decimal;

use orchard_core::cart::CartOwner;
use orchard_core::pricing::DiscountSource;
use orchard_core::{AffiliateStatus, CommissionType, StoreSettings};
use orchard_integration_tests::{Shop, example_settings, order_request, percent_coupon};
use orchard_storefront::services::CheckoutError;

#[tokio::test]
async fn test_coupon_example_totals_91_40() {
    let shop = Shop::new(example_settings());
    let customer = shop.customer("sam@orchard.test").await;
    let product = shop
        .store
        .seed(|s| {
            s.add_coupon(percent_coupon("SAVE20", 20, None));
            s.add_product("Walnut Desk Lamp", Decimal::from(100), 10)
        })
        .await;
    shop.fill_cart(&customer, product, 1).await;

    let placed = shop
        .state
        .checkout()
        .place_order(
            &customer,
            &CartOwner::User(customer.id),
            order_request(Some("save20")),
            None,
        )
        .await
        .unwrap();

    let order = placed.order;
    assert_eq!(order.subtotal, Decimal::from(100));
    assert_eq!(order.discount_amount, Decimal::from(20));
    assert_eq!(order.tax, Decimal::new(640, 2));
    assert_eq!(order.shipping_cost, Decimal::from(5));
    assert_eq!(order.total, Decimal::new(9140, 2));
    assert_eq!(order.applied_code.as_deref(), Some("SAVE20"));
    assert_eq!(placed.discount_source, DiscountSource::Coupon);
}

#[tokio::test]
async fn test_referral_example_discount_and_commission_5_40() {
    let shop = Shop::new(StoreSettings::default());
    let customer = shop.customer("sam@orchard.test").await;
    let admin = shop.admin().await;
    let (product, affiliate) = shop
        .store
        .seed(|s| {
            let referrer = s.add_customer("jane@orchard.test", "Jane");
            let affiliate = s.add_affiliate(
                referrer,
                "JANE",
                Some(Decimal::from(12)),
                AffiliateStatus::Approved,
                None,
            );
            (s.add_product("Linen Throw", Decimal::from(50), 10), affiliate)
        })
        .await;
    shop.fill_cart(&customer, product, 1).await;

    let placed = shop
        .state
        .checkout()
        .place_order(
            &customer,
            &CartOwner::User(customer.id),
            order_request(None),
            Some("jane"),
        )
        .await
        .unwrap();
    assert_eq!(placed.order.discount_amount, Decimal::from(5));
    assert_eq!(placed.order.affiliate_id, Some(affiliate));

    let confirmation = shop
        .state
        .payments()
        .confirm_payment(placed.order.id, &admin)
        .await
        .unwrap();

    assert_eq!(confirmation.commissions.len(), 1);
    let commission = &confirmation.commissions[0];
    assert_eq!(commission.commission_type, CommissionType::Direct);
    assert_eq!(commission.rate, Decimal::from(12));
    assert_eq!(commission.amount, Decimal::new(540, 2));
}

#[tokio::test]
async fn test_entered_coupon_beats_referral_cookie() {
    let shop = Shop::new(StoreSettings::default());
    let customer = shop.customer("sam@orchard.test").await;
    let (product, affiliate) = shop
        .store
        .seed(|s| {
            s.add_coupon(percent_coupon("SAVE20", 20, None));
            let referrer = s.add_customer("jane@orchard.test", "Jane");
            let affiliate =
                s.add_affiliate(referrer, "JANE", None, AffiliateStatus::Approved, None);
            (s.add_product("Linen Throw", Decimal::from(50), 10), affiliate)
        })
        .await;
    shop.fill_cart(&customer, product, 2).await;

    let placed = shop
        .state
        .checkout()
        .place_order(
            &customer,
            &CartOwner::User(customer.id),
            order_request(Some("SAVE20")),
            Some("JANE"),
        )
        .await
        .unwrap();

    // 20% of 100 from the coupon, not 10% from the referral on top
    assert_eq!(placed.order.discount_amount, Decimal::from(20));
    assert_eq!(placed.discount_source, DiscountSource::Coupon);
    assert_eq!(placed.order.applied_code.as_deref(), Some("SAVE20"));
    // Attribution still follows the cookie
    assert_eq!(placed.order.affiliate_id, Some(affiliate));
}

#[tokio::test]
async fn test_order_items_survive_product_edit_and_delete() {
    let shop = Shop::new(StoreSettings::default());
    let customer = shop.customer("sam@orchard.test").await;
    let (lamp, throw) = shop
        .store
        .seed(|s| {
            (
                s.add_product("Walnut Desk Lamp", Decimal::new(4950, 2), 10),
                s.add_product("Linen Throw", Decimal::from(30), 10),
            )
        })
        .await;
    shop.fill_cart(&customer, lamp, 1).await;
    shop.fill_cart(&customer, throw, 2).await;

    let placed = shop
        .state
        .checkout()
        .place_order(
            &customer,
            &CartOwner::User(customer.id),
            order_request(None),
            None,
        )
        .await
        .unwrap();

    shop.store
        .seed(|s| {
            s.set_product_price(lamp, Decimal::from(99));
            s.delete_product(throw);
        })
        .await;

    let detail = shop
        .state
        .orders()
        .detail(&customer, placed.order.id)
        .await
        .unwrap()
        .unwrap();

    let lamp_item = detail
        .items
        .iter()
        .find(|item| item.product_name == "Walnut Desk Lamp")
        .unwrap();
    assert_eq!(lamp_item.unit_price, Decimal::new(4950, 2));
    assert_eq!(lamp_item.product_id, Some(lamp));
    assert_eq!(lamp_item.sku.as_deref(), Some(format!("SKU-{lamp}").as_str()));

    let throw_item = detail
        .items
        .iter()
        .find(|item| item.product_name == "Linen Throw")
        .unwrap();
    assert_eq!(throw_item.unit_price, Decimal::from(30));
    assert_eq!(throw_item.line_total, Decimal::from(60));
    assert_eq!(throw_item.product_id, None);
}

#[tokio::test]
async fn test_guest_cart_merges_into_user_cart_before_checkout() {
    let shop = Shop::new(StoreSettings::default());
    let customer = shop.customer("sam@orchard.test").await;
    let product = shop
        .store
        .seed(|s| s.add_product("Linen Throw", Decimal::from(30), 10))
        .await;
    let guest = CartOwner::Guest("browser-token".to_owned());
    shop.state
        .cart()
        .add_item(&guest, product, None, 2)
        .await
        .unwrap();
    shop.fill_cart(&customer, product, 1).await;

    let view = shop
        .state
        .cart()
        .merge_guest_cart("browser-token", customer.id)
        .await
        .unwrap();
    assert_eq!(view.item_count, 3);
    assert!(shop.store.inspect(|s| s.cart(&guest).is_none()).await);

    let placed = shop
        .state
        .checkout()
        .place_order(
            &customer,
            &CartOwner::User(customer.id),
            order_request(None),
            None,
        )
        .await
        .unwrap();
    assert_eq!(placed.order.subtotal, Decimal::from(90));
}

#[tokio::test]
async fn test_failed_checkout_leaves_cart_and_stock_untouched() {
    let shop = Shop::new(StoreSettings::default());
    let customer = shop.customer("sam@orchard.test").await;
    let product = shop
        .store
        .seed(|s| s.add_product("Linen Throw", Decimal::from(30), 3))
        .await;
    shop.fill_cart(&customer, product, 3).await;
    shop.store
        .seed(|s| {
            let mut coupon = percent_coupon("GONE", 10, None);
            coupon.active = false;
            s.add_coupon(coupon);
        })
        .await;

    let err = shop
        .state
        .checkout()
        .place_order(
            &customer,
            &CartOwner::User(customer.id),
            order_request(Some("GONE")),
            None,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::CouponUnavailable(_)));
    shop.store
        .inspect(|s| {
            assert_eq!(s.orders().count(), 0);
            assert_eq!(s.product(product).unwrap().stock, 3);
            assert_eq!(s.items_in_cart(&CartOwner::User(customer.id)).len(), 1);
        })
        .await;
}
